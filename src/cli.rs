use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::types::FormatKind;

macro_rules! arg_env {
    ($v:literal) => {
        concat!("TUBEFETCH_", $v)
    };
}

/// Search and download web videos or their audio with `yt-dlp`,
/// and open everyday things from a short phrase.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// The path to a TOML settings file.
    /// Defaults to `tubefetch.toml` in the working directory, if present
    #[arg(long, global = true, env = arg_env!("CONFIG"))]
    pub config: Option<PathBuf>,

    /// The path to the output directory. Overrides the settings file
    #[arg(long, global = true, env = arg_env!("OUTPUT_DIR"))]
    pub out: Option<PathBuf>,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Run a desktop command such as "open youtube" or "open downloads"
    Exec {
        /// The command, in free text
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },

    /// List the desktop commands `exec` understands
    Commands,

    /// Search videos and print the results
    Search {
        /// What to look for
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,

        /// Number of results to show (1 to 10). Defaults to the settings value
        #[arg(long, short = 'n')]
        count: Option<usize>,

        /// Number of best ranked results to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Download a single video, by ID or by link
    Fetch {
        /// A video ID or a video link
        target: String,

        #[command(flatten)]
        format: FormatArgs,
    },

    /// Download the best match of every line of a file (or standard input)
    Batch {
        /// File with one search query per line. Standard input when absent
        file: Option<PathBuf>,

        #[command(flatten)]
        format: FormatArgs,
    },

    /// Start an interactive session
    Session,
}

#[derive(clap::Args, Debug, Clone)]
pub struct FormatArgs {
    /// Keep the audio or the whole video
    #[arg(long, value_enum, default_value_t = FormatKind::Audio, env = arg_env!("FORMAT"))]
    pub format: FormatKind,

    /// Quality label: 96k, 128k, 192k, 256k, 320k for audio;
    /// 360p, 480p, 720p, 1080p, Best for video.
    /// Defaults to 320k for audio and 1080p for video
    #[arg(long, env = arg_env!("QUALITY"))]
    pub quality: Option<String>,
}
