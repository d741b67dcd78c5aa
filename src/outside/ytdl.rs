use std::path::{Path, PathBuf};

use tracing::debug;

use super::command::{assert_success_command, run_stdout_command, stream_command, YT_DL, YT_DLP};
use crate::{
    result::{bail, Error, Result},
    types::{FormatKind, InfoJson, Quality, SearchResult},
};

/// Marker put in front of the final file path printed by `yt-dlp`
const SAVED_MARKER: &str = "[saved] ";

/// Build the canonical watch page URL of a video
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Everything needed to run a single download
#[derive(Debug, Clone)]
pub struct DownloadJob<'a> {
    pub video_id: &'a str,
    pub quality: Quality,
    /// Exact path the downloader is asked to write to
    pub output: &'a Path,
}

/// Interface for searching, resolving and downloading media
pub trait MediaBackend {
    /// Get the `total` best ranked results for the query, best first
    fn search(&self, query: &str, total: usize) -> Result<Vec<SearchResult>>;

    /// Get the descriptor of a single video
    fn resolve(&self, video_id: &str) -> Result<SearchResult>;

    /// Download a video, calling `on_line` for every line of output while it runs.
    ///
    /// Return the path of the produced file if the downloader reported one.
    /// A downloader exiting with a failure status must be reported as an error.
    fn download(&self, job: &DownloadJob<'_>, on_line: &mut dyn FnMut(&str))
        -> Result<Option<PathBuf>>;
}

/// Interface for the [yt-dlp](https://github.com/yt-dlp/yt-dlp) program,
/// or [youtube-dl](https://github.com/ytdl-org/youtube-dl) when that is all there is
#[derive(Debug)]
pub struct Ytdl {
    program: String,
}

impl Ytdl {
    /// Verify that the `yt-dlp` or `youtube-dl` binaries are reachable
    pub fn new() -> Result<Self> {
        if assert_success_command(YT_DLP, |cmd| cmd.arg("--version")).is_ok() {
            Ok(Self {
                program: YT_DLP.to_owned(),
            })
        } else if assert_success_command(YT_DL, |cmd| cmd.arg("--version")).is_ok() {
            Ok(Self {
                program: YT_DL.to_owned(),
            })
        } else {
            bail("Neither yt-dlp nor youtube-dl found")
        }
    }

    /// Use the given downloader program, verifying it can run
    pub fn with_program(program: &str) -> Result<Self> {
        assert_success_command(program, |cmd| cmd.arg("--version"))
            .map_err(|err| err.wrap_err_with(|| format!("Could not run downloader {program}")))?;

        Ok(Self {
            program: program.to_owned(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// `youtube-dl` knows nothing about `--print after_move:...`
    fn can_print_filepath(&self) -> bool {
        Path::new(&self.program)
            .file_stem()
            .map_or(true, |name| name != YT_DL)
    }
}

impl MediaBackend for Ytdl {
    fn search(&self, query: &str, total: usize) -> Result<Vec<SearchResult>> {
        let output = run_stdout_command(&self.program, |cmd| {
            cmd.arg(format!("ytsearch{total}:{query}"))
                .arg("--skip-download")
                .arg("--dump-json")
                .arg("--no-warnings")
                .arg("--quiet")
        })?;

        parse_descriptor_lines(&output)
    }

    fn resolve(&self, video_id: &str) -> Result<SearchResult> {
        let output = run_stdout_command(&self.program, |cmd| {
            cmd.arg("--dump-json")
                .arg("--no-playlist")
                .arg("--no-warnings")
                .arg("--quiet")
                .arg("--")
                .arg(watch_url(video_id))
        })?;

        let info: InfoJson = serde_json::from_str(output.trim()).map_err(|err| {
            Error::MalformedOutput(format!("video descriptor is not valid: {err}"))
        })?;

        Ok(info.into())
    }

    fn download(
        &self,
        job: &DownloadJob<'_>,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<Option<PathBuf>> {
        let mut reported = None;

        let exit = stream_command(
            &self.program,
            |cmd| {
                let mut cmd = cmd
                    .arg("--output")
                    .arg(job.output)
                    .arg("--no-playlist")
                    .arg("--no-warnings")
                    .arg("--newline")
                    .args(["--format", &job.quality.format_selector()]);

                if job.quality.kind() == FormatKind::Video {
                    cmd = cmd.args(["--merge-output-format", "mp4"]);
                }

                if self.can_print_filepath() {
                    // --print implies --quiet and --simulate, undo both
                    cmd = cmd
                        .args(["--print", &format!("after_move:{SAVED_MARKER}%(filepath)s")])
                        .arg("--no-simulate")
                        .arg("--progress");
                }

                cmd.arg("--").arg(watch_url(job.video_id))
            },
            |line| {
                let text = line.text();
                if let Some(path) = text.strip_prefix(SAVED_MARKER) {
                    debug!("Downloader reported the file {path}");
                    reported = Some(PathBuf::from(path.trim()));
                } else {
                    on_line(text);
                }
            },
        )?;

        if exit.status.success() {
            Ok(reported)
        } else {
            Err(Error::ProcessFailed {
                program: self.program.clone(),
                diagnostic: exit.stderr.join("\n"),
            })
        }
    }
}

/// Parse the downloader's `--dump-json` output: one JSON object per line
fn parse_descriptor_lines(output: &str) -> Result<Vec<SearchResult>> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(idx, line)| {
            serde_json::from_str::<InfoJson>(line)
                .map(SearchResult::from)
                .map_err(|err| {
                    Error::MalformedOutput(format!("descriptor {} is not valid: {err}", idx + 1))
                })
        })
        .collect()
}
