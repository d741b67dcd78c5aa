mod batch;
mod cli;
mod config;
mod dispatcher;
mod fetch;
mod io;
mod logging;
mod my_regex;
mod outside;
mod progress;
mod result;
mod search;
mod session;
mod types;

use std::{io::BufRead, time::Duration};

use clap::Parser;
use miette::{Context, IntoDiagnostic};
use tracing::{debug, info};

use crate::{
    batch::{batch_fetch, render_report},
    cli::{Args, Cmd, FormatArgs},
    config::Settings,
    dispatcher::Dispatcher,
    fetch::{DownloadRequest, Fetcher},
    my_regex::extract_video_id,
    outside::{OsLauncher, Ytdl},
    result::{Error, Result},
    search::Searcher,
    session::Session,
    types::Quality,
};

fn main() -> miette::Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(out) = &args.out {
        settings.output_dir = out.clone();
    }

    logging::init_logging(logging::level_from(args.verbose, &settings.log_level))?;
    debug!("Settings: {settings:?}");

    match args.command {
        Cmd::Exec { words } => {
            let phrase = exec_phrase(&words)?;
            let dispatcher = Dispatcher::new(OsLauncher, &settings.editor);
            println!("{}", dispatcher.execute(&phrase)?);
        }
        Cmd::Commands => {
            let dispatcher = Dispatcher::new(OsLauncher, &settings.editor);
            println!("Available commands:");
            for label in dispatcher.available_commands() {
                println!("- {label}");
            }
        }
        Cmd::Search {
            words,
            count,
            offset,
        } => {
            let searcher = load_searcher(&settings)?;
            let count = count.unwrap_or(settings.default_count);
            let results = searcher.search(&words.join(" "), count, offset)?;

            if results.is_empty() {
                println!("No results found.");
            }
            for (idx, result) in results.iter().enumerate() {
                println!(
                    "{:>3}. {} ({}) [{}]",
                    offset + idx + 1,
                    result.title,
                    result.duration_label(),
                    result.external_id
                );
            }
        }
        Cmd::Fetch { target, format } => {
            let quality = quality_from(&format)?;
            let video_id = video_id_from(&target)?;

            let searcher = load_searcher(&settings)?;
            let fetcher = Fetcher::new(&settings.output_dir, true);
            let file = fetcher.fetch(searcher.backend(), &DownloadRequest::new(video_id, quality))?;

            println!("Saved {} ({} bytes)", file.path.display(), file.size_bytes);
        }
        Cmd::Batch { file, format } => {
            let quality = quality_from(&format)?;
            let queries: Vec<String> = match &file {
                Some(path) => std::fs::read_to_string(path)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("Could not read {}", path.display()))?
                    .lines()
                    .map(str::to_owned)
                    .collect(),
                None => read_lines(std::io::stdin().lock())?,
            };

            let searcher = load_searcher(&settings)?;
            let fetcher = Fetcher::new(&settings.output_dir, true);
            let outcomes = batch_fetch(&searcher, &fetcher, &queries, quality);
            print!("{}", render_report(&outcomes));
        }
        Cmd::Session => {
            let searcher = load_searcher(&settings)?;
            let fetcher = Fetcher::new(&settings.output_dir, true);
            let mut session = Session::new(
                &searcher,
                &fetcher,
                settings.default_count,
                settings.more_count,
            );

            session.run(std::io::stdin().lock(), std::io::stdout().lock())?;
            info!("Session ended");
        }
    }

    Ok(())
}

/// Find the downloader and put the search memoization in front of it
fn load_searcher(settings: &Settings) -> Result<Searcher<Ytdl>> {
    let ytdl = match &settings.downloader {
        Some(program) => Ytdl::with_program(program)?,
        None => Ytdl::new()?,
    };
    info!("Using downloader {}", ytdl.program());

    Ok(Searcher::new(
        ytdl,
        Duration::from_secs(settings.search_ttl_secs),
    ))
}

/// Join the words of `exec`, refusing a command made only of blanks
fn exec_phrase(words: &[String]) -> Result<String> {
    let phrase = words.join(" ");
    if phrase.trim().is_empty() {
        return Err(Error::InvalidInput("Please enter a command".to_owned()));
    }
    Ok(phrase)
}

fn quality_from(args: &FormatArgs) -> Result<Quality> {
    match &args.quality {
        Some(label) => args
            .format
            .parse_quality(label)
            .map_err(Error::InvalidInput),
        None => Ok(args.format.default_quality()),
    }
}

/// Accept either a video link or a bare video ID
fn video_id_from(target: &str) -> Result<String> {
    let target = target.trim();
    if let Some(id) = extract_video_id(target) {
        return Ok(id.to_owned());
    }

    let is_bare_id = target.len() == 11
        && target
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if is_bare_id {
        Ok(target.to_owned())
    } else {
        Err(Error::InvalidInput(format!(
            "'{target}' is neither a YouTube link nor a video ID"
        )))
    }
}

fn read_lines<R: BufRead>(input: R) -> Result<Vec<String>> {
    Ok(input.lines().collect::<std::io::Result<Vec<_>>>()?)
}
