use std::io::{BufRead, Write};

use indoc::indoc;
use tracing::debug;

use crate::{
    batch::{batch_fetch, render_report},
    fetch::{DownloadRequest, FetchedFile, Fetcher},
    my_regex::extract_video_id,
    outside::MediaBackend,
    result::{Error, Result},
    search::{Searcher, MAX_RESULTS},
    types::{FormatKind, Quality, SearchResult},
};

const HELP: &str = indoc! {"
    Commands:
      format audio|video   choose what to keep (resets the quality)
      quality <label>      96k..320k for audio, 360p..1080p or Best for video
      mode search|url      what a bare line means
      count <1-10>         number of results of a new search
      search <query>       search videos
      more                 load more results of the last search
      get <n>              download result number n
      url <link>           download a video from its link
      batch                download the best match of every following line,
                           until an empty line or 'end'
      status               show the current choices
      reset                forget results and go back to the defaults
      help                 show this help
      quit                 leave
"};

/// What a bare line (one not starting with a command) means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Search,
    Url,
}

/// Everything the user chose or got during one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub mode: Mode,
    pub quality: Quality,
    pub results: Vec<SearchResult>,
    /// Number of ranked results already asked for the last query
    pub offset: usize,
    /// Number of results of a new search
    pub result_count: usize,
    pub last_query: Option<String>,
}

impl SessionState {
    pub fn new(result_count: usize) -> Self {
        Self {
            mode: Mode::Search,
            quality: FormatKind::Audio.default_quality(),
            results: Vec::new(),
            offset: 0,
            result_count: result_count.clamp(1, MAX_RESULTS),
            last_query: None,
        }
    }

    pub fn format_kind(&self) -> FormatKind {
        self.quality.kind()
    }

    /// Switch the format kind, going back to its default quality
    pub fn set_format(&mut self, kind: FormatKind) {
        self.quality = kind.default_quality();
    }

    pub fn set_quality(&mut self, label: &str) -> Result<()> {
        self.quality = self
            .format_kind()
            .parse_quality(label)
            .map_err(Error::InvalidInput)?;
        Ok(())
    }

    pub fn set_result_count(&mut self, count: usize) -> Result<()> {
        if !(1..=MAX_RESULTS).contains(&count) {
            return Err(Error::InvalidInput(format!(
                "The number of results must be between 1 and {MAX_RESULTS}"
            )));
        }
        self.result_count = count;
        Ok(())
    }

    /// Replace the results with the ones of a new search
    pub fn start_results(&mut self, query: &str, results: Vec<SearchResult>) {
        self.last_query = Some(query.to_owned());
        self.results = results;
        self.offset = self.result_count;
    }

    /// Add a page of results of the last search
    pub fn extend_results(&mut self, results: Vec<SearchResult>, page: usize) {
        self.results.extend(results);
        self.offset += page;
    }

    /// Back to a fresh session, keeping the result count
    pub fn reset(&mut self) {
        *self = Self::new(self.result_count);
    }
}

/// One parsed line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Format(FormatKind),
    Quality(String),
    Mode(Mode),
    Count(usize),
    Search(String),
    More,
    Get(usize),
    Url(String),
    BatchStart,
    /// The queries following a `batch` line
    Batch(Vec<String>),
    Status,
    Reset,
    Help,
    Quit,
}

impl Command {
    /// Parse a line of input. A line not starting with a known command word is
    /// a search query in search mode and a link in URL mode.
    pub fn parse(line: &str, mode: Mode) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, rest)| (word, rest.trim()));

        let invalid = |msg: &str| Error::InvalidInput(msg.to_owned());

        Ok(match word.to_lowercase().as_str() {
            "format" => match rest.to_lowercase().as_str() {
                "audio" | "mp3" => Command::Format(FormatKind::Audio),
                "video" | "mp4" => Command::Format(FormatKind::Video),
                _ => return Err(invalid("Usage: format audio|video")),
            },
            "quality" if !rest.is_empty() => Command::Quality(rest.to_owned()),
            "quality" => return Err(invalid("Usage: quality <label>")),
            "mode" => match rest.to_lowercase().as_str() {
                "search" => Command::Mode(Mode::Search),
                "url" => Command::Mode(Mode::Url),
                _ => return Err(invalid("Usage: mode search|url")),
            },
            "count" => Command::Count(
                rest.parse()
                    .map_err(|_| invalid("Usage: count <number>"))?,
            ),
            "search" => Command::Search(rest.to_owned()),
            "more" if rest.is_empty() => Command::More,
            "get" => Command::Get(
                rest.parse()
                    .map_err(|_| invalid("Usage: get <result number>"))?,
            ),
            "url" => Command::Url(rest.to_owned()),
            "batch" if rest.is_empty() => Command::BatchStart,
            "status" if rest.is_empty() => Command::Status,
            "reset" if rest.is_empty() => Command::Reset,
            "help" | "?" if rest.is_empty() => Command::Help,
            "quit" | "exit" if rest.is_empty() => Command::Quit,
            _ => match mode {
                Mode::Search => Command::Search(line.to_owned()),
                Mode::Url => Command::Url(line.to_owned()),
            },
        })
    }
}

/// What to do after a command
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue(String),
    Quit,
}

/// An interactive session reading commands line by line
pub struct Session<'a, B> {
    searcher: &'a Searcher<B>,
    fetcher: &'a Fetcher,
    more_count: usize,
    state: SessionState,
}

impl<'a, B: MediaBackend> Session<'a, B> {
    pub fn new(
        searcher: &'a Searcher<B>,
        fetcher: &'a Fetcher,
        result_count: usize,
        more_count: usize,
    ) -> Self {
        Self {
            searcher,
            fetcher,
            more_count: more_count.clamp(1, MAX_RESULTS),
            state: SessionState::new(result_count),
        }
    }

    /// Read commands until the input ends or the user quits.
    ///
    /// Failed commands are reported on `out` and the session goes on.
    /// Only failing to read the input or to write the output ends it early.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> Result<()> {
        writeln!(out, "Type 'help' to list the commands.")?;
        let mut lines = input.lines();

        loop {
            write!(out, "[{}]> ", self.prompt())?;
            out.flush()?;

            let Some(line) = lines.next() else {
                break;
            };
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let command = match Command::parse(&line, self.state.mode) {
                Ok(Command::BatchStart) => Command::Batch(read_batch(&mut lines)?),
                Ok(command) => command,
                Err(err) => {
                    writeln!(out, "Error: {err}")?;
                    continue;
                }
            };

            debug!("Session command {command:?}");
            match self.handle(command) {
                Ok(Flow::Continue(reply)) => writeln!(out, "{reply}")?,
                Ok(Flow::Quit) => break,
                Err(err) => writeln!(out, "Error: {err}")?,
            }
        }

        Ok(())
    }

    fn prompt(&self) -> String {
        let mode = match self.state.mode {
            Mode::Search => "search",
            Mode::Url => "url",
        };
        format!("{} {} {mode}", self.state.format_kind(), self.state.quality)
    }

    fn handle(&mut self, command: Command) -> Result<Flow> {
        let reply = match command {
            Command::Format(kind) => {
                self.state.set_format(kind);
                format!("Format set to {kind}, quality {}", self.state.quality)
            }
            Command::Quality(label) => {
                self.state.set_quality(&label)?;
                format!("Quality set to {}", self.state.quality)
            }
            Command::Mode(Mode::Search) => {
                self.state.mode = Mode::Search;
                "Search mode: type a song name to search it".to_owned()
            }
            Command::Mode(Mode::Url) => {
                self.state.mode = Mode::Url;
                "URL mode: paste a video link to download it".to_owned()
            }
            Command::Count(count) => {
                self.state.set_result_count(count)?;
                format!("New searches will show {count} results")
            }
            Command::Search(query) => self.search(&query)?,
            Command::More => self.more()?,
            Command::Get(number) => self.get(number)?,
            Command::Url(url) => self.fetch_url(&url)?,
            Command::BatchStart => self.batch(&[]),
            Command::Batch(queries) => self.batch(&queries),
            Command::Status => self.status(),
            Command::Reset => {
                self.state.reset();
                "Session reset".to_owned()
            }
            Command::Help => HELP.trim_end().to_owned(),
            Command::Quit => return Ok(Flow::Quit),
        };

        Ok(Flow::Continue(reply))
    }

    fn search(&mut self, query: &str) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("Please enter a song name.".to_owned()));
        }

        let results = self.searcher.search(query, self.state.result_count, 0)?;
        if results.is_empty() {
            return Ok("No results found.".to_owned());
        }

        self.state.start_results(query, results);
        Ok(self.render_results())
    }

    fn more(&mut self) -> Result<String> {
        let Some(query) = self.state.last_query.clone() else {
            return Err(Error::InvalidInput("Search for something first.".to_owned()));
        };

        let results = self
            .searcher
            .search(&query, self.more_count, self.state.offset)?;
        if results.is_empty() {
            return Ok("No more results available.".to_owned());
        }

        self.state.extend_results(results, self.more_count);
        Ok(self.render_results())
    }

    fn get(&self, number: usize) -> Result<String> {
        let result = number
            .checked_sub(1)
            .and_then(|idx| self.state.results.get(idx))
            .ok_or_else(|| Error::InvalidInput(format!("There is no result number {number}")))?;

        let request = DownloadRequest::new(result.external_id.clone(), self.state.quality);
        let file = self.fetcher.fetch(self.searcher.backend(), &request)?;
        Ok(saved_message(&file))
    }

    fn fetch_url(&self, url: &str) -> Result<String> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::InvalidInput("Please enter a YouTube URL".to_owned()));
        }
        let video_id = extract_video_id(url)
            .ok_or_else(|| Error::InvalidInput("Please enter a valid YouTube URL".to_owned()))?;

        let request = DownloadRequest::new(video_id, self.state.quality);
        let file = self.fetcher.fetch(self.searcher.backend(), &request)?;
        Ok(saved_message(&file))
    }

    fn batch(&self, queries: &[String]) -> String {
        if queries.is_empty() {
            return "Nothing to download.".to_owned();
        }

        let outcomes = batch_fetch(self.searcher, self.fetcher, queries, self.state.quality);
        render_report(&outcomes).trim_end().to_owned()
    }

    fn status(&self) -> String {
        let mode = match self.state.mode {
            Mode::Search => "search",
            Mode::Url => "url",
        };
        let kind = self.state.format_kind();

        format!(
            "Mode: {mode}\nFormat: {kind}\nQuality: {} (available: {})\nResults per search: {}\nResults shown: {}\nOutput directory: {}",
            self.state.quality,
            kind.quality_labels().join(", "),
            self.state.result_count,
            self.state.results.len(),
            self.fetcher.out_dir().display(),
        )
    }

    fn render_results(&self) -> String {
        let mut text = format!("Search results (showing {}):", self.state.results.len());
        for (idx, result) in self.state.results.iter().enumerate() {
            text.push_str(&format!(
                "\n{:>3}. {} ({})",
                idx + 1,
                result.title,
                result.duration_label()
            ));
            if !result.thumbnail_url.is_empty() {
                text.push_str(&format!("\n     {}", result.thumbnail_url));
            }
        }
        text
    }
}

/// Read the lines of a batch, up to an empty line or `end`
fn read_batch<I>(lines: &mut I) -> Result<Vec<String>>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    let mut queries = Vec::new();
    for line in lines {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.eq_ignore_ascii_case("end") {
            break;
        }
        queries.push(line.to_owned());
    }
    Ok(queries)
}

fn saved_message(file: &FetchedFile) -> String {
    format!(
        "Saved {} ({} bytes, {})",
        file.path.display(),
        file.size_bytes,
        file.mime
    )
}
