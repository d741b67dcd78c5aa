use indicatif::{ProgressBar, ProgressStyle};

use crate::my_regex::percent_re;

/// Resolution of the progress bar
const BAR_LEN: u64 = 1000;

/// Parse a percentage out of a downloader output line, as a fraction in `[0, 1]`.
///
/// Returns None for lines without a percentage or with a value above 100%.
pub fn parse_progress(line: &str) -> Option<f64> {
    let cap = percent_re().captures(line)?;
    let pct: f64 = cap.name("pct")?.as_str().parse().ok()?;

    if (0.0..=100.0).contains(&pct) {
        Some(pct / 100.0)
    } else {
        None
    }
}

/// Keeps a progress bar moving forward only.
///
/// The downloader restarts its percentage for every stream it fetches
/// (video then audio), so values going backward are expected and ignored.
pub struct ProgressTracker {
    bar: ProgressBar,
    fraction: f64,
}

impl ProgressTracker {
    /// A tracker drawing a bar on the terminal
    pub fn new(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new(BAR_LEN);
        if let Ok(style) =
            ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {percent:>3}%")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message(message.into());

        Self { bar, fraction: 0.0 }
    }

    /// A tracker which draws nothing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            fraction: 0.0,
        }
    }

    /// Feed one output line. Return true if the visible progress changed.
    pub fn observe(&mut self, line: &str) -> bool {
        match parse_progress(line) {
            Some(fraction) => self.advance(fraction),
            None => false,
        }
    }

    fn advance(&mut self, fraction: f64) -> bool {
        if fraction <= self.fraction {
            return false;
        }

        self.fraction = fraction;
        self.bar.set_position((fraction * BAR_LEN as f64).round() as u64);
        true
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
