use std::{fmt::Display, str::FromStr};

use clap::ValueEnum;

use super::{Bitrate, Extension};

/// What kind of media the user wants to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatKind {
    Audio,
    Video,
}

impl FormatKind {
    pub fn default_quality(self) -> Quality {
        match self {
            FormatKind::Audio => Quality::Audio(Bitrate::HIGHEST),
            FormatKind::Video => Quality::Video(Resolution::Height(1080)),
        }
    }

    pub fn extension(self) -> Extension {
        match self {
            FormatKind::Audio => Extension::M4a,
            FormatKind::Video => Extension::Mp4,
        }
    }

    /// The quality labels offered for this kind, lowest first
    pub fn quality_labels(self) -> Vec<String> {
        match self {
            FormatKind::Audio => Bitrate::CHOICES.iter().map(Bitrate::to_string).collect(),
            FormatKind::Video => Resolution::CHOICES
                .iter()
                .map(Resolution::to_string)
                .collect(),
        }
    }

    /// Parse a quality label in the label set of this format kind
    pub fn parse_quality(self, label: &str) -> Result<Quality, String> {
        match self {
            FormatKind::Audio => label.parse().map(Quality::Audio),
            FormatKind::Video => label.parse().map(Quality::Video),
        }
    }
}

impl Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatKind::Audio => write!(f, "audio"),
            FormatKind::Video => write!(f, "video"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Height(u16),
    Best,
}

impl Resolution {
    pub const CHOICES: [Resolution; 5] = [
        Resolution::Height(360),
        Resolution::Height(480),
        Resolution::Height(720),
        Resolution::Height(1080),
        Resolution::Best,
    ];
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("best") {
            return Ok(Resolution::Best);
        }

        Self::CHOICES
            .into_iter()
            .find(|r| r.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Resolution '{s}' is not one of 360p, 480p, 720p, 1080p, Best"))
    }
}

impl Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Height(h) => write!(f, "{h}p"),
            Resolution::Best => write!(f, "Best"),
        }
    }
}

/// A quality label bound to the format kind it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Audio(Bitrate),
    Video(Resolution),
}

impl Quality {
    pub fn kind(self) -> FormatKind {
        match self {
            Quality::Audio(_) => FormatKind::Audio,
            Quality::Video(_) => FormatKind::Video,
        }
    }

    /// The `--format` selector handed to the downloader.
    ///
    /// Audio only distinguishes the highest bitrate from every other one:
    /// anything below 320k selects the worst audio-only stream.
    pub fn format_selector(self) -> String {
        match self {
            Quality::Audio(bitrate) if bitrate == Bitrate::HIGHEST => {
                "bestaudio[ext=m4a]/bestaudio/best".to_owned()
            }
            Quality::Audio(_) => "worstaudio[ext=m4a]/worstaudio/worst".to_owned(),
            Quality::Video(Resolution::Best) => {
                "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_owned()
            }
            Quality::Video(Resolution::Height(h)) => format!(
                "bestvideo[height<={h}][ext=mp4]+bestaudio[ext=m4a]/best[height<={h}][ext=mp4]/best"
            ),
        }
    }
}

impl Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quality::Audio(b) => b.fmt(f),
            Quality::Video(r) => r.fmt(f),
        }
    }
}
