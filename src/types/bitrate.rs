use std::{fmt::Display, str::FromStr};

/// An audio bitrate label, in kbit/s, as offered to the user (e.g. `320k`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Bitrate(u16);

impl Bitrate {
    /// The bitrates the user can choose from, lowest first
    pub const CHOICES: [Bitrate; 5] = [
        Bitrate(96),
        Bitrate(128),
        Bitrate(192),
        Bitrate(256),
        Bitrate(320),
    ];

    pub const HIGHEST: Bitrate = Bitrate(320);
}

impl FromStr for Bitrate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(num_prefix) = s.trim().to_lowercase().strip_suffix('k').map(str::to_owned) else {
            return Err(format!("Bitrate '{s}' does not end with 'k'"));
        };

        let value: u16 = num_prefix
            .parse()
            .map_err(|_| format!("Bitrate '{s}' is not a number of kbit/s"))?;

        Self::CHOICES
            .into_iter()
            .find(|b| b.0 == value)
            .ok_or_else(|| format!("Bitrate '{s}' is not one of 96k, 128k, 192k, 256k, 320k"))
    }
}

impl Display for Bitrate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}k", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_offered_labels() {
        assert_eq!("320k".parse::<Bitrate>(), Ok(Bitrate::HIGHEST));
        assert_eq!("128K".parse::<Bitrate>(), Ok(Bitrate::CHOICES[1]));
    }

    #[test]
    fn rejects_unknown_labels() {
        assert!("100k".parse::<Bitrate>().is_err());
        assert!("320".parse::<Bitrate>().is_err());
        assert!("fastk".parse::<Bitrate>().is_err());
    }
}
