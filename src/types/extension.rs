use std::path::Path;

/// Container of the file we expect the downloader to leave behind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    M4a,
    Mp4,
}

impl Extension {
    /// Return the extension with the leading dot.
    /// e.g. ".ext"
    pub fn with_dot(self) -> &'static str {
        match self {
            Extension::M4a => ".m4a",
            Extension::Mp4 => ".mp4",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Extension::M4a => "audio/mp4",
            Extension::Mp4 => "video/mp4",
        }
    }

    /// Parse the path file extension.
    /// Return None in case of no or invalid extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_ascii_lowercase().as_str() {
                "m4a" => Some(Self::M4a),
                "mp4" => Some(Self::Mp4),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_ignores_partial_files() {
        assert_eq!(Extension::from_path("a/b_12.M4A"), Some(Extension::M4a));
        assert_eq!(Extension::from_path("a/b_12.mp4"), Some(Extension::Mp4));
        assert_eq!(Extension::from_path("a/b_12.mp4.part"), None);
        assert_eq!(Extension::M4a.with_dot(), ".m4a");
    }
}
