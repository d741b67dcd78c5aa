use std::{fmt::Display, path::PathBuf};

use miette::miette;

#[derive(Debug)]
pub enum Error {
    /// The external program could not be started or exited with a failure status.
    /// The diagnostic is whatever the program wrote on its error stream.
    ProcessFailed { program: String, diagnostic: String },

    /// The external program succeeded but its output could not be understood
    MalformedOutput(String),

    /// The download reported success but no usable file was found.
    /// Partial download artifacts found in the output directory are attached.
    MissingArtifact { partials: Vec<PathBuf> },

    /// The user gave something we cannot work with
    InvalidInput(String),

    /// An OS-level action (browser, folder, application) could not be started
    Launch(String),

    Miette(miette::Report),
}

impl From<miette::Report> for Error {
    fn from(err: miette::Report) -> Self {
        Error::Miette(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Miette(miette!("{err}"))
    }
}

impl From<Error> for miette::Report {
    fn from(err: Error) -> Self {
        match err {
            Error::Miette(err) => err,
            err => miette!("{err}"),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ProcessFailed {
                program,
                diagnostic,
            } => {
                let diagnostic = diagnostic.trim();
                if diagnostic.is_empty() {
                    write!(f, "{program} did not complete successfully")
                } else {
                    write!(f, "{program} did not complete successfully: {diagnostic}")
                }
            }
            Error::MalformedOutput(msg) => write!(f, "Unexpected downloader output: {msg}"),
            Error::MissingArtifact { partials } if partials.is_empty() => {
                write!(f, "Download finished but no output file was found")
            }
            Error::MissingArtifact { partials } => {
                write!(
                    f,
                    "Download finished but no output file was found. Partial files left behind: "
                )?;
                let names: Vec<_> = partials.iter().map(|p| p.display().to_string()).collect();
                write!(f, "{}", names.join(", "))
            }
            Error::InvalidInput(msg) => write!(f, "{msg}"),
            Error::Launch(msg) => write!(f, "Could not perform the action: {msg}"),
            Error::Miette(report) => write!(f, "{report:#}"),
        }
    }
}

impl Error {
    pub fn wrap_err_with<D, F>(self, f: F) -> Error
    where
        D: Display + Send + Sync + 'static,
        F: FnOnce() -> D,
    {
        match self {
            Error::Miette(report) => Error::Miette(report.wrap_err(f())),
            err => err,
        }
    }
}

pub fn err_msg<D: Display>(msg: D) -> Error {
    Error::Miette(miette!("{msg}"))
}

pub fn bail<T, D: Display>(msg: D) -> Result<T> {
    Err(err_msg(msg))
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_failure_shows_diagnostic() {
        let err = Error::ProcessFailed {
            program: "yt-dlp".to_owned(),
            diagnostic: "ERROR: Video unavailable\n".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "yt-dlp did not complete successfully: ERROR: Video unavailable"
        );
    }

    #[test]
    fn missing_artifact_lists_partials() {
        let err = Error::MissingArtifact {
            partials: vec![PathBuf::from("downloads/a_1.m4a.part")],
        };
        assert!(err.to_string().ends_with("downloads/a_1.m4a.part"));
    }

    #[test]
    fn wrap_err_only_touches_reports() {
        let err = err_msg("inner").wrap_err_with(|| "outer");
        assert!(err.to_string().starts_with("outer"));

        let err = Error::InvalidInput("bad".to_owned()).wrap_err_with(|| "outer");
        assert_eq!(err.to_string(), "bad");
    }
}
