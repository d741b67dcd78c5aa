use std::{
    path::PathBuf,
    process::{Command, Stdio},
};

use tracing::debug;

use crate::result::{Error, Result};

/// A side effect on the user's desktop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open a web page in the default browser
    OpenUrl(String),
    /// Open a folder in the default file manager
    OpenFolder(PathBuf),
    /// Start a program and forget about it
    Spawn { program: String, args: Vec<String> },
}

/// Performs desktop actions.
///
/// Actions are fire-and-forget: success only means the action could be started.
pub trait Launcher {
    fn perform(&self, action: &Action) -> Result<()>;
}

/// Launcher using the operating system facilities
#[derive(Debug, Default)]
pub struct OsLauncher;

impl Launcher for OsLauncher {
    fn perform(&self, action: &Action) -> Result<()> {
        debug!("Performing {action:?}");

        match action {
            Action::OpenUrl(url) => open::that_detached(url)
                .map_err(|err| Error::Launch(format!("opening {url} failed ({err})"))),
            Action::OpenFolder(path) => open::that_detached(path).map_err(|err| {
                Error::Launch(format!("opening {} failed ({err})", path.display()))
            }),
            Action::Spawn { program, args } => Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map(|_child| ())
                .map_err(|err| Error::Launch(format!("starting {program} failed ({err})"))),
        }
    }
}
