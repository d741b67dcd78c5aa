mod command;
mod launcher;
mod ytdl;

pub use launcher::{Action, Launcher, OsLauncher};
pub use ytdl::{DownloadJob, MediaBackend, Ytdl};
