mod bitrate;
mod extension;
mod format;
mod search_result;

pub use bitrate::Bitrate;
pub use extension::Extension;
pub use format::{FormatKind, Quality, Resolution};
pub use search_result::{InfoJson, SearchResult};
