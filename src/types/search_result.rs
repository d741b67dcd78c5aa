use serde::Deserialize;

/// One entry of a search, as described by the downloader
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub thumbnail_url: String,
    pub duration_seconds: Option<u64>,
    pub external_id: String,
}

impl SearchResult {
    /// Human-readable duration, `m:ss`
    pub fn duration_label(&self) -> String {
        match self.duration_seconds {
            None | Some(0) => "Unknown duration".to_owned(),
            Some(secs) => format!("{}:{:02}", secs / 60, secs % 60),
        }
    }
}

/// The subset of the downloader's JSON descriptor we care about
#[derive(Debug, Deserialize)]
pub struct InfoJson {
    pub id: String,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    /// Usually an integer, but some extractors report fractional seconds
    pub duration: Option<f64>,
}

impl From<InfoJson> for SearchResult {
    fn from(info: InfoJson) -> Self {
        Self {
            title: info.title.unwrap_or_default(),
            thumbnail_url: info.thumbnail.unwrap_or_default(),
            duration_seconds: info
                .duration
                .filter(|d| d.is_finite() && *d >= 0.0)
                .map(|d| d as u64),
            external_id: info.id,
        }
    }
}
