use std::sync::OnceLock;

use regex::Regex;

/// Optional scheme and `www.` prefix
macro_rules! opt_prefix {
    () => {
        r#"(?:https?://)?(?:www\.)?"#
    };
}
/// Either the long watch form or the short form of a video link
macro_rules! watch_path {
    () => {
        r#"(?:youtube\.com/watch\?v=|youtu\.be/)"#
    };
}
/// The 11 characters video identifier
macro_rules! video_id {
    () => {
        r#"(?P<id>[a-zA-Z0-9_-]{11})"#
    };
}

/// A video link, anchored at the start only so trailing query parameters are accepted.
/// Example: "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42"
const VIDEO_URL: &str = concat!("^", opt_prefix!(), watch_path!(), video_id!());

/// A progress percentage as printed by the downloader.
/// Example: "[download]  42.5% of 3.20MiB at 1.01MiB/s ETA 00:02"
const PERCENT: &str = r#"(?P<pct>[0-9]{1,3}(?:\.[0-9]+)?)%"#;

static VIDEO_URL_RE: OnceLock<Regex> = OnceLock::new();
static PERCENT_RE: OnceLock<Regex> = OnceLock::new();

pub fn video_url_re() -> &'static Regex {
    VIDEO_URL_RE.get_or_init(|| Regex::new(VIDEO_URL).unwrap())
}

pub fn percent_re() -> &'static Regex {
    PERCENT_RE.get_or_init(|| Regex::new(PERCENT).unwrap())
}

/// Extract the video identifier out of a video link
pub fn extract_video_id(url: &str) -> Option<&str> {
    video_url_re()
        .captures(url.trim())
        .and_then(|cap| cap.name("id"))
        .map(|id| id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_long_and_short_links() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("youtu.be/dQw4w9WgXcQ?si=abc"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("  http://youtube.com/watch?v=a_b-c_d-e_f&t=1 "),
            Some("a_b-c_d-e_f")
        );
    }

    #[test]
    fn rejects_other_links() {
        assert_eq!(extract_video_id("https://vimeo.com/12345678901"), None);
        assert_eq!(extract_video_id("youtube.com/watch?v=short"), None);
        assert_eq!(extract_video_id("see https://youtu.be/dQw4w9WgXcQ"), None);
    }
}
