use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicI64, Ordering},
};

use time::OffsetDateTime;
use tracing::debug;

use crate::{result::Result, types::Extension};

/// Suffixes the downloader gives to files it has not finished writing
const PARTIAL_SUFFIXES: [&str; 3] = [".part", ".ytdl", ".temp"];

/// Keep only the characters that are safe in a file name on every platform:
/// alphanumerics, spaces, hyphens and underscores.
///
/// Falls back to `video` if nothing usable remains.
pub fn sanitize_title(title: &str) -> String {
    let clean: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();

    let clean = clean.trim();
    if clean.is_empty() {
        "video".to_owned()
    } else {
        clean.to_owned()
    }
}

/// Return a token to tell apart files downloaded from similarly named videos.
///
/// This is the current epoch second, bumped when needed so that two calls
/// never return the same value within this process.
pub fn uniqueness_token() -> i64 {
    static LAST: AtomicI64 = AtomicI64::new(0);

    let now = OffsetDateTime::now_utc().unix_timestamp();
    let prev = LAST
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or(now);

    now.max(prev + 1)
}

/// Build the output path of a download: `<out_dir>/<title>_<token><ext>`
pub fn build_output_path(out_dir: &Path, title: &str, token: i64, ext: Extension) -> PathBuf {
    out_dir.join(format!("{title}_{token}{}", ext.with_dot()))
}

/// Size of the file, or None if it is not a regular non-empty file
pub fn non_empty_file_size(path: &Path) -> Option<u64> {
    fs::metadata(path)
        .ok()
        .filter(|meta| meta.is_file() && meta.len() > 0)
        .map(|meta| meta.len())
}

/// Fallback lookup of a downloaded file, used when the downloader did not tell
/// where it wrote it.
///
/// Scan `out_dir` for non-empty files whose name contains the token and ends
/// with the expected extension, and pick the largest one.
///
/// The scan is not safe against another process writing files with the same
/// token in the same directory at the same time.
pub fn find_by_token(out_dir: &Path, token: i64, ext: Extension) -> Result<Option<PathBuf>> {
    let token = token.to_string();
    let mut best: Option<(u64, PathBuf)> = None;

    for entry in out_dir.read_dir()? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if !name.contains(&token) || Extension::from_path(&path) != Some(ext) {
            continue;
        }

        if let Some(size) = non_empty_file_size(&path) {
            debug!("Candidate {} ({size} bytes)", path.display());
            if best.as_ref().map_or(true, |(best_size, _)| size > *best_size) {
                best = Some((size, path));
            }
        }
    }

    Ok(best.map(|(_, path)| path))
}

/// List the unfinished download artifacts carrying the token
pub fn find_partials(out_dir: &Path, token: i64) -> Result<Vec<PathBuf>> {
    let token = token.to_string();
    let mut partials: Vec<PathBuf> = out_dir
        .read_dir()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |name| {
                    name.contains(&token) && PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s))
                })
        })
        .collect();

    partials.sort();
    Ok(partials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_title("My/Song:Title?"), "MySongTitle");
        assert_eq!(
            sanitize_title(" Daft Punk - One More Time (Official_Video) "),
            "Daft Punk - One More Time Official_Video"
        );
        assert_eq!(sanitize_title("???"), "video");
    }

    #[test]
    fn sanitized_titles_only_contain_allowed_characters() {
        let title = sanitize_title(r#"a<b>c:d"e/f\g|h?i*j. k-l_m"#);
        assert!(title
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_')));
    }

    #[test]
    fn tokens_never_repeat() {
        let a = uniqueness_token();
        let b = uniqueness_token();
        let c = uniqueness_token();
        assert!(a < b && b < c);
    }

    #[test]
    fn output_path_layout() {
        let path = build_output_path(Path::new("downloads"), "Song", 1700000000, Extension::M4a);
        assert_eq!(path, Path::new("downloads").join("Song_1700000000.m4a"));
    }

    #[test]
    fn fallback_scan_prefers_largest_matching_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path();

        fs::write(p.join("Song_42.f137.mp4"), b"12345").unwrap();
        fs::write(p.join("Song_42.mp4"), b"1234567890").unwrap();
        fs::write(p.join("Song_42.mp4.part"), vec![0u8; 100]).unwrap();
        fs::write(p.join("Other_41.mp4"), vec![0u8; 100]).unwrap();
        fs::write(p.join("Song_42.m4a"), vec![0u8; 100]).unwrap();

        let found = find_by_token(p, 42, Extension::Mp4).unwrap();
        assert_eq!(found, Some(p.join("Song_42.mp4")));
    }

    #[test]
    fn fallback_scan_ignores_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Song_7.m4a"), b"").unwrap();

        assert_eq!(find_by_token(dir.path(), 7, Extension::M4a).unwrap(), None);
    }

    #[test]
    fn partials_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path();
        fs::write(p.join("Song_9.m4a.part"), b"xx").unwrap();
        fs::write(p.join("Song_9.m4a.ytdl"), b"xx").unwrap();
        fs::write(p.join("Song_8.m4a.part"), b"xx").unwrap();

        assert_eq!(
            find_partials(p, 9).unwrap(),
            [p.join("Song_9.m4a.part"), p.join("Song_9.m4a.ytdl")]
        );
    }
}
