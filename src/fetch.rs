use std::path::{Path, PathBuf};

use miette::{Context, IntoDiagnostic};
use tracing::{debug, info, warn};

use crate::{
    io::{
        build_output_path, find_by_token, find_partials, non_empty_file_size, sanitize_title,
        uniqueness_token,
    },
    outside::{DownloadJob, MediaBackend},
    progress::ProgressTracker,
    result::{Error, Result},
    types::{Extension, FormatKind, Quality},
};

/// What the user asked to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub external_id: String,
    pub quality: Quality,
}

impl DownloadRequest {
    pub fn new(external_id: impl Into<String>, quality: Quality) -> Self {
        Self {
            external_id: external_id.into(),
            quality,
        }
    }

    pub fn format_kind(&self) -> FormatKind {
        self.quality.kind()
    }
}

/// A file that has been downloaded and is ready for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub mime: &'static str,
}

/// Downloads media into a fixed output directory
#[derive(Debug, Clone)]
pub struct Fetcher {
    out_dir: PathBuf,
    show_progress: bool,
}

impl Fetcher {
    pub fn new(out_dir: impl Into<PathBuf>, show_progress: bool) -> Self {
        Self {
            out_dir: out_dir.into(),
            show_progress,
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Download a video or its audio and return the produced file.
    ///
    /// The file is named after the video title followed by a uniqueness token.
    /// An error is returned if any step fails, including when the downloader
    /// claims success but no file can be found.
    pub fn fetch<B: MediaBackend + ?Sized>(
        &self,
        backend: &B,
        request: &DownloadRequest,
    ) -> Result<FetchedFile> {
        std::fs::create_dir_all(&self.out_dir)
            .into_diagnostic()
            .wrap_err_with(|| {
                format!("Could not create output directory {}", self.out_dir.display())
            })?;

        let info = backend
            .resolve(&request.external_id)
            .map_err(|err| err.wrap_err_with(|| "Could not get the video information"))?;

        let title = sanitize_title(&info.title);
        let token = uniqueness_token();
        let ext = request.format_kind().extension();
        let output = build_output_path(&self.out_dir, &title, token, ext);

        info!(
            "Downloading '{}' as {} ({}) into {}",
            info.title,
            request.format_kind(),
            request.quality,
            output.display()
        );

        let mut tracker = if self.show_progress {
            ProgressTracker::new(title.clone())
        } else {
            ProgressTracker::hidden()
        };

        let job = DownloadJob {
            video_id: &request.external_id,
            quality: request.quality,
            output: &output,
        };
        let reported = backend.download(&job, &mut |line: &str| {
            tracker.observe(line);
        });
        tracker.finish();
        debug!("Last seen progress: {:.1}%", tracker.fraction() * 100.0);

        let path = self.locate_output(reported?, token, ext)?;
        let size_bytes = non_empty_file_size(&path).unwrap_or_default();

        info!("Saved {} ({size_bytes} bytes)", path.display());
        Ok(FetchedFile {
            path,
            size_bytes,
            mime: ext.mime(),
        })
    }

    /// Find the downloaded file.
    ///
    /// The path reported by the downloader is trusted first. When it is absent
    /// or unusable, fall back to scanning the output directory for the token.
    fn locate_output(
        &self,
        reported: Option<PathBuf>,
        token: i64,
        ext: Extension,
    ) -> Result<PathBuf> {
        if let Some(path) = reported {
            if non_empty_file_size(&path).is_some() {
                return Ok(path);
            }
            warn!(
                "The downloader reported {} but there is no such non-empty file",
                path.display()
            );
        }

        if let Some(path) = find_by_token(&self.out_dir, token, ext)? {
            warn!("Using {} found by scanning the output directory", path.display());
            return Ok(path);
        }

        let partials = find_partials(&self.out_dir, token)?;
        Err(Error::MissingArtifact { partials })
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, fs};

    use super::*;
    use crate::types::{Bitrate, Resolution, SearchResult};

    #[derive(Clone, Copy)]
    enum Behavior {
        /// Write the requested file and print its path
        WriteAndReport,
        /// Write the requested file without printing anything about it
        WriteSilently,
        /// Write the requested file but print a path that was never written
        ReportWrongPath,
        /// Leave only an unfinished file behind
        PartialOnly,
        /// Exit with a failure status
        Fail,
    }

    struct FakeBackend {
        behavior: Behavior,
        resolve_fails: bool,
        downloads: Cell<usize>,
    }

    impl FakeBackend {
        fn new(behavior: Behavior) -> Self {
            Self {
                behavior,
                resolve_fails: false,
                downloads: Cell::new(0),
            }
        }
    }

    impl MediaBackend for FakeBackend {
        fn search(&self, _query: &str, _total: usize) -> Result<Vec<SearchResult>> {
            Ok(vec![])
        }

        fn resolve(&self, video_id: &str) -> Result<SearchResult> {
            if self.resolve_fails {
                return Err(Error::ProcessFailed {
                    program: "yt-dlp".to_owned(),
                    diagnostic: "ERROR: Video unavailable".to_owned(),
                });
            }
            Ok(SearchResult {
                title: "My/Song:Title?".to_owned(),
                thumbnail_url: String::new(),
                duration_seconds: None,
                external_id: video_id.to_owned(),
            })
        }

        fn download(
            &self,
            job: &DownloadJob<'_>,
            on_line: &mut dyn FnMut(&str),
        ) -> Result<Option<PathBuf>> {
            self.downloads.set(self.downloads.get() + 1);
            on_line("[download]  42.5% of 3.2MiB at 1.0MiB/s ETA 00:02");
            on_line("[download] 100% of 3.2MiB in 00:03");

            match self.behavior {
                Behavior::WriteAndReport => {
                    fs::write(job.output, b"media")?;
                    Ok(Some(job.output.to_path_buf()))
                }
                Behavior::WriteSilently => {
                    fs::write(job.output, b"media")?;
                    Ok(None)
                }
                Behavior::ReportWrongPath => {
                    fs::write(job.output, b"media")?;
                    Ok(Some(job.output.with_extension("webm")))
                }
                Behavior::PartialOnly => {
                    let mut partial = job.output.as_os_str().to_owned();
                    partial.push(".part");
                    fs::write(partial, b"half")?;
                    Ok(None)
                }
                Behavior::Fail => Err(Error::ProcessFailed {
                    program: "yt-dlp".to_owned(),
                    diagnostic: "ERROR: Requested format is not available".to_owned(),
                }),
            }
        }
    }

    fn audio_request() -> DownloadRequest {
        DownloadRequest::new("dQw4w9WgXcQ", Quality::Audio(Bitrate::HIGHEST))
    }

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        dir.read_dir()
            .unwrap()
            .flatten()
            .map(|entry| entry.path())
            .collect()
    }

    #[test]
    fn reported_file_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("downloads");
        let fetcher = Fetcher::new(&out, false);

        let file = fetcher
            .fetch(&FakeBackend::new(Behavior::WriteAndReport), &audio_request())
            .unwrap();

        let name = file.path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("MySongTitle_"), "{name}");
        assert!(name.ends_with(".m4a"), "{name}");
        assert_eq!(file.path.parent(), Some(out.as_path()));
        assert_eq!(file.size_bytes, 5);
        assert_eq!(file.mime, "audio/mp4");
    }

    #[test]
    fn silent_download_is_found_by_scanning() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(dir.path(), false);
        let request = DownloadRequest::new("dQw4w9WgXcQ", Quality::Video(Resolution::Best));

        let file = fetcher
            .fetch(&FakeBackend::new(Behavior::WriteSilently), &request)
            .unwrap();

        assert_eq!(file.mime, "video/mp4");
        assert_eq!(files_in(dir.path()), [file.path]);
    }

    #[test]
    fn wrong_reported_path_falls_back_to_scanning() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(dir.path(), false);

        let file = fetcher
            .fetch(&FakeBackend::new(Behavior::ReportWrongPath), &audio_request())
            .unwrap();

        assert_eq!(Extension::from_path(&file.path), Some(Extension::M4a));
        assert_eq!(files_in(dir.path()), [file.path]);
    }

    #[test]
    fn failed_download_claims_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(dir.path(), false);

        let err = fetcher
            .fetch(&FakeBackend::new(Behavior::Fail), &audio_request())
            .unwrap_err();

        assert!(matches!(err, Error::ProcessFailed { .. }));
        assert!(files_in(dir.path()).is_empty());
    }

    #[test]
    fn success_without_file_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(dir.path(), false);

        let err = fetcher
            .fetch(&FakeBackend::new(Behavior::PartialOnly), &audio_request())
            .unwrap_err();

        match err {
            Error::MissingArtifact { partials } => {
                assert_eq!(partials.len(), 1);
                assert!(partials[0].to_string_lossy().ends_with(".m4a.part"));
            }
            err => panic!("unexpected error {err}"),
        }
    }

    #[test]
    fn metadata_failure_aborts_before_downloading() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(dir.path(), false);
        let backend = FakeBackend {
            resolve_fails: true,
            ..FakeBackend::new(Behavior::WriteAndReport)
        };

        let err = fetcher.fetch(&backend, &audio_request()).unwrap_err();

        assert!(err.to_string().contains("Video unavailable"));
        assert_eq!(backend.downloads.get(), 0);
    }
}
