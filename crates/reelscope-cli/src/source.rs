//! Asset inputs: local video files and Instagram reel URLs.
//!
//! Reels are downloaded with yt-dlp into a temporary directory that is
//! removed when the returned [`DownloadedReel`] is dropped, whichever way
//! the analysis ends.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;

use regex::Regex;
use tempfile::TempDir;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};
use url::Url;

use reelscope_lifecycle::LocalAsset;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Not a reel or post URL: {0}")]
    InvalidUrl(String),

    #[error("yt-dlp not found in PATH")]
    YtDlpNotFound,

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Input file not found: {0}")]
    MissingFile(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SourceResult<T> = Result<T, SourceError>;

fn shortcode_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"/(reels?|p)/([^/?#]+)").unwrap_or_else(|e| panic!("invalid shortcode regex: {e}"))
    })
}

/// A validated Instagram reel or post URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReelUrl {
    url: Url,
    shortcode: String,
}

impl ReelUrl {
    pub fn parse(input: &str) -> SourceResult<Self> {
        let url = Url::parse(input.trim()).map_err(|_| SourceError::InvalidUrl(input.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SourceError::InvalidUrl(input.to_string()));
        }

        let shortcode = shortcode_pattern()
            .captures(url.path())
            .and_then(|c| c.get(2))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| SourceError::InvalidUrl(input.to_string()))?;

        Ok(Self { url, shortcode })
    }

    pub fn shortcode(&self) -> &str {
        &self.shortcode
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

/// Where an asset's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File(PathBuf),
    Reel(ReelUrl),
}

impl InputSource {
    /// Classify a command-line argument: anything with a URL scheme must be
    /// a reel URL, everything else is a path.
    pub fn parse(input: &str) -> SourceResult<Self> {
        if input.starts_with("http://") || input.starts_with("https://") {
            ReelUrl::parse(input).map(InputSource::Reel)
        } else {
            Ok(InputSource::File(PathBuf::from(input)))
        }
    }

    /// Default local identifier for outcomes and logs.
    pub fn label(&self) -> String {
        match self {
            InputSource::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            InputSource::Reel(reel) => format!("reel-{}", reel.shortcode()),
        }
    }
}

/// Downloader settings.
#[derive(Debug, Clone, Default)]
pub struct Downloader {
    work_dir: PathBuf,
    cookies: Option<PathBuf>,
}

/// A reel on local disk. Dropping it removes the download directory.
#[derive(Debug)]
pub struct DownloadedReel {
    path: PathBuf,
    _dir: TempDir,
}

impl DownloadedReel {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// An input made ready for upload.
///
/// Holds the download directory (if any) for as long as the asset is needed.
#[derive(Debug)]
pub struct PreparedInput {
    pub asset: LocalAsset,
    download: Option<DownloadedReel>,
}

impl PreparedInput {
    pub fn download(&self) -> Option<&DownloadedReel> {
        self.download.as_ref()
    }
}

impl Downloader {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            cookies: None,
        }
    }

    /// Pass a Netscape cookies file through to yt-dlp.
    pub fn with_cookies(mut self, cookies: Option<PathBuf>) -> Self {
        self.cookies = cookies;
        self
    }

    /// Resolve an input to an uploadable asset, downloading reels first.
    pub async fn prepare(&self, source: &InputSource, label: Option<&str>) -> SourceResult<PreparedInput> {
        let label = label.map(str::to_string).unwrap_or_else(|| source.label());
        match source {
            InputSource::File(path) => {
                if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                    return Err(SourceError::MissingFile(path.clone()));
                }
                Ok(PreparedInput {
                    asset: LocalAsset::from_path(path).with_label(label),
                    download: None,
                })
            }
            InputSource::Reel(reel) => {
                let download = self.fetch(reel).await?;
                Ok(PreparedInput {
                    asset: LocalAsset::from_path(download.path()).with_label(label),
                    download: Some(download),
                })
            }
        }
    }

    /// Download a reel into a fresh temporary directory under the work dir.
    pub async fn fetch(&self, reel: &ReelUrl) -> SourceResult<DownloadedReel> {
        which::which("yt-dlp").map_err(|_| SourceError::YtDlpNotFound)?;

        tokio::fs::create_dir_all(&self.work_dir).await?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("reel-{}-", reel.shortcode()))
            .tempdir_in(&self.work_dir)?;

        info!(url = %reel.as_str(), dir = %dir.path().display(), "Downloading reel");

        let template = dir.path().join("%(id)s.%(ext)s");
        let mut command = Command::new("yt-dlp");
        command
            .arg("--no-playlist")
            .arg("--quiet")
            .args(["-f", "best[ext=mp4]/best"])
            .args(["--merge-output-format", "mp4"])
            .arg("-o")
            .arg(&template);
        if let Some(cookies) = &self.cookies {
            command.arg("--cookies").arg(cookies);
        }
        command.arg(reel.as_str());

        let output = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp stderr: {}", stderr);
            let message = stderr.lines().last().unwrap_or("Unknown error");
            return Err(SourceError::DownloadFailed(format!("yt-dlp failed: {message}")));
        }

        let path = first_mp4(dir.path())
            .await?
            .ok_or_else(|| SourceError::DownloadFailed("yt-dlp produced no .mp4 file".into()))?;

        info!(path = %path.display(), "Downloaded reel");
        Ok(DownloadedReel { path, _dir: dir })
    }
}

/// First `.mp4` in `dir`, by file name.
async fn first_mp4(dir: &Path) -> SourceResult<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut found = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_mp4 = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("mp4"));
        if is_mp4 {
            found.push(path);
        }
    }
    found.sort();
    Ok(found.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reel_url_shortcodes() {
        let cases = [
            ("https://www.instagram.com/reel/C8abc123/", "C8abc123"),
            ("https://www.instagram.com/reels/XyZ_-9/?igsh=abc", "XyZ_-9"),
            ("https://instagram.com/p/Post42", "Post42"),
        ];
        for (input, expected) in cases {
            assert_eq!(ReelUrl::parse(input).unwrap().shortcode(), expected, "{input}");
        }
    }

    #[test]
    fn test_reel_url_rejects_other_paths() {
        assert!(ReelUrl::parse("https://www.instagram.com/someuser/").is_err());
        assert!(ReelUrl::parse("ftp://instagram.com/reel/abc").is_err());
        assert!(ReelUrl::parse("not a url").is_err());
    }

    #[test]
    fn test_input_classification_and_labels() {
        let file = InputSource::parse("videos/launch.mp4").unwrap();
        assert_eq!(file, InputSource::File(PathBuf::from("videos/launch.mp4")));
        assert_eq!(file.label(), "launch.mp4");

        let reel = InputSource::parse("https://www.instagram.com/reel/Abc1/").unwrap();
        assert_eq!(reel.label(), "reel-Abc1");

        assert!(InputSource::parse("https://example.com/watch").is_err());
    }

    #[tokio::test]
    async fn test_prepare_local_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mov");
        std::fs::write(&path, b"video").unwrap();

        let downloader = Downloader::new(dir.path());
        let prepared = downloader
            .prepare(&InputSource::File(path.clone()), None)
            .await
            .unwrap();
        assert_eq!(prepared.asset.label(), "clip.mov");
        assert_eq!(prepared.asset.content_type(), "video/quicktime");
        assert!(prepared.download().is_none());

        let missing = downloader
            .prepare(&InputSource::File(dir.path().join("nope.mp4")), Some("x"))
            .await
            .unwrap_err();
        assert!(matches!(missing, SourceError::MissingFile(_)));
    }

    #[tokio::test]
    async fn test_first_mp4_picks_by_name() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.mp4"), b"").unwrap();
        std::fs::write(dir.path().join("a.MP4"), b"").unwrap();
        std::fs::write(dir.path().join("a.part"), b"").unwrap();

        let found = first_mp4(dir.path()).await.unwrap().unwrap();
        assert_eq!(found.file_name().unwrap(), "a.MP4");

        let empty = TempDir::new().unwrap();
        assert!(first_mp4(empty.path()).await.unwrap().is_none());
    }
}
