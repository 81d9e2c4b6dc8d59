//! Configuration for the downloader process.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Browsers the downloader can read cookies from directly.
pub const KNOWN_BROWSERS: &[&str] = &["chrome", "firefox", "safari", "edge", "opera", "chromium"];

/// Where authentication cookies come from. The two are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieSource {
    /// Browser keychain identifier, e.g. "firefox".
    Browser(String),
    /// Netscape-format cookie file.
    File(PathBuf),
}

impl CookieSource {
    /// A known browser name selects the keychain, anything else is a file path.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        let lower = value.to_lowercase();
        if KNOWN_BROWSERS.contains(&lower.as_str()) {
            Some(CookieSource::Browser(lower))
        } else {
            Some(CookieSource::File(PathBuf::from(value)))
        }
    }
}

/// Configuration for launching the downloader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloaderConfig {
    /// Explicit downloader executable.
    #[serde(default)]
    pub binary_path: Option<PathBuf>,

    /// Directory holding bundled downloader/merge tool binaries.
    #[serde(default)]
    pub bundled_dir: Option<PathBuf>,

    /// Explicit merge tool executable.
    #[serde(default)]
    pub merge_tool_path: Option<PathBuf>,

    /// Browser name or cookie file path.
    #[serde(default)]
    pub cookie_source: Option<String>,

    #[serde(default)]
    pub proxy_url: Option<String>,

    /// Sent as `--user-agent`. Defaults to a desktop browser; set it to an
    /// empty string to let the downloader pick its own.
    #[serde(default = "default_user_agent")]
    pub user_agent: Option<String>,

    /// Stream selection with fallbacks.
    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default = "default_merge_output_format")]
    pub merge_output_format: String,

    /// Fetch uploaded and automatic subtitles.
    #[serde(default = "default_true")]
    pub subtitles: bool,

    #[serde(default = "default_subtitle_format")]
    pub subtitle_format: String,

    /// URL for a video id; `{id}` is substituted.
    #[serde(default = "default_source_url_template")]
    pub source_url_template: String,

    /// Minimum gap between progress events per job (milliseconds).
    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,

    /// Extra directories appended to the child's PATH.
    #[serde(default)]
    pub extra_search_paths: Vec<PathBuf>,

    /// Additional arguments inserted before the output path.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_format() -> String {
    "bestvideo[ext=mp4][vcodec^=avc1]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string()
}

fn default_merge_output_format() -> String {
    "mp4".to_string()
}

fn default_true() -> bool {
    true
}

/// Desktop Chrome on macOS.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn default_user_agent() -> Option<String> {
    Some(DEFAULT_USER_AGENT.to_string())
}

fn default_subtitle_format() -> String {
    "srt".to_string()
}

fn default_source_url_template() -> String {
    "https://www.youtube.com/watch?v={id}".to_string()
}

fn default_progress_interval() -> u64 {
    100
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            bundled_dir: None,
            merge_tool_path: None,
            cookie_source: None,
            proxy_url: None,
            user_agent: default_user_agent(),
            format: default_format(),
            merge_output_format: default_merge_output_format(),
            subtitles: true,
            subtitle_format: default_subtitle_format(),
            source_url_template: default_source_url_template(),
            progress_interval_ms: default_progress_interval(),
            extra_search_paths: Vec::new(),
            extra_args: Vec::new(),
        }
    }
}

impl DownloaderConfig {
    pub fn cookie_source(&self) -> Option<CookieSource> {
        self.cookie_source.as_deref().and_then(CookieSource::parse)
    }

    pub fn source_url(&self, job_id: &str) -> String {
        self.source_url_template.replace("{id}", job_id)
    }
}
