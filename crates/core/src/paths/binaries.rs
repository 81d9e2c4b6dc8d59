//! Locating the downloader and its merge tool.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::supervisor::DownloaderConfig;

/// Base name of the downloader executable.
pub const DOWNLOADER_NAME: &str = "yt-dlp";
/// Base name of the merge tool the downloader uses to mux streams.
pub const MERGE_TOOL_NAME: &str = "ffmpeg";

/// Directories that GUI-launched processes commonly miss from `PATH`.
#[cfg(unix)]
const COMMON_TOOL_DIRS: &[&str] = &["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin", "/bin"];
#[cfg(not(unix))]
const COMMON_TOOL_DIRS: &[&str] = &[];

/// Platform file name for an executable.
pub fn executable_name(base: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", base)
    } else {
        base.to_string()
    }
}

/// Build the `PATH` handed to the downloader: the inherited value, then the
/// bundled dir, configured extra dirs and common tool dirs, without duplicates.
pub fn augmented_search_path(config: &DownloaderConfig) -> OsString {
    let mut dirs: Vec<PathBuf> = std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).collect())
        .unwrap_or_default();

    let extra = config
        .bundled_dir
        .iter()
        .cloned()
        .chain(config.extra_search_paths.iter().cloned())
        .chain(COMMON_TOOL_DIRS.iter().map(PathBuf::from));

    for dir in extra {
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }

    std::env::join_paths(dirs).unwrap_or_else(|e| {
        warn!("Could not join search path, using inherited PATH: {}", e);
        std::env::var_os("PATH").unwrap_or_default()
    })
}

/// Find an executable by name in a `PATH`-style list.
pub fn find_in_path(name: &str, search_path: &std::ffi::OsStr) -> Option<PathBuf> {
    let file_name = executable_name(name);
    std::env::split_paths(search_path)
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
}

/// Resolve the downloader: explicit override, bundled copy, then the search path.
///
/// Falls back to the bare command name so the OS reports a spawn error if the
/// tool is missing altogether.
pub fn locate_downloader(config: &DownloaderConfig, search_path: &std::ffi::OsStr) -> PathBuf {
    if let Some(path) = &config.binary_path {
        if path.is_file() {
            debug!("Using downloader override at {}", path.display());
            return path.clone();
        }
        warn!(
            "Configured downloader {} does not exist, falling back",
            path.display()
        );
    }

    if let Some(bundled) = bundled(config, DOWNLOADER_NAME) {
        debug!("Using bundled downloader at {}", bundled.display());
        return bundled;
    }

    find_in_path(DOWNLOADER_NAME, search_path)
        .unwrap_or_else(|| PathBuf::from(executable_name(DOWNLOADER_NAME)))
}

/// Resolve the merge tool: explicit override, next to the downloader, bundled
/// copy, then the search path. `None` lets the downloader look for it itself.
pub fn locate_merge_tool(
    config: &DownloaderConfig,
    downloader: &Path,
    search_path: &std::ffi::OsStr,
) -> Option<PathBuf> {
    if let Some(path) = &config.merge_tool_path {
        if path.is_file() {
            return Some(path.clone());
        }
        warn!(
            "Configured merge tool {} does not exist, falling back",
            path.display()
        );
    }

    let sibling = downloader
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(executable_name(MERGE_TOOL_NAME)))
        .filter(|candidate| candidate.is_file());

    sibling
        .or_else(|| bundled(config, MERGE_TOOL_NAME))
        .or_else(|| find_in_path(MERGE_TOOL_NAME, search_path))
}

fn bundled(config: &DownloaderConfig, name: &str) -> Option<PathBuf> {
    config
        .bundled_dir
        .as_ref()
        .map(|dir| dir.join(executable_name(name)))
        .filter(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(executable_name(name));
        std::fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_override_wins_when_present() {
        let temp_dir = TempDir::new().unwrap();
        let custom = touch(temp_dir.path(), "my-downloader");
        let bundled_dir = temp_dir.path().join("bundle");
        std::fs::create_dir(&bundled_dir).unwrap();
        touch(&bundled_dir, DOWNLOADER_NAME);

        let config = DownloaderConfig {
            binary_path: Some(custom.clone()),
            bundled_dir: Some(bundled_dir),
            ..Default::default()
        };
        assert_eq!(locate_downloader(&config, "".as_ref()), custom);
    }

    #[test]
    fn test_missing_override_falls_back_to_bundled() {
        let temp_dir = TempDir::new().unwrap();
        let bundled = touch(temp_dir.path(), DOWNLOADER_NAME);

        let config = DownloaderConfig {
            binary_path: Some(temp_dir.path().join("missing")),
            bundled_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(locate_downloader(&config, "".as_ref()), bundled);
    }

    #[test]
    fn test_search_path_then_bare_name() {
        let temp_dir = TempDir::new().unwrap();
        let on_path = touch(temp_dir.path(), DOWNLOADER_NAME);
        let config = DownloaderConfig::default();

        assert_eq!(
            locate_downloader(&config, temp_dir.path().as_os_str()),
            on_path
        );

        let empty = TempDir::new().unwrap();
        assert_eq!(
            locate_downloader(&config, empty.path().as_os_str()),
            PathBuf::from(executable_name(DOWNLOADER_NAME))
        );
    }

    #[test]
    fn test_merge_tool_next_to_downloader() {
        let temp_dir = TempDir::new().unwrap();
        let downloader = touch(temp_dir.path(), DOWNLOADER_NAME);
        let merge_tool = touch(temp_dir.path(), MERGE_TOOL_NAME);

        let config = DownloaderConfig::default();
        let found = locate_merge_tool(&config, &downloader, "".as_ref());
        assert_eq!(found, Some(merge_tool));
    }

    #[test]
    fn test_merge_tool_not_found() {
        let empty = TempDir::new().unwrap();
        let config = DownloaderConfig::default();
        let found = locate_merge_tool(
            &config,
            Path::new(DOWNLOADER_NAME),
            empty.path().as_os_str(),
        );
        assert!(found.is_none());
    }

    #[test]
    fn test_augmented_path_includes_extra_dirs_once() {
        let config = DownloaderConfig {
            bundled_dir: Some(PathBuf::from("/opt/bundle")),
            extra_search_paths: vec![PathBuf::from("/opt/bundle"), PathBuf::from("/opt/tools")],
            ..Default::default()
        };
        let joined = augmented_search_path(&config);
        let dirs: Vec<PathBuf> = std::env::split_paths(&joined).collect();

        assert_eq!(
            dirs.iter().filter(|d| *d == Path::new("/opt/bundle")).count(),
            1
        );
        assert!(dirs.contains(&PathBuf::from("/opt/tools")));
    }
}
