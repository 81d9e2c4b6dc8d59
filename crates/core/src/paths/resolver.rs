use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::PathError;
use super::sanitize::sanitize_segment;
use crate::job::Job;

/// Container extension for every finished download.
pub const MEDIA_EXTENSION: &str = "mp4";
/// Directory used when a channel has no group.
pub const DEFAULT_GROUP: &str = "Ungrouped";
/// Directory used when the channel name sanitizes to nothing.
pub const DEFAULT_CHANNEL: &str = "Uncategorized";
/// File stem used when the title sanitizes to nothing.
pub const DEFAULT_TITLE: &str = "video";

/// Compute `root/group/channel/title.mp4` without touching the filesystem.
pub fn output_path_for(job: &Job, destination_root: &Path, group_name: Option<&str>) -> PathBuf {
    let group = sanitize_segment(group_name.unwrap_or(DEFAULT_GROUP), DEFAULT_GROUP);
    let channel = sanitize_segment(&job.channel_name, DEFAULT_CHANNEL);
    let title = sanitize_segment(&job.title, DEFAULT_TITLE);

    destination_root
        .join(group)
        .join(channel)
        .join(format!("{}.{}", title, MEDIA_EXTENSION))
}

/// Resolve the absolute output file for a job and create its parent directories.
///
/// Existing directories are not an error. The target file itself is never
/// created, opened or removed.
pub fn resolve_output_path(
    job: &Job,
    destination_root: &Path,
    group_name: Option<&str>,
) -> Result<PathBuf, PathError> {
    let root = std::path::absolute(destination_root).map_err(|e| PathError::InvalidRoot {
        path: destination_root.to_path_buf(),
        source: e,
    })?;

    let path = output_path_for(job, &root, group_name);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PathError::DirectoryCreationFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    debug!(job_id = %job.id, path = %path.display(), "Resolved output path");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{EnqueueRequest, Job};
    use chrono::Utc;
    use tempfile::TempDir;

    fn job(title: &str, channel: &str) -> Job {
        Job::new(
            EnqueueRequest {
                id: "abc123".to_string(),
                title: title.to_string(),
                thumbnail: None,
                channel_name: channel.to_string(),
                channel_id: None,
                group_name: None,
            },
            Utc::now(),
            0,
        )
    }

    #[test]
    fn test_three_level_layout() {
        let job = job("My Video", "Some Channel");
        let path = output_path_for(&job, Path::new("/library"), Some("Music"));
        assert_eq!(
            path,
            PathBuf::from("/library/Music/Some Channel/My Video.mp4")
        );
    }

    #[test]
    fn test_segments_are_sanitized() {
        let job = job("What: is/this?", "A|B");
        let path = output_path_for(&job, Path::new("/library"), Some("x*y"));
        assert_eq!(path, PathBuf::from("/library/xy/AB/What isthis.mp4"));
    }

    #[test]
    fn test_missing_group_and_empty_names_fall_back() {
        let job = job("???", "");
        let path = output_path_for(&job, Path::new("/library"), None);
        assert_eq!(
            path,
            PathBuf::from("/library/Ungrouped/Uncategorized/video.mp4")
        );
    }

    #[test]
    fn test_is_deterministic() {
        let job = job("Same", "Channel");
        let a = output_path_for(&job, Path::new("/r"), Some("G"));
        let b = output_path_for(&job, Path::new("/r"), Some("G"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_resolve_creates_directories_idempotently() {
        let temp_dir = TempDir::new().unwrap();
        let job = job("Clip", "Chan");

        let first = resolve_output_path(&job, temp_dir.path(), Some("Group")).unwrap();
        let second = resolve_output_path(&job, temp_dir.path(), Some("Group")).unwrap();

        assert_eq!(first, second);
        assert!(first.is_absolute());
        assert!(first.parent().unwrap().is_dir());
        assert!(!first.exists(), "target file must not be created");
    }

    #[test]
    fn test_resolve_fails_when_root_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        let job = job("Clip", "Chan");
        let result = resolve_output_path(&job, &file, None);
        assert!(matches!(
            result,
            Err(PathError::DirectoryCreationFailed { .. })
        ));
    }
}
