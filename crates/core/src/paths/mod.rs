//! Destination paths and executable lookup.
//!
//! Everything here is a pure function of its inputs apart from creating the
//! destination directory tree.

mod binaries;
mod error;
mod resolver;
mod sanitize;

pub use binaries::{
    augmented_search_path, executable_name, find_in_path, locate_downloader, locate_merge_tool,
    DOWNLOADER_NAME, MERGE_TOOL_NAME,
};
pub use error::PathError;
pub use resolver::{
    output_path_for, resolve_output_path, DEFAULT_CHANNEL, DEFAULT_GROUP, DEFAULT_TITLE,
    MEDIA_EXTENSION,
};
pub use sanitize::{sanitize_segment, ILLEGAL_CHARS};
