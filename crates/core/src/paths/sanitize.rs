/// Characters removed from every path segment.
pub const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*', '`', '$'];

/// Make a single path segment safe for common filesystems.
///
/// Strips [`ILLEGAL_CHARS`] and control characters, trims surrounding
/// whitespace and trailing dots, and returns `fallback` if nothing is left.
/// The result never contains a separator and is never `.` or `..`.
pub fn sanitize_segment(raw: &str, fallback: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c) && !c.is_control())
        .collect();

    let trimmed = cleaned.trim().trim_end_matches('.').trim_end();

    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}
