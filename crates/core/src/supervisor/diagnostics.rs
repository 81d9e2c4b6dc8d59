//! Rolling capture of stderr for failure messages.

use std::collections::VecDeque;

/// Lines of stderr kept per process.
pub const MAX_TAIL_LINES: usize = 20;
/// Characters of the kept lines attached to an error.
pub const MAX_TAIL_CHARS: usize = 1000;

/// The last [`MAX_TAIL_LINES`] lines a process wrote to stderr.
#[derive(Debug, Default, Clone)]
pub struct StderrTail {
    lines: VecDeque<String>,
}

impl StderrTail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == MAX_TAIL_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The kept lines joined by newlines, cut to the last [`MAX_TAIL_CHARS`] characters.
    pub fn render(&self) -> String {
        let joined = self.lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n");
        let count = joined.chars().count();
        if count <= MAX_TAIL_CHARS {
            joined
        } else {
            joined.chars().skip(count - MAX_TAIL_CHARS).collect()
        }
    }

    /// Error text for a process that exited unsuccessfully.
    pub fn failure_message(&self, code: Option<i32>) -> String {
        let code = code.map_or_else(|| "unknown".to_string(), |c| c.to_string());
        let mut message = format!("Download process exited with code {}.", code);
        if !self.is_empty() {
            message.push_str("\nDetails: ");
            message.push_str(&self.render());
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_last_twenty_lines() {
        let mut tail = StderrTail::new();
        for i in 0..25 {
            tail.push(format!("line {}", i));
        }
        let rendered = tail.render();
        assert!(!rendered.contains("line 4\n"));
        assert!(rendered.starts_with("line 5"));
        assert!(rendered.ends_with("line 24"));
        assert_eq!(rendered.lines().count(), MAX_TAIL_LINES);
    }

    #[test]
    fn test_render_caps_characters() {
        let mut tail = StderrTail::new();
        for _ in 0..MAX_TAIL_LINES {
            tail.push("x".repeat(200));
        }
        tail.push("the end");
        let rendered = tail.render();
        assert_eq!(rendered.chars().count(), MAX_TAIL_CHARS);
        assert!(rendered.ends_with("the end"));
    }

    #[test]
    fn test_render_is_char_boundary_safe() {
        let mut tail = StderrTail::new();
        for _ in 0..MAX_TAIL_LINES {
            tail.push("é".repeat(100));
        }
        assert_eq!(tail.render().chars().count(), MAX_TAIL_CHARS);
    }

    #[test]
    fn test_failure_message_with_details() {
        let mut tail = StderrTail::new();
        tail.push("ERROR: unable to download video data");
        assert_eq!(
            tail.failure_message(Some(1)),
            "Download process exited with code 1.\nDetails: ERROR: unable to download video data"
        );
    }

    #[test]
    fn test_failure_message_without_details() {
        let tail = StderrTail::new();
        assert_eq!(
            tail.failure_message(None),
            "Download process exited with code unknown."
        );
    }
}
