//! Discord message length utilities
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Add code block wrapping for operator error reports
//! - 1.0.0: Initial message truncation helpers

/// Discord message content limit
pub const MESSAGE_LIMIT: usize = 2000;

/// Truncate text to fit the message limit, adding ellipsis if needed
pub fn truncate_for_message(text: &str) -> String {
    truncate_to(text, MESSAGE_LIMIT)
}

/// Wrap text in a code block that still fits in a single message
///
/// The body is truncated before fencing so the closing fence is never cut off.
pub fn code_block(header: &str, body: &str) -> String {
    // Room for the header, two fences and the newlines between them
    let overhead = header.len() + "\n```\n".len() + "\n```".len();
    let budget = MESSAGE_LIMIT.saturating_sub(overhead);
    format!("{header}\n```\n{}\n```", truncate_to(body, budget))
}

fn truncate_to(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }

    // Find a safe UTF-8 boundary
    let mut end = limit.saturating_sub(3); // Room for "..."
    while !text.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_message_short() {
        let text = "short text";
        assert_eq!(truncate_for_message(text), text);
    }

    #[test]
    fn test_truncate_for_message_long() {
        let text = "a".repeat(3000);
        let result = truncate_for_message(&text);
        assert!(result.len() <= MESSAGE_LIMIT);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_truncate_utf8_safety() {
        let text = "世界".repeat(1000);
        let result = truncate_for_message(&text);
        assert!(result.len() <= MESSAGE_LIMIT);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_code_block_fits_message_limit() {
        let body = "x".repeat(5000);
        let block = code_block("**Error report**", &body);
        assert!(block.len() <= MESSAGE_LIMIT);
        assert!(block.starts_with("**Error report**\n```\n"));
        assert!(block.ends_with("\n```"));
    }

    #[test]
    fn test_code_block_short_body_untouched() {
        let block = code_block("h", "body");
        assert_eq!(block, "h\n```\nbody\n```");
    }
}
