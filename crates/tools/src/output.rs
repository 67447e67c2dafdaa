//! Output size cap applied to every tool result.

/// Hard cap on what a single tool call may return.
pub const MAX_OUTPUT_BYTES: usize = 64 * 1024;

const CAP_MARKER: &str = "\n… [output truncated at 64 KiB]";

/// Cut `text` to [`MAX_OUTPUT_BYTES`] on a character boundary.
pub fn cap(text: String) -> String {
    if text.len() <= MAX_OUTPUT_BYTES {
        return text;
    }
    let mut end = MAX_OUTPUT_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut capped = text;
    capped.truncate(end);
    capped.push_str(CAP_MARKER);
    capped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_output_untouched() {
        assert_eq!(cap("hello".into()), "hello");
    }

    #[test]
    fn large_output_cut_on_char_boundary() {
        let big = "ü".repeat(MAX_OUTPUT_BYTES);
        let capped = cap(big);
        assert!(capped.ends_with(CAP_MARKER));
        assert!(capped.len() <= MAX_OUTPUT_BYTES + CAP_MARKER.len());
    }
}
