//! Simulated streaming of an already-complete response
//!
//! Progressive reveal is purely cosmetic: the full text has arrived before
//! the first frame is shown. A frame is a prefix of the text covering a
//! number of word-group tokens, where tokens alternate between runs of
//! non-whitespace and runs of whitespace. Frames are computed from
//! `(full text, elapsed chunks)` alone, independent of any timer, so a
//! frontend can replay them at whatever cadence it likes.

/// Byte offsets at which each token (word run or whitespace run) ends.
fn token_ends(text: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut in_whitespace = None::<bool>;

    for (offset, ch) in text.char_indices() {
        let whitespace = ch.is_whitespace();
        match in_whitespace {
            Some(current) if current != whitespace => ends.push(offset),
            None | Some(_) => {}
        }
        in_whitespace = Some(whitespace);
    }

    if in_whitespace.is_some() {
        ends.push(text.len());
    }
    ends
}

/// Number of frames needed to reveal `text` at `chunk_tokens` tokens per
/// frame.
pub fn frame_count(text: &str, chunk_tokens: usize) -> usize {
    if chunk_tokens == 0 {
        return 0;
    }
    let tokens = token_ends(text).len();
    (tokens + chunk_tokens - 1) / chunk_tokens
}

/// The prefix of `text` visible after `chunks` frames.
///
/// # Examples
///
/// ```
/// use chatwire::render::streaming::frame;
///
/// let text = "one two three";
/// assert_eq!(frame(text, 1, 2), "one ");
/// assert_eq!(frame(text, 2, 2), "one two ");
/// assert_eq!(frame(text, 99, 2), text);
/// ```
pub fn frame(text: &str, chunks: usize, chunk_tokens: usize) -> &str {
    let ends = token_ends(text);
    let take = (chunks.saturating_mul(chunk_tokens)).min(ends.len());
    if take == 0 {
        return "";
    }
    &text[..ends[take - 1]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_has_no_frames() {
        assert_eq!(frame_count("", 5), 0);
        assert_eq!(frame("", 1, 5), "");
    }

    #[test]
    fn test_zero_chunk_returns_empty() {
        assert_eq!(frame("hello", 0, 5), "");
        assert_eq!(frame_count("hello", 0), 0);
    }

    #[test]
    fn test_single_word() {
        assert_eq!(frame_count("hello", 5), 1);
        assert_eq!(frame("hello", 1, 5), "hello");
    }

    #[test]
    fn test_frames_grow_monotonically() {
        let text = "the quick brown fox jumps over the lazy dog";
        let total = frame_count(text, 2);
        let mut previous = 0;

        for chunk in 1..=total {
            let visible = frame(text, chunk, 2).len();
            assert!(visible >= previous);
            previous = visible;
        }
        assert_eq!(frame(text, total, 2), text);
    }

    #[test]
    fn test_last_frame_is_full_text() {
        let text = "alpha beta\ngamma  delta";
        let total = frame_count(text, 3);
        assert_eq!(frame(text, total, 3), text);
    }

    #[test]
    fn test_whitespace_runs_are_tokens() {
        // "a", " ", "b" -> 3 tokens; one token per frame.
        let text = "a b";
        assert_eq!(frame_count(text, 1), 3);
        assert_eq!(frame(text, 1, 1), "a");
        assert_eq!(frame(text, 2, 1), "a ");
        assert_eq!(frame(text, 3, 1), "a b");
    }

    #[test]
    fn test_frame_is_pure_and_replayable() {
        let text = "repeatable output for any chunk index";
        assert_eq!(frame(text, 2, 3), frame(text, 2, 3));
    }

    #[test]
    fn test_multibyte_text() {
        let text = "héllo wörld ünïcode";
        let total = frame_count(text, 1);
        for chunk in 1..=total {
            // Every frame must slice on a char boundary.
            let _ = frame(text, chunk, 1);
        }
        assert_eq!(frame(text, total, 1), text);
    }
}
