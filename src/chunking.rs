//! Splitting long replies into transport-sized chat messages

/// Per-message character limit of the chat platform
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 2000;

const SENTENCE_BREAKS: [char; 3] = ['。', '！', '？'];

/// Split `message` into chunks of at most `max_length` characters.
///
/// Within each window the split prefers the last newline (kept at the end of
/// the chunk), then the last full-width sentence terminator, and only then
/// cuts at the limit. Concatenating the chunks yields the input.
pub fn split_message(message: &str, max_length: usize) -> Vec<String> {
    if message.is_empty() {
        return Vec::new();
    }
    let max_length = max_length.max(1);

    let chars: Vec<char> = message.chars().collect();
    if chars.len() <= max_length {
        return vec![message.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let remaining = chars.len() - start;
        if remaining <= max_length {
            chunks.push(chars[start..].iter().collect());
            break;
        }

        let window = &chars[start..start + max_length];
        // Position 0 is never used as a break so every chunk makes progress
        let split_at = match window.iter().rposition(|&c| c == '\n') {
            Some(pos) if pos > 0 => pos + 1,
            _ => match window.iter().rposition(|c| SENTENCE_BREAKS.contains(c)) {
                Some(pos) if pos > 0 => pos + 1,
                _ => max_length,
            },
        };

        chunks.push(window[..split_at].iter().collect());
        start += split_at;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_message() {
        assert!(split_message("", 10).is_empty());
    }

    #[test]
    fn test_short_message_single_chunk() {
        assert_eq!(split_message("短いメッセージ", 2000), vec!["短いメッセージ"]);
    }

    #[test]
    fn test_exact_limit_single_chunk() {
        let msg = "あ".repeat(2000);
        assert_eq!(split_message(&msg, 2000), vec![msg]);
    }

    #[test]
    fn test_hard_cut_without_breaks() {
        let msg = "あ".repeat(2500);
        let chunks = split_message(&msg, 2000);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 2000);
        assert_eq!(chunks[1].chars().count(), 500);
    }

    #[test]
    fn test_prefers_newline() {
        let msg = format!("{}\n{}", "a".repeat(6), "b".repeat(6));
        let chunks = split_message(&msg, 10);
        assert_eq!(chunks[0], format!("{}\n", "a".repeat(6)));
        assert_eq!(chunks.concat(), msg);
    }

    #[test]
    fn test_falls_back_to_sentence_break() {
        let msg = "あいう。えおかきくけこさしすせ";
        let chunks = split_message(msg, 8);
        assert_eq!(chunks[0], "あいう。");
        assert_eq!(chunks.concat(), msg);
    }

    #[test]
    fn test_newline_beats_later_sentence_break() {
        let msg = "ab\ncd。efghijkl";
        let chunks = split_message(msg, 8);
        assert_eq!(chunks[0], "ab\n");
    }

    #[test]
    fn test_reconstruction_and_bounds() {
        let msg = "一行目です。\n二行目は少し長めの文章になっています！三行目？\n".repeat(40);
        for limit in [5, 17, 64, 2000] {
            let chunks = split_message(&msg, limit);
            assert_eq!(chunks.concat(), msg);
            assert!(chunks.iter().all(|c| c.chars().count() <= limit));
            assert!(chunks.iter().all(|c| !c.is_empty()));
        }
    }
}
