use std::sync::OnceLock;

use tracing::warn;

use crate::text_splitter::{char_len, RecursiveCharacterTextSplitter};

/// Below this many characters, trimming gives up on splitting and hard-cuts.
pub const MIN_CHUNK_SIZE: usize = 140;

/// Default token budget for a single prompt.
pub const DEFAULT_CONTEXT_SIZE: usize = 128_000;

/// BPE token counter (o200k_base).
pub struct TokenCounter {
    bpe: Option<tiktoken_rs::CoreBPE>,
}

impl TokenCounter {
    /// Process-wide counter; the encoder tables are only loaded once.
    pub fn shared() -> &'static TokenCounter {
        static COUNTER: OnceLock<TokenCounter> = OnceLock::new();
        COUNTER.get_or_init(|| {
            let bpe = match tiktoken_rs::o200k_base() {
                Ok(bpe) => Some(bpe),
                Err(e) => {
                    warn!(error = %e, "Failed to load o200k_base, estimating tokens from length");
                    None
                }
            };
            TokenCounter { bpe }
        })
    }

    pub fn count(&self, text: &str) -> usize {
        match &self.bpe {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => char_len(text).div_ceil(4),
        }
    }
}

/// Shrinks `prompt` until it fits in `context_size` tokens.
///
/// Each pass estimates three characters per overflowing token and keeps the
/// first chunk a recursive split at that size produces. Never returns more
/// text than it was given; may return up to [`MIN_CHUNK_SIZE`] characters
/// even when the budget is smaller.
pub fn trim_prompt(prompt: &str, context_size: usize) -> String {
    let counter = TokenCounter::shared();
    let mut current = prompt.to_string();

    loop {
        if current.is_empty() {
            return current;
        }
        let tokens = counter.count(&current);
        if tokens <= context_size {
            return current;
        }

        let overflow = tokens - context_size;
        let len = char_len(&current);
        let chunk_size = len.saturating_sub(overflow.saturating_mul(3));
        if chunk_size < MIN_CHUNK_SIZE {
            return take_chars(&current, MIN_CHUNK_SIZE);
        }

        let first = match RecursiveCharacterTextSplitter::new(chunk_size, 0) {
            Ok(splitter) => splitter.split_text(&current).into_iter().next(),
            Err(_) => None,
        };
        current = match first {
            None => return String::new(),
            Some(chunk) if char_len(&chunk) == len => take_chars(&current, chunk_size),
            Some(chunk) => chunk,
        };
    }
}

fn take_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_budget_unchanged() {
        let prompt = "A short prompt about solar panels.";
        assert_eq!(trim_prompt(prompt, 1_000), prompt);
    }

    #[test]
    fn test_empty_prompt() {
        assert_eq!(trim_prompt("", 10), "");
    }

    #[test]
    fn test_trims_to_budget() {
        let paragraph = "Photovoltaic efficiency improved steadily across the decade. ";
        let prompt = paragraph.repeat(400);
        let budget = 500;
        let trimmed = trim_prompt(&prompt, budget);

        assert!(TokenCounter::shared().count(&trimmed) <= budget);
        assert!(char_len(&trimmed) < char_len(&prompt));
        assert!(prompt.starts_with(&trimmed));
    }

    #[test]
    fn test_tiny_budget_hard_cuts() {
        let prompt = "word ".repeat(2_000);
        let trimmed = trim_prompt(&prompt, 1);
        assert!(!trimmed.is_empty());
        assert!(char_len(&trimmed) <= MIN_CHUNK_SIZE);
        assert!(prompt.starts_with(&trimmed));
    }

    #[test]
    fn test_multibyte_cut_is_safe() {
        let prompt = "日本語のテキスト。".repeat(3_000);
        let trimmed = trim_prompt(&prompt, 200);
        assert!(char_len(&trimmed) <= char_len(&prompt));
        assert!(prompt.starts_with(&trimmed));
    }
}
