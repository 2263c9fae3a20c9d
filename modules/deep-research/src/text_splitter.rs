//! Recursive character text splitter.
//!
//! Splits on the first separator present in the text, merges the pieces
//! back into chunks under `chunk_size` characters, and recurses into any
//! piece that is still too long using the remaining separators.

use crate::error::{ResearchError, Result};

pub const DEFAULT_SEPARATORS: [&str; 8] = ["\n\n", "\n", ".", ",", ">", "<", " ", ""];

#[derive(Debug, Clone)]
pub struct RecursiveCharacterTextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveCharacterTextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_overlap >= chunk_size {
            return Err(ResearchError::Config(format!(
                "chunk overlap ({chunk_overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn with_separators(mut self, separators: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_with(text, &self.separators)
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        let (separator, remaining) = pick_separator(text, separators);

        let splits: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator.as_str()).map(str::to_string).collect()
        };

        let mut final_chunks = Vec::new();
        let mut good_splits: Vec<String> = Vec::new();
        for split in splits {
            // Single characters cannot be split further.
            if char_len(&split) < self.chunk_size || separator.is_empty() {
                good_splits.push(split);
                continue;
            }
            if !good_splits.is_empty() {
                final_chunks.extend(self.merge_splits(&good_splits, &separator));
                good_splits.clear();
            }
            final_chunks.extend(self.split_with(&split, remaining));
        }
        if !good_splits.is_empty() {
            final_chunks.extend(self.merge_splits(&good_splits, &separator));
        }
        final_chunks
    }

    fn merge_splits(&self, splits: &[String], separator: &str) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: std::collections::VecDeque<&str> = std::collections::VecDeque::new();
        let mut total = 0usize;

        for split in splits {
            let len = char_len(split);
            if total + len >= self.chunk_size && !current.is_empty() {
                if let Some(doc) = join_docs(current.iter().copied(), separator) {
                    docs.push(doc);
                }
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }
            current.push_back(split);
            total += len;
        }

        if let Some(doc) = join_docs(current.iter().copied(), separator) {
            docs.push(doc);
        }
        docs
    }
}

/// Returns the first separator found in `text` (or the empty separator)
/// and the separators after it.
fn pick_separator<'a>(text: &str, separators: &'a [String]) -> (String, &'a [String]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep.as_str()) {
            return (sep.clone(), &separators[i + 1..]);
        }
    }
    (String::new(), &[])
}

fn join_docs<'a>(parts: impl Iterator<Item = &'a str>, separator: &str) -> Option<String> {
    let joined = parts.collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        assert!(RecursiveCharacterTextSplitter::new(10, 10).is_err());
        assert!(RecursiveCharacterTextSplitter::new(10, 9).is_ok());
    }

    #[test]
    fn test_empty_text() {
        let splitter = RecursiveCharacterTextSplitter::new(10, 0).unwrap();
        assert!(splitter.split_text("").is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let splitter = RecursiveCharacterTextSplitter::new(100, 0).unwrap();
        assert_eq!(splitter.split_text("hello world"), ["hello world"]);
    }

    #[test]
    fn test_splits_on_paragraphs_first() {
        let splitter = RecursiveCharacterTextSplitter::new(12, 0).unwrap();
        let chunks = splitter.split_text("first para\n\nsecond para");
        assert_eq!(chunks, ["first para", "second para"]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let splitter = RecursiveCharacterTextSplitter::new(10, 0).unwrap();
        let text = "one two three four five six seven eight nine ten";
        let chunks = splitter.split_text(text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(char_len(chunk) <= 10, "chunk too long: {chunk:?}");
        }
    }

    #[test]
    fn test_falls_back_to_characters() {
        let splitter = RecursiveCharacterTextSplitter::new(4, 0).unwrap();
        let chunks = splitter.split_text("abcdefghij");
        assert_eq!(chunks.concat(), "abcdefghij");
        assert!(chunks.iter().all(|c| char_len(c) <= 4));
    }

    #[test]
    fn test_custom_separators() {
        let splitter = RecursiveCharacterTextSplitter::new(6, 0)
            .unwrap()
            .with_separators(["|", ""]);
        assert_eq!(splitter.split_text("abc|def|gh"), ["abc", "def|gh"]);
    }

    #[test]
    fn test_multibyte_text_counts_chars() {
        let splitter = RecursiveCharacterTextSplitter::new(3, 0).unwrap();
        let chunks = splitter.split_text("éééééé");
        assert_eq!(chunks, ["éé", "éé", "éé"]);
    }
}
