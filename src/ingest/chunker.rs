//! Boundary-aware text chunking.

use crate::config::ChunkingConfig;

/// Splits text into overlapping windows that prefer line and sentence breaks.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    max_chars: usize,
    overlap: usize,
    min_split: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(&ChunkingConfig::default())
    }
}

impl TextChunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            max_chars: config.max_chars,
            overlap: config.overlap,
            min_split: config.min_split,
        }
    }

    /// Returns a lazy iterator over the chunks of `text`.
    ///
    /// Calling this again on the same input restarts from the beginning and
    /// yields the same sequence.
    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        let text = text.trim();
        // Byte offset of every char boundary, including the end of the text.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        Chunks {
            text,
            boundaries,
            next_start: if text.is_empty() { None } else { Some(0) },
            chunker: *self,
        }
    }

    /// Collects the chunks of `text` into owned strings.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.chunks(text).map(str::to_string).collect()
    }
}

/// Iterator returned by [`TextChunker::chunks`].
///
/// Positions are counted in chars, not bytes.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    boundaries: Vec<usize>,
    next_start: Option<usize>,
    chunker: TextChunker,
}

impl<'a> Chunks<'a> {
    fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[self.boundaries[start]..self.boundaries[end]]
    }

    /// Char position of the last newline (else the last ". ") in the
    /// window, if any.
    fn split_point(&self, start: usize, end: usize) -> Option<usize> {
        let window = self.slice(start, end);
        let byte = window.rfind('\n').or_else(|| window.rfind(". "))?;
        Some(start + window[..byte].chars().count())
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let start = self.next_start?;
            let len = self.char_len();
            let mut end = len.min(start + self.chunker.max_chars);

            if end < len {
                if let Some(split_at) = self.split_point(start, end) {
                    if split_at > start + self.chunker.min_split {
                        end = split_at + 1;
                    }
                }
            }

            let chunk = self.slice(start, end).trim();

            self.next_start = if end >= len {
                None
            } else {
                let next = end.saturating_sub(self.chunker.overlap);
                // No forward progress means the window cannot advance.
                (next > start).then_some(next)
            };

            if !chunk.is_empty() {
                return Some(chunk);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(max_chars: usize, overlap: usize) -> TextChunker {
        TextChunker::new(&ChunkingConfig {
            max_chars,
            overlap,
            min_split: 200,
        })
    }

    fn offset_in(text: &str, chunk: &str) -> usize {
        chunk.as_ptr() as usize - text.as_ptr() as usize
    }

    fn sample_text() -> String {
        (0..120)
            .map(|i| format!("Sentence number {} talks about quarterly revenue. ", i))
            .collect::<String>()
            + "\nA closing paragraph follows the sentences.\n"
    }

    #[test]
    fn test_empty_and_whitespace_input() {
        let chunker = TextChunker::default();
        assert!(chunker.split("").is_empty());
        assert!(chunker.split("   \n\t  ").is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = TextChunker::default().split("  On 2021-01-15, Acme Corp acquired Beta LLC.  ");
        assert_eq!(chunks, vec!["On 2021-01-15, Acme Corp acquired Beta LLC."]);
    }

    #[test]
    fn test_chunks_cover_the_whole_text() {
        let raw = sample_text();
        let text = raw.trim();
        let chunks: Vec<&str> = TextChunker::default().chunks(text).collect();
        assert!(chunks.len() > 1);

        let mut covered = vec![false; text.len()];
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1600);
            let start = offset_in(text, chunk);
            covered[start..start + chunk.len()].iter_mut().for_each(|c| *c = true);
        }
        for (i, ch) in text.char_indices() {
            if !ch.is_whitespace() {
                assert!(covered[i], "char {} at byte {} not covered", ch, i);
            }
        }
    }

    #[test]
    fn test_prefers_sentence_boundary() {
        let text = sample_text();
        let first = TextChunker::default().chunks(&text).next().unwrap();
        assert!(first.ends_with('.'));
        assert!(first.chars().count() < 1600);
    }

    #[test]
    fn test_prefers_newline_over_sentence() {
        let text = format!("{}\n{}", "a. ".repeat(150), "b".repeat(400));
        let first = chunker(600, 0).chunks(&text).next().unwrap();
        assert_eq!(first, "a. ".repeat(150).trim());
    }

    #[test]
    fn test_backup_too_close_to_start_is_ignored() {
        let text = format!("{}\n{}", "x".repeat(50), "y".repeat(500));
        let first = chunker(300, 0).chunks(&text).next().unwrap();
        assert_eq!(first.chars().count(), 300);
    }

    #[test]
    fn test_terminates_when_overlap_exceeds_window() {
        let text = "z".repeat(5000);
        let chunks = chunker(100, 100).split(&text);
        assert_eq!(chunks.len(), 1);
        let chunks = chunker(100, 500).split(&text);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_is_deterministic_and_restartable() {
        let text = sample_text();
        let chunker = TextChunker::default();
        let first: Vec<&str> = chunker.chunks(&text).collect();
        let second: Vec<&str> = chunker.chunks(&text).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_multibyte_text() {
        let text = "Überraschung für Café Größe. ".repeat(200);
        let chunks = TextChunker::default().split(&text);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 1600));
    }
}
