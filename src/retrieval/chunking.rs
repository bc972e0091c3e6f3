//! Rules text chunking
//!
//! Splits a comprehensive-rules document into bounded-size passages for
//! embedding. Sections are blank-line delimited and never split internally,
//! so a single section larger than the limit becomes one oversized chunk.

/// Greedy section-accumulating chunker
pub struct RuleChunker {
    max_chars: usize,
}

impl RuleChunker {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Split rules text into chunks of at most `max_chars` characters.
    ///
    /// Sections (blank-line delimited paragraphs) are accumulated in
    /// document order until adding the next one would reach the limit,
    /// then the buffer is flushed as a trimmed chunk. Deterministic:
    /// identical input always produces identical output.
    pub fn split(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for section in text.split("\n\n") {
            if current.len() + section.len() >= self.max_chars {
                flush(&mut current, &mut chunks);
            }
            current.push_str(section);
            current.push_str("\n\n");
        }

        flush(&mut current, &mut chunks);
        chunks
    }
}

/// Push the trimmed buffer as a chunk and reset it. Empty buffers
/// (whitespace-only accumulations) are dropped, never emitted.
fn flush(current: &mut String, chunks: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_chunk_when_everything_fits() {
        let chunker = RuleChunker::new(1024);
        let chunks = chunker.split("100.1. General.\n\n100.2. Players.");
        assert_eq!(chunks, vec!["100.1. General.\n\n100.2. Players."]);
    }

    #[test]
    fn test_each_section_forms_own_chunk_at_tight_limit() {
        let chunker = RuleChunker::new(3);
        let chunks = chunker.split("A.\n\nB.\n\nC.");
        assert_eq!(chunks, vec!["A.", "B.", "C."]);
    }

    #[test]
    fn test_chunk_length_bound() {
        let max = 120;
        let chunker = RuleChunker::new(max);
        let text = (0..40)
            .map(|i| format!("Rule {i}: a short paragraph of rules text."))
            .collect::<Vec<_>>()
            .join("\n\n");

        for chunk in chunker.split(&text) {
            assert!(chunk.len() <= max, "chunk exceeds bound: {}", chunk.len());
        }
    }

    #[test]
    fn test_oversized_section_emitted_whole() {
        let chunker = RuleChunker::new(10);
        let big = "x".repeat(50);
        let text = format!("aa\n\n{big}\n\nbb");
        let chunks = chunker.split(&text);

        assert_eq!(chunks, vec!["aa".to_string(), big, "bb".to_string()]);
    }

    #[test]
    fn test_leading_oversized_section_produces_no_empty_chunk() {
        let chunker = RuleChunker::new(5);
        let chunks = chunker.split("a very long first section\n\nok");
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn test_concatenation_preserves_section_order_and_content() {
        let chunker = RuleChunker::new(30);
        let sections = ["first rule", "second rule", "third rule", "fourth rule"];
        let text = sections.join("\n\n");

        let rejoined = chunker.split(&text).join("\n\n");
        let recovered: Vec<&str> = rejoined.split("\n\n").collect();
        assert_eq!(recovered, sections);
    }

    #[test]
    fn test_deterministic() {
        let chunker = RuleChunker::new(64);
        let text = "alpha\n\nbeta\n\ngamma\n\ndelta\n\nepsilon";
        assert_eq!(chunker.split(text), chunker.split(text));
    }

    #[test]
    fn test_empty_and_whitespace_input() {
        let chunker = RuleChunker::new(100);
        assert!(chunker.split("").is_empty());
        assert!(chunker.split("\n\n\n\n  \n\n").is_empty());
    }
}
