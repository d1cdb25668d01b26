use crate::config::ExtractionConfig;

/// One chunk of a source document; the smallest unit of text extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct TextUnit {
    /// `"{source}#{index}"`
    pub id: String,
    /// Document the chunk came from
    pub source: String,
    /// Position of the chunk within its document
    pub index: usize,
    /// Whole sentences joined by single spaces
    pub text: String,
    /// Sentence index of the first sentence
    pub start: usize,
    /// Sentence index after the last sentence
    pub end: usize,
}

impl TextUnit {
    pub fn new(source: impl Into<String>, index: usize, text: String, start: usize, end: usize) -> Self {
        let source = source.into();
        Self {
            id: format!("{}#{}", source, index),
            source,
            index,
            text,
            start,
            end,
        }
    }
}

/// Splits documents into word-bounded chunks without breaking sentences.
#[derive(Debug, Clone)]
pub struct TextChunker {
    size: usize,
    overlap: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

impl TextChunker {
    /// `size` is the word budget per chunk; `overlap` is how many trailing
    /// sentences the next chunk repeats.
    pub fn new(size: usize, overlap: usize) -> Self {
        Self {
            size: size.max(1),
            overlap,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.chunk_words, config.chunk_overlap_sentences)
    }

    pub fn chunk(&self, text: &str, source: impl Into<String>) -> Vec<TextUnit> {
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return Vec::new();
        }
        let word_counts: Vec<usize> = sentences
            .iter()
            .map(|s| s.split_whitespace().count())
            .collect();

        let source = source.into();
        let mut units = Vec::new();
        let mut begin = 0;

        while begin < sentences.len() {
            let mut end = begin;
            let mut words = 0;
            // a sentence longer than the budget still forms its own chunk
            while end < sentences.len() && (end == begin || words + word_counts[end] <= self.size) {
                words += word_counts[end];
                end += 1;
            }

            let text = sentences[begin..end].join(" ");
            units.push(TextUnit::new(source.clone(), units.len(), text, begin, end));

            if end == sentences.len() {
                break;
            }
            begin = end - self.overlap.min(end - begin - 1);
        }

        units
    }
}

/// Sentences of `text`, trimmed, with whitespace runs collapsed.
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace, or at a blank
/// line. Decimal points never end a sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        let boundary = match ch {
            '.' | '!' | '?' => chars.peek().map_or(true, |(_, next)| next.is_whitespace()),
            '\n' => chars.peek().map_or(false, |(_, next)| *next == '\n' || *next == '\r'),
            _ => false,
        };
        if boundary {
            let end = idx + ch.len_utf8();
            push_sentence(&mut sentences, &text[start..end]);
            start = end;
        }
    }
    push_sentence(&mut sentences, &text[start..]);

    sentences
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !collapsed.is_empty() {
        sentences.push(collapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminal_punctuation() {
        let sentences = split_sentences("Light drives photosynthesis. Does it? Yes!  Water too.");
        assert_eq!(
            sentences,
            vec![
                "Light drives photosynthesis.",
                "Does it?",
                "Yes!",
                "Water too."
            ]
        );
    }

    #[test]
    fn decimals_do_not_end_sentences() {
        let sentences = split_sentences("The pH was 6.5 at noon. Then it fell");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0], "The pH was 6.5 at noon.");
    }

    #[test]
    fn blank_lines_end_sentences() {
        let sentences = split_sentences("Heading without stop\n\nBody text here");
        assert_eq!(sentences, vec!["Heading without stop", "Body text here"]);
    }

    #[test]
    fn chunker_packs_whole_sentences() {
        let chunker = TextChunker::new(6, 0);
        let units = chunker.chunk("One two three. Four five six. Seven eight.", "doc");

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].text, "One two three. Four five six.");
        assert_eq!(units[1].text, "Seven eight.");
        assert_eq!(units[1].start, 2);
        assert_eq!(units[1].end, 3);
    }

    #[test]
    fn chunker_repeats_overlap_sentences() {
        let chunker = TextChunker::new(4, 1);
        let units = chunker.chunk("A b c. D e f. G h i.", "doc");

        assert_eq!(units.len(), 3);
        assert_eq!(units[0].text, "A b c.");
        assert_eq!(units[1].text, "D e f.");
        assert_eq!(units[2].text, "G h i.");

        let chunker = TextChunker::new(6, 1);
        let units = chunker.chunk("A b c. D e f. G h i.", "doc");
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].text, "A b c. D e f.");
        assert_eq!(units[1].text, "D e f. G h i.");
    }

    #[test]
    fn oversized_sentence_is_its_own_chunk() {
        let chunker = TextChunker::new(2, 3);
        let units = chunker.chunk("This sentence is far too long. Short one.", "doc");
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].text, "This sentence is far too long.");
    }

    #[test]
    fn unit_ids_carry_source_and_index() {
        let chunker = TextChunker::new(3, 0);
        let units = chunker.chunk("A b c. D e f.", "paper.txt");
        let ids: Vec<_> = units.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["paper.txt#0", "paper.txt#1"]);
        assert_eq!(units[1].source, "paper.txt");
        assert_eq!(units[1].index, 1);
    }

    #[test]
    fn chunker_empty_text_returns_empty() {
        let chunker = TextChunker::default();
        assert!(chunker.chunk("", "doc").is_empty());
        assert!(chunker.chunk("   \t\n  ", "doc").is_empty());
    }

    #[test]
    fn chunker_zero_size_uses_minimum() {
        let chunker = TextChunker::new(0, 0);
        let units = chunker.chunk("Word. Other.", "doc");
        assert_eq!(units.len(), 2);
    }

    #[test]
    fn chunker_unicode_text() {
        let chunker = TextChunker::new(10, 0);
        let units = chunker.chunk("Хлорофилл поглощает свет. 光合作用", "doc");
        assert_eq!(units.len(), 1);
        assert!(units[0].text.contains("光合作用"));
    }
}
