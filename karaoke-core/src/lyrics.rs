//! In-memory lyrics model: timed words grouped into sentences.
//!
//! A [`Song`] keeps its sentences in the order they were declared in the
//! lyrics file. That order is the singing order and is what the timing
//! queries scan; it is never re-sorted implicitly.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trailing time a sentence stays current after its last word starts.
pub const DEFAULT_SENTENCE_TAIL_MS: u64 = 1000;

/// A single word with the instant (ms from song start) it starts being sung.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub time: u64,
    pub text: String,
}

impl Word {
    #[must_use]
    pub fn new(time: u64, text: impl Into<String>) -> Self {
        Self {
            time,
            text: text.into(),
        }
    }
}

/// One line of lyrics, identified by its key in the lyrics file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    key: String,
    words: Vec<Word>,
    tail_ms: u64,
}

impl Sentence {
    /// Create a sentence. An empty word list is allowed; its start and end
    /// times are both 0.
    #[must_use]
    pub fn new(key: impl Into<String>, words: Vec<Word>) -> Self {
        Self {
            key: key.into(),
            words,
            tail_ms: DEFAULT_SENTENCE_TAIL_MS,
        }
    }

    /// Override the trailing buffer added to the last word's time.
    #[must_use]
    pub const fn with_tail(mut self, tail_ms: u64) -> Self {
        self.tail_ms = tail_ms;
        self
    }

    /// Trailing buffer added to the last word's time.
    #[must_use]
    pub const fn tail_ms(&self) -> u64 {
        self.tail_ms
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    #[must_use]
    pub fn start_time(&self) -> u64 {
        self.words.first().map_or(0, |word| word.time)
    }

    #[must_use]
    pub fn end_time(&self) -> u64 {
        self.words
            .last()
            .map_or(0, |word| word.time.saturating_add(self.tail_ms))
    }

    /// Words joined with single spaces.
    #[must_use]
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|word| word.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A complete song: metadata plus sentences in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Song {
    pub title: String,
    pub artist: String,
    #[serde(deserialize_with = "deserialize_sentences")]
    sentences: Vec<Sentence>,
}

impl Song {
    /// Build a song from sentences in singing order.
    ///
    /// A repeated key replaces the earlier sentence in place, so keys stay
    /// unique and the first declaration keeps its position.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        sentences: impl IntoIterator<Item = Sentence>,
    ) -> Self {
        let mut unique = Vec::new();
        for sentence in sentences {
            insert_sentence(&mut unique, sentence);
        }
        Self {
            title: title.into(),
            artist: artist.into(),
            sentences: unique,
        }
    }

    /// Apply a trailing buffer to every sentence.
    #[must_use]
    pub fn with_sentence_tail(mut self, tail_ms: u64) -> Self {
        for sentence in &mut self.sentences {
            sentence.tail_ms = tail_ms;
        }
        self
    }

    /// Stable sort of the sentences by start time.
    #[must_use]
    pub fn sorted_by_start_time(mut self) -> Self {
        self.sentences.sort_by_key(Sentence::start_time);
        self
    }

    #[must_use]
    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    #[must_use]
    pub fn sentence(&self, key: &str) -> Option<&Sentence> {
        self.sentences.iter().find(|sentence| sentence.key == key)
    }

    /// End time of the last sentence in declaration order, 0 when empty.
    #[must_use]
    pub fn total_duration(&self) -> u64 {
        self.sentences.last().map_or(0, Sentence::end_time)
    }

    #[must_use]
    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    #[must_use]
    pub fn word_count(&self) -> usize {
        self.sentences.iter().map(|sentence| sentence.words.len()).sum()
    }

    /// Whether sentence start times never decrease in declaration order.
    #[must_use]
    pub fn is_chronological(&self) -> bool {
        self.sentences
            .windows(2)
            .all(|pair| pair[0].start_time() <= pair[1].start_time())
    }
}

/// Title and artist of a lyrics file, read without the sentences.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SongInfo {
    #[serde(default = "unknown")]
    pub title: String,
    #[serde(default = "unknown")]
    pub artist: String,
}

fn unknown() -> String {
    "Unknown".to_string()
}

fn insert_sentence(sentences: &mut Vec<Sentence>, sentence: Sentence) {
    if let Some(existing) = sentences.iter_mut().find(|s| s.key == sentence.key) {
        *existing = sentence;
    } else {
        sentences.push(sentence);
    }
}

fn deserialize_sentences<'de, D>(deserializer: D) -> Result<Vec<Sentence>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_map(SentencesVisitor)
}

/// Reads the `sentences` object entry by entry so document order survives.
struct SentencesVisitor;

impl<'de> Visitor<'de> for SentencesVisitor {
    type Value = Vec<Sentence>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of sentence keys to word lists")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut sentences = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, words)) = map.next_entry::<String, Vec<Word>>()? {
            insert_sentence(&mut sentences, Sentence::new(key, words));
        }
        Ok(sentences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello_world() -> Song {
        Song::new(
            "Test",
            "Tester",
            [Sentence::new(
                "1",
                vec![Word::new(0, "hello"), Word::new(1000, "world")],
            )],
        )
    }

    #[test]
    fn test_sentence_times() {
        let sentence = Sentence::new("1", vec![Word::new(500, "a"), Word::new(1500, "b")]);
        assert_eq!(sentence.start_time(), 500);
        assert_eq!(sentence.end_time(), 2500);
        assert_eq!(sentence.text(), "a b");
    }

    #[test]
    fn test_empty_sentence_times_default_to_zero() {
        let sentence = Sentence::new("empty", vec![]);
        assert_eq!(sentence.start_time(), 0);
        assert_eq!(sentence.end_time(), 0);
        assert_eq!(sentence.text(), "");
    }

    #[test]
    fn test_custom_tail() {
        let sentence = Sentence::new("1", vec![Word::new(1000, "a")]).with_tail(250);
        assert_eq!(sentence.end_time(), 1250);

        let song = hello_world().with_sentence_tail(0);
        assert_eq!(song.total_duration(), 1000);
    }

    #[test]
    fn test_total_duration() {
        assert_eq!(hello_world().total_duration(), 2000);
        assert_eq!(Song::new("Empty", "Nobody", []).total_duration(), 0);
    }

    #[test]
    fn test_total_duration_uses_last_declared_sentence() {
        let song = Song::new(
            "Out of order",
            "Tester",
            [
                Sentence::new("late", vec![Word::new(10_000, "late")]),
                Sentence::new("early", vec![Word::new(1000, "early")]),
            ],
        );
        assert_eq!(song.total_duration(), 2000);
        assert!(!song.is_chronological());
    }

    #[test]
    fn test_counts() {
        let song = Song::new(
            "Counts",
            "Tester",
            [
                Sentence::new("1", vec![Word::new(0, "a"), Word::new(100, "b")]),
                Sentence::new("2", vec![]),
                Sentence::new("3", vec![Word::new(2000, "c")]),
            ],
        );
        assert_eq!(song.sentence_count(), 3);
        assert_eq!(song.word_count(), 3);
    }

    #[test]
    fn test_duplicate_key_replaces_in_place() {
        let song = Song::new(
            "Dupes",
            "Tester",
            [
                Sentence::new("a", vec![Word::new(0, "first")]),
                Sentence::new("b", vec![Word::new(1000, "second")]),
                Sentence::new("a", vec![Word::new(0, "replaced")]),
            ],
        );
        assert_eq!(song.sentence_count(), 2);
        assert_eq!(song.sentences()[0].key(), "a");
        assert_eq!(song.sentences()[0].text(), "replaced");
    }

    #[test]
    fn test_deserialize_preserves_document_order() {
        let json = r#"{
            "title": "Order",
            "artist": "Tester",
            "sentences": {
                "z": [{"time": 0, "text": "first"}],
                "a": [{"time": 2000, "text": "second"}],
                "m": [{"time": 4000, "text": "third"}]
            }
        }"#;
        let song: Song = serde_json::from_str(json).unwrap();
        let keys: Vec<_> = song.sentences().iter().map(Sentence::key).collect();
        assert_eq!(keys, ["z", "a", "m"]);
        assert!(song.is_chronological());
    }

    #[test]
    fn test_deserialize_missing_field_fails() {
        let json = r#"{"title": "No artist", "sentences": {}}"#;
        assert!(serde_json::from_str::<Song>(json).is_err());
    }

    #[test]
    fn test_sorted_by_start_time_is_stable() {
        let song = Song::new(
            "Sort",
            "Tester",
            [
                Sentence::new("c", vec![Word::new(3000, "c")]),
                Sentence::new("a", vec![Word::new(1000, "a")]),
                Sentence::new("b", vec![Word::new(1000, "b")]),
            ],
        )
        .sorted_by_start_time();
        let keys: Vec<_> = song.sentences().iter().map(Sentence::key).collect();
        assert_eq!(keys, ["a", "b", "c"]);
        assert!(song.is_chronological());
    }

    #[test]
    fn test_song_info_defaults() {
        let info: SongInfo = serde_json::from_str(r#"{"title": "Only title"}"#).unwrap();
        assert_eq!(info.title, "Only title");
        assert_eq!(info.artist, "Unknown");
    }
}
