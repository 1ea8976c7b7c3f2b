//! Pure timing queries mapping a playback time onto a [`Song`].
//!
//! Nothing here holds state. Every function scans the song's sentences in
//! declaration order, so results for out-of-order lyrics follow file order
//! rather than true time order.

use crate::lyrics::{Sentence, Song, DEFAULT_SENTENCE_TAIL_MS};

/// How long a word stays highlighted after it starts.
pub const DEFAULT_HIGHLIGHT_DURATION_MS: u64 = 800;

/// Delay after the last sentence ends before the song counts as finished.
pub const DEFAULT_FINISH_BUFFER_MS: u64 = 3000;

/// Tunable windows used by the timing queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    pub highlight_duration_ms: u64,
    pub finish_buffer_ms: u64,
    pub sentence_tail_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            highlight_duration_ms: DEFAULT_HIGHLIGHT_DURATION_MS,
            finish_buffer_ms: DEFAULT_FINISH_BUFFER_MS,
            sentence_tail_ms: DEFAULT_SENTENCE_TAIL_MS,
        }
    }
}

/// Rendering state of a single word at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordState {
    /// Inside its highlight window.
    Active,
    /// Started earlier and its highlight window has passed.
    Sung,
    /// Not started yet.
    Upcoming,
}

/// First sentence whose `[start_time, end_time]` range contains `t`.
///
/// Gaps between sentences yield `None`.
#[must_use]
pub fn current_sentence(song: &Song, t: u64) -> Option<&Sentence> {
    song.sentences()
        .iter()
        .find(|sentence| sentence.start_time() <= t && t <= sentence.end_time())
}

/// First sentence that starts strictly after `t`.
#[must_use]
pub fn next_sentence(song: &Song, t: u64) -> Option<&Sentence> {
    song.sentences()
        .iter()
        .find(|sentence| sentence.start_time() > t)
}

/// Last sentence of the leading run of sentences that ended before `t`.
///
/// The scan stops at the first sentence that has not ended yet, even if a
/// later-declared sentence did.
#[must_use]
pub fn previous_sentence(song: &Song, t: u64) -> Option<&Sentence> {
    song.sentences()
        .iter()
        .take_while(|sentence| sentence.end_time() < t)
        .last()
}

/// Whether a word starting at `word_time` is inside its highlight window.
#[must_use]
pub const fn is_word_active(word_time: u64, t: u64, highlight_duration_ms: u64) -> bool {
    word_time <= t && t <= word_time.saturating_add(highlight_duration_ms)
}

#[must_use]
pub const fn word_state(word_time: u64, t: u64, highlight_duration_ms: u64) -> WordState {
    if is_word_active(word_time, t, highlight_duration_ms) {
        WordState::Active
    } else if word_time <= t {
        WordState::Sung
    } else {
        WordState::Upcoming
    }
}

/// Playback progress in percent, clamped to `0.0..=100.0`.
#[must_use]
pub fn progress_percentage(t: u64, total_duration: u64) -> f64 {
    if total_duration == 0 {
        return 0.0;
    }
    // Millisecond values stay far below 2^52, so the conversion is exact.
    #[allow(clippy::cast_precision_loss)]
    let percentage = t as f64 / total_duration as f64 * 100.0;
    percentage.clamp(0.0, 100.0)
}

/// Whether `t` is past the song's end plus the finish buffer.
#[must_use]
pub fn is_song_finished(song: &Song, t: u64, finish_buffer_ms: u64) -> bool {
    t > song.total_duration().saturating_add(finish_buffer_ms)
}
