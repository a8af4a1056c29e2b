//! Self-correction heuristics
//!
//! Best-effort classifier over incoming words. A false positive costs a
//! masked (crossfaded) rollback; a false negative lets the error through.
//! Neither is reported as an error; only the rollback count shows them.
//!
//! Rules, in order:
//! 1. Explicit correction signals ("I mean", "actually", "sorry", "wait",
//!    "no,", em-dash, ellipsis) roll back to the last commit marker.
//!    Active when sensitivity > 0.3.
//! 2. A word repeating (case-insensitively) one of the previous three words
//!    since the last commit rolls back to just before the nearest earlier
//!    occurrence. Active when sensitivity > 0.5 and at least three words
//!    precede it in the segment, so a deliberate "very very" survives.

use regex::Regex;

/// Sensitivity above which explicit signals count
const SIGNAL_THRESHOLD: f64 = 0.3;
/// Sensitivity above which repetitions count
const REPETITION_THRESHOLD: f64 = 0.5;
/// How many previous words a repetition may look back
const REPETITION_WINDOW: usize = 3;

/// Where to roll back to after a correction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// Keep words up to and including this index
    ToWord(usize),
    /// Keep words up to the start of the current segment
    ToLastCommit,
}

#[derive(Debug, Clone)]
pub struct CorrectionDetector {
    sensitivity: f64,
    patterns: Vec<Regex>,
    /// Words since the last commit
    history: Vec<String>,
    /// Global index of `history[0]`
    base_index: usize,
    last_committed: String,
}

impl CorrectionDetector {
    pub fn new(sensitivity: f64) -> Self {
        // Literal patterns; compilation cannot fail
        let patterns = [
            r"(?i)\b(?:i mean|actually|sorry|wait)\b",
            r"(?i)\bno,",
            "\u{2014}",
            r"\.\.\.",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect();

        Self {
            sensitivity,
            patterns,
            history: Vec::new(),
            base_index: 0,
            last_committed: String::new(),
        }
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    pub fn last_committed(&self) -> &str {
        &self.last_committed
    }

    /// Check the next word
    ///
    /// Returns `None` when the word does not look like a correction.
    pub fn feed(&mut self, word: &str) -> Option<Correction> {
        self.history.push(word.to_string());

        let signal = self.patterns.iter().any(|p| p.is_match(word)) || self.completes_i_mean(word);
        if self.sensitivity > SIGNAL_THRESHOLD && signal {
            tracing::debug!(word, "explicit correction signal");
            return Some(Correction::ToLastCommit);
        }

        if self.sensitivity > REPETITION_THRESHOLD && self.history.len() > REPETITION_WINDOW {
            let newest = self.history.len() - 1;
            let window_start = newest.saturating_sub(REPETITION_WINDOW);
            let lower = word.to_lowercase();

            let repeat = self.history[window_start..newest]
                .iter()
                .rposition(|w| w.to_lowercase() == lower)
                .map(|offset| window_start + offset);

            if let Some(local) = repeat {
                tracing::debug!(word, local, "repeated word");
                return Some(match local {
                    0 => Correction::ToLastCommit,
                    n => Correction::ToWord(self.base_index + n - 1),
                });
            }
        }

        None
    }

    /// "I" followed by "mean" arriving as separate words
    fn completes_i_mean(&self, word: &str) -> bool {
        let n = self.history.len();
        n >= 2
            && self.history[n - 2].eq_ignore_ascii_case("i")
            && word
                .trim_end_matches(|c: char| c.is_ascii_punctuation())
                .eq_ignore_ascii_case("mean")
    }

    /// Mark everything seen so far as committed
    pub fn commit(&mut self, text: &str) {
        self.last_committed = text.to_string();
        self.base_index += self.history.len();
        self.history.clear();
    }

    /// Forget words rolled back by the caller
    ///
    /// `kept_words` is the global word count that survives; the word that
    /// triggered the rollback stays as the newest history entry.
    pub fn rollback(&mut self, kept_words: usize) {
        let Some(trigger) = self.history.pop() else {
            return;
        };
        let keep = kept_words.saturating_sub(self.base_index).min(self.history.len());
        self.history.truncate(keep);
        self.history.push(trigger);
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.base_index = 0;
        self.last_committed.clear();
    }
}

impl Default for CorrectionDetector {
    fn default() -> Self {
        Self::new(0.5)
    }
}
