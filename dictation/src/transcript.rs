//! Reconciliation of interim and final recognition results.

use crate::recognition::RecognitionResult;

/// Accumulates confirmed speech and tracks the in-flight hypothesis for one
/// recognition session.
///
/// Finalized segments are appended with a separating space and survive until
/// flushed; the interim hypothesis is replaced wholesale by each result
/// batch, since engines re-segment the unfinalized utterance on every update.
#[derive(Debug, Default)]
pub struct TranscriptBuffer {
    final_text: String,
    interim_text: String,
}

impl TranscriptBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one batch of results into the buffers and return the combined
    /// text.
    ///
    /// Final results append to the confirmed text. The batch's non-final
    /// content becomes the new interim hypothesis; a batch that finalized
    /// everything clears it.
    pub fn apply(&mut self, results: &[RecognitionResult]) -> String {
        let mut interim = String::new();
        for result in results {
            if result.is_final {
                self.final_text.push_str(&result.transcript);
                self.final_text.push(' ');
            } else {
                interim.push_str(&result.transcript);
            }
        }
        self.interim_text = interim;
        self.combined()
    }

    /// Combined confirmed plus in-flight text, as delivered to the sink.
    pub fn combined(&self) -> String {
        format!("{}{}", self.final_text, self.interim_text)
    }

    /// Take the trimmed confirmed text, clearing both buffers.
    ///
    /// Returns `None` when nothing was confirmed; the in-flight hypothesis is
    /// discarded either way.
    pub fn take_final(&mut self) -> Option<String> {
        let text = self.final_text.trim().to_string();
        self.final_text.clear();
        self.interim_text.clear();
        if text.is_empty() { None } else { Some(text) }
    }

    /// Whether both buffers are empty.
    pub fn is_empty(&self) -> bool {
        self.final_text.is_empty() && self.interim_text.is_empty()
    }
}

#[cfg(test)]
#[path = "transcript_test.rs"]
mod tests;
