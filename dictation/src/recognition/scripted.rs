//! Scripted recognition engine for demos and tests.
//!
//! Replays a fixed list of utterances as a recognition session would deliver
//! them: growing word-prefix interim results, then a final result per
//! utterance, then [`RecognitionEvent::End`]. Pacing between events is
//! configurable so the same engine serves instant tests and a watchable demo.

use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{
    RecognitionEvent, RecognitionProvider, RecognitionResult, RecognitionSession, SessionHandle,
    SessionSettings,
};

/// Deterministic in-process recognition engine.
///
/// Honors [`SessionSettings`]: interim results are skipped when disabled, and
/// a non-continuous session ends after its first utterance. A stop request
/// interrupts the replay and the session still confirms with `End`, matching
/// how a real engine winds down.
pub struct ScriptedRecognition {
    utterances: Vec<String>,
    delay: Duration,
}

impl ScriptedRecognition {
    /// Create an engine replaying the given utterances with no pacing delay.
    pub fn new<I, S>(utterances: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            utterances: utterances.into_iter().map(Into::into).collect(),
            delay: Duration::ZERO,
        }
    }

    /// Set the pause inserted before each emitted event.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl RecognitionProvider for ScriptedRecognition {
    fn is_available(&self) -> bool {
        true
    }

    /// Open a session fed from a spawned task. Must be called within a Tokio
    /// runtime.
    fn open_session(&self, settings: SessionSettings) -> Result<RecognitionSession> {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        debug!(
            utterances = self.utterances.len(),
            language = %settings.language,
            continuous = settings.continuous,
            "Opening scripted recognition session"
        );

        let feed = Feed {
            utterances: self.utterances.clone(),
            delay: self.delay,
            settings,
            tx,
            cancel: cancel.clone(),
        };
        tokio::spawn(feed.run());

        Ok(RecognitionSession {
            events: rx,
            handle: Box::new(ScriptedHandle { cancel }),
        })
    }
}

struct ScriptedHandle {
    cancel: CancellationToken,
}

impl SessionHandle for ScriptedHandle {
    fn request_stop(&mut self) -> Result<()> {
        self.cancel.cancel();
        Ok(())
    }
}

/// Replay task feeding one session's event channel.
struct Feed {
    utterances: Vec<String>,
    delay: Duration,
    settings: SessionSettings,
    tx: mpsc::UnboundedSender<RecognitionEvent>,
    cancel: CancellationToken,
}

impl Feed {
    async fn run(self) {
        'script: for utterance in &self.utterances {
            if self.settings.interim_results {
                let mut prefix = String::new();
                for word in utterance.split_whitespace() {
                    if !self.pace().await {
                        break 'script;
                    }
                    if !prefix.is_empty() {
                        prefix.push(' ');
                    }
                    prefix.push_str(word);
                    let interim = RecognitionResult {
                        transcript: prefix.clone(),
                        is_final: false,
                    };
                    if self
                        .tx
                        .send(RecognitionEvent::Results(vec![interim]))
                        .is_err()
                    {
                        return;
                    }
                }
            }

            if !self.pace().await {
                break 'script;
            }
            let finalized = RecognitionResult {
                transcript: utterance.clone(),
                is_final: true,
            };
            if self
                .tx
                .send(RecognitionEvent::Results(vec![finalized]))
                .is_err()
            {
                return;
            }

            if !self.settings.continuous {
                break;
            }
        }

        // Ignore send errors (receiver already gone)
        let _ = self.tx.send(RecognitionEvent::End);
    }

    /// Wait one pacing interval. Returns false when the session was stopped.
    async fn pace(&self) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(self.delay) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dictation_settings() -> SessionSettings {
        SessionSettings {
            language: "en-US".to_string(),
            continuous: true,
            interim_results: true,
        }
    }

    async fn collect(mut session: RecognitionSession) -> Vec<RecognitionEvent> {
        let mut events = Vec::new();
        while let Some(event) = session.events.recv().await {
            events.push(event);
        }
        events
    }

    fn interim(text: &str) -> RecognitionEvent {
        RecognitionEvent::Results(vec![RecognitionResult {
            transcript: text.to_string(),
            is_final: false,
        }])
    }

    fn finalized(text: &str) -> RecognitionEvent {
        RecognitionEvent::Results(vec![RecognitionResult {
            transcript: text.to_string(),
            is_final: true,
        }])
    }

    #[tokio::test]
    async fn test_session_event_sequence() {
        let engine = ScriptedRecognition::new(["add milk"]);
        let session = engine.open_session(dictation_settings()).unwrap();

        let events = collect(session).await;

        assert_eq!(
            events,
            vec![
                interim("add"),
                interim("add milk"),
                finalized("add milk"),
                RecognitionEvent::End,
            ]
        );
    }

    #[tokio::test]
    async fn test_interim_results_can_be_disabled() {
        let engine = ScriptedRecognition::new(["add milk", "and eggs"]);
        let mut settings = dictation_settings();
        settings.interim_results = false;
        let session = engine.open_session(settings).unwrap();

        let events = collect(session).await;

        assert_eq!(
            events,
            vec![
                finalized("add milk"),
                finalized("and eggs"),
                RecognitionEvent::End,
            ]
        );
    }

    #[tokio::test]
    async fn test_single_shot_session_ends_after_first_utterance() {
        let engine = ScriptedRecognition::new(["first", "second"]);
        let mut settings = dictation_settings();
        settings.continuous = false;
        let session = engine.open_session(settings).unwrap();

        let events = collect(session).await;

        assert_eq!(events, vec![interim("first"), finalized("first"), RecognitionEvent::End]);
    }

    #[tokio::test]
    async fn test_stop_request_ends_session_promptly() {
        let engine = ScriptedRecognition::new(["a long utterance that would replay slowly"])
            .with_delay(Duration::from_secs(30));
        let mut session = engine.open_session(dictation_settings()).unwrap();

        session.handle.request_stop().unwrap();

        let ended = tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                match session.events.recv().await {
                    Some(RecognitionEvent::End) | None => break,
                    _ => {}
                }
            }
        })
        .await;
        assert!(ended.is_ok(), "session did not end after stop request");
    }
}
