//! Dictation controller: owns the recognition session lifecycle and keeps
//! the caller's text current.
//!
//! The controller drives a [`RecognitionProvider`], reconciles its result
//! batches through a [`TranscriptBuffer`], and reports state through an
//! observable listening flag plus a single human-readable error field.
//! Operations never fail across the public surface; failures land in the
//! error field and the caller decides how to present them.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::recognition::{
    RecognitionErrorKind, RecognitionEvent, RecognitionProvider, SessionHandle, SessionSettings,
};
use crate::transcript::TranscriptBuffer;

/// Locale used for every recognition session.
const DICTATION_LANGUAGE: &str = "en-US";

/// Observable listening state. `Error` behaves as idle: the controller is not
/// listening and a fresh `start()` is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListeningState {
    Idle,
    Listening,
    Error,
}

/// User-facing dictation failures, rendered into the controller's error
/// field. All are terminal to the current session and recovered locally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DictationError {
    #[error("Speech recognition is not supported on this platform.")]
    Unsupported,
    #[error("Speech recognition is not initialized.")]
    NotInitialized,
    #[error("Failed to start speech recognition: {0}")]
    StartFailure(String),
    #[error("No speech detected. Please try again.")]
    NoSpeech,
    #[error("Microphone access denied. Please allow microphone use and retry.")]
    PermissionDenied,
    #[error("Network error during speech recognition. Check your connection.")]
    Network,
    #[error("Speech recognition error: {0}")]
    Unknown(String),
}

impl DictationError {
    fn from_engine(kind: RecognitionErrorKind) -> Self {
        match kind {
            RecognitionErrorKind::NoSpeech => DictationError::NoSpeech,
            RecognitionErrorKind::PermissionDenied => DictationError::PermissionDenied,
            RecognitionErrorKind::Network => DictationError::Network,
            RecognitionErrorKind::Other(code) => DictationError::Unknown(code),
        }
    }
}

/// The active session's controller-side bookkeeping.
struct ActiveSession {
    generation: u64,
    handle: Box<dyn SessionHandle>,
    cancel: CancellationToken,
}

struct Inner {
    provider: Arc<dyn RecognitionProvider>,
    sink: Box<dyn Fn(&str) + Send + Sync>,
    supported: bool,
    state: RwLock<ListeningState>,
    error: RwLock<Option<DictationError>>,
    /// Monotonic session counter. A pump whose generation no longer matches
    /// has been superseded and must discard its events.
    generation: AtomicU64,
    active: Mutex<Option<ActiveSession>>,
    state_tx: broadcast::Sender<ListeningState>,
}

/// Controller for continuous voice dictation.
///
/// Construct with a capability provider and a text sink; the sink receives
/// the combined confirmed-plus-interim transcript on every recognition
/// update and the trimmed confirmed text once when a session ends. At most
/// one recognition session is open at a time.
pub struct DictationController {
    inner: Arc<Inner>,
}

impl DictationController {
    /// Create a controller delivering transcript updates to `on_text_update`.
    ///
    /// The capability check happens here, once: with an unavailable provider
    /// the controller starts in the `Error` state and `start()` is disabled.
    pub fn new(
        provider: Arc<dyn RecognitionProvider>,
        on_text_update: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        let supported = provider.is_available();
        if !supported {
            warn!("Speech recognition capability unavailable");
        }
        let (state_tx, _) = broadcast::channel(32);
        let inner = Arc::new(Inner {
            provider,
            sink: Box::new(on_text_update),
            supported,
            state: RwLock::new(if supported {
                ListeningState::Idle
            } else {
                ListeningState::Error
            }),
            error: RwLock::new(if supported {
                None
            } else {
                Some(DictationError::Unsupported)
            }),
            generation: AtomicU64::new(0),
            active: Mutex::new(None),
            state_tx,
        });
        Self { inner }
    }

    /// Get the current listening state.
    pub async fn state(&self) -> ListeningState {
        *self.inner.state.read().await
    }

    /// Whether a recognition session is currently active.
    pub async fn is_listening(&self) -> bool {
        self.state().await == ListeningState::Listening
    }

    /// Current error message; empty when there is none.
    pub async fn error(&self) -> String {
        self.inner
            .error
            .read()
            .await
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// Typed view of the current error, if any.
    pub async fn last_error(&self) -> Option<DictationError> {
        self.inner.error.read().await.clone()
    }

    /// Subscribe to listening-state changes.
    pub fn subscribe(&self) -> broadcast::Receiver<ListeningState> {
        self.inner.state_tx.subscribe()
    }

    /// Open a new recognition session.
    ///
    /// No-op (with the error field set) when the capability check failed or a
    /// session is already active; a provider rejection is surfaced the same
    /// way and leaves the state untouched. On success the error field is
    /// cleared and the state transitions to `Listening`.
    pub async fn start(&self) {
        if !self.inner.supported {
            self.inner.set_error(DictationError::NotInitialized).await;
            return;
        }

        let mut state = self.inner.state.write().await;
        if *state == ListeningState::Listening {
            self.inner
                .set_error(DictationError::StartFailure(
                    "a recognition session is already active".to_string(),
                ))
                .await;
            return;
        }

        let settings = SessionSettings {
            language: DICTATION_LANGUAGE.to_string(),
            continuous: true,
            interim_results: true,
        };
        let session = match self.inner.provider.open_session(settings) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Recognition engine rejected start");
                self.inner
                    .set_error(DictationError::StartFailure(format!("{e:#}")))
                    .await;
                return;
            }
        };

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        {
            let mut active = self.inner.active.lock().expect("session lock poisoned");
            *active = Some(ActiveSession {
                generation,
                handle: session.handle,
                cancel: cancel.clone(),
            });
        }
        *state = ListeningState::Listening;
        *self.inner.error.write().await = None;
        // Ignore send errors (no subscribers)
        let _ = self.inner.state_tx.send(ListeningState::Listening);
        info!(generation, "Recognition session started");

        tokio::spawn(Inner::pump(
            self.inner.clone(),
            generation,
            session.events,
            cancel,
        ));
    }

    /// Stop the active session, if any. Idempotent.
    ///
    /// The termination request is made even when the engine fails it
    /// synchronously; the caller-visible state always ends not listening.
    /// Confirmed text still pending in the session is flushed to the sink
    /// asynchronously.
    pub async fn stop(&self) {
        let mut state = self.inner.state.write().await;
        let session = self
            .inner
            .active
            .lock()
            .expect("session lock poisoned")
            .take();
        if let Some(mut session) = session {
            debug!(generation = session.generation, "Stopping recognition session");
            if let Err(e) = session.handle.request_stop() {
                warn!(error = %e, "Recognition engine failed to stop cleanly");
            }
            session.cancel.cancel();
        }
        if *state == ListeningState::Listening {
            *state = ListeningState::Idle;
            let _ = self.inner.state_tx.send(ListeningState::Idle);
        }
    }

    /// Stop when listening, otherwise start.
    pub async fn toggle_listening(&self) {
        if self.is_listening().await {
            self.stop().await;
        } else {
            self.start().await;
        }
    }
}

impl Drop for DictationController {
    fn drop(&mut self) {
        // No recognition session outlives its controller.
        if let Ok(mut active) = self.inner.active.lock() {
            if let Some(mut session) = active.take() {
                let _ = session.handle.request_stop();
                session.cancel.cancel();
            }
        }
    }
}

impl Inner {
    /// Event pump for one recognition session.
    ///
    /// Owns the session's transcript buffers; all mutation happens here, in
    /// engine delivery order. Events from a superseded generation are
    /// discarded instead of touching current state.
    async fn pump(
        self: Arc<Self>,
        generation: u64,
        mut events: mpsc::UnboundedReceiver<RecognitionEvent>,
        cancel: CancellationToken,
    ) {
        let mut transcript = TranscriptBuffer::new();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    // Explicit stop: fold in results the engine already
                    // delivered, then flush the confirmed text.
                    while let Ok(event) = events.try_recv() {
                        if let RecognitionEvent::Results(results) = event {
                            transcript.apply(&results);
                        }
                    }
                    self.flush(generation, &mut transcript);
                    return;
                }
                event = events.recv() => match event {
                    Some(RecognitionEvent::Results(results)) => {
                        if self.generation.load(Ordering::SeqCst) != generation {
                            debug!(generation, "Discarding results from superseded session");
                            return;
                        }
                        let combined = transcript.apply(&results);
                        (self.sink)(&combined);
                    }
                    Some(RecognitionEvent::End) | None => {
                        self.finish(generation, &mut transcript).await;
                        return;
                    }
                    Some(RecognitionEvent::Error(kind)) => {
                        self.fail(generation, kind).await;
                        return;
                    }
                },
            }
        }
    }

    /// Natural end of session: flush confirmed text and return to idle.
    async fn finish(&self, generation: u64, transcript: &mut TranscriptBuffer) {
        let mut state = self.state.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        self.clear_active(generation);
        self.flush(generation, transcript);
        if *state == ListeningState::Listening {
            *state = ListeningState::Idle;
            let _ = self.state_tx.send(ListeningState::Idle);
            info!(generation, "Recognition session ended");
        }
    }

    /// Engine error: record the message, abandon the session without a
    /// flush, and force the state out of listening.
    async fn fail(&self, generation: u64, kind: RecognitionErrorKind) {
        let mut state = self.state.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        self.clear_active(generation);
        let err = DictationError::from_engine(kind);
        warn!(error = %err, generation, "Recognition session failed");
        *self.error.write().await = Some(err);
        *state = ListeningState::Error;
        let _ = self.state_tx.send(ListeningState::Error);
    }

    /// Deliver the trimmed confirmed text once, unless superseded.
    fn flush(&self, generation: u64, transcript: &mut TranscriptBuffer) {
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        if let Some(text) = transcript.take_final() {
            debug!(text = %text, "Flushing final transcript");
            (self.sink)(&text);
        }
    }

    fn clear_active(&self, generation: u64) {
        let mut active = self.active.lock().expect("session lock poisoned");
        if active.as_ref().is_some_and(|s| s.generation == generation) {
            *active = None;
        }
    }

    async fn set_error(&self, err: DictationError) {
        debug!(error = %err, "Recording dictation error");
        *self.error.write().await = Some(err);
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
