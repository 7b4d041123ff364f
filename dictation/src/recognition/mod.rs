//! Speech-recognition engine abstraction.
//!
//! This module provides a trait abstraction for continuous recognition
//! engines so the controller can be driven by a real platform engine or a
//! deterministic test double. An engine delivers ordered batches of results
//! (each tagged final or interim), an end-of-session notification, and typed
//! error notifications.

use anyhow::Result;
use tokio::sync::mpsc;

pub mod scripted;

/// Per-session engine settings.
///
/// `Default` mirrors single-shot platform defaults; the controller overrides
/// these for continuous multi-utterance dictation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// BCP 47 language tag the engine should recognize.
    pub language: String,
    /// Keep recognizing across pauses instead of stopping after one utterance.
    pub continuous: bool,
    /// Deliver partial hypotheses before they are finalized.
    pub interim_results: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            continuous: false,
            interim_results: false,
        }
    }
}

/// One recognized piece of speech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    /// Recognized text for this segment.
    pub transcript: String,
    /// Whether the engine will revise this segment further.
    pub is_final: bool,
}

/// Typed error reported by a recognition engine. Terminal for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    /// Silence timeout: no speech was detected.
    NoSpeech,
    /// No microphone available or access was denied.
    PermissionDenied,
    /// The engine lost its network connection.
    Network,
    /// Any other engine-specific code.
    Other(String),
}

/// Notifications delivered by an open recognition session, in engine order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// A batch of results. Final segments are interleaved with the current
    /// interim hypothesis.
    Results(Vec<RecognitionResult>),
    /// The engine ended the session (natural end of speech or stop request).
    End,
    /// The engine failed; no further events follow.
    Error(RecognitionErrorKind),
}

/// An open recognition session: the event stream plus a stop handle.
pub struct RecognitionSession {
    /// Ordered event stream for this session. Closed when the engine is done.
    pub events: mpsc::UnboundedReceiver<RecognitionEvent>,
    /// Handle used to request session termination.
    pub handle: Box<dyn SessionHandle>,
}

/// Control handle for an open session.
pub trait SessionHandle: Send {
    /// Request that the engine stop capturing and wind the session down.
    ///
    /// Idempotent. The engine confirms asynchronously with
    /// [`RecognitionEvent::End`]; callers must not rely on a synchronous
    /// acknowledgement.
    fn request_stop(&mut self) -> Result<()>;
}

/// Speech-recognition capability provider.
///
/// Implementations open continuous recognition sessions. Availability is
/// probed once by the controller at construction time.
pub trait RecognitionProvider: Send + Sync {
    /// Whether the recognition capability exists on this host.
    fn is_available(&self) -> bool;

    /// Open a new recognition session with the given settings.
    ///
    /// # Returns
    /// The session's event receiver and stop handle, or an error if the
    /// engine rejected the start request.
    fn open_session(&self, settings: SessionSettings) -> Result<RecognitionSession>;
}
