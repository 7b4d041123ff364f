//! Voice dictation core for the voicelist shopping assistant.
//!
//! The entry point is [`controller::DictationController`], which drives a
//! continuous speech-recognition session behind the [`recognition`]
//! abstraction and delivers the live transcript to a caller-supplied sink.

pub mod config;
pub mod controller;
pub mod dirs;
pub mod recognition;
pub mod transcript;
