//! # colloquy-context
//!
//! Bounded-context conversation management:
//!
//! - [`MessageStore`]: chronological history plus the append-only archive
//! - [`RequestComposer`]: most-recent-first windowing under a token budget
//! - [`Compressor`]: summarize-and-archive state machine
//! - [`ChatState`] and [`persistence`]: the on-disk chat and conditions files
//! - [`ConditionLibrary`]: the saved conditions collection
//! - [`transcript`]: plain-text transcript export

#![deny(unsafe_code)]

pub mod chat_state;
pub mod compressor;
pub mod conditions;
pub mod constants;
pub mod errors;
pub mod message_store;
pub mod persistence;
pub mod request_composer;
pub mod transcript;

pub use chat_state::{ChatState, RestoredChat, StoredMessages};
pub use compressor::{CompressionOutcome, Compressor, CompressorState};
pub use conditions::ConditionLibrary;
pub use errors::CompressionError;
pub use message_store::MessageStore;
pub use persistence::{
    load_chat_state, load_conditions, save_chat_state, save_conditions, write_transcript,
};
pub use request_composer::{ComposedRequest, RequestComposer};
pub use transcript::{TranscriptEntry, render_transcript};
