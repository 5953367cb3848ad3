pub mod dto;
pub mod error;
pub mod gate;
pub mod language;
pub mod service;

pub use dto::{SpeechRequest, SpeechVendor};
pub use error::SpeechError;
pub use gate::{ConcurrencyGate, GatePermit};
pub use language::{minimax_voice_for, polly_voice_for, LanguageTag};
pub use service::{SpeechIdentity, SpeechService};
