use super::language::LanguageTag;
use serde::{Deserialize, Serialize};

/// Request for POST /api/speech
#[derive(Debug, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    pub language: LanguageTag,
    #[serde(default = "default_female")]
    pub female: bool,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default)]
    pub provider: SpeechVendor,
}

fn default_female() -> bool {
    true
}

fn default_speed() -> f32 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SpeechVendor {
    #[serde(rename = "aws", alias = "awsPolly")]
    #[default]
    Aws,
    #[serde(rename = "minimax")]
    Minimax,
}

impl std::fmt::Display for SpeechVendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeechVendor::Aws => write!(f, "aws"),
            SpeechVendor::Minimax => write!(f, "minimax"),
        }
    }
}
