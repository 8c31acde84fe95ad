use serde::{ Serialize, Deserialize };
use crate::models::chat::ChatMessage;

#[derive(Deserialize, Debug, Default)]
pub struct SpeechTurnRequest {
    pub transcript: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct TextTurnRequest {
    pub message: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct SynthesizeRequest {
    pub text: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SpeechTurnResponse {
    pub transcript: String,
    pub response: String,
    /// Base64 encoded audio; `None` when synthesis failed and text-only replies are allowed.
    pub audio: Option<String>,
    pub audio_available: bool,
    pub conversation_history: Vec<ChatMessage>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TextTurnResponse {
    pub response: String,
    pub context: String,
    pub conversation_history: Vec<ChatMessage>,
}

#[derive(Serialize, Debug)]
pub struct SynthesizeResponse {
    pub audio: String,
}

#[derive(Serialize, Debug)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentStatus {
    pub anthropic_key_set: bool,
    pub elevenlabs_key_set: bool,
    pub voice_id_set: bool,
    pub retriever_configured: bool,
}

#[derive(Serialize, Debug)]
pub struct ServiceStatusResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub environment: EnvironmentStatus,
}

#[derive(Serialize, Debug)]
pub struct ReloadResponse {
    pub success: bool,
    pub message: String,
    pub details: Option<Vec<String>>,
}

#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}
