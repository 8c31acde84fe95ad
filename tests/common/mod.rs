#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{ Request, StatusCode },
    Router,
};
use rag_voice_relay::agent::{ RelayAgent, TurnSettings };
use rag_voice_relay::config::prompt::PromptConfig;
use rag_voice_relay::error::RelayError;
use rag_voice_relay::llm::chat::{ ChatClient, CompletionOptions };
use rag_voice_relay::llm::speech::{ SpeechClient, SpeechOptions };
use rag_voice_relay::models::chat::ChatMessage;
use rag_voice_relay::rag::ContextRetriever;
use rag_voice_relay::server::api::{ app, AppState };
use serde_json::Value;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::{ Arc, Mutex };
use tower::ServiceExt;

pub const BASE_TEMPLATE: &str = "You are Sarah from ABLe Capital Property Management.";

pub struct StubChat {
    reply: Result<String, u16>,
    pub calls: Mutex<Vec<(String, Vec<ChatMessage>)>>,
}

impl StubChat {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self { reply: Ok(reply.to_string()), calls: Mutex::new(Vec::new()) })
    }

    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self { reply: Err(status), calls: Mutex::new(Vec::new()) })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_system_prompt(&self) -> String {
        self.calls.lock().unwrap().last().map(|(s, _)| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatClient for StubChat {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        _options: &CompletionOptions
    ) -> Result<String, RelayError> {
        self.calls.lock().unwrap().push((system_prompt.to_string(), history.to_vec()));
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(status) =>
                Err(RelayError::Provider {
                    provider: "stub-chat",
                    status: Some(*status),
                    body: Some("{\"error\":\"upstream secret detail\"}".to_string()),
                    message: "upstream failure".to_string(),
                }),
        }
    }

    fn provider(&self) -> &'static str {
        "stub-chat"
    }

    fn is_configured(&self) -> bool {
        true
    }
}

pub struct StubSpeech {
    audio: Option<Vec<u8>>,
    pub calls: AtomicUsize,
}

impl StubSpeech {
    pub fn returning(audio: &[u8]) -> Arc<Self> {
        Arc::new(Self { audio: Some(audio.to_vec()), calls: AtomicUsize::new(0) })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { audio: None, calls: AtomicUsize::new(0) })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechClient for StubSpeech {
    async fn synthesize(
        &self,
        _text: &str,
        _voice_id: &str,
        _options: &SpeechOptions
    ) -> Result<Vec<u8>, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.audio.clone().ok_or_else(|| RelayError::provider("stub-speech", "synthesis unavailable"))
    }

    fn provider(&self) -> &'static str {
        "stub-speech"
    }

    fn is_configured(&self) -> bool {
        true
    }
}

pub struct StubRetriever {
    context: String,
    pub calls: AtomicUsize,
}

impl StubRetriever {
    pub fn returning(context: &str) -> Arc<Self> {
        Arc::new(Self { context: context.to_string(), calls: AtomicUsize::new(0) })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContextRetriever for StubRetriever {
    async fn retrieve(&self, _query: &str) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.context.clone()
    }
}

pub struct Harness {
    pub app: Router,
    pub agent: Arc<RelayAgent>,
}

pub fn prompt_config() -> Arc<PromptConfig> {
    let json = serde_json::json!({ "system_template": BASE_TEMPLATE }).to_string();
    Arc::new(PromptConfig::from_json(&json).unwrap())
}

pub fn harness_with(
    chat: Arc<dyn ChatClient>,
    speech: Arc<dyn SpeechClient>,
    retriever: Arc<dyn ContextRetriever>,
    settings: TurnSettings,
    requests_per_second: u32
) -> Harness {
    let agent = Arc::new(RelayAgent::from_parts(chat, speech, retriever, prompt_config(), settings));
    let app = app(AppState::new(Arc::clone(&agent), requests_per_second));
    Harness { app, agent }
}

pub fn harness(
    chat: Arc<dyn ChatClient>,
    speech: Arc<dyn SpeechClient>,
    retriever: Arc<dyn ContextRetriever>
) -> Harness {
    harness_with(chat, speech, retriever, TurnSettings::default(), 0)
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    conversation_id: Option<&str>
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = conversation_id {
        builder = builder.header("X-Conversation-Id", id);
    }
    let req = match body {
        Some(json) =>
            builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}
