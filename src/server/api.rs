use crate::agent::RelayAgent;
use crate::cli::Args;
use crate::error::RelayError;
use crate::history::DEFAULT_CONVERSATION_ID;
use crate::models::api::{
    ErrorResponse,
    ReloadResponse,
    ServiceStatusResponse,
    SpeechTurnRequest,
    SpeechTurnResponse,
    StatusResponse,
    SynthesizeRequest,
    SynthesizeResponse,
    TextTurnRequest,
    TextTurnResponse,
};
use std::convert::Infallible;
use std::error::Error;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::{ FromRequestParts, Request, State },
    http::{ request::Parts, StatusCode },
    middleware::{ self, Next },
    response::{ IntoResponse, Response },
    routing::{ get, post },
    Json,
    Router,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use governor::{ DefaultDirectRateLimiter, Quota, RateLimiter };
use serde::de::DeserializeOwned;
use tower::ServiceBuilder;
use tower_http::cors::{ Any, CorsLayer };
use log::{ debug, info, warn, error };

pub const CONVERSATION_HEADER: &str = "x-conversation-id";

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<RelayAgent>,
    pub limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl AppState {
    /// `requests_per_second == 0` disables rate limiting.
    pub fn new(agent: Arc<RelayAgent>, requests_per_second: u32) -> Self {
        let limiter = NonZeroU32::new(requests_per_second).map(|rate| {
            Arc::new(RateLimiter::direct(Quota::per_second(rate)))
        });
        Self { agent, limiter }
    }
}

/// Conversation selected by the `X-Conversation-Id` header, `default` when absent.
pub struct ConversationId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ConversationId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts.headers
            .get(CONVERSATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_CONVERSATION_ID);
        Ok(ConversationId(id.to_string()))
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message.to_string()),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Logs the full failure server-side and hands the client only `generic`.
fn failure(context: &str, err: RelayError, generic: &'static str) -> ApiError {
    if let RelayError::Validation(message) = err {
        return ApiError::BadRequest(message);
    }
    error!("{}: {}", context, err);
    if let Some(body) = err.upstream_body() {
        error!("Upstream payload: {}", body);
    }
    ApiError::Internal(generic)
}

/// An empty or unparsable body counts as a body without fields.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> T {
    if body.is_empty() {
        return T::default();
    }
    serde_json::from_slice(body).unwrap_or_else(|e| {
        debug!("Ignoring unparsable request body: {}", e);
        T::default()
    })
}

fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    value.filter(|v| !v.is_empty()).ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/process-speech", post(process_speech_handler))
        .route("/api/text-chat", post(text_chat_handler))
        .route("/api/reset-conversation", post(reset_conversation_handler))
        .route("/api/text-to-speech", post(text_to_speech_handler))
        .route("/api/test", get(service_status_handler))
        .route("/api/reload-prompts", get(reload_prompts_handler))
        .layer(
            ServiceBuilder::new()
                .layer(cors)
                .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        )
        .with_state(state)
}

async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            warn!("Global request rate limit exceeded for {} {}", request.method(), request.uri());
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorResponse { error: "Too many requests".to_string() }),
            ).into_response();
        }
    }
    next.run(request).await
}

pub async fn start_http_server(
    addr: SocketAddr,
    state: AppState,
    args: &Args
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let app = app(state);

    if args.enable_tls {
        let (cert_path, key_path) = match (&args.tls_cert_path, &args.tls_key_path) {
            (Some(cert), Some(key)) => (cert, key),
            _ => {
                error!("--enable-tls requires both --tls-cert-path and --tls-key-path.");
                return Err("TLS enabled without cert/key".into());
            }
        };
        info!("TLS enabled. Loading certificate from '{}' and key from '{}'", cert_path, key_path);
        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path).await?;

        info!("HTTPS server listening on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
    } else {
        let listener = tokio::net::TcpListener
            ::bind(addr).await
            .map_err(|e| format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e))?;
        info!("HTTP server listening on: http://{}", addr);
        axum::serve(listener, app.into_make_service()).await?;
    }

    Ok(())
}

async fn process_speech_handler(
    State(state): State<AppState>,
    ConversationId(conversation_id): ConversationId,
    body: Bytes
) -> Result<Json<SpeechTurnResponse>, ApiError> {
    let request: SpeechTurnRequest = parse_body(&body);
    let transcript = required(request.transcript, "Transcript is required")?;

    let outcome = state.agent
        .run_turn(&conversation_id, &transcript, true).await
        .map_err(|e| failure("Error processing speech", e, "Failed to process speech"))?;

    let audio = outcome.audio.as_ref().map(|bytes| BASE64_STANDARD.encode(bytes));
    Ok(
        Json(SpeechTurnResponse {
            transcript: outcome.input,
            response: outcome.reply,
            audio_available: audio.is_some(),
            audio,
            conversation_history: outcome.history,
        })
    )
}

async fn text_chat_handler(
    State(state): State<AppState>,
    ConversationId(conversation_id): ConversationId,
    body: Bytes
) -> Result<Json<TextTurnResponse>, ApiError> {
    let request: TextTurnRequest = parse_body(&body);
    let message = required(request.message, "Message is required")?;

    let outcome = state.agent
        .run_turn(&conversation_id, &message, false).await
        .map_err(|e| failure("Error processing text message", e, "Failed to process message"))?;

    Ok(
        Json(TextTurnResponse {
            response: outcome.reply,
            context: outcome.context,
            conversation_history: outcome.history,
        })
    )
}

async fn reset_conversation_handler(
    State(state): State<AppState>,
    ConversationId(conversation_id): ConversationId
) -> Json<StatusResponse> {
    state.agent.reset(&conversation_id).await;
    Json(StatusResponse { status: "success", message: "Conversation reset" })
}

async fn text_to_speech_handler(
    State(state): State<AppState>,
    body: Bytes
) -> Result<Json<SynthesizeResponse>, ApiError> {
    let request: SynthesizeRequest = parse_body(&body);
    let text = required(request.text, "Text is required")?;
    info!("Generating speech for {} characters of text", text.chars().count());
    debug!("Speech text: {}", text);

    let audio = state.agent
        .synthesize(&text).await
        .map_err(|e| failure("Error generating speech", e, "Failed to generate speech"))?;

    Ok(Json(SynthesizeResponse { audio: BASE64_STANDARD.encode(audio) }))
}

async fn service_status_handler(State(state): State<AppState>) -> Json<ServiceStatusResponse> {
    Json(ServiceStatusResponse {
        status: "success",
        message: "Server is running",
        environment: state.agent.environment_status(),
    })
}

async fn reload_prompts_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (code, response) = match state.agent.reload_prompts_if_changed().await {
        Ok(true) =>
            (
                StatusCode::OK,
                ReloadResponse {
                    success: true,
                    message: "Reload complete".into(),
                    details: Some(vec!["Prompts reloaded".into()]),
                },
            ),
        Ok(false) =>
            (
                StatusCode::OK,
                ReloadResponse {
                    success: true,
                    message: "Reload complete".into(),
                    details: Some(vec!["Prompts unchanged".into()]),
                },
            ),
        Err(e) => {
            warn!("Prompt reload failed, keeping previous configuration: {}", e);
            (
                StatusCode::BAD_REQUEST,
                ReloadResponse {
                    success: false,
                    message: "Reload errors".into(),
                    details: Some(vec![format!("Prompt error: {}", e)]),
                },
            )
        }
    };
    (code, Json(response))
}
