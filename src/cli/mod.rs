use clap::Parser;

#[derive(Parser, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Address the HTTP server binds to.
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port the HTTP server listens on.
    #[arg(long, env = "PORT", default_value = "3001")]
    pub port: u16,

    /// Global request budget per second. 0 disables rate limiting.
    #[arg(long, env = "REQUESTS_PER_SECOND", default_value = "10")]
    pub requests_per_second: u32,

    // --- Chat LLM Provider Args ---
    /// API key for the Anthropic Messages API. No default; absence is reported at startup.
    #[arg(long, env = "ANTHROPIC_API_KEY")]
    pub anthropic_api_key: Option<String>,

    /// Base URL for the Anthropic API.
    #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = "https://api.anthropic.com")]
    pub anthropic_base_url: String,

    /// Model name for chat completion.
    #[arg(long, env = "CHAT_MODEL", default_value = "claude-3-5-sonnet-20241022")]
    pub chat_model: String,

    /// Maximum number of tokens generated per reply.
    #[arg(long, env = "CHAT_MAX_TOKENS", default_value = "150")]
    pub max_tokens: u32,

    /// Sampling temperature for chat completion.
    #[arg(long, env = "CHAT_TEMPERATURE", default_value = "0.7")]
    pub temperature: f32,

    // --- Speech Provider Args ---
    /// API key for the ElevenLabs text-to-speech API. No default; absence is reported at startup.
    #[arg(long, env = "ELEVENLABS_API_KEY")]
    pub elevenlabs_api_key: Option<String>,

    /// Base URL for the ElevenLabs API.
    #[arg(long, env = "ELEVENLABS_BASE_URL", default_value = "https://api.elevenlabs.io")]
    pub elevenlabs_base_url: String,

    /// Voice used for every synthesized reply.
    #[arg(long, env = "ELEVENLABS_VOICE_ID", default_value = "EXAVITQu4vr4xnSDxMaL")]
    pub voice_id: String,

    /// Synthesis model identifier.
    #[arg(long, env = "ELEVENLABS_MODEL_ID", default_value = "eleven_monolingual_v1")]
    pub speech_model: String,

    /// Voice stability (0.0 to 1.0).
    #[arg(long, env = "VOICE_STABILITY", default_value = "0.5")]
    pub stability: f32,

    /// Voice similarity boost (0.0 to 1.0).
    #[arg(long, env = "VOICE_SIMILARITY_BOOST", default_value = "0.5")]
    pub similarity_boost: f32,

    /// Fail the whole spoken turn when speech synthesis fails instead of answering text-only.
    #[arg(long, env = "REQUIRE_AUDIO", default_value = "false")]
    pub require_audio: bool,

    /// Timeout in seconds for requests to the chat and speech providers.
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value = "60")]
    pub provider_timeout_secs: u64,

    // --- Prompt Args ---
    /// Path to the persona/policy prompt configuration file.
    #[arg(long, env = "PROMPTS_PATH", default_value = "config/prompts.json")]
    pub prompts_path: String,

    // --- Retriever Args ---
    /// Program invoked to retrieve document context (e.g. python3). Retrieval is disabled when unset.
    #[arg(long, env = "RETRIEVER_COMMAND")]
    pub retriever_command: Option<String>,

    /// Arguments passed to the retriever program (comma separated when read from the environment).
    #[arg(long, env = "RETRIEVER_ARGS", value_delimiter = ',')]
    pub retriever_args: Vec<String>,

    /// Number of snippets requested from the retriever.
    #[arg(long, env = "RETRIEVER_K", default_value = "3")]
    pub retriever_k: usize,

    /// Seconds to wait for a retriever process before giving up on context.
    #[arg(long, env = "RETRIEVER_TIMEOUT_SECS", default_value = "30")]
    pub retriever_timeout_secs: u64,

    /// Maximum number of retriever processes running at once.
    #[arg(long, env = "RETRIEVER_MAX_CONCURRENCY", default_value = "4")]
    pub retriever_max_concurrency: usize,

    // --- TLS Args ---
    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

impl Args {
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Credentials stay out of Debug output.
impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("anthropic_api_key", &self.anthropic_api_key.as_ref().map(|_| "<set>"))
            .field("anthropic_base_url", &self.anthropic_base_url)
            .field("chat_model", &self.chat_model)
            .field("elevenlabs_api_key", &self.elevenlabs_api_key.as_ref().map(|_| "<set>"))
            .field("elevenlabs_base_url", &self.elevenlabs_base_url)
            .field("voice_id", &self.voice_id)
            .field("prompts_path", &self.prompts_path)
            .field("retriever_command", &self.retriever_command)
            .finish_non_exhaustive()
    }
}
