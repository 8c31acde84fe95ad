use crate::cli::Args;
use crate::config::prompt::{ self, PromptConfig, PromptError };
use crate::error::RelayError;
use crate::history::ConversationStore;
use crate::llm::ProviderConfig;
use crate::llm::chat::{ ChatClient, CompletionOptions, new_client as new_chat_client };
use crate::llm::speech::{ SpeechClient, SpeechOptions, new_client as new_speech_client };
use crate::models::api::EnvironmentStatus;
use crate::models::chat::ChatMessage;
use crate::rag::{ ContextRetriever, new_retriever };

use log::{ debug, info, warn, error };
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub completion: CompletionOptions,
    pub speech: SpeechOptions,
    pub voice_id: String,
    /// Fail spoken turns when synthesis fails instead of answering text-only.
    pub require_audio: bool,
    pub prompts_path: Option<PathBuf>,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            completion: CompletionOptions::default(),
            speech: SpeechOptions::default(),
            voice_id: "EXAVITQu4vr4xnSDxMaL".to_string(),
            require_audio: false,
            prompts_path: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub input: String,
    pub reply: String,
    pub context: String,
    /// Raw audio for the reply. `None` for text turns and for spoken turns whose synthesis failed.
    pub audio: Option<Vec<u8>>,
    pub history: Vec<ChatMessage>,
}

pub struct RelayAgent {
    chat_client: Arc<dyn ChatClient>,
    speech_client: Arc<dyn SpeechClient>,
    retriever: Arc<dyn ContextRetriever>,
    prompt_config: RwLock<Arc<PromptConfig>>,
    history: ConversationStore,
    settings: TurnSettings,
}

impl RelayAgent {
    fn initialize_provider_clients(
        args: &Args
    ) -> Result<(Arc<dyn ChatClient>, Arc<dyn SpeechClient>), Box<dyn Error + Send + Sync>> {
        let timeout = Duration::from_secs(args.provider_timeout_secs);

        let chat_config = ProviderConfig::new(
            args.anthropic_api_key.clone(),
            &args.anthropic_base_url,
            timeout
        )?;
        if chat_config.api_key.is_none() {
            error!("ANTHROPIC_API_KEY not set; every conversational turn will fail until it is configured");
        }
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Provider={}, Model={}, BaseURL={}",
            chat_client.provider(),
            args.chat_model,
            chat_config.base_url
        );

        let speech_config = ProviderConfig::new(
            args.elevenlabs_api_key.clone(),
            &args.elevenlabs_base_url,
            timeout
        )?;
        if speech_config.api_key.is_none() {
            error!("ELEVENLABS_API_KEY not set; speech synthesis will fail until it is configured");
        }
        let speech_client = new_speech_client(&speech_config, &args.speech_model)?;
        info!(
            "Speech client configured: Provider={}, Model={}, Voice={}, BaseURL={}",
            speech_client.provider(),
            args.speech_model,
            args.voice_id,
            speech_config.base_url
        );

        Ok((chat_client, speech_client))
    }

    pub async fn new(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let (chat_client, speech_client) = Self::initialize_provider_clients(args)?;
        let retriever = new_retriever(args);
        let prompt_config = prompt::load_prompts(&args.prompts_path)
            .map_err(|e| format!("Failed to load prompts file '{}': {}", args.prompts_path, e))?;

        let settings = TurnSettings {
            completion: CompletionOptions {
                model: args.chat_model.clone(),
                max_tokens: args.max_tokens,
                temperature: args.temperature,
            },
            speech: SpeechOptions {
                stability: args.stability,
                similarity_boost: args.similarity_boost,
            },
            voice_id: args.voice_id.clone(),
            require_audio: args.require_audio,
            prompts_path: Some(PathBuf::from(&args.prompts_path)),
        };

        Ok(Self::from_parts(chat_client, speech_client, retriever, prompt_config, settings))
    }

    pub fn from_parts(
        chat_client: Arc<dyn ChatClient>,
        speech_client: Arc<dyn SpeechClient>,
        retriever: Arc<dyn ContextRetriever>,
        prompt_config: Arc<PromptConfig>,
        settings: TurnSettings
    ) -> Self {
        Self {
            chat_client,
            speech_client,
            retriever,
            prompt_config: RwLock::new(prompt_config),
            history: ConversationStore::new(),
            settings,
        }
    }

    /// Runs one turn: record input, retrieve, compose, complete, record reply and
    /// optionally synthesize the reply.
    ///
    /// The user message stays recorded when completion fails; no assistant message is
    /// added in that case.
    pub async fn run_turn(
        &self,
        conversation_id: &str,
        input: &str,
        with_speech: bool
    ) -> Result<TurnOutcome, RelayError> {
        if input.is_empty() {
            return Err(RelayError::Validation("Input is required".to_string()));
        }
        let turn_id = Uuid::new_v4();
        info!("[{}] Turn in conversation '{}' (speech={})", turn_id, conversation_id, with_speech);
        debug!("[{}] Input: {}", turn_id, input);

        let mut conversation = self.history.lock(conversation_id).await;
        conversation.append(ChatMessage::user(input));

        let context = self.retriever.retrieve(input).await;
        let prompt_config = Arc::clone(&*self.prompt_config.read().await);
        let system_prompt = prompt::compose(prompt_config.base_prompt(), &context);

        let reply = self.chat_client
            .complete(&system_prompt, conversation.messages(), &self.settings.completion).await
            .map_err(|e| {
                error!("[{}] Completion failed: {}", turn_id, e);
                e
            })?;

        conversation.append(ChatMessage::assistant(reply.as_str()));
        let history = conversation.snapshot();
        drop(conversation);

        let audio = if with_speech {
            match self.synthesize(&reply).await {
                Ok(audio) => Some(audio),
                Err(e) if !self.settings.require_audio => {
                    warn!("[{}] Speech synthesis failed, answering text-only: {}", turn_id, e);
                    None
                }
                Err(e) => {
                    error!("[{}] Speech synthesis failed: {}", turn_id, e);
                    return Err(e);
                }
            }
        } else {
            None
        };

        debug!("[{}] Turn complete ({} messages in history)", turn_id, history.len());
        Ok(TurnOutcome {
            input: input.to_string(),
            reply,
            context,
            audio,
            history,
        })
    }

    /// Synthesizes `text` with the configured voice. Independent of conversation state.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, RelayError> {
        if text.is_empty() {
            return Err(RelayError::Validation("Text is required".to_string()));
        }
        self.speech_client.synthesize(text, &self.settings.voice_id, &self.settings.speech).await
    }

    pub async fn reset(&self, conversation_id: &str) {
        self.history.reset(conversation_id).await;
    }

    pub async fn history(&self, conversation_id: &str) -> Vec<ChatMessage> {
        self.history.snapshot(conversation_id).await
    }

    pub async fn base_prompt(&self) -> String {
        self.prompt_config.read().await.base_prompt().to_string()
    }

    /// Swaps in the prompt file when it changed on disk. Returns whether a reload happened.
    pub async fn reload_prompts_if_changed(&self) -> Result<bool, PromptError> {
        let path = match &self.settings.prompts_path {
            Some(path) => path.clone(),
            None => {
                return Err(PromptError::MissingField("prompts_path".to_string()));
            }
        };

        let current = Arc::clone(&*self.prompt_config.read().await);
        let reload_path = path.clone();
        let reloaded = tokio::task
            ::spawn_blocking(move || prompt::reload_prompts_if_changed(&reload_path, &current)).await
            .map_err(|e| PromptError::IoError(std::io::Error::other(e)))??;

        match reloaded {
            Some(new_config) => {
                *self.prompt_config.write().await = new_config;
                info!("Prompts successfully reloaded from {}", path.display());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn environment_status(&self) -> EnvironmentStatus {
        EnvironmentStatus {
            anthropic_key_set: self.chat_client.is_configured(),
            elevenlabs_key_set: self.speech_client.is_configured(),
            voice_id_set: !self.settings.voice_id.trim().is_empty(),
            retriever_configured: self.retriever.is_configured(),
        }
    }
}
