pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod llm;
pub mod models;
pub mod rag;
pub mod server;

use agent::RelayAgent;
use cli::Args;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr());
    info!("Chat Model: {}", args.chat_model);
    info!("Chat Base URL: {}", args.anthropic_base_url);
    info!("Anthropic API Key Set: {}", args.anthropic_api_key.is_some());
    info!("Speech Model: {}", args.speech_model);
    info!("Speech Base URL: {}", args.elevenlabs_base_url);
    info!("ElevenLabs API Key Set: {}", args.elevenlabs_api_key.is_some());
    info!("Voice ID: {}", args.voice_id);
    info!("Require Audio: {}", args.require_audio);
    info!("Prompts Path: {}", args.prompts_path);
    info!("Retriever Command: {}", args.retriever_command.as_deref().unwrap_or("(disabled)"));
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let agent = Arc::new(RelayAgent::new(&args).await?);
    let addr = args.server_addr();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, agent, args.clone());
    server.run().await?;

    Ok(())
}
