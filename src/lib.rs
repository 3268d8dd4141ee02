pub mod models;
pub mod server;
pub mod service;
pub mod store;
pub mod llm;
pub mod cli;
pub mod client;

use cli::Args;
use llm::{ LlmConfig, LlmType };
use llm::chat::{ new_client as new_completion_client, CompletionClient };
use log::{ info, warn };
use server::Server;
use service::{ ConversationService, ServiceConfig };
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

fn initialize_provider(
    args: &Args
) -> Result<Option<Arc<dyn CompletionClient>>, Box<dyn Error + Send + Sync>> {
    let llm_type: LlmType = args.chat_llm_type.parse()?;
    let config = LlmConfig {
        llm_type,
        api_key: Some(args.chat_api_key.clone()).filter(|k| !k.trim().is_empty()),
        completion_model: args.chat_model.clone(),
        base_url: args.chat_base_url.clone(),
    };

    if !config.is_usable() {
        warn!("No API key provided for {}, using mock replies.", llm_type);
        return Ok(None);
    }

    let client = new_completion_client(&config)?;
    info!(
        "Completion client configured: Type={}, Model={}, BaseURL={}",
        llm_type,
        client.get_model(),
        client.get_base_url().as_deref().unwrap_or("adapter default")
    );
    Ok(Some(client))
}

pub fn build_service(args: &Args) -> Result<ConversationService, Box<dyn Error + Send + Sync>> {
    let store = store::initialize_store(args)?;
    let provider = initialize_provider(args)?;
    Ok(
        ConversationService::new(ServiceConfig {
            store,
            provider,
            provider_timeout: Duration::from_secs(args.provider_timeout_secs),
            enable_delete: args.enable_delete,
        })
    )
}

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Store Type: {}", args.store_type);
    info!("Store URL configured: {}", args.store_url.is_some());
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or("adapter default"));
    info!("Provider Timeout: {}s", args.provider_timeout_secs);
    info!("Delete Enabled: {}", args.enable_delete);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let service = Arc::new(build_service(&args)?);
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, service, args);
    server.run().await?;

    Ok(())
}
