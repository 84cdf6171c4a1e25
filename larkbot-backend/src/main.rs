use dotenv::dotenv;
use std::sync::Arc;
use tokio::sync::oneshot;

mod ai;
mod config;
mod db;
mod http;
mod ids;
mod interactions;
mod models;
mod twitter;

use ai::{AiClient, OpenAIClient};
use config::{twitter_credentials_from_env, AgentConfig, AiSettings};
use db::Database;
use interactions::start_interaction_listener;
use twitter::{SocialPlatform, TwitterClient};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let config = match AgentConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let ai_settings = match AiSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Invalid AI configuration: {}", e);
            std::process::exit(1);
        }
    };
    let credentials = match twitter_credentials_from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            log::error!("Invalid Twitter configuration: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("Initializing database at {}", config.database_url);
    let db = Arc::new(Database::open(&config.database_url).expect("Failed to initialize database"));

    let twitter = TwitterClient::new(credentials, &config.agent_user_id, &config.agent_handle);
    match twitter.verify_credentials().await {
        Ok(username) => log::info!("Twitter: credentials validated for @{}", username),
        Err(e) => {
            log::error!("Twitter: invalid credentials: {}", e);
            std::process::exit(1);
        }
    }
    let platform: Arc<dyn SocialPlatform> = Arc::new(twitter);

    let openai = match OpenAIClient::new(&ai_settings) {
        Ok(client) => client,
        Err(e) => {
            log::error!("Failed to create AI client: {}", e);
            std::process::exit(1);
        }
    };
    let ai = AiClient::OpenAI(openai);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let listener = tokio::spawn(start_interaction_listener(
        platform,
        ai,
        db,
        config,
        shutdown_rx,
    ));

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
    log::info!("Shutting down");
    let _ = shutdown_tx.send(());
    let _ = listener.await;
    log::info!("larkbot stopped");
}
