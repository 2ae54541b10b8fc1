use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use groq_chat_server::config::{Settings, UiVariant};
use groq_chat_server::services::{ConversationManager, GroqService};
use groq_chat_server::utils::logger::init_logger;
use groq_chat_server::{bind_listener, build_router, AppState};

#[derive(Parser, Debug)]
#[command(name = "groq-chat-server", version, about = "Web chat over the Groq API with rolling memory")]
struct Args {
    /// Host to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides config)
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// UI variant: textbox or chat
    #[arg(long)]
    variant: Option<UiVariant>,

    /// Turns kept per session, 0 for unbounded
    #[arg(long)]
    window_size: Option<usize>,

    /// Listen on every interface
    #[arg(long)]
    share: bool,

    /// Open the page in the default browser after start
    #[arg(long)]
    open_browser: bool,
}

impl Args {
    fn apply(self, settings: &mut Settings) {
        if let Some(host) = self.host {
            settings.server.host = host;
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(variant) = self.variant {
            settings.ui.variant = variant;
        }
        if let Some(window_size) = self.window_size {
            settings.memory.window_size = window_size;
        }
        settings.server.share |= self.share;
        settings.server.open_browser |= self.open_browser;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_logger()?;

    info!("🚀 Starting Groq chat server...");

    let args = Args::parse();
    let mut settings = Settings::load().context("Failed to load configuration")?;
    args.apply(&mut settings);
    info!(
        "✅ Configuration loaded: model={}, window={:?}, variant={:?}",
        settings.llm.model,
        settings.memory.capacity(),
        settings.ui.variant
    );

    // Fatal when missing: there is nothing useful to serve without it
    let api_key = settings.api_key()?;

    let llm_service = Arc::new(GroqService::new(settings.llm.clone(), api_key));
    let conversation_manager = Arc::new(ConversationManager::from_settings(&settings, llm_service));

    let _cleanup = conversation_manager
        .clone()
        .spawn_cleanup_task(Duration::from_secs(settings.memory.cleanup_interval_secs));
    info!("✅ Session cleanup task started");

    let listener = bind_listener(&settings.server).await?;
    let addr = listener.local_addr()?;
    let open_browser = settings.server.open_browser;

    let app = build_router(AppState::new(settings, conversation_manager));

    let local_url = format!("http://127.0.0.1:{}/", addr.port());
    info!("🎯 Server listening on {} ({})", addr, local_url);

    if open_browser {
        if let Err(e) = webbrowser::open(&local_url) {
            warn!("Could not open browser: {}", e);
        }
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
