use anyhow::Context;
use navigator_core::{ConversationSession, NavigatorConfig, OpenAiBackend, Registry};
use navigator_gateway::{router, shutdown_signal, AppState, Backend};
use navigator_tools::Dispatcher;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging Setup
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "navigator_core=info,navigator_tools=info,navigator_gateway=info,tower_http=info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    info!("Navigator Gateway Initializing...");
    let config = NavigatorConfig::from_env()?;

    // 2. Load the tool catalog (manifest on disk overrides the built-ins)
    let dispatcher = match &config.tools_path {
        Some(path) => {
            info!(path = %path.display(), "Loading tool registry from manifest...");
            Dispatcher::with_registry(Registry::load(path).await?)
        }
        None => Dispatcher::builtin()?,
    };
    info!("Loaded {} tools for the assistant.", dispatcher.registry().len());

    // 3. Create the assistant and its default thread. Failure here is fatal.
    let backend: Backend = Arc::new(OpenAiBackend::new(&config));
    let session = ConversationSession::initialize(
        &*backend,
        &config.persona.name,
        &config.persona.instructions,
        dispatcher.registry().list_tools(),
    )
    .await
    .context("failed to initialize the assistant session")?;

    // 4. Bundle State
    let state = AppState::new(
        backend,
        Arc::new(dispatcher),
        session,
        config.poll.clone(),
        config.max_conversations,
    );
    let app = router(state);

    // 5. Start Server
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!("Gateway listening on {}...", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}
