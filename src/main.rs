//! Agent Gateway server binary.

use std::sync::Arc;
use std::time::Duration;

use http::HeaderValue;
use secrecy::ExposeSecret;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use agent_gateway::adapters::generator::{
    GeminiClient, GeminiDispatcher, GeminiHandler, GeminiRoutingOracle,
};
use agent_gateway::adapters::http::chat::{chat_routes, ChatAppState};
use agent_gateway::adapters::log::{JsonlConversationLog, NullConversationLog};
use agent_gateway::adapters::pending::InMemoryPendingStore;
use agent_gateway::application::handlers::chat::{
    ContinueSessionHandler, HandlerRegistry, StartSessionHandler,
};
use agent_gateway::config::AppConfig;
use agent_gateway::domain::foundation::HandlerId;
use agent_gateway::ports::ConversationLog;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.server.log_level)?)
        .init();

    let state = build_state(&config);
    let app = chat_routes(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(cors_layer(&config))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            ))),
    );

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "starting agent-gateway");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

fn build_state(config: &AppConfig) -> ChatAppState {
    let api_key = config
        .generator
        .api_key
        .as_ref()
        .expect("validated configuration carries an API key");
    let client = GeminiClient::new(api_key.expose_secret(), &config.generator.model);

    let orchestrator_instructions = config
        .generator
        .orchestrator_instructions
        .clone()
        .unwrap_or_default();
    let dispatcher_instructions = format!(
        "{}\n\nMAIL_SENDER: {} <{}>\nMAIL_DEFAULT_RECIPIENT: {}",
        orchestrator_instructions,
        config.mail.sender_name,
        config.mail.sender_email,
        config.mail.default_recipient,
    );

    let oracle = Arc::new(GeminiRoutingOracle::new(
        client.clone(),
        orchestrator_instructions,
    ));
    let dispatcher = Arc::new(GeminiDispatcher::new(client.clone(), dispatcher_instructions));
    let procurement = Arc::new(GeminiHandler::new(
        client,
        config
            .generator
            .procurement_instructions
            .clone()
            .unwrap_or_default(),
    ));

    let registry = Arc::new(HandlerRegistry::new().register(
        HandlerId::new("procurement-agent"),
        "Satınalma Asistanı",
        procurement,
    ));

    let pending = Arc::new(InMemoryPendingStore::new());
    let log: Arc<dyn ConversationLog> = if config.logs.disabled {
        Arc::new(NullConversationLog)
    } else {
        Arc::new(JsonlConversationLog::new(&config.logs.conversation_dir))
    };

    let run_timeout = config.generator.run_timeout();
    ChatAppState {
        start_handler: Arc::new(StartSessionHandler::new(
            oracle,
            registry.clone(),
            pending.clone(),
            log.clone(),
            run_timeout,
        )),
        continue_handler: Arc::new(ContinueSessionHandler::new(
            registry.clone(),
            dispatcher,
            pending,
            log,
            run_timeout,
        )),
        registry,
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
