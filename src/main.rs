use anyhow::Result;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

mod code_parser;
mod config;
mod error;
mod http_client;
mod middleware;
mod models;
mod prompts;
mod providers;
mod routes;
mod template_generator;
mod templates;
mod workflow;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = config::Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("🚀 Scaffold Gateway starting...");
    tracing::info!(
        "Server configured: {}:{}",
        config.server_host,
        config.server_port
    );
    tracing::debug!("Debug mode: {:?}", config.debug_mode);

    warn_missing_keys(&config);

    // Initialize HTTP client
    let http_client = Arc::new(http_client::UpstreamHttpClient::new(
        config.http_max_connections,
        config.http_connect_timeout,
        config.http_request_timeout,
    )?);
    tracing::info!("✅ HTTP client initialized with connection pooling");

    let app_state = routes::AppState::new(Arc::new(config.clone()), http_client);

    // Build the application with routes and middleware
    let app = build_app(app_state);

    // Bind to configured host and port
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Print startup banner
    print_startup_banner(&config);

    // Start server with graceful shutdown
    tracing::info!("🚀 Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 Server shutdown complete");

    Ok(())
}

/// Missing upstream keys only disable the endpoints that need them
fn warn_missing_keys(config: &config::Config) {
    match config.paradigm_api_key.as_deref() {
        Some(key) => tracing::info!("Paradigm API key: {}", config::key_prefix(key)),
        None => tracing::warn!("PARADIGM_API_KEY not set; workflow execution is disabled"),
    }
    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set; workflow generation is disabled");
    }
    if config.anthropic_api_key.is_none() {
        tracing::warn!("ANTHROPIC_API_KEY not set; /api/test-claude is disabled");
    }
    if config.gateway_api_key.is_none() {
        tracing::warn!("GATEWAY_API_KEY not set; /api routes are unauthenticated");
    }
}

/// Build the application with all routes and middleware
fn build_app(state: routes::AppState) -> axum::Router {
    use axum::Router;

    // Health check routes (no auth required)
    let health_routes = routes::health_routes();

    // Workflow API routes (auth when GATEWAY_API_KEY is set)
    let api_routes = routes::api_routes(state.clone());

    // Apply middleware stack: Trace → CORS → Debug → (Auth is per-route)
    Router::new()
        .merge(health_routes)
        .merge(api_routes)
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::debug_middleware,
        ))
        .layer(middleware::cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// Print startup banner
fn print_startup_banner(config: &config::Config) {
    let banner = r#"
╔═══════════════════════════════════════════════════════════╗
║                                                           ║
║                 🚀 Scaffold Gateway                       ║
║                                                           ║
║  Workflow execution & generation for Paradigm            ║
║                                                           ║
╚═══════════════════════════════════════════════════════════╝
"#;

    let status = |key: &Option<String>| if key.is_some() { "configured" } else { "missing" };

    println!("{}", banner);
    println!("  Version:     {}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Server:      http://{}:{}",
        config.server_host, config.server_port
    );
    println!("  Paradigm:    {} ({})", config.paradigm_base_url, status(&config.paradigm_api_key));
    println!("  OpenAI:      {}", status(&config.openai_api_key));
    println!("  Anthropic:   {}", status(&config.anthropic_api_key));
    println!("  Public URL:  {}", config.public_base_url);
    println!("  Debug Mode:  {:?}", config.debug_mode);
    println!("  Log Level:   {}", config.log_level);
    println!();
}

/// Handle graceful shutdown signal
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown...");
        },
    }
}
