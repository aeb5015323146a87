//! OpenVox Agent Planner - platform resolution service
//!
//! Serves agent install plans (repository, GPG keys, package source, services)
//! for hosts described by Facter facts or known to PuppetDB.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use config::{LogFormat, LogTarget};
use openvox_agent_planner::{api, config, services, AppConfig, AppState};
use services::{FactSource, PuppetDbClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    // Check for --help flag
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    // Check for --version flag
    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        println!("OpenVox Agent Planner {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration first (before logging, so we know log format)
    let config = AppConfig::load().context("Failed to load configuration")?;

    // The guard must be kept alive for the duration of the program
    // to ensure log messages are flushed to files
    let _log_guard = init_logging(&config);

    info!("OpenVox Agent Planner starting up");
    info!(
        "Default collection: {}, manage_repo: {}",
        config.resolver.default_collection, config.resolver.manage_repo
    );

    // Initialize PuppetDB client if configured
    let facts: Option<Arc<dyn FactSource>> = if let Some(ref puppetdb_config) = config.puppetdb {
        info!("Initializing PuppetDB client: {}", puppetdb_config.url);
        Some(Arc::new(
            PuppetDbClient::new(puppetdb_config).context("Failed to initialize PuppetDB client")?,
        ))
    } else {
        info!("PuppetDB not configured, node endpoints disabled");
        None
    };

    let state = AppState::new(config.clone(), facts);
    info!(
        "PE version lookup: {}",
        state.resolver.pe_versions().describe()
    );

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address configuration")?;

    if let Some(ref tls_config) = config.server.tls {
        info!("Starting HTTPS server on https://{}", addr);
        info!("TLS certificate: {:?}", tls_config.cert_file);

        let rustls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            &tls_config.cert_file,
            &tls_config.key_file,
        )
        .await
        .with_context(|| {
            format!(
                "Failed to load TLS material from {:?} and {:?}",
                tls_config.cert_file, tls_config.key_file
            )
        })?;

        info!("HTTPS server is ready to accept connections");

        axum_server::bind_rustls(addr, rustls_config)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .context("HTTPS server error")?;
    } else {
        info!("Starting HTTP server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .context("Failed to bind to address")?;

        info!("HTTP server is ready to accept connections");

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .context("HTTP server error")?;
    }

    Ok(())
}

/// Initialize the logging/tracing infrastructure
///
/// The returned guard flushes the file writer and must outlive the server.
fn init_logging(config: &AppConfig) -> Option<WorkerGuard> {
    let log_config = &config.logging;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_config.level));

    let to_console = matches!(log_config.target, LogTarget::Console | LogTarget::Both);
    let to_file = matches!(log_config.target, LogTarget::File | LogTarget::Both);

    let (file_writer, guard) = if to_file {
        let (writer, guard) = create_file_writer(log_config);
        (Some(writer), Some(guard))
    } else {
        (None, None)
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let console_layer = to_console.then(|| format_layer(&log_config.format, std::io::stdout, true));
    let registry = registry.with(console_layer);
    let file_layer = file_writer.map(|writer| format_layer(&log_config.format, writer, false));
    registry.with(file_layer).init();

    guard
}

/// One formatting layer for the configured log format
fn format_layer<S, W>(format: &LogFormat, writer: W, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_writer(writer).with_ansi(ansi);
    match format {
        LogFormat::Json => layer.json().with_target(true).boxed(),
        LogFormat::Compact => layer.compact().with_target(false).boxed(),
        LogFormat::Pretty => layer.with_target(true).boxed(),
    }
}

/// Create a file writer with optional daily rotation
fn create_file_writer(log_config: &config::LoggingConfig) -> (NonBlocking, WorkerGuard) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}

/// Create the application router with all routes and middleware
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .nest("/api/v1", api::routes())
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(trace_layer)
        .layer(cors)
}

/// Print help message
fn print_help() {
    println!(
        r#"OpenVox Agent Planner {}

USAGE:
    openvox-agent-planner [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information

ENVIRONMENT:
    OPENVOX_CONFIG          Path to configuration file
    OPENVOX_HOST            Listen address (default: 127.0.0.1)
    OPENVOX_PORT            Listen port (default: 5052)
    OPENVOX_COLLECTION      Default collection when a request names none
    OPENVOX_PE_VERSION      Fixed Puppet Enterprise version
    OPENVOX_PE_BUILD_FILE   File holding the Puppet Enterprise version
    PUPPETDB_URL            PuppetDB base URL (enables node endpoints)
    RUST_LOG                Log filter (overrides logging.level)

CONFIGURATION:
    The application looks for configuration files in the following order:
    1. Path specified by OPENVOX_CONFIG environment variable
    2. ./config.yaml
    3. ./config/config.yaml
    4. /etc/openvox-agent-planner/config.yaml
    5. ~/.config/openvox-agent-planner/config.yaml

ENDPOINTS:
    GET  /api/v1/health[/detailed|/live|/ready]
    POST /api/v1/resolve
    GET  /api/v1/nodes/{{certname}}/plan
    GET  /api/v1/nodes/{{certname}}/repo"#,
        env!("CARGO_PKG_VERSION")
    );
}
