//! ConnectLib command-line entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use connectlib::api::{create_router, AppState};
use connectlib::config::Config;
use connectlib::metrics;
use connectlib::routes::{Method, RouteRequest, RouteStore, RouteTable};
use connectlib::utils::{parse_key_value, shutdown_signal};
use connectlib::Engine;

/// Declarative HTTP route registry and request dispatcher.
#[derive(Parser, Debug)]
#[command(name = "connectlib")]
#[command(about = "Manage infos.yml routes and dispatch requests against them")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding infos.yml (overrides CONNECTLIB_RESOURCE_DIR).
    #[arg(long, global = true)]
    resource_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create infos.yml if missing and merge the given routes into it.
    Init {
        /// Route to declare, as name=/path/template.
        #[arg(short, long = "route", value_parser = parse_key_value)]
        routes: Vec<(String, String)>,
    },

    /// List routes declared in infos.yml.
    Routes,

    /// Resolve a route into a concrete path.
    Resolve {
        /// Route key.
        route: String,

        /// Version prefix (v1..v5 or any tag).
        #[arg(long)]
        api_version: Option<String>,

        /// Path placeholder value, as name=value.
        #[arg(long = "path", value_parser = parse_key_value)]
        path_params: Vec<(String, String)>,

        /// Query placeholder value, as name=value.
        #[arg(long = "query", value_parser = parse_key_value)]
        query_params: Vec<(String, String)>,
    },

    /// Resolve and dispatch a route, printing the response.
    Call {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE).
        method: String,

        /// Route key.
        route: String,

        /// Version prefix (v1..v5 or any tag).
        #[arg(long)]
        api_version: Option<String>,

        /// Path placeholder value, as name=value.
        #[arg(long = "path", value_parser = parse_key_value)]
        path_params: Vec<(String, String)>,

        /// Query placeholder value, as name=value.
        #[arg(long = "query", value_parser = parse_key_value)]
        query_params: Vec<(String, String)>,

        /// JSON object body for POST/PUT/PATCH.
        #[arg(long)]
        body: Option<String>,

        /// Base URL overriding urlPath.
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Serve the status dashboard.
    Serve {
        /// HTTP server port (defaults to CONNECTLIB_DASHBOARD_PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load()?;
    if let Some(dir) = &args.resource_dir {
        config = Config {
            resource_dir: Some(dir.clone()),
            ..config
        };
    }

    // Initialize logging
    let logs_enabled = RouteStore::new(config.resource_dir())
        .logging_enabled()
        .unwrap_or(true);
    let filter = if args.verbose || config.verbose {
        EnvFilter::new("connectlib=debug,info")
    } else if !logs_enabled {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.rust_log))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Handle subcommands
    match args.command {
        Command::Init { routes } => cmd_init(config, routes),
        Command::Routes => cmd_routes(config),
        Command::Resolve {
            route,
            api_version,
            path_params,
            query_params,
        } => {
            let request = build_request(Method::Get, &route, api_version, path_params, query_params);
            cmd_resolve(config, request)
        }
        Command::Call {
            method,
            route,
            api_version,
            path_params,
            query_params,
            body,
            base_url,
        } => {
            let method: Method = method
                .parse()
                .map_err(|_| anyhow::anyhow!("unsupported HTTP method `{}`", method))?;
            let mut request = build_request(method, &route, api_version, path_params, query_params);
            if let Some(raw) = body {
                request = request.body(parse_body(&raw)?);
            }
            cmd_call(config, request, base_url).await
        }
        Command::Serve { port } => cmd_serve(config, port).await,
        Command::CheckConfig => cmd_check_config(config),
    }
}

fn build_request(
    method: Method,
    route: &str,
    api_version: Option<String>,
    path_params: Vec<(String, String)>,
    query_params: Vec<(String, String)>,
) -> RouteRequest {
    let mut request = RouteRequest::new(method, route);
    if let Some(version) = api_version {
        request = request.version(version);
    }
    request.path_params.extend(path_params);
    request.query_params.extend(query_params);
    request
}

fn parse_body(raw: &str) -> anyhow::Result<Map<String, Value>> {
    match serde_json::from_str(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow::anyhow!("--body must be a JSON object")),
    }
}

/// Build an engine and load the route file.
fn open_engine(config: Config, declared: &RouteTable) -> anyhow::Result<Engine> {
    let engine = Engine::new(config)?;
    engine.init(declared);
    Ok(engine)
}

/// Create the route file and merge declared routes.
fn cmd_init(config: Config, routes: Vec<(String, String)>) -> anyhow::Result<()> {
    let declared: RouteTable = routes.into_iter().collect();
    let engine = open_engine(config, &declared)?;

    println!("Route file: {}", engine.store().file().display());
    println!("Routes:     {}", engine.routes().len());
    if engine.effective_base_url().is_none() {
        println!("WARNING: urlPath is empty; set it before dispatching requests");
    }

    Ok(())
}

/// Print declared routes.
fn cmd_routes(config: Config) -> anyhow::Result<()> {
    let engine = open_engine(config, &RouteTable::new())?;
    let routes = engine.routes();

    if routes.is_empty() {
        println!("No routes declared in {}", engine.store().file().display());
        return Ok(());
    }

    let width = routes.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, template) in routes.iter() {
        println!("{:width$}  {}", name, template, width = width);
    }

    Ok(())
}

/// Print the resolved path of a route.
fn cmd_resolve(config: Config, request: RouteRequest) -> anyhow::Result<()> {
    let engine = open_engine(config, &RouteTable::new())?;
    let resolved = engine.resolve(&request)?;
    println!("{}", resolved.path());
    Ok(())
}

/// Dispatch a route and print the envelope.
async fn cmd_call(
    config: Config,
    request: RouteRequest,
    base_url: Option<String>,
) -> anyhow::Result<()> {
    let engine = open_engine(config, &RouteTable::new())?;
    let resolved = engine.resolve(&request)?;

    let handle = match base_url {
        Some(base) => engine.dispatch_with_base(resolved, &base)?,
        None => engine.dispatch(resolved)?,
    };
    let id = handle.id();
    let envelope = handle.await?;

    println!("Request #{} -> HTTP {}", id, envelope.status_code());
    if envelope.is_parsed() {
        println!("{}", envelope.display());
    }

    if !envelope.is_success() {
        return Err(anyhow::anyhow!("request failed with HTTP {}", envelope.status_code()));
    }

    Ok(())
}

/// Serve the dashboard until Ctrl-C or SIGTERM.
async fn cmd_serve(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(config.dashboard_port);
    let engine = Arc::new(open_engine(config, &RouteTable::new())?);

    let mut state = AppState::new(Arc::clone(&engine));
    match metrics::install_prometheus() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => warn!(error = %e, "Prometheus recorder not installed"),
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Dashboard listening on {}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("Dashboard server error: {}", e);
            e
        })?;

    info!(requests = engine.ledger().len(), "Dashboard stopped");
    Ok(())
}

/// Check configuration validity.
fn cmd_check_config(config: Config) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("CONNECTLIB - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    let store = RouteStore::new(config.resource_dir());
    print!("Reading route file... ");
    if store.exists() {
        println!("OK");
    } else {
        println!("MISSING");
        println!("  Run `connectlib init` to create {}", store.file().display());
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Resource Type:   {}", config.resource_type);
    println!("  Route File:      {}", store.file().display());
    println!(
        "  Base URL:        {}",
        config
            .base_url_override()
            .map(str::to_string)
            .or_else(|| store.base_url())
            .unwrap_or_else(|| "(not set)".to_string())
    );
    println!("  Routes:          {}", store.routes().map(|r| r.len()).unwrap_or(0));
    println!("  HTTP Timeout:    {}ms", config.http_timeout_ms);
    println!("  Connect Timeout: {}ms", config.connect_timeout_ms);
    println!("  User Agent:      {}", config.user_agent);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}
