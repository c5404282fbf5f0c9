//! switchyard demo server.
//!
//! ```text
//!     Client Request
//!     ─────────▶ axum (timeout, trace)
//!                 → Dispatcher
//!                     → MappingTable (first matching action)
//!                     → before / action / after filters
//!                     → exception handlers, always filters
//!     ◀───────── Response
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;

use switchyard::config::{load_config, AppConfig, ConfigWatcher, DispatchConfig};
use switchyard::error::{MappingError, NOT_FOUND};
use switchyard::observability::{logging, metrics};
use switchyard::resource::{ResourceRegistry, ResourceType};
use switchyard::routing::{ErrorHandler, Filter, MappingTable, PathPrefixConstraint, Route};
use switchyard::{Application, Dispatcher, HttpServer};

#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "Demo server for the switchyard routing core", long_about = None)]
struct Cli {
    /// TOML configuration file. Watched for `[dispatch]` changes.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let file_config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    let mut config = file_config.clone();
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("switchyard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        synchronize = config.dispatch.synchronize,
        debug = config.dispatch.debug,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = Arc::new(demo_application(config.dispatch.clone())?);

    // Keep the watcher alive for the lifetime of the server
    let _watcher = match &cli.config {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path, file_config);
            let handle = watcher.run()?;
            let app = app.clone();
            tokio::spawn(async move {
                while let Some(dispatch) = updates.recv().await {
                    app.update_settings(dispatch);
                }
            });
            Some(handle)
        }
        None => None,
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(Dispatcher::new(app), &config.timeouts);
    server.run(listener, shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn demo_application(settings: DispatchConfig) -> Result<Application, MappingError> {
    let resources = ResourceRegistry::default()
        .with(ResourceType::new("blanket").action("list", |_| Ok("All the blankets".into())))
        .with(ResourceType::new("quilt").parent("blanket"));

    let app = Application::new(resources, settings);
    app.configure(configure)?;
    Ok(app)
}

fn configure(mapping: &mut MappingTable) -> Result<(), MappingError> {
    mapping.register(Route::get("/").to(|_| Ok("Hello".into())))?;
    mapping.register(Route::get("/param/{value}").to(|ctx| {
        Ok(format!("You said {}", ctx.param("value").unwrap_or_default()))
    }))?;
    mapping.register(Route::get("/onager").to(|ctx| {
        let target = ctx.paths().generate("show", &[json!("blankets"), json!(1)])?;
        Err(ctx.redirect(target))
    }))?;
    mapping.register(Route::get("/{resources}").to(|ctx| ctx.invoke("list")))?;
    mapping.register(Route::get("/{kind}/{id}").matching("id", r"\d+").named("show").to(|ctx| {
        Ok(format!(
            "{} #{}",
            ctx.param("kind").unwrap_or_default(),
            ctx.param("id").unwrap_or_default()
        ))
    }))?;

    mapping.before(
        Filter::new(|ctx, args| {
            tracing::debug!(path = %ctx.request().path(), tag = ?args.first(), "Admin request");
            Ok(())
        })
        .when(PathPrefixConstraint::new("/admin"))
        .with_args(vec![json!("audit")]),
    );
    mapping.handle(ErrorHandler::new(&NOT_FOUND, |ctx, _, _| {
        ctx.response_mut().set_status(axum::http::StatusCode::NOT_FOUND);
        ctx.response_mut().write("Nothing here");
        Ok(())
    }));
    Ok(())
}

/// Wait for Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
