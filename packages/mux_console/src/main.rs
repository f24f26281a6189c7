use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::info;

use mux_console::server::{self, ServerState, SharedValue};
use mux_console::{
    CONSOLE_VIEW, CliOverrides, Console, FileConfig, LOGS_VIEW, Outcome, load_config,
};
use view_mux::{Capacity, Multiplexer, Stream};

#[derive(Parser)]
#[command(name = "muxconsole")]
#[command(about = "Switch one terminal between an operator console and live HTTP logs")]
struct Args {
    /// Directory containing mux.toml
    #[arg(short, long, default_value = ".")]
    config_dir: PathBuf,

    /// Host to bind the HTTP server to
    #[arg(short = 'b', long)]
    host: Option<String>,

    /// Port for the HTTP server
    #[arg(short, long)]
    port: Option<u16>,

    /// View shown at startup (logs or cmd)
    #[arg(long)]
    initial_view: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            host: self.host.clone(),
            port: self.port,
            initial_view: self.initial_view.clone(),
            debug: self.debug,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    let result = runtime.block_on(run(args));
    // The stdin reader thread never finishes on its own.
    runtime.shutdown_background();
    result
}

async fn run(args: Args) -> Result<()> {
    let config = FileConfig::resolve(&load_config(&args.config_dir), &args.overrides())
        .context("Failed to load configuration")?;

    let logs = Stream::new(LOGS_VIEW, Capacity::from_signed(config.streams.logs_capacity));
    let console_stream = Stream::new(
        CONSOLE_VIEW,
        Capacity::from_signed(config.streams.console_capacity),
    );

    // Everything we log becomes content of the logs view.
    mux_console::logging::init_logging(config.log.level, &logs)?;

    let initial = if config.initial_view == LOGS_VIEW {
        logs.clone()
    } else {
        console_stream.clone()
    };
    let mux = Multiplexer::new(std::io::stdout(), initial).await;
    mux.register([logs.clone(), console_stream.clone()]).await;

    let value = SharedValue::default();
    let app = server::router(ServerState {
        value: value.clone(),
    });

    let host = config.server.host.as_str();
    let port = config.server.port;
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;
    info!("Listening on http://{}", listener.local_addr()?);

    let console = Console::new(mux.clone(), console_stream, value);
    let serve = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .into_future();

    tokio::select! {
        result = serve => result.context("Server error")?,
        result = operate(&console) => result?,
        _ = tokio::signal::ctrl_c() => info!("Received shutdown signal"),
    }

    info!("Shutting down");
    Ok(())
}

/// Drive the console from stdin. Resolves only on `exit` or an input error;
/// once stdin closes the server keeps running until Ctrl+C.
async fn operate(console: &Console) -> Result<()> {
    match console.run(BufReader::new(tokio::io::stdin())).await? {
        Outcome::Exit => Ok(()),
        Outcome::InputClosed => {
            info!("Console input closed, still serving until Ctrl+C");
            std::future::pending().await
        }
    }
}
