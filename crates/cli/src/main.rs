use clap::{Parser, Subcommand};
use strata_core::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
use commands::{
    handle_call_command, handle_config_command, handle_watch_command, load_config, CallOptions,
    ConfigCommands, WatchOptions,
};

#[derive(Parser)]
#[command(name = "strata-cli")]
#[command(about = "Strata CLI - drive a caching, subscription-aware provider against a node")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (defaults to $STRATA_CONFIG or config/strata.toml)
    #[arg(long, global = true, env = "STRATA_CONFIG")]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a request through the provider
    Call {
        /// JSON-RPC method name
        method: String,

        /// Params as a JSON array
        params: Option<String>,

        /// Websocket URL of the node (overrides the config file)
        #[arg(long)]
        url: Option<String>,

        /// Number of times to send the request
        #[arg(long, default_value = "1")]
        repeat: u32,
    },

    /// Subscribe and print notifications
    Watch {
        /// Websocket URL of the node (overrides the config file)
        #[arg(long)]
        url: Option<String>,

        /// Subscription type: newHeads or logs
        #[arg(long, default_value = "newHeads")]
        kind: String,

        /// Log filter as a JSON object (logs only)
        #[arg(long)]
        filter: Option<String>,

        /// Stop after this many notifications
        #[arg(long)]
        count: Option<usize>,
    },

    /// Configuration Management
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn init_logging(config: &LoggingConfig) {
    let filter = if let Ok(env_filter) = std::env::var("RUST_LOG") {
        if env_filter == "debug" {
            EnvFilter::new("warn,strata_core=debug,cli=debug")
        } else if env_filter == "trace" {
            EnvFilter::new("warn,strata_core=trace,cli=trace")
        } else {
            EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| EnvFilter::new("warn,strata_core=debug,cli=debug"))
        }
    } else {
        EnvFilter::new(format!("warn,strata_core={0},cli={0}", config.level))
    };

    let registry = tracing_subscriber::registry().with(filter);

    if config.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Call { method, params, url, repeat } => {
            let config = load_config(config_path, url)?;
            init_logging(&config.logging);
            handle_call_command(config, CallOptions { method, params, repeat }).await?;
        }

        Commands::Watch { url, kind, filter, count } => {
            let config = load_config(config_path, url)?;
            init_logging(&config.logging);
            handle_watch_command(config, WatchOptions { kind, filter, count }).await?;
        }

        Commands::Config(config_command) => {
            handle_config_command(config_command, config_path)?;
        }
    }

    Ok(())
}
