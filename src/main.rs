use clap::{Parser, Subcommand};
use semun_api::{logging, metrics, server, AppState, Config};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "semun-api")]
#[command(about = "United Nations SemUN's API: Digital Library proxy and graph queries")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to run the server on
        #[arg(short, long)]
        port: Option<u16>,
        /// Prometheus exporter address (e.g. 127.0.0.1:9464)
        #[arg(long)]
        metrics_addr: Option<String>,
    },
    /// Search the Digital Library and print the results as JSON
    Search {
        query: String,
        /// Continue a previous search
        #[arg(long)]
        search_id: Option<String>,
    },
    /// Print the documents and relations for the given ids as JSON
    Graph {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Check the connection to the graph database
    CheckGraph,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables
    dotenv::dotenv().ok();

    let mut config = Config::load(cli.config.as_deref())?;
    let _guard = logging::init_logging(config.server.debug, &config.server.log_dir);

    let state = AppState::from_config(&config)?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            metrics_addr,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(addr) = metrics_addr.or(config.metrics.addr.clone()) {
                metrics::init_metrics(&addr);
            }

            info!(
                "Starting SemUN API (debug: {}, Digital Library: {}, graph: {})",
                config.server.debug,
                state.undl.base_url(),
                config.graph.uri
            );
            server::start_server(state, &config.server.host, config.server.port).await?;
        }
        Commands::Search { query, search_id } => {
            let params = semun_api::undl::SearchParams::new(query).with_search_id(search_id);
            let results = state.undl.query_page(&params).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Graph { ids } => {
            let graph = state.graph.documents_by_ids(&ids, true).await?;
            println!("{}", serde_json::to_string_pretty(&graph)?);
        }
        Commands::CheckGraph => match state.graph.check_connection().await {
            Ok(()) => {
                println!("✅ Connected to the graph database at {}", config.graph.uri);
            }
            Err(e) => {
                error!("Graph connectivity check failed: {}", e);
                return Err(e.into());
            }
        },
    }

    Ok(())
}
