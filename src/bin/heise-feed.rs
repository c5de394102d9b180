//! heise-feed CLI: bus listener and feed sync service.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use heise_feed::bus::{EventListener, GraphqlPublisher, ListenerConfig};
use heise_feed::config::Config;
use heise_feed::event::{Event, EventNames};
use heise_feed::feed::HttpFeed;
use heise_feed::graphql::GraphqlClient;
use heise_feed::store::GraphqlStore;
use heise_feed::sync::FeedSync;
use heise_feed::telemetry::{TelemetryConfig, TelemetryGuard, init_telemetry};
use tokio::sync::mpsc;
use tracing::error;

#[derive(Parser)]
#[command(name = "heise-feed", about = "Mirror a news feed into a GraphQL store on demand")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every event seen on the bus
    Listen {
        /// Event name pattern to subscribe to
        #[arg(long, default_value = "*")]
        pattern: String,
    },
    /// Run the feed sync service until Ctrl-C
    Serve,
    /// Run a single sync right now and exit
    Sync,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;
    let _guard = telemetry(&config)?;

    match cli.command {
        Command::Listen { pattern } => cmd_listen(&config, &pattern).await,
        Command::Serve => cmd_serve(&config).await,
        Command::Sync => cmd_sync(&config).await,
    }
}

fn telemetry(config: &Config) -> anyhow::Result<TelemetryGuard> {
    Ok(init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "heise-feed".to_string(),
        log_level: config.log_level.clone(),
    })?)
}

fn listener(config: &Config, pattern: &str) -> EventListener {
    let mut listener_config = ListenerConfig::new(&config.graphql_ws_url);
    listener_config.pattern = pattern.to_string();
    listener_config.token = config.graphql_token.clone();
    EventListener::new(listener_config)
}

fn feed_sync(config: &Config) -> anyhow::Result<FeedSync> {
    let client = GraphqlClient::new(
        &config.graphql_http_url,
        config.graphql_token.clone(),
        config.request_timeout,
    )?;
    let feed = HttpFeed::new(&config.feed_url, config.request_timeout)?;

    Ok(FeedSync::new(
        Arc::new(feed),
        Arc::new(GraphqlStore::new(client.clone(), &config.store_tag)),
        Arc::new(GraphqlPublisher::new(client)),
        EventNames::new(&config.namespace),
    )
    .with_timeout(config.request_timeout))
}

async fn cmd_listen(config: &Config, pattern: &str) -> anyhow::Result<()> {
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    let listener = listener(config, pattern).with_status(status_tx);
    let (tx, mut rx) = mpsc::channel::<Event>(64);

    let ctrl = listener.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        ctrl.shutdown();
    });

    let printer = tokio::spawn(async move {
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => println!("{}", event.display_line()),
                    None => break,
                },
                Some(status) = status_rx.recv() => {
                    println!("{}", Event::from(status).display_line());
                }
            }
        }
    });

    listener.run(tx).await?;
    printer.await?;
    Ok(())
}

async fn cmd_serve(config: &Config) -> anyhow::Result<()> {
    let sync = Arc::new(feed_sync(config)?);
    // Subscribe to everything; dispatch ignores names outside the namespace.
    let listener = listener(config, "*");
    let (tx, rx) = mpsc::channel(64);

    let ctrl = listener.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        ctrl.shutdown();
    });

    let server = tokio::spawn(Arc::clone(&sync).serve(rx));

    if let Err(e) = listener.run(tx).await {
        error!("listener stopped: {e}");
    }
    server.await?;
    Ok(())
}

async fn cmd_sync(config: &Config) -> anyhow::Result<()> {
    let sync = feed_sync(config)?;
    let report = sync.trigger().await?;

    println!(
        "Stored {} of {} new entries (feed had {}, watermark {})",
        report.stored.len(),
        report.selected,
        report.fetched,
        report.from
    );
    for failure in &report.failures {
        println!("  failed: {failure}");
    }
    Ok(())
}
