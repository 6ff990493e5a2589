use anyhow::Context;
use clap::Parser;
use occupancy_dashboard::utils::{logger, validation::Validate};
use occupancy_dashboard::{
    CliConfig, Command, CountSource, DashboardConfig, DashboardPoller, FetchOutcome,
    HttpCountsClient, TerminalDisplay, Visibility,
};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let resolved = match cli.resolve() {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if resolved.json_logs {
        logger::init_json_logger(resolved.verbose);
    } else {
        logger::init_cli_logger(resolved.verbose);
    }

    tracing::debug!("Resolved config: {:?}", resolved.dashboard);

    if let Err(e) = resolved.dashboard.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    let client = HttpCountsClient::from_config(&resolved.dashboard)?;

    match cli.command() {
        Command::Watch => watch(client, &resolved.dashboard).await,
        Command::Once => once(client, &resolved.dashboard).await,
        Command::Reset => reset(&client).await,
        Command::Status => status(&client).await,
    }
}

async fn watch(client: HttpCountsClient, config: &DashboardConfig) -> anyhow::Result<()> {
    let mut poller = DashboardPoller::new(client, TerminalDisplay::stdout(), config);
    poller.start(visibility_events())?;

    tracing::info!(
        "Dashboard initialized. Fetching from: {} every {:?}",
        poller.source().endpoint(),
        poller.interval()
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    poller.stop().await;

    let stats = poller.stats();
    tracing::info!(
        "Stopped after {} fetches ({} ok, {} timed out, {} failed, {} skipped)",
        stats.attempts,
        stats.successes,
        stats.timeouts,
        stats.failures,
        stats.skipped
    );
    Ok(())
}

async fn once(client: HttpCountsClient, config: &DashboardConfig) -> anyhow::Result<()> {
    let endpoint = client.endpoint().clone();
    let poller = DashboardPoller::new(client, TerminalDisplay::stdout(), config);

    match poller.refresh().await {
        FetchOutcome::Updated(_) => Ok(()),
        FetchOutcome::TimedOut => {
            anyhow::bail!("{} did not answer within {:?}", endpoint, config.request_timeout())
        }
        FetchOutcome::Failed(e) => {
            eprintln!("💡 {}", e.recovery_suggestion());
            Err(e).with_context(|| format!("failed to fetch counts from {}", endpoint))
        }
    }
}

async fn reset(client: &HttpCountsClient) -> anyhow::Result<()> {
    let snapshot = client.reset().await.context("failed to reset counters")?;
    println!(
        "✅ Counters reset - IN: {}, OUT: {}, PRESENT: {}",
        snapshot.count_in.unwrap_or(0),
        snapshot.count_out.unwrap_or(0),
        snapshot.present().unwrap_or(0)
    );
    Ok(())
}

async fn status(client: &HttpCountsClient) -> anyhow::Result<()> {
    let status = client.status().await.context("failed to query backend status")?;
    println!("📡 Backend: {}", status.status);
    println!(
        "🎥 Video processing: {}",
        if status.video_active { "active" } else { "inactive" }
    );

    // Also report whether the counts endpoint itself answers.
    match client.fetch_counts().await {
        FetchOutcome::Updated(snapshot) => println!(
            "📊 Counts endpoint: ok (IN: {}, OUT: {})",
            snapshot.count_in.unwrap_or(0),
            snapshot.count_out.unwrap_or(0)
        ),
        FetchOutcome::TimedOut => println!("📊 Counts endpoint: timed out"),
        FetchOutcome::Failed(e) => println!("📊 Counts endpoint: {}", e),
    }
    Ok(())
}

/// SIGUSR1 is treated as "the dashboard became visible" and forces a refresh.
#[cfg(unix)]
fn visibility_events() -> Option<mpsc::Receiver<Visibility>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut shown = match signal(SignalKind::user_defined1()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!("Visibility refresh via SIGUSR1 unavailable: {}", e);
            return None;
        }
    };

    let (tx, rx) = mpsc::channel(4);
    tokio::spawn(async move {
        while shown.recv().await.is_some() {
            if tx.send(Visibility::Visible).await.is_err() {
                break;
            }
        }
    });
    Some(rx)
}

#[cfg(not(unix))]
fn visibility_events() -> Option<mpsc::Receiver<Visibility>> {
    None
}
