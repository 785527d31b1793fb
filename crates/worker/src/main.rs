use anyhow::Context;
use clap::Parser;
use lasagna_core::config::Settings;
use lasagna_core::domain::comic::ScheduledTick;
use lasagna_core::pipeline::Pipeline;
use lasagna_core::time::schedule::Scheduler;
use tokio::sync::{mpsc, oneshot};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod keepalive;

#[derive(Debug, Parser)]
#[command(name = "lasagna_worker")]
struct Args {
    /// Run a single tick right away and exit (no timer, no listener).
    #[arg(long)]
    once: bool,

    /// Strip date (YYYY-MM-DD) for `--once` instead of a random one.
    #[arg(long, requires = "once")]
    date: Option<String>,

    /// Fetch the strip only; skip upload and webhooks.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let pipeline = Pipeline::from_settings(&settings)
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            e
        })?
        .with_dry_run(args.dry_run);

    if args.once {
        return run_once(&pipeline, args.date.as_deref()).await;
    }

    let listener = keepalive::bind(settings.port).await?;
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(keepalive::serve(listener, async move {
        let _ = stop_rx.await;
    }));

    let scheduler = Scheduler::from_settings(&settings, chrono::Local::now().time());
    let (tick_tx, mut tick_rx) = mpsc::channel::<ScheduledTick>(8);
    let timer = tokio::spawn(scheduler.run(tick_tx));

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            tick = tick_rx.recv() => {
                let Some(tick) = tick else { break };
                // Ticks never wait on each other; a slow run may overlap the next one.
                let pipeline = pipeline.clone();
                tokio::spawn(async move {
                    let today = chrono::Local::now().date_naive();
                    let outcome = pipeline.run_tick(tick, today).await;
                    tracing::debug!(?outcome, "tick finished");
                });
            }
            _ = &mut shutdown => {
                tracing::info!("shutdown requested");
                break;
            }
        }
    }

    timer.abort();
    let _ = stop_tx.send(());
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "keepalive listener failed");
        }
        Err(e) => tracing::warn!(error = %e, "keepalive task did not finish cleanly"),
    }

    Ok(())
}

async fn run_once(pipeline: &Pipeline, date_arg: Option<&str>) -> anyhow::Result<()> {
    let today = chrono::Local::now().date_naive();
    let outcome = match date_arg {
        Some(s) => {
            let date = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("--date must be YYYY-MM-DD (got {s})"))?;
            let date = pipeline.dates().validate(date, today)?;
            pipeline.run_for_date(date).await
        }
        None => pipeline.run_tick(ScheduledTick::now(), today).await,
    };

    anyhow::ensure!(
        outcome.is_success(),
        "single run for {} did not complete: {outcome:?}",
        outcome.date()
    );
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
