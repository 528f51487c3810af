mod config;

use clap::Parser;
use config::Config;
use display_queue::{InboundMessage, OverlaySnapshot, SchedulerService, ServiceConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::fmt::format::JsonFields;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let config = Config::parse();
	init_tracing(&config)?;

	tracing::info!("Starting media overlay scheduler");

	let groups = config.load_groups().await?;
	tracing::info!(groups = groups.len(), "Loaded initial display groups");

	let mut service_config = ServiceConfig::new(groups);
	if let Some(seed) = config.placement_seed {
		service_config = service_config.with_seed(seed);
	}
	let service = SchedulerService::spawn(service_config);
	let publisher = tokio::spawn(publish_snapshots(service.subscribe()));

	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	loop {
		tokio::select! {
			line = lines.next_line() => {
				match line? {
					Some(line) => handle_line(&service, &line)?,
					None => {
						tracing::info!("Input closed");
						break;
					}
				}
			}
			_ = tokio::signal::ctrl_c() => {
				tracing::info!("Received shutdown signal");
				break;
			}
		}
	}

	service.shutdown().await;
	publisher.await??;

	tracing::info!("Media overlay scheduler stopped");
	Ok(())
}

/// Routes one inbound JSON line. Bad or unknown messages are logged and skipped.
fn handle_line(service: &SchedulerService, line: &str) -> anyhow::Result<()> {
	let line = line.trim();
	if line.is_empty() {
		return Ok(());
	}

	match InboundMessage::parse(line) {
		Ok(InboundMessage::Show(request)) => service.submit(request)?,
		Ok(InboundMessage::GroupsUpdated(groups)) => service.update_groups(groups)?,
		Err(e) if e.is_recoverable() => tracing::warn!("Ignoring message: {}", e),
		Err(e) => return Err(e.into()),
	}
	Ok(())
}

/// Writes every published snapshot to stdout as one JSON line
async fn publish_snapshots(mut state_rx: watch::Receiver<OverlaySnapshot>) -> anyhow::Result<()> {
	let mut stdout = tokio::io::stdout();

	while state_rx.changed().await.is_ok() {
		let snapshot = state_rx.borrow_and_update().clone();
		let mut line = serde_json::to_vec(&snapshot)?;
		line.push(b'\n');
		stdout.write_all(&line).await?;
		stdout.flush().await?;
	}
	Ok(())
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
	let filter = EnvFilter::try_new(config.log_filter())?;

	let layer = if config.log_json {
		Box::new(
			tracing_subscriber::fmt::layer()
				.with_writer(std::io::stderr)
				.fmt_fields(JsonFields::default())
				.event_format(tracing_subscriber::fmt::format().json().flatten_event(true).with_span_list(false))
				.with_filter(filter),
		) as Box<dyn Layer<_> + Send + Sync>
	} else {
		Box::new(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_filter(filter))
	};

	tracing_subscriber::registry().with(layer).try_init()?;
	Ok(())
}
