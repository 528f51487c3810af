use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::group::DisplayGroup;
use crate::media::ShowRequest;
use crate::queue::QueueItem;
use crate::scheduler::{OverlaySnapshot, Scheduler, SubmitOutcome};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Commands handled by the scheduler actor
#[derive(Debug, Clone)]
pub enum SchedulerCommand {
	Submit(ShowRequest),
	UpdateGroups(Vec<DisplayGroup>),
}

#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
	/// Groups known before the first update arrives
	pub initial_groups: Vec<DisplayGroup>,
	/// Fixed seed for random placement, mostly for reproducible runs
	pub rng_seed: Option<u64>,
}

impl ServiceConfig {
	pub fn new(initial_groups: Vec<DisplayGroup>) -> Self {
		Self { initial_groups, rng_seed: None }
	}

	pub fn with_seed(mut self, seed: u64) -> Self {
		self.rng_seed = Some(seed);
		self
	}
}

/// Runs a [`Scheduler`] on its own task.
///
/// Requests go in over a channel; every state change is published as an
/// [`OverlaySnapshot`] on a watch channel for the rendering side.
pub struct SchedulerService {
	command_tx: mpsc::UnboundedSender<SchedulerCommand>,
	state_rx: watch::Receiver<OverlaySnapshot>,
	task_handle: Option<JoinHandle<()>>,
	cancel_token: CancellationToken,
}

impl SchedulerService {
	/// Spawns the actor on the current tokio runtime
	pub fn spawn(config: ServiceConfig) -> Self {
		let clock = SystemClock::new();
		let rng = config.rng_seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
		let mut scheduler = Scheduler::with_rng(clock, rng);
		if !config.initial_groups.is_empty() {
			scheduler.update_groups(config.initial_groups);
		}

		let cancel_token = CancellationToken::new();
		let (command_tx, command_rx) = mpsc::unbounded_channel();
		let (state_tx, state_rx) = watch::channel(scheduler.snapshot_all());

		let task_handle = tokio::spawn(run(scheduler, command_rx, state_tx, cancel_token.clone()));

		Self {
			command_tx,
			state_rx,
			task_handle: Some(task_handle),
			cancel_token,
		}
	}

	fn send_command(&self, command: SchedulerCommand) -> Result<()> {
		self.command_tx.send(command).map_err(|_| Error::ServiceClosed)
	}

	/// Fire-and-forget; drops are reported in the logs, not here
	pub fn submit(&self, request: ShowRequest) -> Result<()> {
		self.send_command(SchedulerCommand::Submit(request))
	}

	pub fn update_groups(&self, groups: Vec<DisplayGroup>) -> Result<()> {
		self.send_command(SchedulerCommand::UpdateGroups(groups))
	}

	pub fn subscribe(&self) -> watch::Receiver<OverlaySnapshot> {
		self.state_rx.clone()
	}

	pub fn current_snapshot(&self) -> OverlaySnapshot {
		self.state_rx.borrow().clone()
	}

	pub fn snapshot(&self, group_id: &str) -> Vec<QueueItem> {
		self.state_rx.borrow().items(group_id).to_vec()
	}

	/// Stops the actor, cancelling every outstanding timer
	pub async fn shutdown(mut self) {
		info!("Shutting down display scheduler");
		self.cancel_token.cancel();

		if let Some(handle) = self.task_handle.take() {
			if let Err(e) = handle.await {
				error!("Display scheduler task failed: {}", e);
			}
		}
	}
}

impl Drop for SchedulerService {
	fn drop(&mut self) {
		self.cancel_token.cancel();
	}
}

async fn run(mut scheduler: Scheduler<SystemClock>, mut command_rx: mpsc::UnboundedReceiver<SchedulerCommand>, state_tx: watch::Sender<OverlaySnapshot>, cancel_token: CancellationToken) {
	info!("Display scheduler started");
	let mut published = scheduler.version();

	loop {
		let deadline = scheduler.next_deadline().map(|at| scheduler.clock().instant_at(at));

		tokio::select! {
			_ = cancel_token.cancelled() => {
				break;
			}
			command = command_rx.recv() => {
				let Some(command) = command else {
					debug!("Command channel closed");
					break;
				};
				handle_command(&mut scheduler, command);
			}
			_ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
				scheduler.advance();
			}
		}

		if scheduler.version() != published {
			published = scheduler.version();
			state_tx.send_replace(scheduler.snapshot_all());
		}
	}

	scheduler.dispose();
	state_tx.send_replace(scheduler.snapshot_all());
	info!("Display scheduler stopped");
}

fn handle_command<C: Clock>(scheduler: &mut Scheduler<C>, command: SchedulerCommand) {
	match command {
		SchedulerCommand::Submit(request) => {
			if let SubmitOutcome::Admitted(id) = scheduler.submit(request) {
				debug!(item_id = %id, "Show request admitted immediately");
			}
		}
		SchedulerCommand::UpdateGroups(groups) => scheduler.update_groups(groups),
	}
}
