use crate::caption::interpolate;
use crate::clock::{Clock, SystemClock};
use crate::group::{DisplayGroup, Placement};
use crate::media::ShowRequest;
use crate::placement::random_position;
use crate::queue::{GroupQueue, PendingItem, QueueItem};
use crate::types::{GroupId, ItemId, ItemIdGen, TimeMs};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Why a show request never reached a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
	MissingGroupId,
	UnknownGroup,
	GroupDisabled,
	Disposed,
}

/// What happened to a submitted show request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
	/// Admitted straight away
	Admitted(ItemId),
	/// Waiting in the group's pending list
	Queued,
	Dropped(DropReason),
}

/// Active items of every known group, as seen by the renderer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlaySnapshot {
	/// Bumped on every state change
	pub version: u64,
	pub groups: BTreeMap<GroupId, Vec<QueueItem>>,
}

impl OverlaySnapshot {
	pub fn items(&self, group_id: &str) -> &[QueueItem] {
		self.groups.get(group_id).map_or(&[], Vec::as_slice)
	}
}

/// Entry point for show requests and group updates.
///
/// Runs on a single logical thread: callers feed it requests, group lists and
/// the passage of time (`advance`), and read active items back with `snapshot`.
pub struct Scheduler<C: Clock = SystemClock> {
	clock: C,
	groups: BTreeMap<GroupId, GroupQueue>,
	ids: ItemIdGen,
	rng: StdRng,
	version: u64,
	disposed: bool,
}

impl Scheduler<SystemClock> {
	pub fn with_system_clock() -> Self {
		Self::new(SystemClock::new())
	}
}

impl<C: Clock> Scheduler<C> {
	pub fn new(clock: C) -> Self {
		Self::with_rng(clock, StdRng::from_entropy())
	}

	/// Uses a caller-provided generator for random placement
	pub fn with_rng(clock: C, rng: StdRng) -> Self {
		Self {
			clock,
			groups: BTreeMap::new(),
			ids: ItemIdGen::default(),
			rng,
			version: 0,
			disposed: false,
		}
	}

	pub const fn clock(&self) -> &C {
		&self.clock
	}

	pub const fn version(&self) -> u64 {
		self.version
	}

	pub const fn is_disposed(&self) -> bool {
		self.disposed
	}

	fn bump(&mut self) {
		self.version = self.version.wrapping_add(1);
	}

	/// Accepts a show request. Requests for missing or disabled groups are
	/// dropped with a warning; nothing is ever returned as an error.
	pub fn submit(&mut self, request: ShowRequest) -> SubmitOutcome {
		if self.disposed {
			warn!(media_id = %request.media_event.id, "Scheduler disposed, dropping show request");
			return SubmitOutcome::Dropped(DropReason::Disposed);
		}
		self.advance();

		let ShowRequest { mut media_event, context } = request;
		let Some(group_id) = media_event.group_id.clone() else {
			warn!(media_id = %media_event.id, "Show request without a group, dropping");
			return SubmitOutcome::Dropped(DropReason::MissingGroupId);
		};

		let now = self.clock.now();
		let Some(queue) = self.groups.get_mut(&group_id).filter(|queue| queue.config().is_some()) else {
			warn!(%group_id, media_id = %media_event.id, "Unknown display group, dropping show request");
			return SubmitOutcome::Dropped(DropReason::UnknownGroup);
		};
		if !queue.accepts_requests() {
			warn!(%group_id, media_id = %media_event.id, "Display group disabled, dropping show request");
			return SubmitOutcome::Dropped(DropReason::GroupDisabled);
		}

		media_event.caption = interpolate(&media_event.caption, &context);
		let random_pos = match queue.config() {
			Some(group) if group.placement == Placement::Random => Some(random_position(group, &mut self.rng)),
			_ => None,
		};

		debug!(%group_id, media_id = %media_event.id, "Enqueueing show request");
		let outcome = match queue.enqueue(PendingItem { media_event, random_pos, enqueued_at: now }, now, &mut self.ids) {
			Some(id) => SubmitOutcome::Admitted(id),
			None => SubmitOutcome::Queued,
		};
		self.bump();
		outcome
	}

	/// Replaces the known group configurations.
	///
	/// Groups missing from `groups` lose their pending items while their active
	/// items finish on the timings they were admitted with. Every group that
	/// can take requests is drained afterwards.
	pub fn update_groups(&mut self, groups: Vec<DisplayGroup>) {
		if self.disposed {
			return;
		}
		self.advance();

		let mut incoming: BTreeMap<GroupId, DisplayGroup> = BTreeMap::new();
		for group in groups {
			if let Some(previous) = incoming.insert(group.id.clone(), group) {
				warn!(group_id = %previous.id, "Duplicate display group in update, keeping the last one");
			}
		}

		let removed: Vec<GroupId> = self.groups.keys().filter(|id| !incoming.contains_key(*id)).cloned().collect();
		for id in &removed {
			if let Some(queue) = self.groups.get_mut(id) {
				if queue.config().is_some() {
					info!(group_id = %id, "Display group removed");
				}
				queue.configure(None);
			}
		}

		for (id, group) in incoming {
			match self.groups.get_mut(&id) {
				Some(queue) => queue.configure(Some(group)),
				None => {
					self.groups.insert(id, GroupQueue::new(group));
				}
			}
		}

		let now = self.clock.now();
		for queue in self.groups.values_mut() {
			queue.drain(now, &mut self.ids);
		}
		self.prune();
		self.bump();
		info!(groups = self.groups.len(), "Display groups updated");
	}

	/// Forgets queues for removed groups once they have nothing left to run
	fn prune(&mut self) {
		self.groups.retain(|_, queue| queue.config().is_some() || !queue.is_idle());
	}

	/// Active items of one group, oldest admission first
	pub fn snapshot(&self, group_id: &str) -> Vec<QueueItem> {
		self.groups.get(group_id).map(|queue| queue.active().to_vec()).unwrap_or_default()
	}

	pub fn snapshot_all(&self) -> OverlaySnapshot {
		OverlaySnapshot {
			version: self.version,
			groups: self.groups.iter().map(|(id, queue)| (id.clone(), queue.active().to_vec())).collect(),
		}
	}

	pub fn pending_len(&self, group_id: &str) -> usize {
		self.groups.get(group_id).map_or(0, GroupQueue::pending_len)
	}

	/// Earliest instant at which some timer fires
	pub fn next_deadline(&self) -> Option<TimeMs> {
		self.groups.values().filter_map(GroupQueue::next_due).min().map(|(due, _)| due)
	}

	/// Fires every timer due at the clock's current time, in deadline order
	/// across all groups. Groups sharing a deadline fire in group id order.
	/// Returns how many fired.
	pub fn advance(&mut self) -> usize {
		if self.disposed {
			return 0;
		}

		let now = self.clock.now();
		let mut fired = 0;
		loop {
			let next = self
				.groups
				.iter()
				.filter_map(|(id, queue)| queue.next_due().map(|(due, _)| (due, id)))
				.filter(|(due, _)| *due <= now)
				.min()
				.map(|(_, id)| id.clone());
			let Some(group_id) = next else {
				break;
			};
			let Some(queue) = self.groups.get_mut(&group_id) else {
				break;
			};
			let Some(timer) = queue.pop_due(now) else {
				break;
			};
			queue.fire(timer, &mut self.ids);
			fired += 1;
		}

		if fired > 0 {
			self.prune();
			self.bump();
		}
		fired
	}

	/// Cancels every outstanding timer and drops all queued and active items.
	/// Nothing changes after this call.
	pub fn dispose(&mut self) {
		if self.disposed {
			return;
		}
		let cancelled: usize = self.groups.values_mut().map(GroupQueue::dispose).sum();
		self.groups.clear();
		self.disposed = true;
		self.bump();
		info!(cancelled, "Scheduler disposed");
	}

	/// Checks every group's queue/timer invariants
	pub fn check_invariants(&self) -> Result<(), String> {
		for queue in self.groups.values() {
			queue.check_invariants().map_err(|e| format!("group {}: {}", queue.group_id(), e))?;
		}
		Ok(())
	}
}

impl<C: Clock> Drop for Scheduler<C> {
	fn drop(&mut self) {
		self.dispose();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::clock::ManualClock;
	use crate::media::MediaEvent;
	use crate::types::Phase;
	use std::collections::HashSet;

	fn scheduler(groups: Vec<DisplayGroup>) -> (Scheduler<ManualClock>, ManualClock) {
		let clock = ManualClock::new(0);
		let mut scheduler = Scheduler::with_rng(clock.clone(), StdRng::seed_from_u64(0));
		scheduler.update_groups(groups);
		(scheduler, clock)
	}

	fn show(media_id: &str, group_id: &str) -> ShowRequest {
		ShowRequest::new(MediaEvent::new(media_id, group_id))
	}

	#[test]
	fn test_unknown_and_disabled_groups_drop() {
		let (mut scheduler, _) = scheduler(vec![DisplayGroup::new("off").with_enabled(false)]);

		assert_eq!(scheduler.submit(show("m", "nope")), SubmitOutcome::Dropped(DropReason::UnknownGroup));
		assert_eq!(scheduler.submit(show("m", "off")), SubmitOutcome::Dropped(DropReason::GroupDisabled));

		let mut orphan = show("m", "off");
		orphan.media_event.group_id = None;
		assert_eq!(scheduler.submit(orphan), SubmitOutcome::Dropped(DropReason::MissingGroupId));
		assert!(scheduler.snapshot("off").is_empty());
	}

	#[test]
	fn test_caption_is_interpolated_on_submit() {
		let (mut scheduler, _) = scheduler(vec![DisplayGroup::new("g")]);
		let request = ShowRequest::new(MediaEvent::new("m", "g").with_caption("Hi ${user} ${x}")).with_context("user", "Bob");

		scheduler.submit(request);

		assert_eq!(scheduler.snapshot("g")[0].media_event.caption, "Hi Bob ${x}");
	}

	#[test]
	fn test_random_placement_gets_position() {
		let (mut scheduler, _) = scheduler(vec![DisplayGroup::new("r").with_placement(Placement::Random), DisplayGroup::new("f")]);

		scheduler.submit(show("a", "r"));
		scheduler.submit(show("b", "f"));

		assert!(scheduler.snapshot("r")[0].random_pos.is_some());
		assert!(scheduler.snapshot("f")[0].random_pos.is_none());
	}

	#[test]
	fn test_reconfigured_group_drains_pending() {
		let group = DisplayGroup::new("g").with_timings(0, 0).with_default_duration(1.0);
		let (mut scheduler, clock) = scheduler(vec![group.clone()]);

		scheduler.submit(show("a", "g"));
		assert_eq!(scheduler.submit(show("b", "g")), SubmitOutcome::Queued);

		scheduler.update_groups(vec![group.clone().with_mode("stack").with_max_items(2)]);
		assert_eq!(scheduler.snapshot("g").len(), 2);

		clock.set(5000);
		scheduler.advance();
		assert!(scheduler.snapshot("g").is_empty());
		scheduler.check_invariants().unwrap();
	}

	#[test]
	fn test_removed_group_finishes_active_items() {
		let group = DisplayGroup::new("g").with_timings(100, 100).with_default_duration(1.0);
		let (mut scheduler, clock) = scheduler(vec![group, DisplayGroup::new("other")]);

		scheduler.submit(show("a", "g"));
		scheduler.submit(show("b", "g"));
		scheduler.update_groups(vec![DisplayGroup::new("other")]);

		assert_eq!(scheduler.pending_len("g"), 0);
		assert_eq!(scheduler.snapshot("g").len(), 1);
		assert_eq!(scheduler.submit(show("c", "g")), SubmitOutcome::Dropped(DropReason::UnknownGroup));

		clock.set(1100);
		scheduler.advance();
		assert_eq!(scheduler.snapshot("g")[0].phase, Phase::Exiting);

		clock.set(1200);
		scheduler.advance();
		assert!(scheduler.snapshot("g").is_empty());
		assert!(!scheduler.snapshot_all().groups.contains_key("g"));
	}

	#[test]
	fn test_timers_fire_in_order_across_groups() {
		let fast = DisplayGroup::new("fast").with_timings(50, 50).with_default_duration(0.1);
		let slow = DisplayGroup::new("slow").with_timings(300, 50).with_default_duration(0.1);
		let (mut scheduler, clock) = scheduler(vec![fast, slow]);

		scheduler.submit(show("a", "slow"));
		scheduler.submit(show("b", "fast"));
		assert_eq!(scheduler.next_deadline(), Some(50));

		clock.set(200);
		assert_eq!(scheduler.advance(), 3);
		assert!(scheduler.snapshot("fast").is_empty());
		assert_eq!(scheduler.snapshot("slow")[0].phase, Phase::Entering);
		assert_eq!(scheduler.next_deadline(), Some(300));
	}

	#[test]
	fn test_same_deadline_ties_break_by_group_id() {
		let group = |id: &str| DisplayGroup::new(id).with_timings(0, 0).with_default_duration(0.1);
		let (mut scheduler, clock) = scheduler(vec![group("beta"), group("alpha")]);
		let seq = |id: &ItemId| id.as_str().rsplit('-').next().unwrap().parse::<u64>().unwrap();

		// alpha runs one item first, so its own timer counter is ahead of beta's
		scheduler.submit(show("warmup", "alpha"));
		clock.set(100);
		scheduler.advance();
		assert!(scheduler.snapshot("alpha").is_empty());

		scheduler.submit(show("x", "beta"));
		scheduler.submit(show("y", "alpha"));
		assert_eq!(scheduler.submit(show("x2", "beta")), SubmitOutcome::Queued);
		assert_eq!(scheduler.submit(show("y2", "alpha")), SubmitOutcome::Queued);

		clock.set(200);
		scheduler.advance();
		let alpha = &scheduler.snapshot("alpha")[0];
		let beta = &scheduler.snapshot("beta")[0];
		assert_eq!((alpha.media_event.id.as_str(), beta.media_event.id.as_str()), ("y2", "x2"));
		assert!(seq(&alpha.id) < seq(&beta.id));
	}

	#[test]
	fn test_dispose_stops_everything() {
		let (mut scheduler, clock) = scheduler(vec![DisplayGroup::new("g")]);
		scheduler.submit(show("a", "g"));
		scheduler.submit(show("b", "g"));

		scheduler.dispose();
		let version = scheduler.version();

		clock.set(60_000);
		assert_eq!(scheduler.advance(), 0);
		assert_eq!(scheduler.submit(show("c", "g")), SubmitOutcome::Dropped(DropReason::Disposed));
		assert!(scheduler.snapshot("g").is_empty());
		assert!(scheduler.next_deadline().is_none());
		assert_eq!(scheduler.version(), version);
	}

	#[test]
	fn test_duplicate_media_gets_distinct_ids() {
		let group = DisplayGroup::new("g").with_mode("stack").with_max_items(5);
		let (mut scheduler, _) = scheduler(vec![group]);

		let a = scheduler.submit(show("same", "g"));
		let b = scheduler.submit(show("same", "g"));

		assert!(matches!((&a, &b), (SubmitOutcome::Admitted(x), SubmitOutcome::Admitted(y)) if x != y));
		let ids: HashSet<_> = scheduler.snapshot("g").into_iter().map(|item| item.id).collect();
		assert_eq!(ids.len(), 2);
	}
}
