use crate::error::Error;
use crate::group::DisplayGroup;
use crate::media::MediaEvent;
use crate::placement::RandomPosition;
use crate::policy::can_admit;
use crate::timer::{Fired, TimerTable, TimerId, Transition};
use crate::types::{GroupId, ItemId, ItemIdGen, Phase, TimeMs};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, warn};

/// Animation and hold timings captured when an item is admitted.
///
/// Later group changes never touch an item that is already on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTimings {
	pub in_duration: TimeMs,
	pub hold: TimeMs,
	pub out_duration: TimeMs,
}

/// A request accepted by a group but not yet admitted
#[derive(Debug, Clone, PartialEq)]
pub struct PendingItem {
	/// Caption already interpolated
	pub media_event: MediaEvent,
	pub random_pos: Option<RandomPosition>,
	pub enqueued_at: TimeMs,
}

/// An admitted item, as handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
	pub id: ItemId,
	pub media_event: MediaEvent,
	pub group_id: GroupId,
	/// Hold time in seconds
	pub duration: f64,
	pub phase: Phase,
	pub start_time: TimeMs,
	pub timings: ItemTimings,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub random_pos: Option<RandomPosition>,
}

impl QueueItem {
	/// When the item is due to start exiting if nothing preempts it
	pub const fn exit_at(&self) -> TimeMs {
		self.start_time.saturating_add(self.timings.in_duration).saturating_add(self.timings.hold)
	}
}

/// Pending and active items of one display group, plus the timers that drive them
#[derive(Debug)]
pub struct GroupQueue {
	group_id: GroupId,
	/// `None` once the group disappears from the group list
	config: Option<DisplayGroup>,
	pending: VecDeque<PendingItem>,
	active: Vec<QueueItem>,
	timers: TimerTable,
	reported_mode: Option<String>,
}

impl GroupQueue {
	pub fn new(group: DisplayGroup) -> Self {
		let mut queue = Self {
			group_id: group.id.clone(),
			config: None,
			pending: VecDeque::new(),
			active: Vec::new(),
			timers: TimerTable::new(),
			reported_mode: None,
		};
		queue.configure(Some(group));
		queue
	}

	pub fn group_id(&self) -> &str {
		&self.group_id
	}

	pub const fn config(&self) -> Option<&DisplayGroup> {
		self.config.as_ref()
	}

	/// Whether the group currently accepts show requests
	pub fn accepts_requests(&self) -> bool {
		self.config.as_ref().is_some_and(|group| group.enabled)
	}

	/// Replaces the group's configuration. Only future admissions see the change.
	///
	/// A removed (`None`) group loses its pending items. A disabled group keeps
	/// them and admits them again once re-enabled. Active items keep running on
	/// the timings captured at admission.
	pub fn configure(&mut self, config: Option<DisplayGroup>) {
		if config.is_none() && !self.pending.is_empty() {
			info!(group_id = %self.group_id, dropped = self.pending.len(), "Group removed, clearing pending items");
			self.pending.clear();
		}

		match config.as_ref().map(|group| (group.validate(), &group.queue.mode)) {
			Some((Err(Error::InvalidQueueMode(_)), mode)) => {
				let raw = mode.to_string();
				if self.reported_mode.as_deref() != Some(raw.as_str()) {
					warn!(group_id = %self.group_id, mode = %raw, "Unknown queue mode, group will not admit items until corrected");
					self.reported_mode = Some(raw);
				}
			}
			Some((Err(e), _)) => warn!(group_id = %self.group_id, "Group configuration problem: {}", e),
			_ => self.reported_mode = None,
		}

		self.config = config;
	}

	pub fn pending_len(&self) -> usize {
		self.pending.len()
	}

	pub fn active(&self) -> &[QueueItem] {
		&self.active
	}

	/// Nothing pending, nothing on screen, nothing armed
	pub fn is_idle(&self) -> bool {
		self.pending.is_empty() && self.active.is_empty() && self.timers.is_empty()
	}

	pub fn next_due(&self) -> Option<(TimeMs, TimerId)> {
		self.timers.next_due()
	}

	/// Appends a request and tries to admit the head of the queue
	pub fn enqueue(&mut self, item: PendingItem, now: TimeMs, ids: &mut ItemIdGen) -> Option<ItemId> {
		self.pending.push_back(item);
		self.drain(now, ids)
	}

	/// Admits at most one pending item if the group's policy allows it.
	///
	/// Always works from the current active list, so it is safe to call from
	/// `enqueue`, from a removal, and from a configuration change.
	pub fn drain(&mut self, now: TimeMs, ids: &mut ItemIdGen) -> Option<ItemId> {
		if self.pending.is_empty() {
			return None;
		}
		let group = self.config.as_ref().filter(|group| group.enabled)?;

		let decision = match can_admit(group, &self.active) {
			Ok(decision) => decision,
			Err(Error::InvalidQueueMode(raw)) => {
				if self.reported_mode.as_deref() != Some(raw.as_str()) {
					warn!(group_id = %self.group_id, mode = %raw, "Unknown queue mode, group will not admit items until corrected");
					self.reported_mode = Some(raw);
				}
				return None;
			}
			Err(e) => {
				warn!(group_id = %self.group_id, "Admission check failed: {}", e);
				return None;
			}
		};

		if !decision.allow {
			return None;
		}

		let requested = self.pending.front()?.media_event.display_duration;
		let duration = group.resolve_duration(requested);
		let timings = ItemTimings {
			in_duration: group.animation.in_duration,
			hold: group.hold_ms(requested),
			out_duration: group.animation.out_duration,
		};

		for id in &decision.force_exit {
			self.force_exit(id, now);
		}

		let next = self.pending.pop_front()?;
		let id = ids.next(&next.media_event.id, now);
		let item = QueueItem {
			id: id.clone(),
			media_event: next.media_event,
			group_id: self.group_id.clone(),
			duration,
			phase: Phase::Entering,
			start_time: now,
			timings,
			random_pos: next.random_pos,
		};

		self.timers.arm(&id, now.saturating_add(item.timings.in_duration), Transition::Reveal);
		info!(
			group_id = %self.group_id,
			item_id = %id,
			waited_ms = now.saturating_sub(next.enqueued_at),
			hold_ms = timings.hold,
			"Admitted item"
		);
		self.active.push(item);

		Some(id)
	}

	/// Cuts an item's hold short and moves it straight to `exiting`
	fn force_exit(&mut self, id: &ItemId, now: TimeMs) {
		let Some(item) = self.active.iter_mut().find(|item| &item.id == id) else {
			return;
		};
		if item.phase.is_exiting() {
			return;
		}

		item.phase = Phase::Exiting;
		self.timers.rearm(id, now.saturating_add(item.timings.out_duration), Transition::Remove);
		debug!(group_id = %self.group_id, item_id = %id, "Preempted item");
	}

	/// Pops the next timer due at `now`, if any
	pub fn pop_due(&mut self, now: TimeMs) -> Option<Fired> {
		self.timers.pop_due(now)
	}

	/// Applies a fired timer. A removal always re-drains the group.
	pub fn fire(&mut self, fired: Fired, ids: &mut ItemIdGen) {
		let now = fired.due;

		if fired.transition == Transition::Remove {
			let before = self.active.len();
			self.active.retain(|item| item.id != fired.item);
			self.timers.cancel(&fired.item);
			if self.active.len() < before {
				debug!(group_id = %self.group_id, item_id = %fired.item, "Removed item");
			}
			self.drain(now, ids);
			return;
		}

		let Some(item) = self.active.iter_mut().find(|item| item.id == fired.item) else {
			warn!(group_id = %self.group_id, item_id = %fired.item, "Timer fired for an item that is no longer active");
			return;
		};

		match fired.transition {
			Transition::Reveal => {
				item.phase = Phase::Visible;
				let exit_at = item.exit_at().max(now);
				self.timers.arm(&fired.item, exit_at, Transition::Exit);
			}
			Transition::Exit => {
				item.phase = Phase::Exiting;
				self.timers.arm(&fired.item, now.saturating_add(item.timings.out_duration), Transition::Remove);
			}
			Transition::Remove => unreachable!("handled above"),
		}
		debug!(group_id = %self.group_id, item_id = %fired.item, phase = %item.phase, "Phase changed");
	}

	/// Cancels every timer and forgets all items
	pub fn dispose(&mut self) -> usize {
		let cancelled = self.timers.clear();
		self.pending.clear();
		self.active.clear();
		cancelled
	}

	/// Checks the structural invariants between the active list and the timer table
	pub fn check_invariants(&self) -> Result<(), String> {
		let mut seen = HashSet::new();
		for item in &self.active {
			if !seen.insert(&item.id) {
				return Err(format!("item {} is active twice", item.id));
			}
			if item.phase == Phase::Pending {
				return Err(format!("item {} is active but pending", item.id));
			}
			let Some(timer) = self.timers.get(&item.id) else {
				return Err(format!("item {} has no outstanding timer", item.id));
			};
			let expected = match item.phase {
				Phase::Entering => Transition::Reveal,
				Phase::Visible => Transition::Exit,
				Phase::Exiting | Phase::Pending => Transition::Remove,
			};
			if timer.transition != expected {
				return Err(format!("item {} in phase {} has a {:?} timer", item.id, item.phase, timer.transition));
			}
		}
		if let Some(orphan) = self.timers.items().find(|id| !seen.contains(id)) {
			return Err(format!("timer armed for unknown item {orphan}"));
		}
		Ok(())
	}
}
