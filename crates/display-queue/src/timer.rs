use crate::types::{ItemId, TimeMs};
use std::collections::{BTreeSet, HashMap};
use tracing::error;

/// Identifies one armed timer; also the tie-breaker between timers due at the same instant
pub type TimerId = u64;

/// The phase change a timer performs when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
	/// `entering -> visible`
	Reveal,
	/// `visible -> exiting`
	Exit,
	/// `exiting -> removed`
	Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerEntry {
	pub id: TimerId,
	pub due: TimeMs,
	pub transition: Transition,
}

/// A fired timer handed back to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired {
	pub item: ItemId,
	pub due: TimeMs,
	pub transition: Transition,
}

/// Timer table keyed by item id.
///
/// Holds at most one timer per item, so cancelling is a single lookup and
/// re-arming an item replaces whatever it had before.
#[derive(Debug, Default)]
pub struct TimerTable {
	by_item: HashMap<ItemId, TimerEntry>,
	ordered: BTreeSet<(TimeMs, TimerId, ItemId)>,
	next_id: TimerId,
}

impl TimerTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Arms the item's next transition. An item that already has a timer is a
	/// scheduler defect: it fails in debug builds and is corrected in release.
	pub fn arm(&mut self, item: &ItemId, due: TimeMs, transition: Transition) -> TimerId {
		let previous = self.cancel(item);
		if let Some(previous) = &previous {
			error!(item = %item, ?previous, "Item already had an outstanding timer, replacing it");
		}
		debug_assert!(previous.is_none(), "item {item} armed twice");

		self.next_id += 1;
		let id = self.next_id;
		self.ordered.insert((due, id, item.clone()));
		self.by_item.insert(item.clone(), TimerEntry { id, due, transition });
		id
	}

	/// Swaps the item's outstanding timer for a new one
	pub fn rearm(&mut self, item: &ItemId, due: TimeMs, transition: Transition) -> TimerId {
		self.cancel(item);
		self.arm(item, due, transition)
	}

	pub fn cancel(&mut self, item: &ItemId) -> Option<TimerEntry> {
		let entry = self.by_item.remove(item)?;
		self.ordered.remove(&(entry.due, entry.id, item.clone()));
		Some(entry)
	}

	pub fn get(&self, item: &ItemId) -> Option<&TimerEntry> {
		self.by_item.get(item)
	}

	/// Earliest outstanding deadline, with its timer id for cross-table ordering
	pub fn next_due(&self) -> Option<(TimeMs, TimerId)> {
		self.ordered.first().map(|(due, id, _)| (*due, *id))
	}

	/// Removes and returns the earliest timer if it is due at `now`
	pub fn pop_due(&mut self, now: TimeMs) -> Option<Fired> {
		let (due, _, _) = self.ordered.first()?;
		if *due > now {
			return None;
		}

		let (due, _, item) = self.ordered.pop_first()?;
		let entry = self.by_item.remove(&item)?;
		Some(Fired {
			item,
			due,
			transition: entry.transition,
		})
	}

	pub fn clear(&mut self) -> usize {
		let cleared = self.by_item.len();
		self.by_item.clear();
		self.ordered.clear();
		cleared
	}

	pub fn len(&self) -> usize {
		self.by_item.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_item.is_empty()
	}

	pub fn items(&self) -> impl Iterator<Item = &ItemId> {
		self.by_item.keys()
	}
}
