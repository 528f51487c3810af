use crate::error::{Error, Result};
use crate::group::{DisplayGroup, QueueMode};
use crate::queue::QueueItem;
use crate::types::ItemId;

/// Outcome of asking whether a group may admit its next pending item
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Admission {
	pub allow: bool,
	/// Active items that must be forced into `exiting` before the admission
	pub force_exit: Vec<ItemId>,
}

impl Admission {
	const fn wait() -> Self {
		Self {
			allow: false,
			force_exit: Vec::new(),
		}
	}

	const fn admit() -> Self {
		Self {
			allow: true,
			force_exit: Vec::new(),
		}
	}
}

/// Decides whether `group` may admit a pending item given its current active list.
///
/// Assumes the group is enabled. An unrecognized queue mode never admits.
pub fn can_admit(group: &DisplayGroup, active: &[QueueItem]) -> Result<Admission> {
	match &group.queue.mode {
		QueueMode::Sequential => {
			if active.iter().any(|item| !item.phase.is_exiting()) {
				Ok(Admission::wait())
			} else {
				Ok(Admission::admit())
			}
		}
		QueueMode::Replace => Ok(Admission {
			allow: true,
			force_exit: active.iter().filter(|item| !item.phase.is_exiting()).map(|item| item.id.clone()).collect(),
		}),
		QueueMode::Stack => {
			if active.len() < group.queue.max_items {
				Ok(Admission::admit())
			} else {
				Ok(Admission::wait())
			}
		}
		QueueMode::Invalid(raw) => Err(Error::InvalidQueueMode(raw.clone())),
	}
}
