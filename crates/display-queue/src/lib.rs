//! Media display queue and animation scheduler.
//!
//! Show requests are routed to named display groups. Each group serializes,
//! stacks or replaces its items according to its queue mode and walks every
//! admitted item through `entering -> visible -> exiting` before removing it
//! and admitting the next one.
//!
//! [`Scheduler`] is the synchronous core, driven by an injected [`Clock`].
//! [`SchedulerService`] runs it on a tokio task and publishes snapshots.

pub mod caption;
pub mod clock;
pub mod error;
pub mod group;
pub mod media;
pub mod messages;
pub mod placement;
pub mod policy;
pub mod queue;
pub mod scheduler;
pub mod service;
pub mod timer;
pub mod types;

pub use caption::interpolate;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use group::{Anchor, AnimationSettings, DisplayGroup, Placement, QueueMode, QueueSettings};
pub use media::{Context, MediaEvent, MediaType, ShowRequest};
pub use messages::{Envelope, InboundMessage};
pub use placement::RandomPosition;
pub use policy::{can_admit, Admission};
pub use queue::{GroupQueue, ItemTimings, QueueItem};
pub use scheduler::{DropReason, OverlaySnapshot, Scheduler, SubmitOutcome};
pub use service::{SchedulerService, ServiceConfig};
pub use types::{GroupId, ItemId, Phase, TimeMs};
