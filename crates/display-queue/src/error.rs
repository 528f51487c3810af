use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
	#[error("Invalid queue mode: {0}")]
	InvalidQueueMode(String),

	#[error("Invalid group configuration: {0}")]
	InvalidGroup(String),

	#[error("Unknown channel: {0}")]
	UnknownChannel(String),

	#[error("Scheduler service closed")]
	ServiceClosed,

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

impl Error {
	/// Errors a caller can log and move past without tearing anything down
	pub const fn is_recoverable(&self) -> bool {
		matches!(self, Self::InvalidQueueMode(_) | Self::InvalidGroup(_) | Self::UnknownChannel(_) | Self::Serialization(_))
	}
}
