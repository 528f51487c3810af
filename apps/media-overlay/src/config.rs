use anyhow::Context;
use clap::Parser;
use display_queue::DisplayGroup;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Clone, Debug, Serialize, Deserialize)]
#[command(author, version, about = "Queues media show requests per display group and streams the active items", long_about = None)]
pub struct Config {
	/// Use JSON formatting for tracing
	#[arg(long, env = "LOG_JSON", default_value = "false")]
	pub log_json: bool,

	/// Log filter directives
	#[arg(long, env = "RUST_LOG")]
	pub rust_log: Option<String>,

	/// JSON file holding the initial display group list
	#[arg(long, env = "GROUPS_FILE")]
	pub groups_file: Option<PathBuf>,

	/// Seed for random placement, for reproducible layouts
	#[arg(long, env = "PLACEMENT_SEED")]
	pub placement_seed: Option<u64>,
}

impl Config {
	pub fn log_filter(&self) -> &str {
		self.rust_log.as_deref().unwrap_or("media_overlay=info,display_queue=info")
	}

	/// Reads the initial groups, if a file was given
	pub async fn load_groups(&self) -> anyhow::Result<Vec<DisplayGroup>> {
		let Some(path) = &self.groups_file else {
			return Ok(Vec::new());
		};

		let raw = tokio::fs::read_to_string(path).await.with_context(|| format!("Failed to read groups file {}", path.display()))?;
		let groups: Vec<DisplayGroup> = serde_json::from_str(&raw).with_context(|| format!("Failed to parse groups file {}", path.display()))?;
		Ok(groups)
	}
}
