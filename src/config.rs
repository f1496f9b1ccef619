//! Panel settings, read from a TOML file.
//!
//! ```toml
//! [relay]
//! base_url = "http://192.168.1.20:8080"
//! device = "epson5030ub"
//!
//! [power]
//! poll_secs = 10
//! ```

use std::path::Path;
use std::time::Duration;

use crate::Result;

/// Port the relay's web front end listens on
pub const DEFAULT_RELAY_PORT: u16 = 8080;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PanelConfig {
	pub relay: RelaySettings,
	pub power: PowerSettings,
	pub scenes: SceneSettings,
	pub macros: MacroSettings,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RelaySettings {
	pub base_url: String,
	/// Sent as `fromClient` with every command
	pub client_id: String,
	/// Sent as `toDevice`
	pub device: String,
	pub timeout_secs: Option<u64>,
}

impl Default for RelaySettings {
	fn default() -> Self {
		RelaySettings {
			base_url: format!("http://localhost:{}", DEFAULT_RELAY_PORT),
			client_id: "webFrontEnd".to_string(),
			device: "epson5030ub".to_string(),
			timeout_secs: None,
		}
	}
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PowerSettings {
	pub poll_secs: u64,
	/// Interval while waiting for a requested power change
	pub fast_poll_secs: u64,
	/// Interval once the requested power state was reached
	pub settled_poll_secs: u64,
	pub blink_secs: u64,
}

impl Default for PowerSettings {
	fn default() -> Self {
		PowerSettings {
			poll_secs: 10,
			fast_poll_secs: 1,
			settled_poll_secs: 60,
			blink_secs: 1,
		}
	}
}

impl PowerSettings {
	pub fn poll(&self) -> Duration {
		Duration::from_secs(self.poll_secs)
	}

	pub fn fast_poll(&self) -> Duration {
		Duration::from_secs(self.fast_poll_secs)
	}

	pub fn settled_poll(&self) -> Duration {
		Duration::from_secs(self.settled_poll_secs)
	}

	pub fn blink(&self) -> Duration {
		Duration::from_secs(self.blink_secs)
	}
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SceneSettings {
	/// Number of scene indicators on the panel
	pub count: u8,
	/// Command asking the controller for the active scene
	pub query: String,
	pub max_backoff_secs: u64,
}

impl Default for SceneSettings {
	fn default() -> Self {
		SceneSettings {
			count: 8,
			query: ":G".to_string(),
			max_backoff_secs: 60,
		}
	}
}

impl SceneSettings {
	pub fn max_backoff(&self) -> Duration {
		Duration::from_secs(self.max_backoff_secs)
	}
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MacroSettings {
	pub hide_after_secs: u64,
}

impl Default for MacroSettings {
	fn default() -> Self {
		MacroSettings { hide_after_secs: 30 }
	}
}

impl MacroSettings {
	pub fn hide_after(&self) -> Duration {
		Duration::from_secs(self.hide_after_secs)
	}
}

impl PanelConfig {
	pub fn parse(source: &str) -> Result<PanelConfig> {
		Ok(toml::from_str(source)?)
	}

	pub fn load(path: &Path) -> Result<PanelConfig> {
		let source = std::fs::read_to_string(path)?;
		PanelConfig::parse(&source)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_file_gives_defaults() {
		let config = PanelConfig::parse("").unwrap();
		assert_eq!(config, PanelConfig::default());
		assert_eq!(config.power.poll(), Duration::from_secs(10));
		assert_eq!(config.macros.hide_after(), Duration::from_secs(30));
		assert_eq!(config.relay.base_url, "http://localhost:8080");
	}

	#[test]
	fn partial_tables_keep_other_defaults() {
		let config = PanelConfig::parse(
			r#"
			[relay]
			device = "lutrongrx3000"

			[power]
			settled_poll_secs = 120
			"#,
		)
		.unwrap();
		assert_eq!(config.relay.device, "lutrongrx3000");
		assert_eq!(config.relay.client_id, "webFrontEnd");
		assert_eq!(config.power.settled_poll(), Duration::from_secs(120));
		assert_eq!(config.power.fast_poll(), Duration::from_secs(1));
	}

	#[test]
	fn bad_toml_is_a_config_error() {
		assert!(matches!(
			PanelConfig::parse("[relay"),
			Err(crate::Error::Config(_))
		));
	}
}
