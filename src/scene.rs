//! Lighting controller panel: hold-to-move zone buttons and scene indicators
//! fed by the relay's unsolicited-message long-poll.

use std::future::Future;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::SceneSettings;
use crate::relay::{RelayClient, RelayReply};

/// Zone id addressing every zone at once
pub const ALL_ZONES: u8 = 0;

static SCENE_NOTIFICATION: Lazy<Regex> =
	Lazy::new(|| Regex::new(r":ss (\d)M+").expect("scene pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneDirection {
	Up,
	Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneButton {
	pub zone: u8,
	pub direction: ZoneDirection,
}

impl ZoneButton {
	pub fn new(zone: u8, direction: ZoneDirection) -> ZoneButton {
		ZoneButton { zone, direction }
	}

	/// Sent on press; the zone keeps moving until the release command arrives
	pub fn press_command(&self) -> String {
		let letter = match self.direction {
			ZoneDirection::Up => 'B',
			ZoneDirection::Down => 'D',
		};
		if self.zone == ALL_ZONES {
			format!(":{}1", letter)
		} else {
			format!(":{}1{}", letter, self.zone)
		}
	}

	pub fn release_command(&self) -> String {
		match self.direction {
			ZoneDirection::Up => ":C".to_string(),
			ZoneDirection::Down => ":E".to_string(),
		}
	}
}

/// Press a zone button, keep it held until `release` resolves, then let go.
pub async fn hold_zone<F>(relay: &RelayClient, button: ZoneButton, release: F)
where
	F: Future<Output = ()>,
{
	relay.fire(&button.press_command()).await;
	release.await;
	relay.fire(&button.release_command()).await;
}

/// Scene digit announced by a notification such as `:ss 2MMM`
pub fn parse_scene(payload: &str) -> Option<u8> {
	let captures = SCENE_NOTIFICATION.captures(payload)?;
	captures.get(1)?.as_str().parse().ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenePanel {
	count: u8,
	active: Option<u8>,
}

impl ScenePanel {
	pub fn new(count: u8) -> ScenePanel {
		ScenePanel {
			count,
			active: None,
		}
	}

	pub fn active(&self) -> Option<u8> {
		self.active
	}

	/// Light the announced scene and clear the rest. Anything else is ignored.
	pub fn apply(&mut self, payload: &str) -> Option<u8> {
		let scene = parse_scene(payload)?;
		self.active = Some(scene);
		Some(scene)
	}

	/// One entry per scene indicator, scene 1 first
	pub fn indicators(&self) -> Vec<bool> {
		(1..=self.count).map(|scene| self.active == Some(scene)).collect()
	}
}

/// Follows scene changes announced by the device.
pub struct SceneWatcher {
	relay: RelayClient,
	panel: ScenePanel,
	query: String,
	max_backoff: Duration,
}

impl SceneWatcher {
	pub fn new(relay: RelayClient, settings: &SceneSettings) -> SceneWatcher {
		SceneWatcher {
			relay,
			panel: ScenePanel::new(settings.count),
			query: settings.query.clone(),
			max_backoff: settings.max_backoff(),
		}
	}

	/// Runs until every receiver of the returned channel is dropped
	pub fn spawn(self) -> watch::Receiver<ScenePanel> {
		let (view_tx, view) = watch::channel(self.panel.clone());
		tokio::spawn(self.run(view_tx));
		view
	}

	async fn run(mut self, view: watch::Sender<ScenePanel>) {
		info!(device = self.relay.device(), "scene watcher started");
		let panel = &mut self.panel;
		tokio::select! {
			_ = self.relay.dispatch(&self.query, |body| {
				panel.apply(&body);
			}) => {}
			_ = view.closed() => {
				info!("scene watcher stopped");
				return;
			}
		}
		let _ = view.send(self.panel.clone());

		let mut backoff = Duration::from_secs(1);
		loop {
			let result = tokio::select! {
				result = self.relay.get_unsolicited() => result,
				_ = view.closed() => {
					info!("scene watcher stopped");
					return;
				}
			};

			let failure = match result {
				Ok(body) if is_relay_failure(&body) => Some(body),
				Ok(body) => {
					backoff = Duration::from_secs(1);
					match self.panel.apply(&body) {
						Some(scene) => {
							debug!(scene, "scene selected");
							let _ = view.send(self.panel.clone());
						}
						None => debug!(payload = %body, "ignoring unsolicited message"),
					}
					None
				}
				Err(e) => Some(e.to_string()),
			};

			if let Some(reason) = failure {
				warn!(error = %reason, backoff_secs = backoff.as_secs(), "getUnsolicited failed, backing off");
				tokio::select! {
					_ = tokio::time::sleep(backoff) => {}
					_ = view.closed() => {
						info!("scene watcher stopped");
						return;
					}
				}
				backoff = (backoff * 2).min(self.max_backoff);
			}
		}
	}
}

/// Replies the relay sends when there is no device to wait on. `TIMEOUT` only
/// means the long-poll expired quietly and is not one of them.
fn is_relay_failure(body: &str) -> bool {
	matches!(
		RelayReply::classify(body),
		RelayReply::NoDeviceFound | RelayReply::Disabled
	)
}
