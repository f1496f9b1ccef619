//! Projector power panel: a status poll loop whose interval adapts to what the user asked for.
//!
//! [`PowerPanel`] holds the state and decides what should happen next; it never
//! touches the network or a clock. [`PowerPoller`] runs a panel on a tokio task
//! and carries out the [`PowerEffect`]s it returns.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, sleep_until, Instant, Interval};
use tracing::{debug, info, warn};

use crate::config::PowerSettings;
use crate::relay::RelayClient;

/// Query answered with one of the `PWR=0x` literals
pub const POWER_QUERY: &str = "PWR?";
pub const POWER_ON_COMMAND: &str = "PWR ON";
pub const POWER_OFF_COMMAND: &str = "PWR OFF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerStatus {
	Off,
	On,
	Warming,
}

impl PowerStatus {
	/// Only the exact reply literals are recognised
	pub fn parse(payload: &str) -> Option<PowerStatus> {
		match payload {
			"PWR=00" => Some(PowerStatus::Off),
			"PWR=01" => Some(PowerStatus::On),
			"PWR=02" => Some(PowerStatus::Warming),
			_ => None,
		}
	}

	pub fn reply(&self) -> &'static str {
		match self {
			PowerStatus::Off => "PWR=00",
			PowerStatus::On => "PWR=01",
			PowerStatus::Warming => "PWR=02",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lights {
	pub power: bool,
	pub status: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// What the panel needs done after an event
pub enum PowerEffect {
	/// Begin toggling the status light, replacing any blink already running
	StartBlink,
	StopBlink,
	/// Replace the pending poll with one after this delay
	SchedulePoll(Duration),
	/// Drop the pending poll and query right away
	PollNow,
	Send(String),
}

#[derive(Debug, Clone, PartialEq)]
/// Snapshot published after every event
pub struct PowerView {
	pub status: Option<PowerStatus>,
	pub wanted: Option<PowerStatus>,
	pub lights: Lights,
	pub interval: Duration,
	pub blinking: bool,
}

impl PowerView {
	/// The power button only has a meaning once the projector reports on or off
	pub fn can_press(&self) -> bool {
		matches!(self.status, Some(PowerStatus::Off) | Some(PowerStatus::On))
	}
}

#[derive(Debug, Clone)]
pub struct PowerPanel {
	status: Option<PowerStatus>,
	wanted: Option<PowerStatus>,
	lights: Lights,
	interval: Duration,
	blinking: bool,
	settings: PowerSettings,
}

impl PowerPanel {
	pub fn new(settings: PowerSettings) -> PowerPanel {
		PowerPanel {
			status: None,
			wanted: None,
			lights: Lights::default(),
			interval: settings.poll(),
			blinking: false,
			settings,
		}
	}

	pub fn status(&self) -> Option<PowerStatus> {
		self.status
	}

	pub fn wanted(&self) -> Option<PowerStatus> {
		self.wanted
	}

	pub fn lights(&self) -> Lights {
		self.lights
	}

	pub fn interval(&self) -> Duration {
		self.interval
	}

	pub fn is_blinking(&self) -> bool {
		self.blinking
	}

	pub fn view(&self) -> PowerView {
		PowerView {
			status: self.status,
			wanted: self.wanted,
			lights: self.lights,
			interval: self.interval,
			blinking: self.blinking,
		}
	}

	fn stop_blink(&mut self, effects: &mut Vec<PowerEffect>) {
		if self.blinking {
			self.blinking = false;
			effects.push(PowerEffect::StopBlink);
		}
	}

	/// Apply the reply to a [`POWER_QUERY`]. The next poll is always scheduled.
	pub fn observe(&mut self, payload: &str) -> Vec<PowerEffect> {
		let mut effects = Vec::new();
		let observed = PowerStatus::parse(payload);
		match observed {
			Some(PowerStatus::Off) => {
				self.stop_blink(&mut effects);
				self.lights = Lights {
					power: false,
					status: false,
				};
			}
			Some(PowerStatus::On) => {
				self.stop_blink(&mut effects);
				self.lights = Lights {
					power: true,
					status: true,
				};
			}
			Some(PowerStatus::Warming) => {
				self.lights.power = true;
				if self.status != Some(PowerStatus::Warming) {
					self.blinking = true;
					effects.push(PowerEffect::StartBlink);
				}
			}
			None => debug!(payload, "unrecognised power status"),
		}

		if observed.is_some() && observed == self.wanted {
			self.wanted = None;
			self.interval = self.settings.settled_poll();
		}
		self.status = observed;
		effects.push(PowerEffect::SchedulePoll(self.interval));
		effects
	}

	/// The power button. Does nothing unless the current state is known to be on or off.
	pub fn press_power(&mut self) -> Vec<PowerEffect> {
		let (command, wanted) = match self.status {
			Some(PowerStatus::Off) => (POWER_ON_COMMAND, PowerStatus::On),
			Some(PowerStatus::On) => (POWER_OFF_COMMAND, PowerStatus::Off),
			_ => {
				info!(status = ?self.status, "unknown state, not sending any command");
				return Vec::new();
			}
		};
		self.wanted = Some(wanted);
		self.interval = self.settings.fast_poll();
		vec![PowerEffect::Send(command.to_string()), PowerEffect::PollNow]
	}

	/// One blink period elapsed
	pub fn blink_tick(&mut self) {
		if self.blinking {
			self.lights.status = !self.lights.status;
		}
	}
}

/// Handle to a running [`PowerPoller`]. Dropping it stops the poller.
pub struct PowerHandle {
	presses: mpsc::Sender<()>,
	view: watch::Receiver<PowerView>,
}

impl PowerHandle {
	pub async fn press(&self) {
		if self.presses.send(()).await.is_err() {
			warn!("power poller is gone");
		}
	}

	pub fn view(&self) -> watch::Receiver<PowerView> {
		self.view.clone()
	}
}

pub struct PowerPoller {
	relay: RelayClient,
	panel: PowerPanel,
	blink_period: Duration,
}

struct Timers {
	next_poll: Option<Instant>,
	blink: Option<Interval>,
	blink_period: Duration,
}

async fn poll_due(next_poll: Option<Instant>) {
	match next_poll {
		Some(deadline) => sleep_until(deadline).await,
		None => std::future::pending().await,
	}
}

async fn blink_due(blink: &mut Option<Interval>) {
	match blink {
		Some(blink) => {
			blink.tick().await;
		}
		None => std::future::pending().await,
	}
}

impl PowerPoller {
	pub fn new(relay: RelayClient, settings: PowerSettings) -> PowerPoller {
		PowerPoller {
			relay,
			blink_period: settings.blink(),
			panel: PowerPanel::new(settings),
		}
	}

	/// Start polling on the current tokio runtime. The first query goes out immediately.
	pub fn spawn(self) -> PowerHandle {
		let (presses_tx, presses) = mpsc::channel(8);
		let (view_tx, view) = watch::channel(self.panel.view());
		tokio::spawn(self.run(presses, view_tx));
		PowerHandle {
			presses: presses_tx,
			view,
		}
	}

	fn poll(&self, replies: &mpsc::UnboundedSender<Option<String>>) {
		let relay = self.relay.clone();
		let replies = replies.clone();
		tokio::spawn(async move {
			let reply = match relay.send_command(POWER_QUERY).await {
				Ok(body) => Some(body),
				Err(e) => {
					warn!(error = %e, "power poll failed");
					None
				}
			};
			let _ = replies.send(reply);
		});
	}

	fn apply(
		&self,
		effects: Vec<PowerEffect>,
		timers: &mut Timers,
		replies: &mpsc::UnboundedSender<Option<String>>,
	) {
		for effect in effects {
			match effect {
				PowerEffect::StartBlink => {
					let period = timers.blink_period;
					timers.blink = Some(interval_at(Instant::now() + period, period));
				}
				PowerEffect::StopBlink => timers.blink = None,
				PowerEffect::SchedulePoll(delay) => {
					timers.next_poll = Some(Instant::now() + delay);
				}
				PowerEffect::PollNow => {
					timers.next_poll = None;
					self.poll(replies);
				}
				PowerEffect::Send(command) => {
					let relay = self.relay.clone();
					tokio::spawn(async move { relay.fire(&command).await });
				}
			}
		}
	}

	async fn run(mut self, mut presses: mpsc::Receiver<()>, view: watch::Sender<PowerView>) {
		let (replies_tx, mut replies) = mpsc::unbounded_channel();
		let mut timers = Timers {
			next_poll: None,
			blink: None,
			blink_period: self.blink_period,
		};
		info!(device = self.relay.device(), "power poller started");
		self.poll(&replies_tx);

		loop {
			tokio::select! {
				_ = poll_due(timers.next_poll) => {
					timers.next_poll = None;
					self.poll(&replies_tx);
				}
				_ = blink_due(&mut timers.blink) => self.panel.blink_tick(),
				Some(reply) = replies.recv() => {
					let effects = match reply {
						Some(body) => self.panel.observe(&body),
						None => vec![PowerEffect::SchedulePoll(self.panel.interval())],
					};
					self.apply(effects, &mut timers, &replies_tx);
				}
				press = presses.recv() => match press {
					Some(()) => {
						let effects = self.panel.press_power();
						self.apply(effects, &mut timers, &replies_tx);
					}
					None => {
						info!("power panel closed");
						return;
					}
				},
			}
			let _ = view.send(self.panel.view());
		}
	}
}
