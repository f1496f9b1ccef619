//! Home panel: macro buttons with a transient result icon, and the relay's enable switch.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{info, warn};

use crate::config::MacroSettings;
use crate::relay::{RelayClient, RelayReply};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroStatus {
	Loading,
	Success,
	Failure,
}

impl MacroStatus {
	/// Icon shown next to the macro
	pub fn icon(&self) -> &'static str {
		match self {
			MacroStatus::Loading => "loading",
			MacroStatus::Success => "checkmark",
			MacroStatus::Failure => "fail",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The single hide timer shared by every macro on the page
pub struct HideTimer {
	pub token: u64,
	pub macro_name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacroBoard {
	statuses: HashMap<String, MacroStatus>,
	hide: Option<HideTimer>,
	next_token: u64,
}

impl MacroBoard {
	pub fn new() -> MacroBoard {
		MacroBoard::default()
	}

	pub fn status(&self, name: &str) -> Option<MacroStatus> {
		self.statuses.get(name).copied()
	}

	pub fn pending_hide(&self) -> Option<&HideTimer> {
		self.hide.as_ref()
	}

	/// Show the loading icon and cancel whatever hide timer is pending
	pub fn invoke(&mut self, name: &str) {
		self.hide = None;
		self.statuses.insert(name.to_string(), MacroStatus::Loading);
	}

	/// Record a result (`None` when the request never got a reply) and arm the hide timer,
	/// replacing any timer already pending. Returns the new timer's token.
	pub fn complete(&mut self, name: &str, reply: Option<&str>) -> u64 {
		let status = match reply.map(RelayReply::classify) {
			Some(RelayReply::Success) => MacroStatus::Success,
			_ => MacroStatus::Failure,
		};
		self.statuses.insert(name.to_string(), status);
		self.next_token += 1;
		self.hide = Some(HideTimer {
			token: self.next_token,
			macro_name: name.to_string(),
		});
		self.next_token
	}

	/// A hide timer fired. Stale tokens are ignored.
	pub fn hide_elapsed(&mut self, token: u64) {
		let current = match &self.hide {
			Some(timer) if timer.token == token => timer.macro_name.clone(),
			_ => return,
		};
		self.hide = None;
		self.statuses.remove(&current);
	}
}

pub struct MacroHandle {
	invocations: mpsc::Sender<String>,
	view: watch::Receiver<MacroBoard>,
}

impl MacroHandle {
	pub async fn invoke(&self, name: &str) {
		if self.invocations.send(name.to_string()).await.is_err() {
			warn!(macro_name = name, "macro runner is gone");
		}
	}

	pub fn view(&self) -> watch::Receiver<MacroBoard> {
		self.view.clone()
	}
}

/// Runs macros through the relay and times out their result icons.
pub struct MacroRunner {
	relay: RelayClient,
	board: MacroBoard,
	hide_after: Duration,
}

async fn hide_due(deadline: Option<(Instant, u64)>) -> u64 {
	match deadline {
		Some((at, token)) => {
			sleep_until(at).await;
			token
		}
		None => std::future::pending().await,
	}
}

impl MacroRunner {
	pub fn new(relay: RelayClient, settings: &MacroSettings) -> MacroRunner {
		MacroRunner {
			relay,
			board: MacroBoard::new(),
			hide_after: settings.hide_after(),
		}
	}

	/// Runs until the handle is dropped
	pub fn spawn(self) -> MacroHandle {
		let (invocations_tx, invocations) = mpsc::channel(8);
		let (view_tx, view) = watch::channel(self.board.clone());
		tokio::spawn(self.run(invocations, view_tx));
		MacroHandle {
			invocations: invocations_tx,
			view,
		}
	}

	async fn run(mut self, mut invocations: mpsc::Receiver<String>, view: watch::Sender<MacroBoard>) {
		let (done_tx, mut done) = mpsc::unbounded_channel::<(String, Option<String>)>();
		let mut hide: Option<(Instant, u64)> = None;

		loop {
			tokio::select! {
				invocation = invocations.recv() => match invocation {
					Some(name) => {
						self.board.invoke(&name);
						hide = None;
						let relay = self.relay.clone();
						let done_tx = done_tx.clone();
						tokio::spawn(async move {
							let reply = match relay.run_macro(&name).await {
								Ok(body) => Some(body),
								Err(e) => {
									warn!(macro_name = %name, error = %e, "macro request failed");
									None
								}
							};
							let _ = done_tx.send((name, reply));
						});
					}
					None => return,
				},
				Some((name, reply)) = done.recv() => {
					let token = self.board.complete(&name, reply.as_deref());
					info!(macro_name = %name, status = ?self.board.status(&name), "macro finished");
					hide = Some((Instant::now() + self.hide_after, token));
				}
				token = hide_due(hide) => {
					self.board.hide_elapsed(token);
					hide = None;
				}
			}
			let _ = view.send(self.board.clone());
		}
	}
}

/// Flip the relay's enabled state, then `reload` whatever the outcome.
pub async fn toggle_status_then(relay: &RelayClient, reload: impl FnOnce()) {
	if let Err(e) = relay.toggle_status().await {
		warn!(error = %e, "toggleStatus failed");
	}
	reload();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn invoke_shows_loading() {
		let mut board = MacroBoard::new();
		board.invoke("lights-on");
		assert_eq!(board.status("lights-on"), Some(MacroStatus::Loading));
		assert!(board.pending_hide().is_none());
	}

	#[test]
	fn only_literal_success_counts() {
		let mut board = MacroBoard::new();
		board.complete("a", Some("SUCCESS"));
		board.complete("b", Some("TIMEOUT"));
		board.complete("c", None);
		board.complete("d", Some("SUCCESS\n"));
		assert_eq!(board.status("a"), Some(MacroStatus::Success));
		assert_eq!(board.status("b"), Some(MacroStatus::Failure));
		assert_eq!(board.status("c"), Some(MacroStatus::Failure));
		assert_eq!(board.status("d"), Some(MacroStatus::Failure));
	}

	#[test]
	fn rapid_reinvocation_leaves_one_timer_from_the_last_completion() {
		let mut board = MacroBoard::new();
		board.invoke("lights-on");
		let first = board.complete("lights-on", Some("SUCCESS"));
		board.invoke("lights-on");
		assert!(board.pending_hide().is_none());
		let second = board.complete("lights-on", Some("SUCCESS"));
		assert_ne!(first, second);
		assert_eq!(board.pending_hide().map(|t| t.token), Some(second));

		board.hide_elapsed(first);
		assert_eq!(board.status("lights-on"), Some(MacroStatus::Success));

		board.hide_elapsed(second);
		assert_eq!(board.status("lights-on"), None);
		assert!(board.pending_hide().is_none());
	}

	#[test]
	fn overlapping_completions_replace_the_timer() {
		let mut board = MacroBoard::new();
		board.invoke("movie");
		board.invoke("lights-on");
		board.complete("movie", Some("SUCCESS"));
		let last = board.complete("lights-on", Some("NO_DEVICE_FOUND"));
		let timer = board.pending_hide().unwrap();
		assert_eq!(timer.token, last);
		assert_eq!(timer.macro_name, "lights-on");

		board.hide_elapsed(last);
		assert_eq!(board.status("lights-on"), None);
		assert_eq!(board.status("movie"), Some(MacroStatus::Success));
	}

	#[test]
	fn icons_match_status() {
		assert_eq!(MacroStatus::Success.icon(), "checkmark");
		assert_eq!(MacroStatus::Loading.icon(), "loading");
		assert_eq!(MacroStatus::Failure.icon(), "fail");
	}
}
