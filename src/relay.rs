//! HTTP client for the device relay.
//!
//! Every call is sent at most once. Nothing is queued or retried, and an HTTP
//! error status is not an error here: the relay reports failures such as
//! `NO_DEVICE_FOUND` in the body, so the body is handed back as the payload.

use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use crate::config::RelaySettings;
use crate::tree::CommandNode;
use crate::Result;

pub const SUCCESS: &str = "SUCCESS";
pub const TIMEOUT: &str = "TIMEOUT";
pub const NO_DEVICE_FOUND: &str = "NO_DEVICE_FOUND";
pub const DISABLED: &str = "DISABLED";

#[derive(Debug, Clone, PartialEq, Eq)]
/// The relay's well-known reply literals
pub enum RelayReply {
	Success,
	Timeout,
	NoDeviceFound,
	Disabled,
	Other(String),
}

impl RelayReply {
	pub fn classify(body: &str) -> RelayReply {
		match body {
			SUCCESS => RelayReply::Success,
			TIMEOUT => RelayReply::Timeout,
			NO_DEVICE_FOUND => RelayReply::NoDeviceFound,
			DISABLED => RelayReply::Disabled,
			other => RelayReply::Other(other.to_string()),
		}
	}

	pub fn is_success(&self) -> bool {
		*self == RelayReply::Success
	}
}

#[derive(Debug, Clone)]
pub struct RelayClient {
	http: reqwest::Client,
	base: Url,
	client_id: String,
	device: String,
}

impl RelayClient {
	pub fn new(base_url: &str, client_id: &str, device: &str) -> Result<RelayClient> {
		RelayClient::with_http(reqwest::Client::new(), base_url, client_id, device)
	}

	pub fn from_settings(settings: &RelaySettings) -> Result<RelayClient> {
		let mut builder = reqwest::Client::builder();
		if let Some(secs) = settings.timeout_secs {
			builder = builder.timeout(Duration::from_secs(secs));
		}
		RelayClient::with_http(
			builder.build()?,
			&settings.base_url,
			&settings.client_id,
			&settings.device,
		)
	}

	fn with_http(
		http: reqwest::Client,
		base_url: &str,
		client_id: &str,
		device: &str,
	) -> Result<RelayClient> {
		let mut base = Url::parse(base_url)?;
		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());
			base.set_path(&path);
		}
		Ok(RelayClient {
			http,
			base,
			client_id: client_id.to_string(),
			device: device.to_string(),
		})
	}

	pub fn device(&self) -> &str {
		&self.device
	}

	/// The same relay, addressed to another device
	pub fn for_device(&self, device: &str) -> RelayClient {
		RelayClient {
			device: device.to_string(),
			..self.clone()
		}
	}

	fn endpoint(&self, path: &str) -> Result<Url> {
		Ok(self.base.join(path)?)
	}

	fn device_endpoint(&self, path: &str) -> Result<Url> {
		self.endpoint(&format!("{}/{}", self.device, path))
	}

	/// `GET /sendCommand`, returning the device's raw reply
	pub async fn send_command(&self, command: &str) -> Result<String> {
		debug!(device = %self.device, command, "sending command");
		let body = self
			.http
			.get(self.endpoint("sendCommand")?)
			.query(&[
				("fromClient", self.client_id.as_str()),
				("toDevice", self.device.as_str()),
				("command", command),
			])
			.send()
			.await?
			.text()
			.await?;
		Ok(body)
	}

	/// Send a command and hand the reply to `on_success`. Transport failures are logged and dropped.
	pub async fn dispatch(&self, command: &str, on_success: impl FnOnce(String)) {
		match self.send_command(command).await {
			Ok(body) => on_success(body),
			Err(e) => warn!(device = %self.device, command, error = %e, "send failed"),
		}
	}

	/// Send a command whose reply nobody needs
	pub async fn fire(&self, command: &str) {
		self.dispatch(command, |_| {}).await
	}

	/// `POST /{device}/sendCommand` with one form field per argument, as a help form does
	pub async fn submit_form(&self, format: &str, args: &[(String, String)]) -> Result<String> {
		let mut fields: Vec<(&str, &str)> = vec![
			("fromClient", crate::render::FORM_CLIENT_ID),
			("command", format),
		];
		fields.extend(args.iter().map(|(id, value)| (id.as_str(), value.as_str())));
		let body = self
			.http
			.post(self.device_endpoint("sendCommand")?)
			.form(&fields)
			.send()
			.await?
			.text()
			.await?;
		Ok(body)
	}

	/// `POST /macro`
	pub async fn run_macro(&self, name: &str) -> Result<String> {
		let body = self
			.http
			.post(self.endpoint("macro")?)
			.form(&[("macroName", name)])
			.send()
			.await?
			.text()
			.await?;
		Ok(body)
	}

	/// `GET /macro`, for relays that still accept the query form
	pub async fn run_macro_get(&self, name: &str) -> Result<String> {
		let body = self
			.http
			.get(self.endpoint("macro")?)
			.query(&[("macroName", name)])
			.send()
			.await?
			.text()
			.await?;
		Ok(body)
	}

	/// Flip the relay between enabled and disabled. The reply carries nothing.
	pub async fn toggle_status(&self) -> Result<()> {
		self.http.get(self.endpoint("toggleStatus")?).send().await?;
		Ok(())
	}

	/// Wait for the next line the device sends without being asked
	pub async fn get_unsolicited(&self) -> Result<String> {
		let body = self
			.http
			.get(self.device_endpoint("getUnsolicited")?)
			.send()
			.await?
			.text()
			.await?;
		Ok(body)
	}

	/// The device's command-tree document
	pub async fn fetch_description(&self) -> Result<CommandNode> {
		let body = self
			.http
			.get(self.device_endpoint("frontEnd/device.json")?)
			.send()
			.await?
			.error_for_status()?
			.text()
			.await?;
		CommandNode::parse(&body)
	}

	pub async fn list_devices(&self) -> Result<Vec<String>> {
		let devices = self
			.http
			.get(self.endpoint("listDevices")?)
			.send()
			.await?
			.error_for_status()?
			.json()
			.await?;
		Ok(devices)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn replies_are_classified() {
		assert!(RelayReply::classify("SUCCESS").is_success());
		assert_eq!(RelayReply::classify("TIMEOUT"), RelayReply::Timeout);
		assert_eq!(
			RelayReply::classify("NO_DEVICE_FOUND"),
			RelayReply::NoDeviceFound
		);
		assert_eq!(RelayReply::classify("DISABLED"), RelayReply::Disabled);
		assert_eq!(
			RelayReply::classify("success"),
			RelayReply::Other("success".to_string())
		);
	}

	#[test]
	fn endpoints_hang_off_the_base_path() {
		let client = RelayClient::new("http://relay.local:8080/hamjab", "test", "epson5030ub").unwrap();
		assert_eq!(
			client.endpoint("macro").unwrap().as_str(),
			"http://relay.local:8080/hamjab/macro"
		);
		assert_eq!(
			client.device_endpoint("getUnsolicited").unwrap().as_str(),
			"http://relay.local:8080/hamjab/epson5030ub/getUnsolicited"
		);
	}

	#[test]
	fn other_device_shares_the_relay() {
		let client = RelayClient::new("http://relay.local:8080", "test", "epson5030ub").unwrap();
		let lutron = client.for_device("lutrongrx3000");
		assert_eq!(lutron.device(), "lutrongrx3000");
		assert_eq!(
			lutron.device_endpoint("getUnsolicited").unwrap().as_str(),
			"http://relay.local:8080/lutrongrx3000/getUnsolicited"
		);
	}

	#[test]
	fn bad_base_url_is_rejected() {
		assert!(matches!(
			RelayClient::new("not a url", "test", "x"),
			Err(crate::Error::Url(_))
		));
	}
}
