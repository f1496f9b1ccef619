use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use hamjab_panel::html;
use hamjab_panel::macros::{toggle_status_then, MacroRunner, MacroStatus};
use hamjab_panel::power::PowerPoller;
use hamjab_panel::render::{render, HelpView, RenderMode};
use hamjab_panel::scene::{hold_zone, SceneWatcher, ZoneButton, ZoneDirection};
use hamjab_panel::{Error, PanelConfig, RelayClient};

#[derive(Parser)]
#[command(name = "hamjab-panel", about = "Control panels for a hamjab device relay", version)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// TOML settings file
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	/// Relay base URL, e.g. http://192.168.1.20:8080
	#[arg(long, global = true)]
	base_url: Option<String>,

	/// Device the commands go to
	#[arg(long, global = true)]
	device: Option<String>,

	/// Identity sent as fromClient
	#[arg(long, global = true)]
	client_id: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
	/// List the devices the relay knows
	Devices,
	/// Show the device's command help
	Help {
		/// Emit HTML instead of a text outline
		#[arg(long)]
		html: bool,
		/// Include submission forms (HTML only)
		#[arg(long)]
		form: bool,
	},
	/// Send a raw command and print the reply
	Send { command: String },
	/// Fill a command from the help tree and send it
	Invoke {
		name: String,
		/// Argument value as id=value, repeatable
		#[arg(long = "arg", value_parser = parse_arg)]
		args: Vec<(String, String)>,
	},
	/// Watch the projector's power state
	Power {
		/// Toggle the power once the current state is known
		#[arg(long)]
		press: bool,
	},
	/// Watch the active lighting scene
	Scenes,
	/// Move a zone for a while (zone 0 moves all zones)
	Zone {
		zone: u8,
		direction: Direction,
		#[arg(long, default_value_t = 500)]
		hold_ms: u64,
	},
	/// Run a macro and report its result
	Macro { name: String },
	/// Enable or disable the relay
	ToggleStatus,
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
	Up,
	Down,
}

fn parse_arg(raw: &str) -> Result<(String, String), String> {
	let (id, value) = raw
		.split_once('=')
		.ok_or_else(|| format!("expected id=value, got '{}'", raw))?;
	Ok((id.to_string(), value.to_string()))
}

fn load_config(cli: &Cli) -> anyhow::Result<PanelConfig> {
	let mut config = match &cli.config {
		Some(path) => PanelConfig::load(path)
			.with_context(|| format!("reading {}", path.display()))?,
		None => PanelConfig::default(),
	};
	if let Some(base_url) = &cli.base_url {
		config.relay.base_url = base_url.clone();
	}
	if let Some(device) = &cli.device {
		config.relay.device = device.clone();
	}
	if let Some(client_id) = &cli.client_id {
		config.relay.client_id = client_id.clone();
	}
	Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
		.with_writer(std::io::stderr)
		.init();

	let cli = Cli::parse();
	let config = load_config(&cli)?;
	let relay = RelayClient::from_settings(&config.relay)?;

	match cli.command {
		Commands::Devices => {
			for device in relay.list_devices().await? {
				println!("{}", device);
			}
		}
		Commands::Help { html: as_html, form } => {
			let mode = if form {
				RenderMode::Form
			} else {
				RenderMode::ReadOnly
			};
			let view = match relay.fetch_description().await {
				Ok(root) => HelpView::new(render(&root, mode)),
				Err(e) => {
					warn!(error = %e, "could not load command tree");
					HelpView::empty()
				}
			};
			if as_html {
				println!("{}", html::to_html(&view));
			} else {
				print!("{}", html::to_text(&view));
			}
		}
		Commands::Send { command } => {
			println!("{}", relay.send_command(&command).await?);
		}
		Commands::Invoke { name, args } => {
			let root = relay.fetch_description().await?;
			let leaf = root
				.find(&name)
				.ok_or_else(|| Error::UnknownCommand(name.clone()))?;
			let values: HashMap<String, String> = args.into_iter().collect();
			let command = leaf.command.fill(&values)?;
			println!("{}", relay.send_command(&command).await?);
		}
		Commands::Power { press } => {
			let handle = PowerPoller::new(relay, config.power.clone()).spawn();
			let mut view = handle.view();
			let mut pressed = !press;
			loop {
				tokio::select! {
					changed = view.changed() => {
						if changed.is_err() {
							break;
						}
						let current = view.borrow().clone();
						println!(
							"status={:?} wanted={:?} power={} status-light={} next poll in {}s",
							current.status,
							current.wanted,
							on_off(current.lights.power),
							on_off(current.lights.status),
							current.interval.as_secs()
						);
						if !pressed && current.can_press() {
							pressed = true;
							handle.press().await;
						}
					}
					_ = tokio::signal::ctrl_c() => break,
				}
			}
		}
		Commands::Scenes => {
			let mut view = SceneWatcher::new(relay, &config.scenes).spawn();
			loop {
				tokio::select! {
					changed = view.changed() => {
						if changed.is_err() {
							break;
						}
						let indicators: String = view
							.borrow()
							.indicators()
							.iter()
							.map(|lit| if *lit { '*' } else { '.' })
							.collect();
						println!("scenes {}", indicators);
					}
					_ = tokio::signal::ctrl_c() => break,
				}
			}
		}
		Commands::Zone {
			zone,
			direction,
			hold_ms,
		} => {
			let direction = match direction {
				Direction::Up => ZoneDirection::Up,
				Direction::Down => ZoneDirection::Down,
			};
			let button = ZoneButton::new(zone, direction);
			hold_zone(&relay, button, tokio::time::sleep(Duration::from_millis(hold_ms))).await;
		}
		Commands::Macro { name } => {
			let handle = MacroRunner::new(relay, &config.macros).spawn();
			let mut view = handle.view();
			handle.invoke(&name).await;
			loop {
				view.changed()
					.await
					.map_err(|_| anyhow!("macro runner stopped"))?;
				let status = view.borrow().status(&name);
				if let Some(status) = status {
					if status != MacroStatus::Loading {
						println!("{}: {}", name, status.icon());
						break;
					}
				}
			}
		}
		Commands::ToggleStatus => {
			toggle_status_then(&relay, || println!("relay status toggled, reload the panel")).await;
		}
	}
	Ok(())
}

fn on_off(lit: bool) -> &'static str {
	if lit {
		"on"
	} else {
		"off"
	}
}
