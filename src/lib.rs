#[macro_use]
extern crate serde_derive;
extern crate reqwest;
extern crate serde;
extern crate serde_json;
pub mod error;
pub use error::{Error, Result};
pub mod config;
pub use config::PanelConfig;
pub mod tree;
pub use tree::CommandNode;
pub mod render;
pub mod html;
pub mod relay;
pub use relay::RelayClient;
pub mod power;
pub mod scene;
pub mod macros;
