use thiserror::Error;

#[derive(Debug, Error)]
/// Everything that can go wrong while talking to the relay or reading its documents
pub enum Error {
	#[error("relay request failed: {0}")]
	Http(#[from] reqwest::Error),
	#[error("malformed JSON document: {0}")]
	Json(#[from] serde_json::Error),
	#[error("invalid configuration: {0}")]
	Config(#[from] toml::de::Error),
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
	#[error("invalid relay URL: {0}")]
	Url(#[from] url::ParseError),
	/// A `{placeholder}` in a command format had no value
	#[error("missing argument '{0}' for command")]
	MissingArgument(String),
	/// A command format contains an unbalanced brace
	#[error("malformed command format '{0}'")]
	BadFormat(String),
	/// No leaf command with that name exists in the command tree
	#[error("unknown command '{0}'")]
	UnknownCommand(String),
}

pub type Result<T> = std::result::Result<T, Error>;
