//! The command-tree document a device publishes as `frontEnd/device.json`.

use std::collections::HashMap;

use crate::{Error, Result};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
/// A node of the command tree: either a named group of further nodes or a single command
pub enum CommandNode {
	Group(GroupNode),
	Leaf(LeafNode),
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GroupNode {
	pub name: String,
	pub commands: Vec<CommandNode>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LeafNode {
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	pub command: LeafCommand,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub response: Option<ResponseDoc>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub examples: Option<Vec<Example>>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
/// How to invoke a command on the device
pub struct LeafCommand {
	/// Wire template, `{id}` marks where an argument goes
	pub format: String,
	#[serde(default)]
	pub args: Vec<Arg>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Arg {
	pub id: String,
	#[serde(default)]
	pub description: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ResponseDoc {
	#[serde(default)]
	pub description: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Example {
	pub command: String,
	#[serde(default)]
	pub description: String,
}

impl CommandNode {
	pub fn parse(document: &str) -> Result<CommandNode> {
		Ok(serde_json::from_str(document)?)
	}

	pub fn name(&self) -> &str {
		match self {
			CommandNode::Group(group) => &group.name,
			CommandNode::Leaf(leaf) => &leaf.name,
		}
	}

	/// All leaf commands in document order
	pub fn leaves(&self) -> Vec<&LeafNode> {
		let mut found = Vec::new();
		self.collect_leaves(&mut found);
		found
	}

	fn collect_leaves<'a>(&'a self, found: &mut Vec<&'a LeafNode>) {
		match self {
			CommandNode::Group(group) => {
				for child in &group.commands {
					child.collect_leaves(found);
				}
			}
			CommandNode::Leaf(leaf) => found.push(leaf),
		}
	}

	/// First leaf with the given name, searched depth-first
	pub fn find(&self, name: &str) -> Option<&LeafNode> {
		self.leaves().into_iter().find(|leaf| leaf.name == name)
	}
}

impl LeafCommand {
	/// Substitute every `{id}` in the format with its value, the way the relay does for form submissions.
	pub fn fill(&self, values: &HashMap<String, String>) -> Result<String> {
		let mut filled = String::with_capacity(self.format.len());
		let mut chars = self.format.chars().peekable();
		while let Some(c) = chars.next() {
			match c {
				'{' if chars.peek() == Some(&'{') => {
					chars.next();
					filled.push('{');
				}
				'}' if chars.peek() == Some(&'}') => {
					chars.next();
					filled.push('}');
				}
				'{' => {
					let mut key = String::new();
					loop {
						match chars.next() {
							Some('}') => break,
							Some(k) => key.push(k),
							None => return Err(Error::BadFormat(self.format.clone())),
						}
					}
					let value = values
						.get(&key)
						.ok_or_else(|| Error::MissingArgument(key.clone()))?;
					filled.push_str(value);
				}
				'}' => return Err(Error::BadFormat(self.format.clone())),
				_ => filled.push(c),
			}
		}
		Ok(filled)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const DOCUMENT: &str = r#"{
		"name": "Epson 5030UB",
		"commands": [
			{
				"name": "Power",
				"commands": [
					{
						"name": "Power query",
						"description": "Ask for the power state",
						"command": {"format": "PWR?", "args": []},
						"response": {"description": "PWR=00 off\nPWR=01 on"}
					}
				]
			},
			{
				"name": "Set source",
				"command": {
					"format": "SOURCE {source}",
					"args": [{"id": "source", "description": "input id"}]
				},
				"examples": [{"command": "SOURCE 30", "description": "HDMI1"}]
			}
		]
	}"#;

	#[test]
	fn group_and_leaf_are_told_apart() {
		let root = CommandNode::parse(DOCUMENT).unwrap();
		let group = match &root {
			CommandNode::Group(group) => group,
			CommandNode::Leaf(_) => panic!("root should be a group"),
		};
		assert_eq!(group.commands.len(), 2);
		assert!(matches!(group.commands[0], CommandNode::Group(_)));
		assert!(matches!(group.commands[1], CommandNode::Leaf(_)));
	}

	#[test]
	fn optional_parts_stay_absent() {
		let root = CommandNode::parse(DOCUMENT).unwrap();
		let query = root.find("Power query").unwrap();
		assert!(query.examples.is_none());
		assert!(query.response.is_some());
		let source = root.find("Set source").unwrap();
		assert!(source.description.is_none());
		assert!(source.response.is_none());
	}

	#[test]
	fn leaves_come_in_document_order() {
		let root = CommandNode::parse(DOCUMENT).unwrap();
		let names: Vec<&str> = root.leaves().iter().map(|l| l.name.as_str()).collect();
		assert_eq!(names, vec!["Power query", "Set source"]);
	}

	#[test]
	fn node_of_neither_shape_is_rejected() {
		assert!(CommandNode::parse(r#"{"name": "nothing"}"#).is_err());
	}

	#[test]
	fn fill_substitutes_arguments() {
		let command = LeafCommand {
			format: "{input}SRC {level}".to_string(),
			args: vec![],
		};
		let mut values = HashMap::new();
		values.insert("input".to_string(), "HD".to_string());
		values.insert("level".to_string(), "5".to_string());
		assert_eq!(command.fill(&values).unwrap(), "HDSRC 5");
	}

	#[test]
	fn fill_reports_missing_argument() {
		let command = LeafCommand {
			format: "VOL {level}".to_string(),
			args: vec![],
		};
		match command.fill(&HashMap::new()) {
			Err(Error::MissingArgument(key)) => assert_eq!(key, "level"),
			other => panic!("unexpected {:?}", other),
		}
	}

	#[test]
	fn fill_keeps_escaped_braces() {
		let command = LeafCommand {
			format: "{{raw}}".to_string(),
			args: vec![],
		};
		assert_eq!(command.fill(&HashMap::new()).unwrap(), "{raw}");
	}
}
