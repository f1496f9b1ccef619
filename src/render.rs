//! Turns a command tree into an abstract, toolkit-independent render tree.

use std::collections::HashSet;

use crate::tree::{CommandNode, LeafNode};

/// Identity sent with commands submitted from a help form
pub const FORM_CLIENT_ID: &str = "webForm";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Whether the help page lets the user submit commands
pub enum RenderMode {
	ReadOnly,
	Form,
}

/// Pre-order index of a group in its tree
pub type GroupId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
	Group {
		id: GroupId,
		title: String,
		children: Vec<Block>,
	},
	Command(CommandBlock),
}

#[derive(Debug, Clone, PartialEq)]
/// Text whose newlines are shown as line breaks
pub struct Text(pub Vec<String>);

impl Text {
	pub fn new(source: &str) -> Text {
		Text(source.split('\n').map(str::to_string).collect())
	}

	pub fn lines(&self) -> &[String] {
		&self.0
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandBlock {
	pub name: String,
	pub description: Option<Text>,
	pub format: String,
	pub args: Vec<ArgRow>,
	pub response: Option<Text>,
	pub examples: Option<Vec<ExampleRow>>,
	pub form: Option<FormSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgRow {
	pub label: String,
	pub value: Text,
	/// Name of the text input bound to this argument, form mode only
	pub input: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExampleRow {
	pub command: String,
	pub description: Text,
}

#[derive(Debug, Clone, PartialEq)]
/// Where and how a command form is submitted
pub struct FormSpec {
	pub action: String,
	pub method: String,
	pub target: String,
	pub hidden: Vec<(String, String)>,
}

impl FormSpec {
	fn for_format(format: &str) -> FormSpec {
		FormSpec {
			action: "../sendCommand".to_string(),
			method: "POST".to_string(),
			target: "_blank".to_string(),
			hidden: vec![
				("fromClient".to_string(), FORM_CLIENT_ID.to_string()),
				("command".to_string(), format.to_string()),
			],
		}
	}
}

/// Render a command tree. Groups are numbered in pre-order starting at 0.
pub fn render(node: &CommandNode, mode: RenderMode) -> Block {
	let mut next_id = 0;
	render_node(node, mode, &mut next_id)
}

fn render_node(node: &CommandNode, mode: RenderMode, next_id: &mut GroupId) -> Block {
	match node {
		CommandNode::Group(group) => {
			let id = *next_id;
			*next_id += 1;
			let children = group
				.commands
				.iter()
				.map(|child| render_node(child, mode, next_id))
				.collect();
			Block::Group {
				id,
				title: group.name.clone(),
				children,
			}
		}
		CommandNode::Leaf(leaf) => Block::Command(render_leaf(leaf, mode)),
	}
}

fn render_leaf(leaf: &LeafNode, mode: RenderMode) -> CommandBlock {
	let args = leaf
		.command
		.args
		.iter()
		.map(|arg| ArgRow {
			label: arg.id.clone(),
			value: Text::new(&arg.description),
			input: match mode {
				RenderMode::Form => Some(arg.id.clone()),
				RenderMode::ReadOnly => None,
			},
		})
		.collect();
	let examples = leaf.examples.as_ref().map(|examples| {
		examples
			.iter()
			.map(|example| ExampleRow {
				command: example.command.clone(),
				description: Text::new(&example.description),
			})
			.collect()
	});

	CommandBlock {
		name: leaf.name.clone(),
		description: leaf.description.as_deref().map(Text::new),
		format: leaf.command.format.clone(),
		args,
		response: leaf.response.as_ref().map(|r| Text::new(&r.description)),
		examples,
		form: match mode {
			RenderMode::Form => Some(FormSpec::for_format(&leaf.command.format)),
			RenderMode::ReadOnly => None,
		},
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderClass {
	Contracted,
	Expanded,
}

impl HeaderClass {
	pub fn css(&self) -> &'static str {
		match self {
			HeaderClass::Contracted => "group-contracted",
			HeaderClass::Expanded => "group-expanded",
		}
	}
}

#[derive(Debug, Clone, Default)]
/// A rendered help panel together with which groups are expanded
pub struct HelpView {
	root: Option<Block>,
	expanded: HashSet<GroupId>,
}

impl HelpView {
	/// Every group starts collapsed
	pub fn new(root: Block) -> HelpView {
		HelpView {
			root: Some(root),
			expanded: HashSet::new(),
		}
	}

	/// The panel left behind when the command tree could not be loaded
	pub fn empty() -> HelpView {
		HelpView::default()
	}

	pub fn root(&self) -> Option<&Block> {
		self.root.as_ref()
	}

	pub fn is_empty(&self) -> bool {
		self.root.is_none()
	}

	/// Flip one group. Nested groups keep their own state.
	pub fn toggle(&mut self, id: GroupId) {
		if !self.expanded.remove(&id) && self.contains_group(id) {
			self.expanded.insert(id);
		}
	}

	pub fn header_class(&self, id: GroupId) -> HeaderClass {
		if self.expanded.contains(&id) {
			HeaderClass::Expanded
		} else {
			HeaderClass::Contracted
		}
	}

	/// Whether the direct command children of a group are shown
	pub fn children_visible(&self, id: GroupId) -> bool {
		self.expanded.contains(&id)
	}

	fn contains_group(&self, id: GroupId) -> bool {
		fn walk(block: &Block, id: GroupId) -> bool {
			match block {
				Block::Group {
					id: group, children, ..
				} => *group == id || children.iter().any(|c| walk(c, id)),
				Block::Command(_) => false,
			}
		}
		self.root.as_ref().map_or(false, |root| walk(root, id))
	}
}
