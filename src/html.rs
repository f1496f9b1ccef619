//! Materialises a [`HelpView`] as HTML markup or as a plain-text outline.

use std::fmt::Write;

use crate::render::{Block, CommandBlock, HelpView, Text};

fn escape(source: &str) -> String {
	let mut out = String::with_capacity(source.len());
	for c in source.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#39;"),
			_ => out.push(c),
		}
	}
	out
}

fn text(value: &Text) -> String {
	value
		.lines()
		.iter()
		.map(|line| escape(line))
		.collect::<Vec<_>>()
		.join("<br />")
}

fn label_value(out: &mut String, label: &str, value: &str) {
	let _ = write!(
		out,
		"<span class=\"command-label\">{}</span><span class=\"command-value\">{}</span>",
		label, value
	);
}

pub fn to_html(view: &HelpView) -> String {
	let mut out = String::new();
	if let Some(root) = view.root() {
		block_html(view, root, true, &mut out);
	}
	out
}

fn block_html(view: &HelpView, block: &Block, visible: bool, out: &mut String) {
	match block {
		Block::Group {
			id,
			title,
			children,
		} => {
			let _ = write!(
				out,
				"<div class=\"group-container\"><h2 class=\"{}\">{}</h2>",
				view.header_class(*id).css(),
				escape(title)
			);
			for child in children {
				block_html(view, child, view.children_visible(*id), out);
			}
			out.push_str("</div>");
		}
		Block::Command(command) => command_html(command, visible, out),
	}
}

fn command_html(command: &CommandBlock, visible: bool, out: &mut String) {
	if visible {
		out.push_str("<div class=\"command-container\">");
	} else {
		out.push_str("<div class=\"command-container\" style=\"display:none\">");
	}
	if let Some(form) = &command.form {
		let _ = write!(
			out,
			"<form action=\"{}\" method=\"{}\" target=\"{}\">",
			escape(&form.action),
			escape(&form.method),
			escape(&form.target)
		);
		for (name, value) in &form.hidden {
			let _ = write!(
				out,
				"<input type=\"hidden\" name=\"{}\" value=\"{}\" />",
				escape(name),
				escape(value)
			);
		}
	}
	let _ = write!(out, "<div class=\"command-name\">{}</div>", escape(&command.name));
	if let Some(description) = &command.description {
		let _ = write!(out, "<div class=\"command-description\">{}</div>", text(description));
	}

	out.push_str("<div class=\"command-format\">");
	label_value(out, "Format", &escape(&command.format));
	out.push_str("<div class=\"command-args\">");
	for arg in &command.args {
		out.push_str("<div class=\"command-arg\">");
		label_value(out, &escape(&arg.label), &text(&arg.value));
		if let Some(input) = &arg.input {
			let _ = write!(out, "<input type=\"text\" size=\"6\" name=\"{}\" />", escape(input));
		}
		out.push_str("</div>");
	}
	out.push_str("</div></div>");

	if command.form.is_some() {
		out.push_str("<input type=\"submit\" value=\"Send\" /></form>");
	}

	if let Some(response) = &command.response {
		out.push_str("<div class=\"command-response\">");
		label_value(out, "Response", &text(response));
		out.push_str("</div>");
	}
	if let Some(examples) = &command.examples {
		out.push_str("<div class=\"command-examples\"><span class=\"command-label\">Examples</span><div class=\"command-example-list\">");
		for example in examples {
			out.push_str("<div class=\"command-example\">");
			label_value(out, &escape(&example.command), &text(&example.description));
			out.push_str("</div>");
		}
		out.push_str("</div></div>");
	}
	out.push_str("</div>");
}

/// Indented outline of the whole tree, ignoring collapsed state
pub fn to_text(view: &HelpView) -> String {
	let mut out = String::new();
	if let Some(root) = view.root() {
		block_text(root, 0, &mut out);
	}
	out
}

fn block_text(block: &Block, depth: usize, out: &mut String) {
	let indent = "  ".repeat(depth);
	match block {
		Block::Group { title, children, .. } => {
			let _ = writeln!(out, "{}[{}]", indent, title);
			for child in children {
				block_text(child, depth + 1, out);
			}
		}
		Block::Command(command) => {
			let _ = writeln!(out, "{}{}  `{}`", indent, command.name, command.format);
			if let Some(description) = &command.description {
				for line in description.lines() {
					let _ = writeln!(out, "{}    {}", indent, line);
				}
			}
			for arg in &command.args {
				let _ = writeln!(out, "{}    {}: {}", indent, arg.label, arg.value.lines().join(" / "));
			}
			if let Some(response) = &command.response {
				let _ = writeln!(out, "{}    -> {}", indent, response.lines().join(" / "));
			}
			for example in command.examples.iter().flatten() {
				let _ = writeln!(out, "{}    e.g. {}  {}", indent, example.command, example.description.lines().join(" / "));
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::render::{render, RenderMode};
	use crate::tree::CommandNode;

	fn view(mode: RenderMode) -> HelpView {
		let root = CommandNode::parse(
			r#"{
			"name": "Projector",
			"commands": [
				{
					"name": "Power <on>",
					"command": {"format": "PWR ON", "args": [{"id": "delay", "description": "seconds\nmax 9"}]},
					"response": {"description": "nothing"},
					"examples": [{"command": "PWR ON", "description": "turn on"}]
				}
			]
		}"#,
		)
		.unwrap();
		HelpView::new(render(&root, mode))
	}

	#[test]
	fn collapsed_groups_hide_their_commands() {
		let html = to_html(&view(RenderMode::ReadOnly));
		assert!(html.contains("<h2 class=\"group-contracted\">Projector</h2>"));
		assert!(html.contains("<div class=\"command-container\" style=\"display:none\">"));
	}

	#[test]
	fn expanded_group_shows_commands() {
		let mut view = view(RenderMode::ReadOnly);
		view.toggle(0);
		let html = to_html(&view);
		assert!(html.contains("group-expanded"));
		assert!(html.contains("<div class=\"command-container\">"));
	}

	#[test]
	fn text_is_escaped_and_broken_into_lines() {
		let html = to_html(&view(RenderMode::ReadOnly));
		assert!(html.contains("Power &lt;on&gt;"));
		assert!(html.contains("seconds<br />max 9"));
		assert!(html.contains("command-example-list"));
		assert!(!html.contains("<form"));
	}

	#[test]
	fn form_variant_has_inputs() {
		let html = to_html(&view(RenderMode::Form));
		assert!(html.contains("<form action=\"../sendCommand\" method=\"POST\" target=\"_blank\">"));
		assert!(html.contains("<input type=\"hidden\" name=\"command\" value=\"PWR ON\" />"));
		assert!(html.contains("<input type=\"text\" size=\"6\" name=\"delay\" />"));
	}

	#[test]
	fn empty_view_renders_nothing() {
		assert_eq!(to_html(&HelpView::empty()), "");
		assert_eq!(to_text(&HelpView::empty()), "");
	}

	#[test]
	fn outline_lists_commands() {
		let outline = to_text(&view(RenderMode::ReadOnly));
		assert!(outline.starts_with("[Projector]\n"));
		assert!(outline.contains("  Power <on>  `PWR ON`"));
	}
}
