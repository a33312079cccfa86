use std::io::{self, Write};

use crate::power::PowerReading;
use crate::tree::{CallTree, MethodNode, TreeNode};

/// Formats the power line shown above the call tree
pub fn format_power_line(reading: &PowerReading) -> String {
	if !reading.calibrated {
		return "Power:   0.00 W (uncalibrated)".to_string();
	}

	let utilization = reading.utilization.unwrap_or(0.0) * 100.0;
	format!(
		"Power: {:6.2} W | Average: {:6.2} W | CPU: {:5.1} %",
		reading.instantaneous, reading.average, utilization
	)
}

/// Renders every thread and method of `tree` as indented lines
pub fn render_call_tree(tree: &CallTree) -> Vec<String> {
	let mut lines = Vec::new();
	for thread in tree.threads().iter() {
		lines.push(format!(
			"Thread: {}  {} ms  {:.2} J  {:.2} W",
			thread.name(),
			thread.total_time(),
			thread.total_energy(),
			thread.average_power()
		));
		for child in thread.children().iter() {
			render_method(child, 1, &mut lines);
		}
	}
	lines
}

fn render_method(node: &MethodNode, depth: usize, lines: &mut Vec<String>) {
	lines.push(format!(
		"{:indent$}{}  {} ms  {:.2} J  {:.2} W",
		"",
		node.name(),
		node.total_time(),
		node.total_energy(),
		node.average_power(),
		indent = depth * 2
	));
	for child in node.children().iter() {
		render_method(child, depth + 1, lines);
	}
}

/// Redraws the power line and call tree in place
///
/// `previous_lines` is the value returned by the previous call, so the
/// cursor can move back over the old output. Returns the number of lines
/// written.
pub fn display_power_readings(reading: &PowerReading, tree: &CallTree, previous_lines: usize) -> io::Result<usize> {
	let mut stdout = io::stdout().lock();

	if previous_lines > 0 {
		write!(stdout, "\x1B[{previous_lines}A")?; // Move cursor up
	}

	let mut lines = vec![format_power_line(reading)];
	lines.extend(render_call_tree(tree));

	for line in &lines {
		write!(stdout, "\x1B[2K")?; // Clear line
		writeln!(stdout, "{line}")?;
	}

	// Blank out leftovers if the output got shorter
	for _ in lines.len()..previous_lines {
		write!(stdout, "\x1B[2K")?;
		writeln!(stdout)?;
	}

	stdout.flush()?;
	Ok(lines.len().max(previous_lines))
}
