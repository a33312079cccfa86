use std::sync::Arc;

use crate::tree::counters::NodeList;
use crate::tree::{ThreadNode, TreeNode};

/// All thread call trees of one profiling session
#[derive(Debug, Default)]
pub struct CallTree {
	threads: NodeList<ThreadNode>,
}

impl CallTree {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the thread named `name`, creating it when first observed
	pub fn thread(&self, name: &str) -> Arc<ThreadNode> {
		self.threads.get_or_insert_with(name, || ThreadNode::new(name))
	}

	pub fn get_thread(&self, name: &str) -> Option<Arc<ThreadNode>> {
		self.threads.find(name)
	}

	/// Snapshot of every known thread
	pub fn threads(&self) -> Arc<Vec<Arc<ThreadNode>>> {
		self.threads.snapshot()
	}

	/// Records one invocation of the method at the end of `path` on `thread`
	pub fn record_invocation(&self, thread: &str, path: &[&str], time_ms: u64, energy_j: f64) {
		self.thread(thread).record_invocation(path, time_ms, energy_j);
	}

	/// Charges `elapsed_ms` at a sampled power of `watts` to a call path
	pub fn attribute_energy(&self, thread: &str, path: &[&str], watts: f64, elapsed_ms: u64) {
		let energy_j = watts * crate::util::millis_to_seconds(elapsed_ms);
		self.record_invocation(thread, path, elapsed_ms, energy_j);
	}

	/// Total energy over all threads in joules
	pub fn total_energy(&self) -> f64 {
		self.threads().iter().map(|t| t.total_energy()).sum()
	}

	/// Resets every thread and method in the session
	pub fn clear(&self) {
		for thread in self.threads().iter() {
			thread.clear();
		}
	}

	pub fn len(&self) -> usize {
		self.threads.len()
	}

	pub fn is_empty(&self) -> bool {
		self.threads.is_empty()
	}
}
