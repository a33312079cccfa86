use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use crate::error::TreeError;
use crate::tree::counters::{NodeCounters, NodeList};
use crate::tree::{Children, MethodNode, ParentLink, ParentNode, TreeNode};

/// Root of one thread's method call tree
#[derive(Debug)]
pub struct ThreadNode {
	name: String,
	this: Weak<ThreadNode>,
	children: NodeList<MethodNode>,
	counters: NodeCounters,
}

impl ThreadNode {
	pub fn new(name: impl Into<String>) -> Arc<Self> {
		let name = name.into();
		Arc::new_cyclic(|this| Self {
			name,
			this: this.clone(),
			children: NodeList::default(),
			counters: NodeCounters::default(),
		})
	}

	/// Appends a top-level method node; sibling names are not checked
	pub fn add_child(&self, node: Arc<MethodNode>) -> Result<(), TreeError> {
		if !node.attach(ParentLink::Thread(self.this.clone())) {
			return Err(TreeError::AlreadyAttached(node.name().to_string()));
		}
		self.children.push(node);
		Ok(())
	}

	/// Returns the top-level method named `name`, creating it if needed
	pub fn get_or_add_child(&self, name: &str) -> Arc<MethodNode> {
		self.children.get_or_insert_with(name, || {
			let node = MethodNode::new(name);
			node.attach(ParentLink::Thread(self.this.clone()));
			node
		})
	}

	/// Sets the total invocation time; negative values are ignored
	pub fn set_total_time(&self, time: i64) {
		self.counters.set_total_time(time);
	}

	pub fn increment_total_time(&self, delta: u64) {
		self.counters.increment_total_time(delta);
	}

	/// Adds to the total energy; non-positive or non-finite deltas are ignored
	pub fn increment_total_energy(&self, energy: f64) {
		self.counters.increment_total_energy(energy);
	}

	/// Sets the total energy; negative or non-finite values are ignored
	pub fn set_total_energy(&self, energy: f64) {
		self.counters.set_total_energy(energy);
	}

	/// Records an invocation at the end of `path`, creating missing method
	/// nodes along the way. An empty path charges the thread itself.
	pub fn record_invocation(&self, path: &[&str], time_ms: u64, energy_j: f64) {
		let Some((first, rest)) = path.split_first() else {
			self.increment_total_time(time_ms);
			self.increment_total_energy(energy_j);
			return;
		};

		let mut node = self.get_or_add_child(first);
		for name in rest {
			node = node.get_or_add_child(name);
		}
		node.record(time_ms, energy_j);
	}

	/// Resets time and energy on the thread and every method below it
	pub fn clear(&self) {
		self.counters.clear();
		for child in self.children().iter() {
			child.clear();
		}
	}
}

impl TreeNode for ThreadNode {
	fn name(&self) -> &str {
		&self.name
	}

	fn children(&self) -> Children {
		self.children.snapshot()
	}

	fn child(&self, name: &str) -> Option<Arc<MethodNode>> {
		self.children.find(name)
	}

	fn parent(&self) -> Option<ParentNode> {
		None
	}

	fn total_time(&self) -> u64 {
		self.counters.total_time()
	}

	fn total_energy(&self) -> f64 {
		self.counters.total_energy()
	}

	fn average_power(&self) -> f64 {
		self.counters.average_power()
	}
}

impl PartialEq for ThreadNode {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name
	}
}

impl Eq for ThreadNode {}

impl Hash for ThreadNode {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.name.hash(state);
	}
}

impl fmt::Display for ThreadNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Thread: {}\t{}", self.name, self.total_time())
	}
}
