use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock, Weak};

use crate::error::TreeError;
use crate::tree::counters::{NodeCounters, NodeList};
use crate::tree::{Children, ParentLink, ParentNode, TreeNode};

/// One method observed along a call path of a thread
#[derive(Debug)]
pub struct MethodNode {
	name: String,
	this: Weak<MethodNode>,
	parent: OnceLock<ParentLink>,
	children: NodeList<MethodNode>,
	counters: NodeCounters,
}

impl MethodNode {
	/// Creates a detached method node with zero counters
	pub fn new(name: impl Into<String>) -> Arc<Self> {
		let name = name.into();
		Arc::new_cyclic(|this| Self {
			name,
			this: this.clone(),
			parent: OnceLock::new(),
			children: NodeList::default(),
			counters: NodeCounters::default(),
		})
	}

	/// Appends `node` as a child of this method
	///
	/// Sibling names are not checked; lookups return the first match. A node
	/// that already has a parent, or that is this node or one of its
	/// ancestors, is rejected.
	pub fn add_child(&self, node: Arc<MethodNode>) -> Result<(), TreeError> {
		if self.is_self_or_ancestor(&node) {
			return Err(TreeError::WouldCycle(node.name.clone()));
		}
		if !node.attach(ParentLink::Method(self.this.clone())) {
			return Err(TreeError::AlreadyAttached(node.name.clone()));
		}
		self.children.push(node);
		Ok(())
	}

	/// Returns the child named `name`, creating it on first observation
	pub fn get_or_add_child(&self, name: &str) -> Arc<MethodNode> {
		self.children.get_or_insert_with(name, || {
			let node = MethodNode::new(name);
			node.attach(ParentLink::Method(self.this.clone()));
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

	/// Time spent in this method excluding its children
	pub fn self_time(&self) -> u64 {
		let children: u64 = self.children().iter().map(|c| c.total_time()).sum();
		self.total_time().saturating_sub(children)
	}

	/// Records one invocation on this node and every ancestor up to the
	/// owning thread
	pub fn record(&self, time_ms: u64, energy_j: f64) {
		self.counters.increment_total_time(time_ms);
		self.counters.increment_total_energy(energy_j);

		let mut next = self.parent();
		while let Some(parent) = next {
			match parent {
				ParentNode::Method(method) => {
					method.counters.increment_total_time(time_ms);
					method.counters.increment_total_energy(energy_j);
					next = method.parent();
				},
				ParentNode::Thread(thread) => {
					thread.increment_total_time(time_ms);
					thread.increment_total_energy(energy_j);
					next = None;
				},
			}
		}
	}

	/// Resets time and energy on this node and all of its descendants
	pub fn clear(&self) {
		self.counters.clear();
		for child in self.children().iter() {
			child.clear();
		}
	}

	/// Links this node to its parent; fails if it already has one
	pub(crate) fn attach(&self, link: ParentLink) -> bool {
		self.parent.set(link).is_ok()
	}

	fn is_self_or_ancestor(&self, node: &Arc<MethodNode>) -> bool {
		if std::ptr::eq(Arc::as_ptr(node), self) {
			return true;
		}
		let mut next = self.parent();
		while let Some(ParentNode::Method(method)) = next {
			if Arc::ptr_eq(&method, node) {
				return true;
			}
			next = method.parent();
		}
		false
	}
}

impl TreeNode for MethodNode {
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
		self.parent.get().and_then(ParentLink::upgrade)
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

impl PartialEq for MethodNode {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name
	}
}

impl Eq for MethodNode {}

impl Hash for MethodNode {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.name.hash(state);
	}
}

impl fmt::Display for MethodNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}\t{}", self.name, self.total_time())
	}
}

#[cfg(test)]
mod tests {
	use approx::assert_abs_diff_eq;

	use super::*;

	#[test]
	fn fresh_node_has_zero_counters() {
		let node = MethodNode::new("run");
		assert_eq!(node.total_time(), 0);
		assert_eq!(node.total_energy(), 0.0);
		assert_eq!(node.average_power(), 0.0);
		assert!(!node.has_children());
		assert!(node.parent().is_none());
	}

	#[test]
	fn negative_time_leaves_fresh_node_at_zero() {
		let node = MethodNode::new("run");
		node.set_total_time(-5);
		assert_eq!(node.total_time(), 0);
	}

	#[test]
	fn children_are_found_by_name() {
		let root = MethodNode::new("main");
		root.add_child(MethodNode::new("parse")).unwrap();
		root.add_child(MethodNode::new("render")).unwrap();

		let parse = root.child("parse").unwrap();
		assert_eq!(parse.name(), "parse");
		assert_eq!(parse.parent().unwrap().name(), "main");
		assert!(root.child("missing").is_none());
		assert!(root.has_children());
	}

	#[test]
	fn duplicate_names_keep_first_match() {
		let root = MethodNode::new("main");
		let first = MethodNode::new("dup");
		first.set_total_time(1);
		root.add_child(first).unwrap();
		root.add_child(MethodNode::new("dup")).unwrap();

		assert_eq!(root.children().len(), 2);
		assert_eq!(root.child("dup").unwrap().total_time(), 1);
	}

	#[test]
	fn rejects_second_parent_and_cycles() {
		let a = MethodNode::new("a");
		let b = MethodNode::new("b");
		let c = MethodNode::new("c");
		a.add_child(b.clone()).unwrap();
		b.add_child(c.clone()).unwrap();

		assert_eq!(a.add_child(c.clone()), Err(TreeError::AlreadyAttached("c".to_string())));
		assert_eq!(c.add_child(a.clone()), Err(TreeError::WouldCycle("a".to_string())));
		assert_eq!(a.add_child(a.clone()), Err(TreeError::WouldCycle("a".to_string())));
	}

	#[test]
	fn record_propagates_to_ancestors() {
		let outer = MethodNode::new("outer");
		let inner = outer.get_or_add_child("inner");
		inner.record(30, 1.5);
		outer.record(10, 0.5);

		assert_eq!(inner.total_time(), 30);
		assert_eq!(outer.total_time(), 40);
		assert_abs_diff_eq!(outer.total_energy(), 2.0);
		assert_eq!(outer.self_time(), 10);
	}

	#[test]
	fn clear_resets_subtree() {
		let outer = MethodNode::new("outer");
		let inner = outer.get_or_add_child("inner");
		let leaf = inner.get_or_add_child("leaf");
		leaf.record(25, 2.0);

		outer.clear();
		for node in [&outer, &inner, &leaf] {
			assert_eq!(node.total_time(), 0);
			assert_eq!(node.total_energy(), 0.0);
		}
	}

	#[test]
	fn equality_is_by_name() {
		let a = MethodNode::new("same");
		let b = MethodNode::new("same");
		b.set_total_time(99);
		assert_eq!(*a, *b);
		assert_ne!(*a, *MethodNode::new("other"));
		assert_eq!(b.to_string(), "same\t99");
	}
}
