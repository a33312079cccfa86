//! Per-thread call trees that accumulate invocation time and energy.
//!
//! Each [`ThreadNode`] is a root owning [`MethodNode`] children, which may
//! themselves own nested method nodes. Ownership runs strictly top-down;
//! every node also keeps a weak link to its parent for navigation.
//!
//! Counters on a single node are updated atomically. A `clear()` that races
//! with recording threads is best effort: a reader may observe part of the
//! tree already reset while another part still holds old totals.

pub mod call_tree;
pub mod counters;
pub mod method;
pub mod thread;

use std::sync::{Arc, Weak};

pub use call_tree::CallTree;
pub use method::MethodNode;
pub use thread::ThreadNode;

/// Snapshot of a node's children
pub type Children = Arc<Vec<Arc<MethodNode>>>;

/// Read access shared by thread and method nodes
pub trait TreeNode {
	fn name(&self) -> &str;

	fn children(&self) -> Children;

	/// First child with the given name
	fn child(&self, name: &str) -> Option<Arc<MethodNode>>;

	fn has_children(&self) -> bool {
		!self.children().is_empty()
	}

	/// Always `None` for thread roots
	fn parent(&self) -> Option<ParentNode>;

	/// Accumulated invocation time in milliseconds
	fn total_time(&self) -> u64;

	/// Accumulated energy in joules
	fn total_energy(&self) -> f64;

	/// Average power in watts; 0 when no time has accumulated
	fn average_power(&self) -> f64;
}

/// The node directly above a method node
#[derive(Debug, Clone)]
pub enum ParentNode {
	Thread(Arc<ThreadNode>),
	Method(Arc<MethodNode>),
}

impl ParentNode {
	pub fn name(&self) -> &str {
		match self {
			ParentNode::Thread(node) => node.name(),
			ParentNode::Method(node) => node.name(),
		}
	}
}

/// Non-owning link from a method node to its parent
#[derive(Debug, Clone)]
pub(crate) enum ParentLink {
	Thread(Weak<ThreadNode>),
	Method(Weak<MethodNode>),
}

impl ParentLink {
	pub(crate) fn upgrade(&self) -> Option<ParentNode> {
		match self {
			ParentLink::Thread(weak) => weak.upgrade().map(ParentNode::Thread),
			ParentLink::Method(weak) => weak.upgrade().map(ParentNode::Method),
		}
	}
}
