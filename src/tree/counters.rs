use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::tree::TreeNode;
use crate::util::millis_to_seconds;

/// Invocation time and energy accumulated by one node
///
/// Time is in milliseconds, energy in joules. Energy is kept as the bit
/// pattern of an `f64` so increments from racing threads are never lost.
#[derive(Debug, Default)]
pub struct NodeCounters {
	total_time: AtomicU64,
	total_energy: AtomicU64,
}

impl NodeCounters {
	pub fn total_time(&self) -> u64 {
		self.total_time.load(Ordering::Acquire)
	}

	pub fn total_energy(&self) -> f64 {
		f64::from_bits(self.total_energy.load(Ordering::Acquire))
	}

	/// Negative values are ignored
	pub fn set_total_time(&self, time: i64) {
		if let Ok(time) = u64::try_from(time) {
			self.total_time.store(time, Ordering::Release);
		}
	}

	pub fn increment_total_time(&self, delta: u64) {
		let _ = self
			.total_time
			.fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| Some(t.saturating_add(delta)));
	}

	/// Only finite, strictly positive deltas are added
	pub fn increment_total_energy(&self, delta: f64) {
		if !(delta > 0.0 && delta.is_finite()) {
			return;
		}
		let _ = self
			.total_energy
			.fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
				Some((f64::from_bits(bits) + delta).to_bits())
			});
	}

	/// Only finite, non-negative values are stored
	pub fn set_total_energy(&self, energy: f64) {
		if energy >= 0.0 && energy.is_finite() {
			self.total_energy.store(energy.to_bits(), Ordering::Release);
		}
	}

	/// Energy per second of accumulated time; 0 when no time has accumulated
	pub fn average_power(&self) -> f64 {
		let time = self.total_time();
		if time == 0 {
			return 0.0;
		}
		self.total_energy() / millis_to_seconds(time)
	}

	pub fn clear(&self) {
		self.total_time.store(0, Ordering::Release);
		self.total_energy.store(0f64.to_bits(), Ordering::Release);
	}
}

/// Copy-on-write list of nodes
///
/// Readers take a cheap snapshot and iterate it without holding the lock, so
/// appends never disturb an iteration in progress.
#[derive(Debug)]
pub struct NodeList<T> {
	nodes: RwLock<Arc<Vec<Arc<T>>>>,
}

impl<T> Default for NodeList<T> {
	fn default() -> Self {
		Self {
			nodes: RwLock::new(Arc::new(Vec::new())),
		}
	}
}

impl<T: TreeNode> NodeList<T> {
	pub fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
		self.nodes.read().unwrap_or_else(PoisonError::into_inner).clone()
	}

	/// First node with the given name
	pub fn find(&self, name: &str) -> Option<Arc<T>> {
		self.snapshot().iter().find(|node| node.name() == name).cloned()
	}

	pub fn push(&self, node: Arc<T>) {
		let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
		Arc::make_mut(&mut *nodes).push(node);
	}

	/// Returns the node named `name`, creating it with `make` if absent
	///
	/// Lookup and insertion happen under one write lock, so two threads
	/// observing the same new name end up sharing a single node.
	pub fn get_or_insert_with(&self, name: &str, make: impl FnOnce() -> Arc<T>) -> Arc<T> {
		if let Some(node) = self.find(name) {
			return node;
		}

		let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
		if let Some(node) = nodes.iter().find(|node| node.name() == name) {
			return node.clone();
		}
		let node = make();
		Arc::make_mut(&mut *nodes).push(node.clone());
		node
	}

	pub fn len(&self) -> usize {
		self.snapshot().len()
	}

	pub fn is_empty(&self) -> bool {
		self.snapshot().is_empty()
	}
}
