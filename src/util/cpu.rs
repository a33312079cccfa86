use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

/// Source of the two clocks a power sampler compares
pub trait CpuClock: Send + Sync {
	/// Monotonic wall clock in nanoseconds
	fn now_nanos(&self) -> u64;

	/// CPU time consumed so far by this process, in nanoseconds
	///
	/// Returns `None` when the platform cannot report it.
	fn process_cpu_time_nanos(&self) -> Option<u64>;
}

/// Reads the CPU time of the current process from the operating system
#[derive(Debug, Clone)]
pub struct ProcessCpuClock {
	origin: Instant,
}

impl ProcessCpuClock {
	pub fn new() -> Self {
		Self { origin: Instant::now() }
	}
}

impl Default for ProcessCpuClock {
	fn default() -> Self {
		Self::new()
	}
}

impl CpuClock for ProcessCpuClock {
	fn now_nanos(&self) -> u64 {
		u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
	}

	fn process_cpu_time_nanos(&self) -> Option<u64> {
		read_process_cpu_time_nanos()
	}
}

/// A clock advanced by hand, for replaying recorded timings
#[derive(Debug, Default)]
pub struct ManualClock {
	wall_nanos: AtomicU64,
	cpu_nanos: AtomicU64,
	cpu_unavailable: AtomicBool,
}

impl ManualClock {
	pub fn new() -> Self {
		Self::default()
	}

	/// Moves both clocks forward
	pub fn advance(&self, wall_nanos: u64, cpu_nanos: u64) {
		self.wall_nanos.fetch_add(wall_nanos, Ordering::SeqCst);
		self.cpu_nanos.fetch_add(cpu_nanos, Ordering::SeqCst);
	}

	/// Sets the process CPU reading directly, which may move it backwards
	pub fn set_cpu_nanos(&self, cpu_nanos: u64) {
		self.cpu_nanos.store(cpu_nanos, Ordering::SeqCst);
	}

	pub fn set_cpu_available(&self, available: bool) {
		self.cpu_unavailable.store(!available, Ordering::SeqCst);
	}
}

impl CpuClock for ManualClock {
	fn now_nanos(&self) -> u64 {
		self.wall_nanos.load(Ordering::SeqCst)
	}

	fn process_cpu_time_nanos(&self) -> Option<u64> {
		if self.cpu_unavailable.load(Ordering::SeqCst) {
			None
		} else {
			Some(self.cpu_nanos.load(Ordering::SeqCst))
		}
	}
}

impl<C: CpuClock + ?Sized> CpuClock for std::sync::Arc<C> {
	fn now_nanos(&self) -> u64 {
		(**self).now_nanos()
	}

	fn process_cpu_time_nanos(&self) -> Option<u64> {
		(**self).process_cpu_time_nanos()
	}
}

/// Reads `CLOCK_PROCESS_CPUTIME_ID`
#[cfg(unix)]
pub fn read_process_cpu_time_nanos() -> Option<u64> {
	let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
	// SAFETY: `ts` is a valid, writable timespec for the duration of the call.
	let rc = unsafe { libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts) };
	if rc != 0 {
		return None;
	}

	let secs = u64::try_from(ts.tv_sec).ok()?;
	let nanos = u64::try_from(ts.tv_nsec).ok()?;
	secs.checked_mul(1_000_000_000)?.checked_add(nanos)
}

#[cfg(not(unix))]
pub fn read_process_cpu_time_nanos() -> Option<u64> {
	None
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn wall_clock_is_monotonic() {
		let clock = ProcessCpuClock::new();
		let a = clock.now_nanos();
		let b = clock.now_nanos();
		assert!(b >= a);
	}

	#[test]
	fn manual_clock_reports_what_it_is_given() {
		let clock = ManualClock::new();
		clock.advance(1_000, 400);
		assert_eq!(clock.now_nanos(), 1_000);
		assert_eq!(clock.process_cpu_time_nanos(), Some(400));
		clock.set_cpu_available(false);
		assert_eq!(clock.process_cpu_time_nanos(), None);
	}

	#[cfg(unix)]
	#[test]
	fn process_cpu_time_advances_under_load() {
		let clock = ProcessCpuClock::new();
		let before = clock.process_cpu_time_nanos().unwrap();
		let mut acc = 0u64;
		for i in 0..5_000_000u64 {
			acc = acc.wrapping_mul(31).wrapping_add(i);
		}
		std::hint::black_box(acc);
		let after = clock.process_cpu_time_nanos().unwrap();
		assert!(after >= before);
	}
}
