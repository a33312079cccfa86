pub mod cpu;

use crate::constants::{MILLIS_PER_SECOND, NANOS_PER_SECOND};

/// Clamps a raw utilization reading into [0, 1]
///
/// Raw process counters can overshoot on multi-core hosts or under clock
/// skew; NaN is treated as no load.
pub fn clamp_utilization(raw: f64) -> f64 {
	if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) }
}

/// Calculates the CPU utilization of a process between two readings
///
/// # Arguments
///
/// * `cpu_before` / `cpu_after` - Process CPU time in nanoseconds
/// * `wall_before` / `wall_after` - Monotonic wall clock in nanoseconds
///
/// # Returns
///
/// The clamped utilization fraction, or 0 when no wall time has elapsed
pub fn utilization_between(cpu_before: u64, cpu_after: u64, wall_before: u64, wall_after: u64) -> f64 {
	if wall_after <= wall_before {
		return 0.0;
	}

	let cpu_delta = cpu_after as f64 - cpu_before as f64;
	let wall_delta = (wall_after - wall_before) as f64;
	clamp_utilization(cpu_delta / wall_delta)
}

pub fn millis_to_seconds(millis: u64) -> f64 {
	millis as f64 / MILLIS_PER_SECOND
}

pub fn nanos_to_seconds(nanos: u64) -> f64 {
	nanos as f64 / NANOS_PER_SECOND
}
