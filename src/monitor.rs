use std::collections::VecDeque;
use std::sync::Arc;

use crate::constants::AVERAGING_ITERATIONS;
use crate::power::PowerReading;
use crate::sampler::{PowerSample, PowerSampler};
use crate::tree::CallTree;
use crate::util::nanos_to_seconds;

/// Name of the thread node that receives sampled process energy
pub const PROCESS_THREAD: &str = "process";

const NANOS_PER_MILLI: u64 = 1_000_000;

/// Samples process power and keeps a rolling average
pub struct PowerMonitor {
	pub sampler: Arc<PowerSampler>,
	power_readings: VecDeque<f64>,
	last_sample: Option<PowerSample>,

	// Sampled time not yet charged to the call tree and its energy
	pending_nanos: u64,
	pending_energy: f64,
}

impl PowerMonitor {
	pub fn new(sampler: Arc<PowerSampler>) -> Self {
		Self {
			sampler,
			power_readings: VecDeque::with_capacity(AVERAGING_ITERATIONS),
			last_sample: None,
			pending_nanos: 0,
			pending_energy: 0.0,
		}
	}

	/// Runs one sampling tick and returns the updated reading
	pub fn tick(&mut self) -> PowerReading {
		let sample = self.sampler.sample();
		self.update_readings(sample);
		self.calculate_averages()
	}

	/// Like [`PowerMonitor::tick`], also charging the tick's energy to the
	/// process thread of `tree`
	///
	/// Only whole milliseconds are charged; the remainder and its share of
	/// the energy carry over to the next tick.
	pub fn tick_into(&mut self, tree: &CallTree) -> PowerReading {
		let sample = self.sampler.sample();
		self.update_readings(sample);

		if sample.utilization.is_some() && sample.elapsed_nanos > 0 {
			self.pending_nanos += sample.elapsed_nanos;
			self.pending_energy += sample.watts * nanos_to_seconds(sample.elapsed_nanos);

			let whole_ms = self.pending_nanos / NANOS_PER_MILLI;
			if whole_ms > 0 {
				let charged_nanos = whole_ms * NANOS_PER_MILLI;
				let energy = self.pending_energy * (charged_nanos as f64 / self.pending_nanos as f64);

				let thread = tree.thread(PROCESS_THREAD);
				thread.increment_total_time(whole_ms);
				thread.increment_total_energy(energy);

				self.pending_nanos -= charged_nanos;
				self.pending_energy -= energy;
			}
		}

		self.calculate_averages()
	}

	/// Updates the internal power readings with a new sample
	pub fn update_readings(&mut self, sample: PowerSample) {
		self.power_readings.push_back(sample.watts);
		if self.power_readings.len() > AVERAGING_ITERATIONS {
			self.power_readings.pop_front();
		}
		self.last_sample = Some(sample);
	}

	/// Builds a reading from the latest sample and the averaging window
	pub fn calculate_averages(&self) -> PowerReading {
		let last = self.last_sample;
		PowerReading {
			instantaneous: last.map_or(0.0, |s| s.watts),
			average: self.calculate_average_power(),
			utilization: last.and_then(|s| s.utilization),
			calibrated: last.is_some_and(|s| s.utilization.is_some()),
		}
	}

	fn calculate_average_power(&self) -> f64 {
		if self.power_readings.is_empty() {
			return 0.0;
		}
		self.power_readings.iter().sum::<f64>() / self.power_readings.len() as f64
	}
}
