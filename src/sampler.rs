use std::sync::{Mutex, PoisonError, RwLock};

use log::{debug, warn};

use crate::calibration::CalibrationPoint;
use crate::config::SamplerOptions;
use crate::constants::DEGRADED_POWER_WATTS;
use crate::error::{CalibrationError, PredictError};
use crate::host::HostProfile;
use crate::predictor::{PowerPredictor, resolve_predictor};
use crate::util::cpu::{CpuClock, ProcessCpuClock};
use crate::util::utilization_between;

/// Clock readings taken at the end of the previous tick
#[derive(Debug, Clone, Copy)]
struct TickState {
	previous_timestamp_nanos: u64,
	previous_cpu_time_nanos: u64,
}

/// Result of a single sampling tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerSample {
	/// Clamped CPU utilization over the tick, `None` when uncalibrated
	pub utilization: Option<f64>,

	/// Estimated power in watts
	pub watts: f64,

	/// Wall time covered by the tick, in nanoseconds
	pub elapsed_nanos: u64,
}

impl PowerSample {
	fn uncalibrated() -> Self {
		Self {
			utilization: None,
			watts: 0.0,
			elapsed_nanos: 0,
		}
	}
}

/// Turns process CPU time into an instantaneous power estimate
///
/// Every call to [`PowerSampler::sample`] measures the interval since the
/// previous call. Ticks are serialized on an internal lock so concurrent
/// callers never interleave their before/after readings.
pub struct PowerSampler {
	host: RwLock<HostProfile>,
	predictor: Box<dyn PowerPredictor>,
	clock: Box<dyn CpuClock>,
	state: Mutex<TickState>,
}

impl PowerSampler {
	/// Creates a sampler for the current process
	pub fn new(options: SamplerOptions) -> Self {
		Self::with_clock(options, Box::new(ProcessCpuClock::new()))
	}

	/// Creates a sampler reading from the given clock
	pub fn with_clock(options: SamplerOptions, clock: Box<dyn CpuClock>) -> Self {
		let predictor = resolve_predictor(&options.predictor, &options.config);
		Self::with_predictor(options.host, predictor, clock)
	}

	pub fn with_predictor(host: HostProfile, predictor: Box<dyn PowerPredictor>, clock: Box<dyn CpuClock>) -> Self {
		let state = TickState {
			previous_timestamp_nanos: clock.now_nanos(),
			previous_cpu_time_nanos: clock.process_cpu_time_nanos().unwrap_or(0),
		};

		Self {
			host: RwLock::new(host),
			predictor,
			clock,
			state: Mutex::new(state),
		}
	}

	/// Current power estimate in watts, 0 while uncalibrated
	pub fn get_power(&self) -> f64 {
		self.sample().watts
	}

	/// Runs one sampling tick
	///
	/// The host stays read-locked for the whole tick so a concurrent
	/// calibration change cannot land between the calibration check and
	/// the prediction.
	pub fn sample(&self) -> PowerSample {
		let host = self.read_host();
		if !host.is_calibrated() {
			return PowerSample::uncalibrated();
		}

		let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

		let timestamp_now = self.clock.now_nanos();
		let cpu_time_now = self
			.clock
			.process_cpu_time_nanos()
			.unwrap_or(state.previous_cpu_time_nanos);

		let utilization = utilization_between(
			state.previous_cpu_time_nanos,
			cpu_time_now,
			state.previous_timestamp_nanos,
			timestamp_now,
		);
		let elapsed_nanos = timestamp_now.saturating_sub(state.previous_timestamp_nanos);

		state.previous_timestamp_nanos = timestamp_now;
		state.previous_cpu_time_nanos = cpu_time_now;
		drop(state);

		let watts = match self.predictor.predict_power(&host, utilization) {
			Ok(power) if power >= 0.0 => power,
			Ok(power) => {
				debug!("Predictor returned {} W at utilization {:.3}, reporting 0", power, utilization);
				0.0
			},
			Err(PredictError::Uncalibrated) => 0.0,
			Err(e) => {
				warn!("Power prediction failed: {}", e);
				DEGRADED_POWER_WATTS
			},
		};

		debug!("Utilization {:.3} -> {:.2} W", utilization, watts);

		PowerSample {
			utilization: Some(utilization),
			watts,
			elapsed_nanos,
		}
	}

	pub fn is_calibrated(&self) -> bool {
		self.read_host().is_calibrated()
	}

	/// Replaces the host calibration points
	pub fn set_host_calibration_data(&self, points: Vec<CalibrationPoint>) -> Result<(), CalibrationError> {
		self.write_host().calibration_mut().set_calibration_data(points)
	}

	/// Parses and applies the compact calibration text; rejected input
	/// leaves the current calibration in place.
	pub fn set_host_calibration_input_string(&self, text: &str) -> Result<(), CalibrationError> {
		self.write_host().calibration_mut().set_calibration_from_text(text)
	}

	pub fn get_host_calibration_input_string(&self) -> String {
		self.read_host().calibration().calibration_text().to_string()
	}

	pub fn get_host_calibration_data(&self) -> Vec<CalibrationPoint> {
		self.read_host().calibration_data().to_vec()
	}

	/// Snapshot of the host profile
	pub fn host(&self) -> HostProfile {
		self.read_host().clone()
	}

	pub fn predictor_name(&self) -> &'static str {
		self.predictor.name()
	}

	fn read_host(&self) -> std::sync::RwLockReadGuard<'_, HostProfile> {
		self.host.read().unwrap_or_else(PoisonError::into_inner)
	}

	fn write_host(&self) -> std::sync::RwLockWriteGuard<'_, HostProfile> {
		self.host.write().unwrap_or_else(PoisonError::into_inner)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use approx::assert_abs_diff_eq;

	use super::*;
	use crate::util::cpu::ManualClock;

	#[derive(Debug, Clone)]
	struct FixedPredictor(Result<f64, PredictError>);

	impl PowerPredictor for FixedPredictor {
		fn name(&self) -> &'static str {
			"Fixed"
		}

		fn predict_power(&self, _host: &HostProfile, _utilization: f64) -> Result<f64, PredictError> {
			self.0.clone()
		}

		fn clone_box(&self) -> Box<dyn PowerPredictor> {
			Box::new(self.clone())
		}
	}

	fn sampler_with_clock() -> (PowerSampler, Arc<ManualClock>) {
		let clock = Arc::new(ManualClock::new());
		let sampler = PowerSampler::with_clock(SamplerOptions::default(), Box::new(clock.clone()));
		(sampler, clock)
	}

	#[test]
	fn uncalibrated_sampler_reports_zero() {
		let (sampler, clock) = sampler_with_clock();
		for _ in 0..5 {
			clock.advance(100_000_000, 80_000_000);
			assert_eq!(sampler.get_power(), 0.0);
		}
		assert_eq!(sampler.sample().utilization, None);
	}

	#[test]
	fn idle_tick_predicts_idle_power() {
		let (sampler, _clock) = sampler_with_clock();
		sampler.set_host_calibration_input_string("0,0,1,100").unwrap();
		assert!(sampler.is_calibrated());

		let sample = sampler.sample();
		assert_eq!(sample.utilization, Some(0.0));
		assert_abs_diff_eq!(sample.watts, 0.0, epsilon = 1e-9);
	}

	#[test]
	fn each_tick_measures_only_its_own_interval() {
		let (sampler, clock) = sampler_with_clock();
		sampler.set_host_calibration_input_string("0,10,1,110").unwrap();

		clock.advance(100, 50);
		let first = sampler.sample();
		assert_eq!(first.utilization, Some(0.5));
		assert_abs_diff_eq!(first.watts, 60.0, epsilon = 1e-9);
		assert_eq!(first.elapsed_nanos, 100);

		clock.advance(100, 25);
		let second = sampler.sample();
		assert_eq!(second.utilization, Some(0.25));
		assert_abs_diff_eq!(second.watts, 35.0, epsilon = 1e-9);
	}

	#[test]
	fn overshooting_counters_are_clamped() {
		let (sampler, clock) = sampler_with_clock();
		sampler.set_host_calibration_input_string("0,10,1,110").unwrap();

		clock.advance(100, 800);
		assert_eq!(sampler.sample().utilization, Some(1.0));

		clock.advance(100, 0);
		clock.set_cpu_nanos(0);
		assert_eq!(sampler.sample().utilization, Some(0.0));
	}

	#[test]
	fn unavailable_cpu_time_counts_as_no_load() {
		let (sampler, clock) = sampler_with_clock();
		sampler.set_host_calibration_input_string("0,10,1,110").unwrap();

		clock.set_cpu_available(false);
		clock.advance(100, 100);
		assert_eq!(sampler.sample().utilization, Some(0.0));
	}

	#[test]
	fn zero_elapsed_time_skips_division() {
		let (sampler, clock) = sampler_with_clock();
		sampler.set_host_calibration_input_string("0,10,1,110").unwrap();

		clock.advance(0, 500);
		assert_eq!(sampler.sample().utilization, Some(0.0));
	}

	#[test]
	fn predictor_faults_report_degraded_power() {
		let clock = Arc::new(ManualClock::new());
		let predictor = Box::new(FixedPredictor(Err(PredictError::InvalidUtilization(2.0))));
		let sampler = PowerSampler::with_predictor(HostProfile::default(), predictor, Box::new(clock));
		sampler.set_host_calibration_input_string("0,0,1,100").unwrap();

		assert_eq!(sampler.get_power(), DEGRADED_POWER_WATTS);
	}

	#[test]
	fn uncalibrated_prediction_reports_zero_not_degraded() {
		let clock = Arc::new(ManualClock::new());
		let predictor = Box::new(FixedPredictor(Err(PredictError::Uncalibrated)));
		let sampler = PowerSampler::with_predictor(HostProfile::default(), predictor, Box::new(clock.clone()));
		sampler.set_host_calibration_input_string("0,0,1,100").unwrap();

		clock.advance(100, 50);
		let sample = sampler.sample();
		assert_eq!(sample.utilization, Some(0.5));
		assert_eq!(sample.watts, 0.0);
	}

	#[test]
	fn calibration_swaps_never_race_a_tick() {
		let (sampler, clock) = sampler_with_clock();
		sampler.set_host_calibration_input_string("0,10,1,110").unwrap();
		let sampler = Arc::new(sampler);

		let writer = {
			let sampler = sampler.clone();
			std::thread::spawn(move || {
				for i in 0..500 {
					if i % 2 == 0 {
						sampler.set_host_calibration_data(Vec::new()).unwrap();
					} else {
						sampler.set_host_calibration_input_string("0,10,1,110").unwrap();
					}
				}
			})
		};

		for _ in 0..500 {
			clock.advance(100, 100);
			let sample = sampler.sample();
			match sample.utilization {
				Some(_) => assert_ne!(sample.watts, DEGRADED_POWER_WATTS),
				None => assert_eq!(sample.watts, 0.0),
			}
		}
		writer.join().unwrap();
	}

	#[test]
	fn negative_predictions_are_reported_as_zero() {
		let clock = Arc::new(ManualClock::new());
		let predictor = Box::new(FixedPredictor(Ok(-12.0)));
		let sampler = PowerSampler::with_predictor(HostProfile::default(), predictor, Box::new(clock));
		sampler.set_host_calibration_input_string("0,0,1,100").unwrap();

		assert_eq!(sampler.get_power(), 0.0);
	}

	#[test]
	fn calibration_round_trip_through_sampler() {
		let (sampler, _clock) = sampler_with_clock();
		sampler.set_host_calibration_input_string("0,0,1,100").unwrap();
		assert!(sampler.set_host_calibration_input_string("0,0,1").is_err());

		assert_eq!(sampler.get_host_calibration_input_string(), "0,0,1,100");
		assert_eq!(sampler.get_host_calibration_data().len(), 2);
	}

	#[test]
	fn unknown_predictor_name_still_samples() {
		let options = SamplerOptions {
			predictor: "DoesNotExist".to_string(),
			..SamplerOptions::default()
		};
		let sampler = PowerSampler::with_clock(options, Box::new(ManualClock::new()));
		assert_eq!(sampler.predictor_name(), crate::predictor::best_fit::NAME);
	}
}
