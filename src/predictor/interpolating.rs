//! Piecewise-linear CPU power predictor.

use crate::calibration::CalibrationPoint;
use crate::config::PredictorConfig;
use crate::error::{ConfigError, PredictError};
use crate::host::HostProfile;
use crate::predictor::{ModelSettings, PowerPredictor, check_utilization};

pub const NAME: &str = "CpuOnlyInterpolating";

/// A predictor that treats the calibration points as measurements and
/// interpolates linearly between the two closest ones.
///
/// Outside the measured utilization range the nearest measurement is used.
#[derive(Debug, Clone, Default)]
pub struct CpuOnlyInterpolatingPredictor {
	settings: ModelSettings,
}

impl CpuOnlyInterpolatingPredictor {
	pub fn new(settings: ModelSettings) -> Self {
		Self { settings }
	}

	pub fn from_config(config: &PredictorConfig) -> Result<Self, ConfigError> {
		Ok(Self::new(ModelSettings::from_config(config)?))
	}
}

/// Interpolates the power at `utilization`; `None` when there are no points
pub fn interpolate(points: &[CalibrationPoint], utilization: f64) -> Option<f64> {
	let mut sorted = points.to_vec();
	sorted.sort_by(|a, b| a.utilization.total_cmp(&b.utilization));

	let first = sorted.first()?;
	let last = sorted.last()?;
	if utilization <= first.utilization {
		return Some(first.power);
	}
	if utilization >= last.utilization {
		return Some(last.power);
	}

	sorted.windows(2).find_map(|pair| {
		let (lo, hi) = (pair[0], pair[1]);
		if utilization < lo.utilization || utilization > hi.utilization {
			return None;
		}
		let span = hi.utilization - lo.utilization;
		if span == 0.0 {
			return Some(hi.power);
		}
		Some(lo.power + (hi.power - lo.power) * (utilization - lo.utilization) / span)
	})
}

impl PowerPredictor for CpuOnlyInterpolatingPredictor {
	fn name(&self) -> &'static str {
		NAME
	}

	fn predict_power(&self, host: &HostProfile, utilization: f64) -> Result<f64, PredictError> {
		check_utilization(utilization)?;
		let points = host.calibration_data();
		let predicted = interpolate(points, utilization).ok_or(PredictError::Uncalibrated)?;
		let idle = interpolate(points, 0.0).unwrap_or(0.0);
		Ok(self.settings.adjust(predicted, idle))
	}

	fn clone_box(&self) -> Box<dyn PowerPredictor> {
		Box::new(self.clone())
	}
}

#[cfg(test)]
mod tests {
	use approx::assert_abs_diff_eq;

	use super::*;

	fn host_with(text: &str) -> HostProfile {
		let mut host = HostProfile::default();
		host.calibration_mut().set_calibration_from_text(text).unwrap();
		host
	}

	#[test]
	fn interpolates_between_unsorted_points() {
		let host = host_with("1,100,0,10,0.5,70");
		let predictor = CpuOnlyInterpolatingPredictor::default();
		assert_abs_diff_eq!(predictor.predict_power(&host, 0.25).unwrap(), 40.0, epsilon = 1e-9);
		assert_abs_diff_eq!(predictor.predict_power(&host, 0.75).unwrap(), 85.0, epsilon = 1e-9);
		assert_abs_diff_eq!(predictor.predict_power(&host, 0.5).unwrap(), 70.0, epsilon = 1e-9);
	}

	#[test]
	fn clamps_outside_measured_range() {
		let host = host_with("0.2,30,0.8,90");
		let predictor = CpuOnlyInterpolatingPredictor::default();
		assert_abs_diff_eq!(predictor.predict_power(&host, 0.0).unwrap(), 30.0);
		assert_abs_diff_eq!(predictor.predict_power(&host, 1.0).unwrap(), 90.0);
	}

	#[test]
	fn drops_idle_share_when_configured() {
		let host = host_with("0,10,1,110");
		let predictor = CpuOnlyInterpolatingPredictor::new(ModelSettings {
			consider_idle_energy: false,
			overhead_watts: 0.0,
		});
		assert_abs_diff_eq!(predictor.predict_power(&host, 0.5).unwrap(), 50.0, epsilon = 1e-9);
	}

	#[test]
	fn uncalibrated_host_is_an_error() {
		let predictor = CpuOnlyInterpolatingPredictor::default();
		assert_eq!(
			predictor.predict_power(&HostProfile::default(), 0.1),
			Err(PredictError::Uncalibrated)
		);
	}
}
