//! Least-squares CPU power predictor.

use crate::calibration::CalibrationPoint;
use crate::config::PredictorConfig;
use crate::error::{ConfigError, PredictError};
use crate::host::HostProfile;
use crate::predictor::{ModelSettings, PowerPredictor, check_utilization};

pub const NAME: &str = "CpuOnlyBestFit";

/// Fits a straight line `P(u) = idle + slope * u` through the host's
/// calibration points and evaluates it at the requested utilization.
///
/// With a single point, or with every point at the same utilization, the
/// mean power is used as a constant.
#[derive(Debug, Clone, Default)]
pub struct CpuOnlyBestFitPredictor {
	settings: ModelSettings,
}

impl CpuOnlyBestFitPredictor {
	pub fn new(settings: ModelSettings) -> Self {
		Self { settings }
	}

	pub fn from_config(config: &PredictorConfig) -> Result<Self, ConfigError> {
		Ok(Self::new(ModelSettings::from_config(config)?))
	}
}

/// Returns `(intercept, slope)` of the least-squares line through `points`
pub fn fit_line(points: &[CalibrationPoint]) -> Option<(f64, f64)> {
	if points.is_empty() {
		return None;
	}

	let n = points.len() as f64;
	let mean_u = points.iter().map(|p| p.utilization).sum::<f64>() / n;
	let mean_p = points.iter().map(|p| p.power).sum::<f64>() / n;

	let mut covariance = 0.0;
	let mut variance = 0.0;
	for point in points {
		let du = point.utilization - mean_u;
		covariance += du * (point.power - mean_p);
		variance += du * du;
	}

	if variance == 0.0 {
		return Some((mean_p, 0.0));
	}

	let slope = covariance / variance;
	Some((mean_p - slope * mean_u, slope))
}

impl PowerPredictor for CpuOnlyBestFitPredictor {
	fn name(&self) -> &'static str {
		NAME
	}

	fn predict_power(&self, host: &HostProfile, utilization: f64) -> Result<f64, PredictError> {
		check_utilization(utilization)?;
		let (intercept, slope) = fit_line(host.calibration_data()).ok_or(PredictError::Uncalibrated)?;
		Ok(self.settings.adjust(intercept + slope * utilization, intercept))
	}

	fn clone_box(&self) -> Box<dyn PowerPredictor> {
		Box::new(self.clone())
	}
}
