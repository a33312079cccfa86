pub mod best_fit;
pub mod interpolating;

use std::fmt::Debug;

use log::warn;

use crate::config::{CONSIDER_IDLE_ENERGY_KEY, OVERHEAD_PER_HOST_KEY, PredictorConfig};
use crate::constants::{DEFAULT_PREDICTOR_NAMESPACE, NAMESPACE_SEPARATOR};
use crate::error::{ConfigError, PredictError};
use crate::host::HostProfile;
use crate::predictor::best_fit::CpuOnlyBestFitPredictor;
use crate::predictor::interpolating::CpuOnlyInterpolatingPredictor;

/// Trait for strategies that turn a CPU utilization into a power estimate
pub trait PowerPredictor: Debug + Send + Sync {
	/// Short registry name of this predictor
	fn name(&self) -> &'static str;

	/// Predicts the host power draw in watts at `utilization` (0-1)
	fn predict_power(&self, host: &HostProfile, utilization: f64) -> Result<f64, PredictError>;

	/// Clone implementation for trait objects
	fn clone_box(&self) -> Box<dyn PowerPredictor>;
}

impl Clone for Box<dyn PowerPredictor> {
	fn clone(&self) -> Self {
		self.clone_box()
	}
}

type PredictorFactory = fn(&PredictorConfig) -> Result<Box<dyn PowerPredictor>, ConfigError>;

/// Known predictors, keyed by their short name
const REGISTRY: &[(&str, PredictorFactory)] = &[
	(best_fit::NAME, build_best_fit),
	(interpolating::NAME, build_interpolating),
];

fn build_best_fit(config: &PredictorConfig) -> Result<Box<dyn PowerPredictor>, ConfigError> {
	let predictor = CpuOnlyBestFitPredictor::from_config(config)?;
	Ok(Box::new(predictor))
}

fn build_interpolating(config: &PredictorConfig) -> Result<Box<dyn PowerPredictor>, ConfigError> {
	let predictor = CpuOnlyInterpolatingPredictor::from_config(config)?;
	Ok(Box::new(predictor))
}

/// Prefixes `name` with the default namespace unless it already carries it
pub fn qualified_predictor_name(name: &str) -> String {
	let prefix = format!("{DEFAULT_PREDICTOR_NAMESPACE}{NAMESPACE_SEPARATOR}");
	if name.starts_with(&prefix) {
		name.to_string()
	} else {
		format!("{prefix}{name}")
	}
}

/// Fully qualified names of every registered predictor
pub fn available_predictors() -> Vec<String> {
	REGISTRY
		.iter()
		.map(|(name, _)| qualified_predictor_name(name))
		.collect()
}

/// Looks up and constructs a predictor, reporting why it could not be built
pub fn create_predictor(name: &str, config: &PredictorConfig) -> Result<Box<dyn PowerPredictor>, PredictError> {
	let qualified = qualified_predictor_name(name);
	let (_, factory) = REGISTRY
		.iter()
		.find(|(short, _)| qualified_predictor_name(short) == qualified)
		.ok_or_else(|| PredictError::UnknownPredictor(qualified.clone()))?;

	factory(config).map_err(|source| PredictError::Construction {
		name: qualified,
		source,
	})
}

/// Factory function that always yields a usable predictor
///
/// Unknown names and construction failures fall back to the default
/// best-fit predictor.
pub fn resolve_predictor(name: &str, config: &PredictorConfig) -> Box<dyn PowerPredictor> {
	match create_predictor(name, config) {
		Ok(predictor) => predictor,
		Err(e @ PredictError::UnknownPredictor(_)) => {
			warn!("The predictor specified was not found: {}", e);
			Box::new(CpuOnlyBestFitPredictor::default())
		},
		Err(e) => {
			warn!("The predictor specified did not work: {}", e);
			Box::new(CpuOnlyBestFitPredictor::default())
		},
	}
}

/// Settings shared by the CPU-only predictors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSettings {
	/// Whether the idle share of the host power is part of the estimate
	pub consider_idle_energy: bool,

	/// Fixed extra draw added to every estimate, in watts
	pub overhead_watts: f64,
}

impl ModelSettings {
	pub fn from_config(config: &PredictorConfig) -> Result<Self, ConfigError> {
		Ok(Self {
			consider_idle_energy: config.get_bool(CONSIDER_IDLE_ENERGY_KEY)?.unwrap_or(true),
			overhead_watts: config.get_f64(OVERHEAD_PER_HOST_KEY)?.unwrap_or(0.0),
		})
	}

	/// Applies the idle and overhead settings to a raw model output
	pub fn adjust(&self, predicted: f64, idle: f64) -> f64 {
		let base = if self.consider_idle_energy {
			predicted
		} else {
			predicted - idle
		};
		base + self.overhead_watts
	}
}

impl Default for ModelSettings {
	fn default() -> Self {
		Self {
			consider_idle_energy: true,
			overhead_watts: 0.0,
		}
	}
}

/// Rejects utilization values a predictor cannot interpret
pub(crate) fn check_utilization(utilization: f64) -> Result<(), PredictError> {
	if utilization.is_finite() && (0.0..=1.0).contains(&utilization) {
		Ok(())
	} else {
		Err(PredictError::InvalidUtilization(utilization))
	}
}
