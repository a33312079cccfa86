use thiserror::Error;

/// Reasons a calibration update is rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
	#[error("calibration input is empty")]
	Empty,

	#[error("calibration input has {0} values, expected utilization/power pairs")]
	OddTokenCount(usize),

	#[error("calibration value {token:?} is not a number")]
	InvalidNumber { token: String },

	#[error("calibration point (utilization {utilization}, power {power} W) is out of range")]
	InvalidPoint { utilization: f64, power: f64 },
}

/// Failures raised while resolving or running a power predictor
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
	#[error("host has no calibration data")]
	Uncalibrated,

	#[error("utilization {0} is not a finite fraction")]
	InvalidUtilization(f64),

	#[error("no predictor named {0:?}")]
	UnknownPredictor(String),

	#[error("predictor {name:?} could not be constructed: {source}")]
	Construction {
		name: String,
		#[source]
		source: ConfigError,
	},
}

/// A configuration value that cannot be read as the requested type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
	#[error("invalid value {value:?} for {key}")]
	InvalidValue { key: String, value: String },

	#[error("malformed setting {0:?}, expected key=value")]
	MalformedSetting(String),
}

/// Structural violations when linking call tree nodes
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
	#[error("method node {0:?} already belongs to another parent")]
	AlreadyAttached(String),

	#[error("adding method node {0:?} would create a cycle")]
	WouldCycle(String),
}
