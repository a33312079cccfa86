use std::collections::BTreeMap;
use std::str::FromStr;

use crate::constants::DEFAULT_PREDICTOR;
use crate::error::ConfigError;
use crate::host::HostProfile;

pub const DEFAULT_LOAD_KEY: &str = "energy.modeller.cpu.energy.predictor.default_load";
pub const CONSIDER_IDLE_ENERGY_KEY: &str = "energy.modeller.cpu.energy.predictor.consider_idle_energy";
pub const OVERHEAD_PER_HOST_KEY: &str = "energy.modeller.energy.predictor.overheadPerHostInWatts";
pub const OBSERVE_TIME_SEC_KEY: &str = "energy.modeller.cpu.energy.predictor.utilisation.observe_time.sec";

/// Named key/value settings handed to a predictor when it is constructed
///
/// Values are stored as text and only interpreted by the predictor that asks
/// for them, so unknown keys are carried along harmlessly.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictorConfig {
	values: BTreeMap<String, String>,
}

impl PredictorConfig {
	/// A bundle with no settings at all
	pub fn empty() -> Self {
		Self { values: BTreeMap::new() }
	}

	pub fn set(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
		self.values.insert(key.into(), value.to_string());
		self
	}

	/// Applies a `key=value` setting, as given on the command line
	pub fn apply_setting(&mut self, setting: &str) -> Result<(), ConfigError> {
		match setting.split_once('=') {
			Some((key, value)) if !key.trim().is_empty() => {
				self.set(key.trim(), value.trim());
				Ok(())
			},
			_ => Err(ConfigError::MalformedSetting(setting.to_string())),
		}
	}

	pub fn get_str(&self, key: &str) -> Option<&str> {
		self.values.get(key).map(String::as_str)
	}

	pub fn get_f64(&self, key: &str) -> Result<Option<f64>, ConfigError> {
		self.parse_value(key)
	}

	pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
		self.parse_value(key)
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.values.keys().map(String::as_str)
	}

	fn parse_value<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
		match self.values.get(key) {
			None => Ok(None),
			Some(raw) => raw.parse::<T>().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: key.to_string(),
				value: raw.clone(),
			}),
		}
	}
}

impl Default for PredictorConfig {
	fn default() -> Self {
		let mut config = Self::empty();
		config
			.set(DEFAULT_LOAD_KEY, 0)
			.set(CONSIDER_IDLE_ENERGY_KEY, true)
			.set(OVERHEAD_PER_HOST_KEY, 0)
			.set(OBSERVE_TIME_SEC_KEY, 30);
		config
	}
}

/// Everything needed to build a `PowerSampler`
#[derive(Debug, Clone)]
pub struct SamplerOptions {
	/// Predictor name, with or without the namespace prefix
	pub predictor: String,
	pub config: PredictorConfig,
	pub host: HostProfile,
}

impl Default for SamplerOptions {
	fn default() -> Self {
		Self {
			predictor: DEFAULT_PREDICTOR.to_string(),
			config: PredictorConfig::default(),
			host: HostProfile::default(),
		}
	}
}
