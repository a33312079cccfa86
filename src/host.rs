use crate::calibration::{CalibrationPoint, CalibrationStore};
use crate::constants::{DEFAULT_HOST_DISK_GB, DEFAULT_HOST_ID, DEFAULT_HOST_NAME, DEFAULT_HOST_RAM_MB};

/// The monitored machine as seen by a power predictor
#[derive(Debug, Clone)]
pub struct HostProfile {
	pub id: u32,
	pub name: String,

	/// Whether the host is currently able to report usage
	pub available: bool,

	/// Disk capacity in GB
	pub disk_gb: u64,

	/// RAM capacity in MB
	pub ram_mb: u64,

	/// Number of logical processors
	pub cpu_count: usize,

	calibration: CalibrationStore,
}

impl HostProfile {
	/// Creates an uncalibrated host profile for the given machine
	pub fn new(id: u32, name: impl Into<String>) -> Self {
		Self {
			id,
			name: name.into(),
			available: true,
			disk_gb: DEFAULT_HOST_DISK_GB,
			ram_mb: DEFAULT_HOST_RAM_MB,
			cpu_count: num_cpus::get(),
			calibration: CalibrationStore::new(),
		}
	}

	pub fn calibration(&self) -> &CalibrationStore {
		&self.calibration
	}

	pub fn calibration_mut(&mut self) -> &mut CalibrationStore {
		&mut self.calibration
	}

	pub fn calibration_data(&self) -> &[CalibrationPoint] {
		self.calibration.calibration_data()
	}

	/// True once at least one valid calibration point is present
	pub fn is_calibrated(&self) -> bool {
		self.calibration.is_calibrated()
	}
}

impl Default for HostProfile {
	fn default() -> Self {
		Self::new(DEFAULT_HOST_ID, DEFAULT_HOST_NAME)
	}
}
