// Monitoring and display settings
pub const DATA_COLLECTION_INTERVAL_MS: u64 = 100;
pub const DISPLAY_UPDATE_INTERVAL_MS: u64 = 200;
pub const AVERAGING_ITERATIONS: usize = 10;

/// Reported when the predictor fails while computing a sample
pub const DEGRADED_POWER_WATTS: f64 = 5.0;

// Predictor resolution
pub const DEFAULT_PREDICTOR_NAMESPACE: &str = "energy_predictor";
pub const NAMESPACE_SEPARATOR: &str = "::";
pub const DEFAULT_PREDICTOR: &str = "CpuOnlyBestFit";

// Default host profile
pub const DEFAULT_HOST_ID: u32 = 0;
pub const DEFAULT_HOST_NAME: &str = "localhost";
pub const DEFAULT_HOST_DISK_GB: u64 = 20;
pub const DEFAULT_HOST_RAM_MB: u64 = 2048;

pub const NANOS_PER_SECOND: f64 = 1_000_000_000.0;
pub const MILLIS_PER_SECOND: f64 = 1_000.0;
