/// Power figures handed from the sampling loop to the display
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerReading {
	/// Power estimated by the latest tick, in watts
	pub instantaneous: f64,

	/// Mean over the recent averaging window, in watts
	pub average: f64,

	/// Utilization measured by the latest tick, `None` while uncalibrated
	pub utilization: Option<f64>,

	/// Whether the host had calibration data at the latest tick
	pub calibrated: bool,
}
