pub mod calibration;
pub mod config;
pub mod constants;
pub mod display;
pub mod error;
pub mod host;
pub mod monitor;
pub mod power;
pub mod predictor;
pub mod sampler;
pub mod tree;
pub mod util;

use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};
use std::{io, thread};

use log::error;

use crate::display::display_power_readings;
use crate::monitor::PowerMonitor;
use crate::power::PowerReading;
use crate::sampler::PowerSampler;
use crate::tree::CallTree;

/// Settings for the background sampling loop
#[derive(Debug, Clone)]
pub struct MonitorOptions {
	/// Time between two sampling ticks
	pub interval: Duration,

	/// Stop after this long; run until the display ends when `None`
	pub duration: Option<Duration>,
}

impl Default for MonitorOptions {
	fn default() -> Self {
		Self {
			interval: Duration::from_millis(constants::DATA_COLLECTION_INTERVAL_MS),
			duration: None,
		}
	}
}

/// Samples process power at a fixed interval and displays the results
///
/// The sampling loop runs on the calling thread and feeds readings to a
/// display thread over a channel. Each tick's energy is charged to `tree`.
pub fn monitor_power(sampler: Arc<PowerSampler>, tree: Arc<CallTree>, options: &MonitorOptions) -> io::Result<()> {
	println!(
		"Monitoring process power (Watts) every {} ms using {}...",
		options.interval.as_millis(),
		sampler.predictor_name()
	);
	if !sampler.is_calibrated() {
		println!("No calibration data, power will read 0 W.");
	}
	println!("Press Ctrl+C to stop.");
	println!();

	// Create a channel to send power readings from the sampling loop to the display thread
	let (tx, rx) = mpsc::channel::<PowerReading>();

	let display_tree = tree.clone();
	let display_handle = thread::spawn(move || {
		let mut last_display_time = Instant::now();
		let mut lines = 0;

		loop {
			if last_display_time.elapsed().as_millis() >= u128::from(constants::DISPLAY_UPDATE_INTERVAL_MS) {
				match rx.try_recv() {
					Ok(oldest) => {
						// Skip readings that queued up since the last redraw
						let reading = rx.try_iter().last().unwrap_or(oldest);
						match display_power_readings(&reading, &display_tree, lines) {
							Ok(written) => lines = written,
							Err(e) => {
								error!("Display error: {}", e);
								break;
							},
						}
						last_display_time = Instant::now();
					},
					Err(mpsc::TryRecvError::Empty) => {},
					Err(mpsc::TryRecvError::Disconnected) => break,
				}
			}
			thread::sleep(Duration::from_millis(10));
		}
	});

	let started = Instant::now();
	let mut monitor = PowerMonitor::new(sampler);

	loop {
		thread::sleep(options.interval);
		let reading = monitor.tick_into(&tree);

		if tx.send(reading).is_err() || display_handle.is_finished() {
			break;
		}
		if options.duration.is_some_and(|limit| started.elapsed() >= limit) {
			break;
		}
	}

	drop(tx);
	let _ = display_handle.join();

	Ok(())
}
