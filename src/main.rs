use std::io;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use env_logger::{Builder, Env};
use log::warn;

use cpu_energy_profiler::config::{PredictorConfig, SamplerOptions};
use cpu_energy_profiler::constants::{DATA_COLLECTION_INTERVAL_MS, DEFAULT_PREDICTOR};
use cpu_energy_profiler::predictor::available_predictors;
use cpu_energy_profiler::sampler::PowerSampler;
use cpu_energy_profiler::tree::CallTree;
use cpu_energy_profiler::{MonitorOptions, monitor_power};

#[derive(Parser)]
#[command(name = "cpu-energy-profiler")]
#[command(about = "Estimate the power draw of this process from its CPU time")]
#[command(version)]
struct Cli {
	/// Calibration points as comma-separated utilization,watts pairs, e.g. "0,20,1,100"
	#[arg(long)]
	calibration: Option<String>,

	/// Power predictor to use
	#[arg(long, default_value = DEFAULT_PREDICTOR)]
	predictor: String,

	/// Predictor setting as key=value (repeatable)
	#[arg(long = "set", value_name = "KEY=VALUE")]
	settings: Vec<String>,

	/// Sampling interval in milliseconds
	#[arg(long, default_value_t = DATA_COLLECTION_INTERVAL_MS)]
	interval_ms: u64,

	/// Stop after this many seconds
	#[arg(long)]
	duration_secs: Option<u64>,

	/// List the available predictors and exit
	#[arg(long)]
	list_predictors: bool,
}

fn main() -> io::Result<()> {
	Builder::from_env(Env::default().default_filter_or("info")).init();

	let cli = Cli::parse();

	if cli.list_predictors {
		for name in available_predictors() {
			println!("{name}");
		}
		return Ok(());
	}

	let mut config = PredictorConfig::default();
	for setting in &cli.settings {
		config
			.apply_setting(setting)
			.map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
	}

	let options = SamplerOptions {
		predictor: cli.predictor,
		config,
		..SamplerOptions::default()
	};
	let sampler = PowerSampler::new(options);

	if let Some(text) = &cli.calibration {
		if let Err(e) = sampler.set_host_calibration_input_string(text) {
			warn!("Calibration ignored: {}", e);
		}
	}

	let host = sampler.host();
	println!(
		"Host {} ({} logical CPUs, {} calibration points).",
		host.name,
		host.cpu_count,
		host.calibration_data().len()
	);

	let monitor_options = MonitorOptions {
		interval: Duration::from_millis(cli.interval_ms.max(1)),
		duration: cli.duration_secs.map(Duration::from_secs),
	};

	monitor_power(Arc::new(sampler), Arc::new(CallTree::new()), &monitor_options)
}
