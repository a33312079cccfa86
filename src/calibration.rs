//! Host calibration data: utilization/power pairs used to fit a power predictor.
//!
//! The compact text form is a flat comma-separated list of alternating
//! `utilization,power` values, e.g. `0,0,1,100`. Utilization may be written
//! either as a fraction (`0.5`) or as a percentage (`50`).

use std::fmt;

use log::{debug, info};

use crate::error::CalibrationError;

/// One observed (utilization, power) pair for a host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationPoint {
	/// CPU utilization fraction in [0, 1]
	pub utilization: f64,

	/// Idle power in watts, zero when parsed from text
	pub idle_power: f64,

	/// Power draw in watts at `utilization`
	pub power: f64,
}

impl CalibrationPoint {
	/// Creates a validated calibration point
	pub fn new(utilization: f64, idle_power: f64, power: f64) -> Result<Self, CalibrationError> {
		let point = Self {
			utilization,
			idle_power,
			power,
		};
		point.validate()?;
		Ok(point)
	}

	/// Checks the point invariants without constructing a new one
	pub fn validate(&self) -> Result<(), CalibrationError> {
		let utilization_ok = self.utilization.is_finite() && (0.0..=1.0).contains(&self.utilization);
		let power_ok = self.power.is_finite() && self.power >= 0.0;
		let idle_ok = self.idle_power.is_finite() && self.idle_power >= 0.0;

		if utilization_ok && power_ok && idle_ok {
			Ok(())
		} else {
			Err(CalibrationError::InvalidPoint {
				utilization: self.utilization,
				power: self.power,
			})
		}
	}
}

/// An ordered, validated sequence of calibration points
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationSet {
	points: Vec<CalibrationPoint>,
}

impl CalibrationSet {
	/// Builds a set after validating every point; nothing is kept on failure
	pub fn from_points(points: Vec<CalibrationPoint>) -> Result<Self, CalibrationError> {
		for point in &points {
			point.validate()?;
		}
		Ok(Self { points })
	}

	/// Parses the compact `utilization,power,...` text form
	///
	/// Trailing empty tokens are ignored, so `"0,0,1,100,"` is accepted.
	pub fn parse(text: &str) -> Result<Self, CalibrationError> {
		let mut tokens: Vec<&str> = text.split(',').collect();
		while tokens.last().is_some_and(|token| token.is_empty()) {
			tokens.pop();
		}
		if tokens.iter().all(|token| token.trim().is_empty()) {
			return Err(CalibrationError::Empty);
		}

		let values = tokens
			.into_iter()
			.map(|token| {
				let token = token.trim();
				token.parse::<f64>().map_err(|_| CalibrationError::InvalidNumber {
					token: token.to_string(),
				})
			})
			.collect::<Result<Vec<_>, _>>()?;

		if values.len() % 2 != 0 {
			return Err(CalibrationError::OddTokenCount(values.len()));
		}

		let points = values
			.chunks_exact(2)
			.map(|pair| CalibrationPoint::new(normalize_utilization(pair[0]), 0.0, pair[1]))
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self { points })
	}

	/// Encodes the set back into the compact text form
	pub fn to_text(&self) -> String {
		self.points
			.iter()
			.map(|p| format!("{},{}", p.utilization, p.power))
			.collect::<Vec<_>>()
			.join(",")
	}

	pub fn points(&self) -> &[CalibrationPoint] {
		&self.points
	}

	pub fn len(&self) -> usize {
		self.points.len()
	}

	pub fn is_empty(&self) -> bool {
		self.points.is_empty()
	}
}

impl fmt::Display for CalibrationSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_text())
	}
}

/// Percentages above 1 are scaled down to fractions; anything past 100 stays
/// as-is and fails validation.
fn normalize_utilization(value: f64) -> f64 {
	if value > 1.0 && value <= 100.0 {
		value / 100.0
	} else {
		value
	}
}

/// Calibration state of a host: the accepted point set plus the raw text it
/// was last parsed from.
///
/// Updates are validate-then-commit: a rejected update leaves both the points
/// and the raw text exactly as they were.
#[derive(Debug, Clone, Default)]
pub struct CalibrationStore {
	set: CalibrationSet,
	raw_text: String,
}

impl CalibrationStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces the whole calibration set. The raw text is left untouched.
	pub fn set_calibration_data(&mut self, points: Vec<CalibrationPoint>) -> Result<(), CalibrationError> {
		self.set = CalibrationSet::from_points(points)?;
		Ok(())
	}

	/// Parses `text` and, only if every value is accepted, replaces the set
	/// and remembers `text` verbatim.
	pub fn set_calibration_from_text(&mut self, text: &str) -> Result<(), CalibrationError> {
		info!("Current calibration data is: {}", text);
		match CalibrationSet::parse(text) {
			Ok(set) => {
				self.set = set;
				self.raw_text = text.to_string();
				Ok(())
			},
			Err(e) => {
				debug!("Ignoring calibration input {:?}: {}", text, e);
				Err(e)
			},
		}
	}

	/// The last successfully accepted raw text
	pub fn calibration_text(&self) -> &str {
		&self.raw_text
	}

	pub fn calibration_data(&self) -> &[CalibrationPoint] {
		self.set.points()
	}

	pub fn calibration_set(&self) -> &CalibrationSet {
		&self.set
	}

	pub fn is_calibrated(&self) -> bool {
		!self.set.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_fraction_pairs() {
		let set = CalibrationSet::parse("0,0,1,100").unwrap();
		assert_eq!(
			set.points(),
			&[
				CalibrationPoint::new(0.0, 0.0, 0.0).unwrap(),
				CalibrationPoint::new(1.0, 0.0, 100.0).unwrap(),
			]
		);
	}

	#[test]
	fn parses_percentages_and_whitespace() {
		let set = CalibrationSet::parse(" 50 , 80, 100,120").unwrap();
		assert_eq!(set.points()[0].utilization, 0.5);
		assert_eq!(set.points()[1].utilization, 1.0);
		assert_eq!(set.points()[1].power, 120.0);
	}

	#[test]
	fn rejects_malformed_text() {
		assert_eq!(CalibrationSet::parse(""), Err(CalibrationError::Empty));
		assert_eq!(CalibrationSet::parse("0,0,1"), Err(CalibrationError::OddTokenCount(3)));
		assert!(matches!(
			CalibrationSet::parse("0,abc"),
			Err(CalibrationError::InvalidNumber { .. })
		));
		assert!(matches!(
			CalibrationSet::parse("0,-4"),
			Err(CalibrationError::InvalidPoint { .. })
		));
		assert!(matches!(
			CalibrationSet::parse("250,10"),
			Err(CalibrationError::InvalidPoint { .. })
		));
		assert!(matches!(
			CalibrationSet::parse("0.5,NaN"),
			Err(CalibrationError::InvalidPoint { .. })
		));
	}

	#[test]
	fn invalid_text_keeps_previous_state() {
		let mut store = CalibrationStore::new();
		store.set_calibration_from_text("0,10,1,100").unwrap();
		let before = store.calibration_data().to_vec();

		assert!(store.set_calibration_from_text("0,10,1").is_err());
		assert!(store.set_calibration_from_text("0,10,x,100").is_err());

		assert_eq!(store.calibration_data(), before.as_slice());
		assert_eq!(store.calibration_text(), "0,10,1,100");
	}

	#[test]
	fn raw_text_round_trips_verbatim() {
		let mut store = CalibrationStore::new();
		let text = "0.0, 12.5 ,0.5,60,1,100";
		store.set_calibration_from_text(text).unwrap();
		assert_eq!(store.calibration_text(), text);
		assert!(store.is_calibrated());
	}

	#[test]
	fn trailing_commas_are_ignored() {
		let set = CalibrationSet::parse("0,0,1,100,").unwrap();
		assert_eq!(set.len(), 2);
		assert_eq!(set.points()[1].power, 100.0);
		assert_eq!(CalibrationSet::parse("0,0,1,100,,").unwrap().len(), 2);

		assert_eq!(CalibrationSet::parse(","), Err(CalibrationError::Empty));
		assert!(matches!(
			CalibrationSet::parse("0,,1,100"),
			Err(CalibrationError::InvalidNumber { .. })
		));

		let mut store = CalibrationStore::new();
		store.set_calibration_from_text("0,0,1,100,").unwrap();
		assert_eq!(store.calibration_text(), "0,0,1,100,");
		assert_eq!(store.calibration_data().len(), 2);
	}

	#[test]
	fn invalid_points_are_rejected_as_a_whole() {
		let mut store = CalibrationStore::new();
		store
			.set_calibration_data(vec![CalibrationPoint::new(0.2, 0.0, 30.0).unwrap()])
			.unwrap();

		let bad = vec![
			CalibrationPoint::new(0.0, 0.0, 10.0).unwrap(),
			CalibrationPoint {
				utilization: f64::NAN,
				idle_power: 0.0,
				power: 10.0,
			},
		];
		assert!(store.set_calibration_data(bad).is_err());
		assert_eq!(store.calibration_data().len(), 1);
		assert_eq!(store.calibration_data()[0].power, 30.0);
	}

	#[test]
	fn empty_point_list_clears_calibration() {
		let mut store = CalibrationStore::new();
		store.set_calibration_from_text("0,0,1,100").unwrap();
		store.set_calibration_data(Vec::new()).unwrap();
		assert!(!store.is_calibrated());
	}

	#[test]
	fn encodes_compact_text() {
		let set = CalibrationSet::parse("0,0,50,60,1,100").unwrap();
		assert_eq!(set.to_text(), "0,0,0.5,60,1,100");
	}
}
