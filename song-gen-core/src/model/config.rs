use serde::{Deserialize, Serialize};

use crate::error::{GenError, Result};

/// Generation parameters for one sequence.
///
/// `GenerationConfig` controls the soft length target and the hard bound
/// on the generation loop.
///
/// # Responsibilities
/// - Track the desired content length (`target_length`)
/// - Track the spread of the stop check (`stdev`)
/// - Bound the number of loop iterations (`max_steps`)
///
/// # Invariants
/// - `target_length >= 1`
/// - `stdev` is finite and `> 0.0`
/// - `max_steps >= 1`
///
/// Values coming from serde are not checked on the way in; the generator
/// calls `validate` before every run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
	/// Desired number of tokens, not counting markers.
	target_length: usize,

	/// Standard deviation of the Gaussian stop check.
	stdev: f64,

	/// Maximum number of tokens drawn before the loop gives up.
	max_steps: usize,
}

impl Default for GenerationConfig {
	/// Lyric lines: six words, unit deviation.
	fn default() -> Self {
		Self { target_length: 6, stdev: 1.0, max_steps: 512 }
	}
}

impl GenerationConfig {
	/// Creates a configuration with the given target and default spread.
	///
	/// # Errors
	/// Returns an error if `target_length` is 0.
	pub fn new(target_length: usize) -> Result<Self> {
		let mut config = Self::default();
		config.set_target_length(target_length)?;
		Ok(config)
	}

	pub fn target_length(&self) -> usize {
		self.target_length
	}

	pub fn stdev(&self) -> f64 {
		self.stdev
	}

	pub fn max_steps(&self) -> usize {
		self.max_steps
	}

	/// Sets the desired content length (must be positive).
	pub fn set_target_length(&mut self, target_length: usize) -> Result<()> {
		if target_length == 0 {
			return Err(GenError::InvalidConfig("target length must be positive".to_owned()));
		}
		self.target_length = target_length;
		Ok(())
	}

	/// Sets the standard deviation of the stop check.
	///
	/// # Errors
	/// Returns an error if the value is not a finite positive number.
	pub fn set_stdev(&mut self, stdev: f64) -> Result<()> {
		if !stdev.is_finite() || stdev <= 0.0 {
			return Err(GenError::InvalidConfig(format!("stdev must be positive, got {}", stdev)));
		}
		self.stdev = stdev;
		Ok(())
	}

	pub fn set_max_steps(&mut self, max_steps: usize) -> Result<()> {
		if max_steps == 0 {
			return Err(GenError::InvalidConfig("max steps must be at least 1".to_owned()));
		}
		self.max_steps = max_steps;
		Ok(())
	}

	/// Re-checks every invariant, for values built through serde.
	pub fn validate(&self) -> Result<()> {
		let mut checked = Self::default();
		checked.set_target_length(self.target_length)?;
		checked.set_stdev(self.stdev)?;
		checked.set_max_steps(self.max_steps)?;
		Ok(())
	}
}
