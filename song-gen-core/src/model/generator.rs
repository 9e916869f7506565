use log::{trace, warn};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::backoff::BackoffModel;
use super::config::GenerationConfig;
use super::token::{START_MARKERS, Symbol, Token, opening};
use crate::error::{GenError, Result};

/// Decides whether a sequence of `current_length` tokens should end.
///
/// Draws from a normal distribution centred on `current_length` with the
/// given standard deviation; the sequence is too long once the draw
/// exceeds `target_length`. The target is soft: both shorter and longer
/// sequences happen, less often the further they are from it.
///
/// # Errors
/// `InvalidConfig` if `stdev` is not a valid standard deviation.
pub fn sentence_too_long<R: Rng + ?Sized>(
	target_length: usize,
	current_length: usize,
	stdev: f64,
	rng: &mut R,
) -> Result<bool> {
	if !stdev.is_finite() || stdev <= 0.0 {
		return Err(GenError::InvalidConfig(format!("stop check: stdev must be positive, got {}", stdev)));
	}
	let normal = Normal::new(current_length as f64, stdev)
		.map_err(|e| GenError::InvalidConfig(format!("stop check: {}", e)))?;
	Ok(normal.sample(rng) > target_length as f64)
}

/// Drops the start markers of a finished sequence.
fn strip_markers<T>(sequence: Vec<Token<T>>) -> Vec<T> {
	sequence
		.into_iter()
		.skip(START_MARKERS)
		.filter_map(Token::into_value)
		.collect()
}

/// High-level generator over a trained back-off model.
///
/// # Responsibilities
/// - Own the trained models (read-only after construction)
/// - Run the generation loop: select a model, sample a token, append it,
///   run the stop check
/// - Return sequences without any boundary marker
///
/// Generation only borrows `self`, so one generator can serve concurrent
/// callers as long as each brings its own rng.
#[derive(Clone, Debug)]
pub struct Generator<T: Symbol> {
	model: BackoffModel<T>,
	config: GenerationConfig,
}

impl<T: Symbol> Generator<T> {
	/// Creates a generator with the default configuration.
	pub fn new(model: BackoffModel<T>) -> Self {
		Self { model, config: GenerationConfig::default() }
	}

	/// Trains a back-off model on `corpus` and wraps it.
	pub fn from_corpus(corpus: &[Vec<T>]) -> Result<Self> {
		Ok(Self::new(BackoffModel::from_corpus(corpus)?))
	}

	/// Replaces the configuration after validating it.
	pub fn with_config(mut self, config: GenerationConfig) -> Result<Self> {
		config.validate()?;
		self.config = config;
		Ok(self)
	}

	pub fn model(&self) -> &BackoffModel<T> {
		&self.model
	}

	pub fn config(&self) -> &GenerationConfig {
		&self.config
	}

	/// Generates one sequence with the stored configuration.
	pub fn generate_sentence<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<T>> {
		self.generate_with_config(&self.config, rng)
	}

	/// Generates one sequence with a caller-supplied configuration, leaving
	/// the stored one untouched.
	///
	/// # Errors
	/// `InvalidConfig` if `config` breaks one of its invariants.
	pub fn generate_with_config<R: Rng + ?Sized>(&self, config: &GenerationConfig, rng: &mut R) -> Result<Vec<T>> {
		self.generate_by(config, rng, |model, sequence, rng| model.next_token(sequence, rng))
	}

	/// Generates one sequence aiming at `target_length` tokens.
	///
	/// # Errors
	/// `InvalidConfig` if `target_length` is 0.
	pub fn generate_with<R: Rng + ?Sized>(&self, target_length: usize, rng: &mut R) -> Result<Vec<T>> {
		let mut config = self.config.clone();
		config.set_target_length(target_length)?;
		self.generate_with_config(&config, rng)
	}

	/// Runs the generation loop with a custom next-token step.
	///
	/// The sequence starts as the two start markers. Each step asks `step`
	/// for a token:
	/// - the end marker finishes the sequence without being appended
	/// - any other token is appended, then the stop check decides
	///   whether to keep growing
	///
	/// The loop never runs more than `config.max_steps()` steps.
	///
	/// # Errors
	/// Propagates configuration errors and any error returned by `step`.
	pub fn generate_by<R, F>(&self, config: &GenerationConfig, rng: &mut R, mut step: F) -> Result<Vec<T>>
	where
		R: Rng + ?Sized,
		F: FnMut(&BackoffModel<T>, &[Token<T>], &mut R) -> Result<Token<T>>,
	{
		config.validate()?;

		let mut sequence = opening();
		for _ in 0..config.max_steps() {
			let next = step(&self.model, &sequence, &mut *rng)?;
			if next == Token::End {
				trace!("end marker after {} tokens", sequence.len() - START_MARKERS);
				return Ok(strip_markers(sequence));
			}

			sequence.push(next);
			let length = sequence.len() - START_MARKERS;
			if sentence_too_long(config.target_length(), length, config.stdev(), &mut *rng)? {
				return Ok(strip_markers(sequence));
			}
		}

		warn!("generation stopped after {} steps without reaching an end", config.max_steps());
		Ok(strip_markers(sequence))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn corpus(lines: &[&str]) -> Vec<Vec<String>> {
		lines
			.iter()
			.map(|line| line.split_whitespace().map(str::to_owned).collect())
			.collect()
	}

	fn lyrics() -> Vec<Vec<String>> {
		corpus(&[
			"i want to hold your hand",
			"she loves you yeah yeah yeah",
			"all you need is love",
			"let it be let it be",
			"here comes the sun",
			"yesterday all my troubles seemed so far away",
		])
	}

	#[test]
	fn stop_check_is_centred_on_current_length() {
		let mut rng = StdRng::seed_from_u64(5);
		let trials = 4_000;
		let stops = (0..trials)
			.filter(|_| sentence_too_long(6, 6, 1.0, &mut rng).unwrap())
			.count();
		let ratio = stops as f64 / trials as f64;
		assert!((ratio - 0.5).abs() < 0.05, "ratio was {ratio}");

		assert!(!(0..200).any(|_| sentence_too_long(100, 1, 1.0, &mut rng).unwrap()));
		assert!((0..200).all(|_| sentence_too_long(1, 100, 1.0, &mut rng).unwrap()));
	}

	#[test]
	fn stop_check_rejects_bad_stdev() {
		let mut rng = StdRng::seed_from_u64(0);
		for stdev in [-1.0, 0.0, f64::NAN, f64::INFINITY] {
			assert!(matches!(
				sentence_too_long(6, 1, stdev, &mut rng),
				Err(GenError::InvalidConfig(_))
			));
		}
	}

	#[test]
	fn sentences_terminate_within_vocabulary() {
		let corpus = lyrics();
		let generator = Generator::from_corpus(&corpus).unwrap();
		let vocabulary: Vec<&String> = corpus.iter().flatten().collect();

		for seed in 0..200 {
			let mut rng = StdRng::seed_from_u64(seed);
			let sentence = generator.generate_with(6, &mut rng).unwrap();
			assert!(sentence.len() <= generator.config().max_steps());
			assert!(sentence.iter().all(|word| vocabulary.contains(&word)));
		}
	}

	#[test]
	fn single_sentence_corpus_is_reproduced() {
		let generator = Generator::from_corpus(&corpus(&["a b c"])).unwrap();
		let mut rng = StdRng::seed_from_u64(1);
		let sentence = generator.generate_with(100, &mut rng).unwrap();
		assert_eq!(sentence, vec!["a", "b", "c"]);
	}

	#[test]
	fn same_seed_same_sentence() {
		let generator = Generator::from_corpus(&lyrics()).unwrap();
		let first = generator.generate_sentence(&mut StdRng::seed_from_u64(99)).unwrap();
		let second = generator.generate_sentence(&mut StdRng::seed_from_u64(99)).unwrap();
		assert_eq!(first, second);
	}

	#[test]
	fn explicit_config_matches_stored_config() {
		let config = GenerationConfig::new(4).unwrap();
		let generator = Generator::from_corpus(&lyrics()).unwrap().with_config(config.clone()).unwrap();
		for seed in 0..20 {
			let stored = generator.generate_sentence(&mut StdRng::seed_from_u64(seed)).unwrap();
			let explicit = generator.generate_with_config(&config, &mut StdRng::seed_from_u64(seed)).unwrap();
			assert_eq!(stored, explicit);
		}
		assert_eq!(generator.config(), &config);
	}

	#[test]
	fn explicit_config_bounds_the_loop() {
		let generator = Generator::from_corpus(&lyrics()).unwrap();
		let mut bounded = GenerationConfig::new(3).unwrap();
		bounded.set_max_steps(1).unwrap();
		let mut rng = StdRng::seed_from_u64(8);
		for _ in 0..50 {
			assert!(generator.generate_with_config(&bounded, &mut rng).unwrap().len() <= 1);
		}
	}

	#[test]
	fn end_marker_is_never_appended() {
		let generator = Generator::from_corpus(&corpus(&["a"])).unwrap();
		let config = GenerationConfig::new(50).unwrap();
		let mut rng = StdRng::seed_from_u64(2);
		let mut calls = 0;
		let sentence = generator
			.generate_by(&config, &mut rng, |_, _, _| {
				calls += 1;
				Ok(if calls < 3 { Token::Value("x".to_owned()) } else { Token::End })
			})
			.unwrap();
		assert_eq!(sentence, vec!["x", "x"]);
	}

	#[test]
	fn loop_is_bounded_by_max_steps() {
		let generator = Generator::from_corpus(&corpus(&["a"])).unwrap();
		let mut config = GenerationConfig::new(1_000_000).unwrap();
		config.set_max_steps(10).unwrap();
		let mut rng = StdRng::seed_from_u64(3);
		let sentence = generator
			.generate_by(&config, &mut rng, |_, _, _| Ok(Token::Value("x".to_owned())))
			.unwrap();
		assert_eq!(sentence.len(), 10);
	}

	#[test]
	fn step_errors_are_propagated() {
		let generator = Generator::from_corpus(&corpus(&["a"])).unwrap();
		let mut rng = StdRng::seed_from_u64(4);
		let result = generator.generate_by(generator.config(), &mut rng, |_, _, _| Err(GenError::EmptyCandidates));
		assert!(matches!(result, Err(GenError::EmptyCandidates)));
	}

	#[test]
	fn zero_target_is_rejected() {
		let generator = Generator::from_corpus(&corpus(&["a"])).unwrap();
		let mut rng = StdRng::seed_from_u64(0);
		assert!(matches!(generator.generate_with(0, &mut rng), Err(GenError::InvalidConfig(_))));
	}
}
