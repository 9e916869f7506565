use log::{debug, trace};

use super::ngram_model::{NGramCounter, NGramModel};
use super::token::{Symbol, Token};
use crate::error::{GenError, Result};

/// Returns the first model, in list order, able to continue `sequence`.
///
/// The list is expected in descending specificity (trigram, bigram,
/// unigram). With a unigram model last, a model is always found.
///
/// # Errors
/// `NoUsableModel` if no model accepts the sequence.
pub fn select_model<'a, T, M>(models: &'a [M], sequence: &[Token<T>]) -> Result<&'a M>
where
	T: Symbol,
	M: NGramCounter<T>,
{
	let model = models
		.iter()
		.find(|model| model.can_continue(sequence))
		.ok_or(GenError::NoUsableModel)?;
	trace!("selected {} model at length {}", model.order(), sequence.len());
	Ok(model)
}

/// A trigram, a bigram and a unigram model trained on the same corpus.
///
/// Asking for a model walks them from the most to the least specific and
/// returns the first one that knows the trailing context: a simple
/// back-off language model.
#[derive(Clone, Debug)]
pub struct BackoffModel<T: Symbol> {
	models: [NGramModel<T>; 3],
}

impl<T: Symbol> Default for BackoffModel<T> {
	fn default() -> Self {
		Self {
			models: [NGramModel::trigram(), NGramModel::bigram(), NGramModel::unigram()],
		}
	}
}

impl<T: Symbol> BackoffModel<T> {
	/// Builds and trains all three models from `corpus`.
	pub fn from_corpus(corpus: &[Vec<T>]) -> Result<Self> {
		let mut model = Self::default();
		model.train(corpus)?;
		Ok(model)
	}

	/// Trains every model once from the same corpus.
	///
	/// # Errors
	/// Propagates `AlreadyTrained` and `EmptyCorpus` from the models.
	pub fn train(&mut self, corpus: &[Vec<T>]) -> Result<()> {
		for model in &mut self.models {
			model.train(corpus)?;
		}
		debug!("trained back-off model on {} sequences", corpus.len());
		Ok(())
	}

	/// Whether every model has been trained.
	pub fn is_trained(&self) -> bool {
		self.models.iter().all(|model| model.is_trained())
	}

	/// Models in selection order.
	pub fn models(&self) -> &[NGramModel<T>] {
		&self.models
	}

	/// Returns the most specific model able to continue `sequence`.
	///
	/// Falls back to the unigram model, which accepts any sequence.
	pub fn select(&self, sequence: &[Token<T>]) -> &NGramModel<T> {
		select_model(&self.models[..], sequence).unwrap_or(&self.models[2])
	}

	/// Samples the next token with the selected model.
	pub fn next_token<R: rand::Rng + ?Sized>(&self, sequence: &[Token<T>], rng: &mut R) -> Result<Token<T>> {
		self.select(sequence).next_token(sequence, rng)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::ngram_model::Order;
	use crate::model::token::opening;

	fn corpus() -> Vec<Vec<String>> {
		["the cat sat", "the dog ran", "a cat ran"]
			.iter()
			.map(|line| line.split_whitespace().map(str::to_owned).collect())
			.collect()
	}

	fn value(word: &str) -> Token<String> {
		Token::Value(word.to_owned())
	}

	#[test]
	fn prefers_trigram_when_pair_is_known() {
		let model = BackoffModel::from_corpus(&corpus()).unwrap();
		let seq = opening();
		assert_eq!(model.select(&seq).order(), Order::Trigram);

		let mut seq = opening();
		seq.push(value("the"));
		seq.push(value("cat"));
		assert_eq!(model.select(&seq).order(), Order::Trigram);
	}

	#[test]
	fn backs_off_to_bigram_then_unigram() {
		let model = BackoffModel::from_corpus(&corpus()).unwrap();

		// "dog cat" never appears, but "cat" was followed by something
		let seq = vec![value("dog"), value("cat")];
		assert_eq!(model.select(&seq).order(), Order::Bigram);

		// "ran" was followed by the end marker
		let seq = vec![value("sat"), value("ran")];
		assert_eq!(model.select(&seq).order(), Order::Bigram);

		let seq = vec![value("zebra")];
		assert_eq!(model.select(&seq).order(), Order::Unigram);
		assert_eq!(model.select(&[]).order(), Order::Unigram);
	}

	#[test]
	fn selector_never_fails_with_unigram_tail() {
		let model = BackoffModel::from_corpus(&corpus()).unwrap();
		for seq in [vec![], vec![value("x")], vec![value("x"), value("y")], opening()] {
			assert!(select_model(model.models(), &seq).is_ok());
		}
	}

	#[test]
	fn selector_without_fallback_can_fail() {
		let mut bigram = NGramModel::bigram();
		bigram.train(&corpus()).unwrap();
		let models = [bigram];
		assert!(matches!(
			select_model(&models[..], &[value("zebra")]),
			Err(GenError::NoUsableModel)
		));
	}

	#[test]
	fn models_are_listed_most_specific_first() {
		let mut model: BackoffModel<String> = BackoffModel::default();
		let orders: Vec<Order> = model.models().iter().map(|m| m.order()).collect();
		assert_eq!(orders, vec![Order::Trigram, Order::Bigram, Order::Unigram]);
		assert!(!model.is_trained());

		model.train(&corpus()).unwrap();
		assert!(model.is_trained());
		assert!(matches!(model.train(&corpus()), Err(GenError::AlreadyTrained { order: "trigram" })));
	}
}
