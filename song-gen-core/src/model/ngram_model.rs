use std::collections::HashMap;
use std::fmt;

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::sampler::weighted_choice;
use super::state::{State, Transitions};
use super::token::{Symbol, Token, wrap_sequence};
use crate::error::{GenError, Result};

/// The n of an n-gram model.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Order {
	Unigram,
	Bigram,
	Trigram,
}

impl Order {
	/// Number of tokens in one window (context + predicted token).
	pub fn n(self) -> usize {
		match self {
			Order::Unigram => 1,
			Order::Bigram => 2,
			Order::Trigram => 3,
		}
	}

	/// Number of trailing tokens used as context.
	pub fn context_len(self) -> usize {
		self.n() - 1
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Order::Unigram => "unigram",
			Order::Bigram => "bigram",
			Order::Trigram => "trigram",
		}
	}
}

impl fmt::Display for Order {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Uniform contract of every n-gram model.
///
/// A model is constructed empty, trained once from a whole corpus, then
/// only queried.
pub trait NGramCounter<T: Symbol> {
	fn order(&self) -> Order;

	fn is_trained(&self) -> bool;

	/// Populates the frequency table from a corpus of raw sequences.
	///
	/// Each sequence is framed with the boundary markers first; the
	/// caller's corpus is never modified.
	fn train(&mut self, corpus: &[Vec<T>]) -> Result<()>;

	/// Whether the trailing context of `sequence` was observed in training.
	fn can_continue(&self, sequence: &[Token<T>]) -> bool;

	/// Candidate next tokens for the trailing context of `sequence`.
	///
	/// # Errors
	/// `UnknownContext` when `can_continue` would be false, or when the
	/// model holds no transitions for the context.
	fn candidates(&self, sequence: &[Token<T>]) -> Result<&Transitions<T>>;

	/// Samples the next token, proportionally to the observed counts.
	fn next_token<R: Rng + ?Sized>(&self, sequence: &[Token<T>], rng: &mut R) -> Result<Token<T>> {
		weighted_choice(self.candidates(sequence)?, rng)
	}
}

/// Represents an n-gram model of order 1, 2 or 3 over tokens of type `T`.
///
/// The frequency table is flat: one `State` per context, keyed by the
/// tuple of context tokens (arity `order - 1`). A unigram model has a
/// single state under the empty context.
///
/// # Invariants
/// - Every key in `states` has exactly `order.context_len()` tokens
/// - All state transitions have occurrence counts >= 1
/// - Unigram models never count the boundary markers
#[derive(Clone, Debug)]
pub struct NGramModel<T: Symbol> {
	order: Order,
	states: HashMap<Vec<Token<T>>, State<T>>,
	trained: bool,
}

impl<T: Symbol> NGramModel<T> {
	pub fn new(order: Order) -> Self {
		Self { order, states: HashMap::new(), trained: false }
	}

	pub fn unigram() -> Self {
		Self::new(Order::Unigram)
	}

	pub fn bigram() -> Self {
		Self::new(Order::Bigram)
	}

	pub fn trigram() -> Self {
		Self::new(Order::Trigram)
	}

	/// Number of distinct contexts observed.
	pub fn context_count(&self) -> usize {
		self.states.len()
	}

	/// Number of distinct tokens ever predicted, markers included.
	pub fn vocabulary_size(&self) -> usize {
		let mut tokens: Vec<&Token<T>> = self
			.states
			.values()
			.flat_map(|state| state.transitions().keys())
			.collect();
		tokens.sort();
		tokens.dedup();
		tokens.len()
	}

	/// Returns the trailing context of `sequence`, if it is long enough.
	fn context<'a>(&self, sequence: &'a [Token<T>]) -> Option<&'a [Token<T>]> {
		let len = self.order.context_len();
		sequence.len().checked_sub(len).map(|start| &sequence[start..])
	}

	/// Adds one framed sequence to the table.
	fn add_sequence(&mut self, wrapped: &[Token<T>]) {
		let n = self.order.n();
		for window in wrapped.windows(n) {
			let (key, next) = window.split_at(n - 1);
			let next = &next[0];
			if self.order == Order::Unigram && next.is_marker() {
				continue;
			}

			let state = self.states.entry(key.to_vec()).or_default();
			state.add_transition(next.clone());
		}
	}
}

impl<T: Symbol> NGramCounter<T> for NGramModel<T> {
	fn order(&self) -> Order {
		self.order
	}

	fn is_trained(&self) -> bool {
		self.trained
	}

	fn train(&mut self, corpus: &[Vec<T>]) -> Result<()> {
		if self.trained {
			return Err(GenError::AlreadyTrained { order: self.order.as_str() });
		}
		if corpus.is_empty() {
			return Err(GenError::EmptyCorpus);
		}

		for sequence in corpus {
			let wrapped = wrap_sequence(sequence);
			self.add_sequence(&wrapped);
		}
		self.trained = true;

		debug!(
			"trained {} model on {} sequences: {} contexts",
			self.order,
			corpus.len(),
			self.states.len()
		);
		Ok(())
	}

	fn can_continue(&self, sequence: &[Token<T>]) -> bool {
		match self.order {
			Order::Unigram => true,
			_ => self.context(sequence).is_some_and(|context| self.states.contains_key(context)),
		}
	}

	fn candidates(&self, sequence: &[Token<T>]) -> Result<&Transitions<T>> {
		self.context(sequence)
			.and_then(|context| self.states.get(context))
			.map(State::transitions)
			.ok_or(GenError::UnknownContext { order: self.order.as_str() })
	}
}
