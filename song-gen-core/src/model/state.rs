use std::collections::BTreeMap;

use super::token::Token;

/// Candidate next tokens and how often each was observed.
pub type Transitions<T> = BTreeMap<Token<T>, usize>;

/// Represents a state in an n-gram model.
///
/// A `State` stores every observed transition from one context (the `n-1`
/// tokens before the predicted one). The context itself is the key under
/// which the owning model stores the state.
///
/// ## Invariants
/// - Each transition occurrence count is strictly positive
#[derive(Clone, Debug)]
pub struct State<T: Ord> {
	/// Outgoing transitions indexed by the next token.
	/// Example: { "cat" => 2, End => 1 }
	transitions: Transitions<T>,
}

impl<T: Ord> Default for State<T> {
	fn default() -> Self {
		Self { transitions: BTreeMap::new() }
	}
}

impl<T: Ord> State<T> {
	/// Records one occurrence of a transition toward `next`.
	pub fn add_transition(&mut self, next: Token<T>) {
		*self.transitions.entry(next).or_insert(0) += 1;
	}

	pub fn transitions(&self) -> &Transitions<T> {
		&self.transitions
	}
}
