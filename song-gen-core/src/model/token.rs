use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Bounds shared by every vocabulary type (words, notes...).
pub trait Symbol: Clone + Eq + Hash + Ord + fmt::Debug {}

impl<T: Clone + Eq + Hash + Ord + fmt::Debug> Symbol for T {}

/// A token of a wrapped sequence.
///
/// Every training or generated sequence is framed by two start markers and
/// one end marker. Markers are separate variants, so no vocabulary value can
/// ever collide with them.
///
/// # Ordering
/// Markers sort before values. Transition tables iterate in this order,
/// which keeps sampling reproducible under a seeded rng.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Token<T> {
	/// First start marker.
	OuterStart,
	/// Second start marker, always right after `OuterStart`.
	InnerStart,
	/// End of sequence.
	End,
	/// A vocabulary value (word, note...).
	Value(T),
}

impl<T> Token<T> {
	/// Returns `true` for the three reserved boundary tokens.
	pub fn is_marker(&self) -> bool {
		!matches!(self, Token::Value(_))
	}

	/// Borrows the wrapped value, if any.
	pub fn value(&self) -> Option<&T> {
		match self {
			Token::Value(v) => Some(v),
			_ => None,
		}
	}

	pub fn into_value(self) -> Option<T> {
		match self {
			Token::Value(v) => Some(v),
			_ => None,
		}
	}
}

impl<T: fmt::Display> fmt::Display for Token<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Token::OuterStart => write!(f, "<<"),
			Token::InnerStart => write!(f, "<"),
			Token::End => write!(f, ">"),
			Token::Value(v) => write!(f, "{}", v),
		}
	}
}

/// Number of start markers in front of every wrapped sequence.
pub const START_MARKERS: usize = 2;

/// Returns the opening of a generated sequence: both start markers.
pub fn opening<T>() -> Vec<Token<T>> {
	vec![Token::OuterStart, Token::InnerStart]
}

/// Frames a raw sequence with the boundary markers.
///
/// `["hello", "goodbye"]` becomes
/// `[OuterStart, InnerStart, "hello", "goodbye", End]`.
///
/// The input is left untouched; a new vector is returned.
pub fn wrap_sequence<T: Clone>(sequence: &[T]) -> Vec<Token<T>> {
	let mut wrapped = Vec::with_capacity(sequence.len() + START_MARKERS + 1);
	wrapped.extend(opening());
	wrapped.extend(sequence.iter().cloned().map(Token::Value));
	wrapped.push(Token::End);
	wrapped
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn wrap_adds_two_starts_and_one_end() {
		let raw = vec!["hello".to_owned(), "goodbye".to_owned()];
		let wrapped = wrap_sequence(&raw);
		assert_eq!(
			wrapped,
			vec![
				Token::OuterStart,
				Token::InnerStart,
				Token::Value("hello".to_owned()),
				Token::Value("goodbye".to_owned()),
				Token::End,
			]
		);
		assert_eq!(raw, vec!["hello".to_owned(), "goodbye".to_owned()]);
	}

	#[test]
	fn wrap_empty_sequence_is_only_markers() {
		let wrapped = wrap_sequence::<u8>(&[]);
		assert_eq!(wrapped.len(), 3);
		assert!(wrapped.iter().all(Token::is_marker));
	}

	#[test]
	fn markers_sort_before_values() {
		assert!(Token::End < Token::Value(0u8));
		assert!(Token::<u8>::OuterStart < Token::InnerStart);
	}
}
