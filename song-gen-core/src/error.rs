use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GenError>;

/// Errors raised by training, sampling, generation and corpus loading.
///
/// Contract violations (sampling an empty table, asking a model for
/// candidates it cannot provide) are reported here instead of producing
/// a degenerate token.
#[derive(Debug, Error)]
pub enum GenError {
	/// `train` was called on a model that already holds counts.
	#[error("{order} model is already trained")]
	AlreadyTrained { order: &'static str },

	/// The training corpus holds no sequence at all.
	#[error("training corpus is empty")]
	EmptyCorpus,

	/// The trailing context of the sequence was never observed.
	#[error("{order} model has no transitions for the trailing context")]
	UnknownContext { order: &'static str },

	/// Weighted sampling was asked to pick from nothing.
	#[error("cannot sample from an empty candidate table")]
	EmptyCandidates,

	/// Weighted sampling was given a non-positive weight.
	#[error("candidate weights must be positive")]
	ZeroWeight,

	/// No model in the back-off list accepts the sequence.
	#[error("no model can continue the sequence")]
	NoUsableModel,

	/// Generation parameter out of range.
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// A musical key needs at least one pitch class.
	#[error("key has no pitch classes")]
	EmptyKey,

	#[error("unknown pitch class '{0}'")]
	UnknownPitchClass(String),

	/// Unparseable `pitch:duration` token in a music corpus.
	#[error("malformed note '{token}'")]
	MalformedNote { token: String },

	/// The corpus directory does not exist or is not a directory.
	#[error("expected a directory, got: {}", .0.display())]
	NotADirectory(PathBuf),

	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}
