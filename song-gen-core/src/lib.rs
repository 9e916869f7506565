//! N-gram based lyric and melody generation library.
//!
//! This crate provides:
//! - Unigram, bigram and trigram models trained on token sequences
//! - Back-off selection from the most to the least specific model
//! - Weighted sampling and a soft-length generation loop
//! - A melody variant constrained by musical keys
//! - Corpus loading helpers for lyric and note files
//!
//! Models are trained once and only read afterwards; every random draw
//! goes through a caller-supplied rng.

/// Core n-gram models and generation logic.
pub mod model;

/// Melody generation (notes, keys, filtering policies).
pub mod music;

/// Lyric song composition (verses, chorus, title).
pub mod song;

/// Corpus loading from lyric and note files.
pub mod io;

/// Crate-wide error type.
pub mod error;

pub use error::{GenError, Result};
