//! Top-level module for the n-gram generation system.
//!
//! This module provides a back-off n-gram sequence generator, including:
//! - Boundary-marked tokens (`Token`)
//! - Order-tagged n-gram models (`NGramModel`) behind the `NGramCounter` contract
//! - Weighted sampling of candidate tokens
//! - Model selection with back-off (`BackoffModel`)
//! - Generation parameters (`GenerationConfig`)
//! - The generation loop (`Generator`)

/// High-level interface for generating sequences from a back-off model.
pub mod generator;

/// Trigram, bigram and unigram models with first-match selection.
pub mod backoff;

/// Unigram, bigram and trigram models.
///
/// Handles corpus ingestion, transition counting, context checks and
/// candidate lookup.
pub mod ngram_model;

/// Per-context transition counts.
pub mod state;

/// Weighted random choice over a candidate table.
pub mod sampler;

/// Start and end markers around sequences.
pub mod token;

/// Generation parameters (target length, stop-check spread, loop bound).
pub mod config;
