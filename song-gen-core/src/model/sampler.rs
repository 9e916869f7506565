use std::collections::BTreeMap;

use rand::Rng;

use crate::error::{GenError, Result};

/// Picks one key of `candidates` with probability `weight / total`.
///
/// This method performs:
/// - a cumulative sum over the candidates, in map order
/// - a uniform integer draw in `[1, total]`
/// - a scan for the first cumulative sum `>=` the draw
///
/// A table with a single entry always yields that entry.
///
/// # Errors
/// - `EmptyCandidates` if the table is empty.
/// - `ZeroWeight` if any weight is 0.
pub fn weighted_choice<K, R>(candidates: &BTreeMap<K, usize>, rng: &mut R) -> Result<K>
where
	K: Clone,
	R: Rng + ?Sized,
{
	if candidates.is_empty() {
		return Err(GenError::EmptyCandidates);
	}

	let mut cumulative = Vec::with_capacity(candidates.len());
	let mut total = 0usize;
	for (key, weight) in candidates {
		if *weight == 0 {
			return Err(GenError::ZeroWeight);
		}
		total += weight;
		cumulative.push((key, total));
	}

	let draw = rng.random_range(1..=total);
	let index = cumulative.partition_point(|(_, sum)| *sum < draw);

	// partition_point is in bounds: the last cumulative sum equals `total`
	Ok(cumulative[index].0.clone())
}
