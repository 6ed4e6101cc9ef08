//! Mutation operators for each gene encoding.
//!
//! These work on gene slices, not on whole solutions, and are combined by
//! [`Operators`](crate::recombination::Operators). Every function leaves its
//! genes inside the given bounds (or a valid permutation).

use rand::{seq::index, Rng};

/// Polynomial mutation. Each gene mutates with probability `pm`; the
/// perturbation follows a polynomial distribution of index `eta` scaled by
/// the gene's range, and the result is clamped into `[min, max]`.
pub fn polynomial<R: Rng + ?Sized>(
  x: &mut [f64],
  min: &[f64],
  max: &[f64],
  pm: f64,
  eta: f64,
  rng: &mut R,
) {
  for (i, xi) in x.iter_mut().enumerate() {
    let del = max[i] - min[i];
    if del <= 0.0 || !rng.gen_bool(pm) {
      continue;
    }
    let u: f64 = rng.gen();
    let delta = if u < 0.5 {
      (2.0 * u).powf(1.0 / (eta + 1.0)) - 1.0
    } else {
      1.0 - (2.0 * (1.0 - u)).powf(1.0 / (eta + 1.0))
    };
    *xi = (*xi + delta * del).clamp(min[i], max[i]);
  }
}

/// With probability `pm`, redraws `nchanges` distinct genes uniformly inside
/// their ranges.
pub fn int_changes<R: Rng + ?Sized>(
  x: &mut [i64],
  min: &[i64],
  max: &[i64],
  nchanges: usize,
  pm: f64,
  rng: &mut R,
) {
  if x.is_empty() || !rng.gen_bool(pm) {
    return;
  }
  for i in index::sample(rng, x.len(), nchanges.min(x.len())).into_iter() {
    x[i] = rng.gen_range(min[i]..=max[i]);
  }
}

/// With probability `pm`, flips `nchanges` distinct bits.
pub fn bit_flip<R: Rng + ?Sized>(
  x: &mut [i64],
  nchanges: usize,
  pm: f64,
  rng: &mut R,
) {
  if x.is_empty() || !rng.gen_bool(pm) {
    return;
  }
  for i in index::sample(rng, x.len(), nchanges.min(x.len())).into_iter() {
    x[i] = 1 - x[i];
  }
}

/// With probability `pm`, performs `nchanges` swaps of two random positions.
/// A permutation stays a permutation.
pub fn swap<R: Rng + ?Sized>(
  x: &mut [i64],
  nchanges: usize,
  pm: f64,
  rng: &mut R,
) {
  if x.len() < 2 || !rng.gen_bool(pm) {
    return;
  }
  for _ in 0..nchanges {
    let pos = index::sample(rng, x.len(), 2);
    x.swap(pos.index(0), pos.index(1));
  }
}
