//! Reproduction operators and utilities.
//!
//! The evolver consumes reproduction through the [`Reproduction`] trait: one
//! call turns a pair of parents into a pair of offspring. Closures of the
//! right shape implement it, and [`Operators`] is the default implementation
//! configured from a [`Config`].

use rand::{seq::index, Rng, RngCore};

use crate::{
  config::{Config, Encoding},
  mutation,
  solution::Solution,
};

/// An operator that fills the genes of two offspring from two parents.
///
/// Only `flt` and `int` of the offspring need to be written; objectives and
/// constraints are evaluated afterwards. An operator that produces poor genes
/// only produces poor offspring, it never stops the run.
///
/// # Examples
/// ```
/// # use archipelago::{recombination::Reproduction, solution::Solution};
/// # use rand::RngCore;
/// // offspring are copies of their parents
/// let r = |a: &Solution,
///          b: &Solution,
///          [c, d]: [&mut Solution; 2],
///          _: &mut dyn RngCore| {
///   c.flt.clone_from(&a.flt);
///   d.flt.clone_from(&b.flt);
/// };
/// # fn takes_reproduction<R: Reproduction>(_: &R) {}
/// # takes_reproduction(&r);
/// ```
///
/// **Note that you always can implement this trait instead of using closures.**
pub trait Reproduction: Sync {
  /// Writes the genes of `offspring` from parents `a` and `b`.
  fn reproduce(
    &self,
    a: &Solution,
    b: &Solution,
    offspring: [&mut Solution; 2],
    rng: &mut dyn RngCore,
  );
}

impl<F> Reproduction for F
where
  F: Fn(&Solution, &Solution, [&mut Solution; 2], &mut dyn RngCore) + Sync,
{
  fn reproduce(
    &self,
    a: &Solution,
    b: &Solution,
    offspring: [&mut Solution; 2],
    rng: &mut dyn RngCore,
  ) {
    self(a, b, offspring, rng)
  }
}

/// Default crossover and mutation for every encoding:
/// - floats: simulated binary crossover and polynomial mutation;
/// - generic ints: n-cut crossover and random changes;
/// - binary ints: n-cut crossover and bit flips;
/// - permutations: order crossover and swaps.
#[derive(Clone, Debug, PartialEq)]
pub struct Operators {
  encoding: Encoding,
  flt_min: Vec<f64>,
  flt_max: Vec<f64>,
  int_min: Vec<i64>,
  int_max: Vec<i64>,
  flt_pc: f64,
  flt_pm: f64,
  eta_c: f64,
  eta_m: f64,
  int_pc: f64,
  int_ncuts: usize,
  int_pm: f64,
  int_nchanges: usize,
}

impl Operators {
  /// Takes bounds and probabilities from a validated configuration.
  pub fn new(config: &Config) -> Self {
    Self {
      encoding: config.encoding,
      flt_min: config.flt_min.clone(),
      flt_max: config.flt_max.clone(),
      int_min: config.int_min.clone(),
      int_max: config.int_max.clone(),
      flt_pc: config.flt_pc,
      flt_pm: config.flt_pm,
      eta_c: config.eta_c,
      eta_m: config.eta_m,
      int_pc: config.int_pc,
      int_ncuts: config.int_ncuts,
      int_pm: config.int_pm,
      int_nchanges: config.int_nchanges,
    }
  }
}

impl Reproduction for Operators {
  fn reproduce(
    &self,
    a: &Solution,
    b: &Solution,
    [c, d]: [&mut Solution; 2],
    rng: &mut dyn RngCore,
  ) {
    if rng.gen_bool(self.flt_pc) {
      sbx(
        &a.flt, &b.flt, &mut c.flt, &mut d.flt, &self.flt_min,
        &self.flt_max, self.eta_c, rng,
      );
    } else {
      c.flt.copy_from_slice(&a.flt);
      d.flt.copy_from_slice(&b.flt);
    }

    if rng.gen_bool(self.int_pc) {
      match self.encoding {
        Encoding::Permutation(_) => {
          order(&a.int, &b.int, &mut c.int, rng);
          order(&b.int, &a.int, &mut d.int, rng);
        }
        Encoding::Generic | Encoding::Binary(_) => {
          ncut(&a.int, &b.int, &mut c.int, &mut d.int, self.int_ncuts, rng)
        }
      }
    } else {
      c.int.copy_from_slice(&a.int);
      d.int.copy_from_slice(&b.int);
    }

    for x in [c, d] {
      mutation::polynomial(
        &mut x.flt,
        &self.flt_min,
        &self.flt_max,
        self.flt_pm,
        self.eta_m,
        rng,
      );
      match self.encoding {
        Encoding::Generic => mutation::int_changes(
          &mut x.int,
          &self.int_min,
          &self.int_max,
          self.int_nchanges,
          self.int_pm,
          rng,
        ),
        Encoding::Binary(_) => {
          mutation::bit_flip(&mut x.int, self.int_nchanges, self.int_pm, rng)
        }
        Encoding::Permutation(_) => {
          mutation::swap(&mut x.int, self.int_nchanges, self.int_pm, rng)
        }
      }
    }
  }
}

/// Simulated binary crossover of every float gene, clamped into bounds.
#[allow(clippy::too_many_arguments)]
pub fn sbx<R: Rng + ?Sized>(
  a: &[f64],
  b: &[f64],
  c: &mut [f64],
  d: &mut [f64],
  min: &[f64],
  max: &[f64],
  eta: f64,
  rng: &mut R,
) {
  for i in 0..a.len() {
    let (x, y) = (a[i], b[i]);
    if (x - y).abs() < 1e-14 || !rng.gen_bool(0.5) {
      c[i] = x;
      d[i] = y;
      continue;
    }
    let u: f64 = rng.gen();
    let beta = if u <= 0.5 {
      (2.0 * u).powf(1.0 / (eta + 1.0))
    } else {
      (1.0 / (2.0 * (1.0 - u))).powf(1.0 / (eta + 1.0))
    };
    let (mid, half) = ((x + y) / 2.0, beta * (y - x).abs() / 2.0);
    c[i] = (mid - half).clamp(min[i], max[i]);
    d[i] = (mid + half).clamp(min[i], max[i]);
  }
}

/// N-cut crossover: the genes are split at `ncuts` distinct positions and
/// the offspring take alternating segments from each parent.
pub fn ncut<R: Rng + ?Sized>(
  a: &[i64],
  b: &[i64],
  c: &mut [i64],
  d: &mut [i64],
  ncuts: usize,
  rng: &mut R,
) {
  let n = a.len();
  if n < 2 || ncuts == 0 {
    c.copy_from_slice(a);
    d.copy_from_slice(b);
    return;
  }
  let mut cuts = index::sample(rng, n - 1, ncuts.min(n - 1)).into_vec();
  cuts.iter_mut().for_each(|k| *k += 1);
  cuts.sort_unstable();
  let mut swap = false;
  let mut next_cut = cuts.iter().peekable();
  for i in 0..n {
    if next_cut.peek().is_some_and(|&&k| k == i) {
      swap = !swap;
      next_cut.next();
    }
    let (x, y) = if swap { (b[i], a[i]) } else { (a[i], b[i]) };
    c[i] = x;
    d[i] = y;
  }
}

/// Order crossover: `c` keeps a random slice of `a` in place and takes the
/// remaining values in the order they appear in `b`. Valid permutations in,
/// valid permutation out.
pub fn order<R: Rng + ?Sized>(
  a: &[i64],
  b: &[i64],
  c: &mut [i64],
  rng: &mut R,
) {
  let n = a.len();
  if n < 2 {
    c.copy_from_slice(a);
    return;
  }
  let (mut lo, mut hi) = (rng.gen_range(0..n), rng.gen_range(0..n));
  if lo > hi {
    std::mem::swap(&mut lo, &mut hi);
  }
  let kept = &a[lo..=hi];
  c[lo..=hi].copy_from_slice(kept);
  let mut fill = b.iter().filter(|v| !kept.contains(v));
  for i in (0..lo).chain(hi + 1..n) {
    if let Some(&v) = fill.next() {
      c[i] = v;
    }
  }
}
