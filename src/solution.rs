//! Candidate solutions and the primitives used to compare them.

use std::cmp::Ordering;

use crate::score::{violation, ParetoDominance, Score};

/// Guards range denominators against degenerate (zero-width) ranges.
pub(crate) const EPS_RANGE: f64 = 1e-15;

/// One candidate point in decision space together with its evaluation and the
/// dominance bookkeeping refreshed by [`Metrics::compute`].
///
/// Relations to other solutions (`win_over`, `closest`) are indices into the
/// buffer that was last ranked, never references. They are meaningful only
/// until that buffer is reordered.
///
/// [`Metrics::compute`]: crate::metrics::Metrics::compute
#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
  /// Real-valued genes.
  pub flt: Vec<f64>,
  /// Integer, binary or permutation genes.
  pub int: Vec<i64>,
  /// Objective values, all minimized.
  pub ova: Vec<Score>,
  /// Constraint residuals. `>= 0` is satisfied, `< 0` is violated.
  pub oor: Vec<Score>,

  /// Number of solutions this one dominates.
  pub nwins: usize,
  /// Number of solutions dominating this one.
  pub nlosses: usize,
  /// Indices of dominated solutions. Only the first `nwins` are valid.
  pub win_over: Vec<usize>,
  /// Index of the non-dominated front, `0` being the best.
  pub front_id: usize,
  /// Crowding distance inside the front, `-1` for singleton fronts.
  pub dist_crowd: f64,
  /// Decision-space distance to the closest other solution.
  pub dist_neigh: f64,
  /// Index of the closest other solution.
  pub closest: Option<usize>,
  /// Whether a near-duplicate with a lower index exists.
  pub repeated: bool,
}

/// Per-gene ranges used to normalise decision-space distances.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ranges {
  /// Minimum of each float gene.
  pub fmin: Vec<f64>,
  /// Maximum of each float gene.
  pub fmax: Vec<f64>,
  /// Minimum of each integer gene.
  pub imin: Vec<i64>,
  /// Maximum of each integer gene.
  pub imax: Vec<i64>,
}

impl Ranges {
  /// Creates zeroed ranges for the given gene counts.
  pub fn new(nflt: usize, nint: usize) -> Self {
    Self {
      fmin: vec![0.0; nflt],
      fmax: vec![0.0; nflt],
      imin: vec![0; nint],
      imax: vec![0; nint],
    }
  }
}

impl Solution {
  /// Allocates a blank solution. `capacity` is the size of the largest buffer
  /// this solution will ever be ranked in.
  pub fn new(
    nova: usize,
    noor: usize,
    nflt: usize,
    nint: usize,
    capacity: usize,
  ) -> Self {
    Self {
      flt: vec![0.0; nflt],
      int: vec![0; nint],
      ova: vec![0.0; nova],
      oor: vec![0.0; noor],
      nwins: 0,
      nlosses: 0,
      win_over: vec![0; capacity],
      front_id: 0,
      dist_crowd: 0.0,
      dist_neigh: f64::INFINITY,
      closest: None,
      repeated: false,
    }
  }

  /// Returns `true` if every constraint residual is satisfied.
  pub fn is_feasible(&self) -> bool {
    self.oor.iter().all(|&r| r >= 0.0)
  }

  /// Makes sure `win_over` can hold relations to `capacity` solutions.
  pub(crate) fn reserve_wins(&mut self, capacity: usize) {
    if self.win_over.len() < capacity {
      self.win_over.resize(capacity, 0);
    }
  }

  /// Dominance test. Returns `(self_dominates, other_dominates)`; at most one
  /// of them is `true`.
  ///
  /// Feasible solutions dominate infeasible ones. Among infeasible solutions
  /// the smaller total violation wins, a NaN residual being the worst. Among
  /// feasible solutions plain Pareto dominance over `ova` applies.
  pub fn compare(&self, other: &Solution) -> (bool, bool) {
    let ord = match (self.is_feasible(), other.is_feasible()) {
      (true, false) => Ordering::Less,
      (false, true) => Ordering::Greater,
      (false, false) => violation(&self.oor)
        .partial_cmp(&violation(&other.oor))
        .unwrap_or(Ordering::Equal),
      (true, true) => self.ova.dominance(&other.ova),
    };
    (ord == Ordering::Less, ord == Ordering::Greater)
  }

  /// Normalised Euclidean distance in decision space. Each gene difference
  /// is divided by the width of its range.
  pub fn distance(&self, other: &Solution, ranges: &Ranges) -> f64 {
    let flt = self.flt.iter().zip(&other.flt).enumerate().map(|(i, (a, b))| {
      let del = ranges.fmax[i] - ranges.fmin[i] + EPS_RANGE;
      ((a - b) / del).powi(2)
    });
    let int = self.int.iter().zip(&other.int).enumerate().map(|(i, (a, b))| {
      let del = (ranges.imax[i] - ranges.imin[i]) as f64 + EPS_RANGE;
      ((a - b) as f64 / del).powi(2)
    });
    flt.chain(int).sum::<f64>().sqrt()
  }

  /// Overwrites genotype and phenotype with `other`'s, leaving dominance
  /// bookkeeping and buffer capacities alone.
  pub fn copy_from(&mut self, other: &Solution) {
    self.flt.clone_from(&other.flt);
    self.int.clone_from(&other.int);
    self.ova.clone_from(&other.ova);
    self.oor.clone_from(&other.oor);
  }
}
