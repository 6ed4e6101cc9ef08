//! Quality of an evolved two-objective front against a known one.
//!
//! The reference front is a function `f1 = F(f0)` over a window
//! `[fmin, fmax]`. Two numbers describe an evolved front:
//! - the distance error, the worst vertical deviation of a front point from
//!   the reference curve;
//! - the spread, the share of grid bins along the reference curve that hold
//!   at least one evolved point.

use std::{collections::BTreeSet, f64::consts::PI, fmt};

use typed_builder::TypedBuilder;

use crate::{
  error::{Error, Result},
  evolver::Evolver,
  problem::Problem,
  recombination::Reproduction,
};

/// Grid and sampling parameters of a reference front.
///
/// # Examples
/// ```
/// # use archipelago::front::{FrontAssessor, FrontGrid};
/// let grid = FrontGrid::builder().fmin([0.0, 0.0]).fmax([1.0, 1.0]).build();
/// let assessor = FrontAssessor::new(|f0| 1.0 - f0 * f0, grid).unwrap();
/// assert_eq!(assessor.distance_error(&[0.5], &[0.75]), 0.0);
/// ```
#[derive(TypedBuilder, Clone, Debug, PartialEq)]
pub struct FrontGrid {
  /// Lower corner of the reference front.
  pub fmin: [f64; 2],
  /// Upper corner of the reference front. The grid reaches `1.1 × fmax`.
  pub fmax: [f64; 2],
  /// Objectives compared against `(f0, f1)` of the reference.
  #[builder(default = (0, 1))]
  pub objectives: (usize, usize),
  /// Divisions of the grid along each axis.
  #[builder(default = 20)]
  pub ndiv: usize,
  /// Radii, as fractions of the window diagonal, of the rings of points
  /// that select bins around the curve.
  #[builder(default = vec![0.02, 0.04])]
  pub rad_m: Vec<f64>,
  /// Number of points on each ring.
  #[builder(default = 8)]
  pub nray: usize,
  /// Open intervals of `f0` where the reference front does not exist.
  #[builder(default)]
  pub excl_f0: Vec<(f64, f64)>,
  /// Open intervals of `f1` where the reference front does not exist.
  #[builder(default)]
  pub excl_f1: Vec<(f64, f64)>,
}

/// Regular 2D grid of `ndiv × ndiv` bins.
#[derive(Clone, Debug, PartialEq)]
pub struct Bins {
  xmin: [f64; 2],
  xmax: [f64; 2],
  size: [f64; 2],
  ndiv: usize,
}

impl Bins {
  /// Splits `[xmin, xmax]` into `ndiv` bins per axis.
  pub fn new(xmin: [f64; 2], xmax: [f64; 2], ndiv: usize) -> Self {
    let size = [0, 1].map(|k| (xmax[k] - xmin[k]) / ndiv as f64);
    Self { xmin, xmax, size, ndiv }
  }

  /// Index of the bin holding `pt`, or `None` outside the grid. Points on
  /// the upper edge belong to the last bin.
  pub fn index(&self, pt: [f64; 2]) -> Option<usize> {
    let mut k = [0; 2];
    for d in 0..2 {
      if !(self.xmin[d] <= pt[d] && pt[d] <= self.xmax[d]) {
        return None;
      }
      let k_d = ((pt[d] - self.xmin[d]) / self.size[d]) as usize;
      k[d] = k_d.min(self.ndiv - 1);
    }
    Some(k[0] + k[1] * self.ndiv)
  }
}

/// Distance error and spread of one front.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct FrontQuality {
  /// Worst deviation of a front point from the reference curve.
  pub distance_error: f64,
  /// Share of selected bins holding a feasible point, in `[0, 1]`.
  pub spread: f64,
}

/// A reference front with its bins pre-selected.
pub struct FrontAssessor {
  reference: Box<dyn Fn(f64) -> f64 + Send + Sync>,
  grid: FrontGrid,
  bins: Bins,
  selected: BTreeSet<usize>,
}

impl fmt::Debug for FrontAssessor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FrontAssessor")
      .field("grid", &self.grid)
      .field("bins", &self.bins)
      .field("selected", &self.selected.len())
      .finish_non_exhaustive()
  }
}

impl FrontAssessor {
  /// Samples `reference` along `[fmin[0], fmax[0]]` at `10 × ndiv` points
  /// and selects every bin touched by a sample or by a ring point around it,
  /// skipping points inside the exclusion intervals.
  ///
  /// # Errors
  ///
  /// Returns [`Error::InvalidExclusion`] for an exclusion interval that is
  /// empty, inverted or NaN, and [`Error::Configuration`] for an empty window
  /// or zero divisions.
  pub fn new(
    reference: impl Fn(f64) -> f64 + Send + Sync + 'static,
    grid: FrontGrid,
  ) -> Result<Self> {
    for (axis, ranges) in [(0, &grid.excl_f0), (1, &grid.excl_f1)] {
      if let Some(&(lo, hi)) = ranges.iter().find(|(lo, hi)| !(lo < hi)) {
        return Err(Error::InvalidExclusion { axis, lo, hi });
      }
    }
    let (fmin, fmax) = (grid.fmin, grid.fmax);
    let top = fmax.map(|x| 1.1 * x);
    if grid.ndiv == 0 || !(fmin[0] < top[0] && fmin[1] < top[1]) {
      return Err(Error::Configuration(format!(
        "front window [{fmin:?}, {top:?}] with {} divisions has no bins",
        grid.ndiv
      )));
    }

    let bins = Bins::new(fmin, top, grid.ndiv);
    let excluded = |pt: [f64; 2]| {
      grid.excl_f0.iter().any(|&(lo, hi)| lo < pt[0] && pt[0] < hi)
        || grid.excl_f1.iter().any(|&(lo, hi)| lo < pt[1] && pt[1] < hi)
    };
    let diag = (fmax[0] - fmin[0]).hypot(fmax[1] - fmin[1]);
    let rings: Vec<[f64; 2]> = (0..grid.nray)
      .flat_map(|j| {
        let alpha = j as f64 * 2.0 * PI / grid.nray as f64;
        grid
          .rad_m
          .iter()
          .map(move |m| [m * diag * alpha.cos(), m * diag * alpha.sin()])
      })
      .collect();

    let mut selected = BTreeSet::new();
    let nsamples = 10 * grid.ndiv;
    for i in 0..nsamples {
      let f0 = fmin[0] + (fmax[0] - fmin[0]) * i as f64 / (nsamples - 1) as f64;
      let f1 = reference(f0);
      let around = rings.iter().map(|[d0, d1]| [f0 + d0, f1 + d1]);
      for pt in std::iter::once([f0, f1]).chain(around) {
        if excluded(pt) {
          continue;
        }
        if let Some(idx) = bins.index(pt) {
          selected.insert(idx);
        }
      }
    }

    Ok(Self {
      reference: Box::new(reference),
      grid,
      bins,
      selected,
    })
  }

  /// Grid parameters.
  pub fn grid(&self) -> &FrontGrid {
    &self.grid
  }

  /// Number of bins touching the reference front.
  pub fn selected_bins(&self) -> usize {
    self.selected.len()
  }

  /// Largest `|f1 - F(f0)|` over the given front points, `0` for no points.
  pub fn distance_error(&self, f0: &[f64], f1: &[f64]) -> f64 {
    f0.iter()
      .zip(f1)
      .map(|(&x, &y)| (y - (self.reference)(x)).abs())
      .fold(0.0, f64::max)
  }

  /// Share of selected bins holding at least one of the given points. Points
  /// beyond `1.1 × fmax` are ignored. No selected bins means no spread.
  pub fn spread(&self, f0: &[f64], f1: &[f64]) -> f64 {
    if self.selected.is_empty() {
      return 0.0;
    }
    let top = self.grid.fmax.map(|x| 1.1 * x);
    let occupied: BTreeSet<usize> = f0
      .iter()
      .zip(f1)
      .filter(|&(&x, &y)| x < top[0] && y < top[1])
      .filter_map(|(&x, &y)| self.bins.index([x, y]))
      .collect();
    let hits = self.selected.intersection(&occupied).count();
    hits as f64 / self.selected.len() as f64
  }

  /// Distance error of the evolver's Pareto front and spread of all its
  /// feasible solutions.
  pub fn assess<P: Problem, R: Reproduction>(
    &self,
    evolver: &Evolver<P, R>,
  ) -> FrontQuality {
    let (i, j) = self.grid.objectives;
    let (f0, f1) = evolver.front_ovas(i, j);
    let (all0, all1): (Vec<f64>, Vec<f64>) =
      evolver.feasible().iter().map(|s| (s.ova[i], s.ova[j])).unzip();
    FrontQuality {
      distance_error: self.distance_error(&f0, &f1),
      spread: self.spread(&all0, &all1),
    }
  }
}
