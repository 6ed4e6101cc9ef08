//! Non-dominated sorting, crowding distances and duplicate detection.
//!
//! [`Metrics`] ranks a buffer of solutions in place. Every call to
//! [`Metrics::compute`] resets and refills the dominance bookkeeping stored on
//! each [`Solution`]; nothing survives from the previous call except the
//! pre-allocated storage.
//!
//! The sort is the incremental front-peeling scheme of NSGA-II with one
//! addition: solutions closer than [`DMIN`] in decision space to a solution
//! with a lower index are flagged as `repeated` and never ranked. They keep
//! `front_id == 0` and `dist_crowd == 0` but take no part in dominance, so the
//! truncation step treats them as the worst candidates.

use log::trace;

use crate::{
  error::{Error, Result},
  solution::{Ranges, Solution, EPS_RANGE},
};

/// Decision-space distance below which two solutions count as duplicates.
pub const DMIN: f64 = 1e-7;

/// Ranking state scoped to one buffer of solutions.
#[derive(Clone, Debug)]
pub struct Metrics {
  /// Current minimum of each objective.
  pub omin: Vec<f64>,
  /// Current maximum of each objective.
  pub omax: Vec<f64>,
  /// Current gene ranges.
  pub ranges: Ranges,
  fsizes: Vec<usize>,
  fronts: Vec<Vec<usize>>,
  nfronts: usize,
}

impl Metrics {
  /// Allocates storage for ranking up to `nsol` solutions. The front matrix
  /// is `nsol × nsol`, enough for every solution sitting in its own front.
  pub fn new(nova: usize, nflt: usize, nint: usize, nsol: usize) -> Self {
    Self {
      omin: vec![0.0; nova],
      omax: vec![0.0; nova],
      ranges: Ranges::new(nflt, nint),
      fsizes: vec![0; nsol],
      fronts: vec![vec![0; nsol]; nsol],
      nfronts: 0,
    }
  }

  /// Maximum number of solutions this instance can rank.
  pub fn capacity(&self) -> usize {
    self.fsizes.len()
  }

  /// Number of fronts found by the last [`compute`](Metrics::compute).
  pub fn nfronts(&self) -> usize {
    self.nfronts
  }

  /// Indices of the solutions in front `r` found by the last
  /// [`compute`](Metrics::compute).
  pub fn front(&self, r: usize) -> &[usize] {
    if r >= self.nfronts {
      return &[];
    }
    &self.fronts[r][..self.fsizes[r]]
  }

  /// Ranks `sols` and returns the number of non-dominated fronts.
  ///
  /// # Errors
  ///
  /// Returns [`Error::NanObjective`] if any objective value is NaN.
  ///
  /// # Panics
  ///
  /// Panics if `sols` holds more solutions than this instance was sized for.
  pub fn compute(&mut self, sols: &mut [Solution]) -> Result<usize> {
    let nsol = sols.len();
    assert!(
      nsol <= self.capacity(),
      "metrics sized for {} solutions, got {nsol}",
      self.capacity()
    );
    self.nfronts = 0;
    if nsol == 0 {
      return Ok(0);
    }

    self.reset_and_find_limits(sols)?;
    self.find_neighbours(sols);
    self.find_dominance(sols);
    self.peel_fronts(sols);
    self.crowd_distances(sols);

    trace!("ranked {nsol} solutions into {} fronts", self.nfronts);
    Ok(self.nfronts)
  }

  fn reset_and_find_limits(&mut self, sols: &mut [Solution]) -> Result<()> {
    let nsol = sols.len();
    self.fsizes.iter_mut().for_each(|z| *z = 0);
    for (i, sol) in sols.iter_mut().enumerate() {
      sol.repeated = false;
      sol.nwins = 0;
      sol.nlosses = 0;
      sol.front_id = 0;
      sol.dist_crowd = 0.0;
      sol.dist_neigh = f64::INFINITY;
      sol.closest = None;
      sol.reserve_wins(nsol);

      if sol.ova.iter().any(|x| x.is_nan()) {
        return Err(Error::NanObjective {
          flt: sol.flt.clone(),
          int: sol.int.clone(),
          ova: sol.ova.clone(),
          oor: sol.oor.clone(),
        });
      }
      update_limits(i, &sol.ova, &mut self.omin, &mut self.omax);
      update_limits(i, &sol.flt, &mut self.ranges.fmin, &mut self.ranges.fmax);
      update_limits(i, &sol.int, &mut self.ranges.imin, &mut self.ranges.imax);
    }
    Ok(())
  }

  fn find_neighbours(&self, sols: &mut [Solution]) {
    let nsol = sols.len();
    for i in 0..nsol {
      for j in i + 1..nsol {
        let dist = sols[i].distance(&sols[j], &self.ranges);
        if dist < sols[i].dist_neigh {
          sols[i].dist_neigh = dist;
          sols[i].closest = Some(j);
        }
        if dist < sols[j].dist_neigh {
          sols[j].dist_neigh = dist;
          sols[j].closest = Some(i);
        }
        if dist < DMIN {
          sols[j].repeated = true;
        }
      }
    }
  }

  fn find_dominance(&self, sols: &mut [Solution]) {
    let nsol = sols.len();
    for i in 0..nsol {
      if sols[i].repeated {
        continue;
      }
      for j in i + 1..nsol {
        if sols[j].repeated {
          continue;
        }
        let (i_dom, j_dom) = sols[i].compare(&sols[j]);
        if i_dom {
          let n = sols[i].nwins;
          sols[i].win_over[n] = j;
          sols[i].nwins += 1;
          sols[j].nlosses += 1;
        }
        if j_dom {
          let n = sols[j].nwins;
          sols[j].win_over[n] = i;
          sols[j].nwins += 1;
          sols[i].nlosses += 1;
        }
      }
    }
  }

  fn peel_fronts(&mut self, sols: &mut [Solution]) {
    let nsol = sols.len();
    for (i, sol) in sols.iter().enumerate() {
      if !sol.repeated && sol.nlosses == 0 {
        self.fronts[0][self.fsizes[0]] = i;
        self.fsizes[0] += 1;
      }
    }

    let mut r = 0;
    while r < nsol && self.fsizes[r] > 0 {
      self.nfronts += 1;
      for s in 0..self.fsizes[r] {
        let a = self.fronts[r][s];
        if sols[a].repeated {
          trace!("repeated solution {a} found in front {r}");
          continue;
        }
        for k in 0..sols[a].nwins {
          let b = sols[a].win_over[k];
          if sols[b].repeated {
            trace!("repeated solution {b} dominated by {a}");
            continue;
          }
          sols[b].nlosses -= 1;
          if sols[b].nlosses == 0 {
            debug_assert!(r + 1 < nsol, "more fronts than solutions");
            sols[b].front_id = r + 1;
            self.fronts[r + 1][self.fsizes[r + 1]] = b;
            self.fsizes[r + 1] += 1;
          }
        }
      }
      r += 1;
    }
  }

  fn crowd_distances(&mut self, sols: &mut [Solution]) {
    let nova = self.omin.len();
    for r in 0..self.nfronts {
      let l = self.fsizes[r];
      if l == 1 {
        sols[self.fronts[r][0]].dist_crowd = -1.0;
        continue;
      }
      let (m, n) = (l - 1, l - 2);
      let front = &mut self.fronts[r][..l];
      for j in 0..nova {
        // stable, so ties keep their buffer order
        front.sort_by(|&a, &b| sols[a].ova[j].total_cmp(&sols[b].ova[j]));
        let del = self.omax[j] - self.omin[j] + EPS_RANGE;
        let ova = |k: usize, sols: &[Solution]| sols[front[k]].ova[j];

        let lo = ((ova(1, sols) - ova(0, sols)) / del).powi(2);
        let hi = ((ova(m, sols) - ova(n, sols)) / del).powi(2);
        sols[front[0]].dist_crowd += lo;
        sols[front[m]].dist_crowd += hi;
        for i in 1..m {
          let prev = (ova(i, sols) - ova(i - 1, sols)) / del;
          let next = (ova(i + 1, sols) - ova(i, sols)) / del;
          sols[front[i]].dist_crowd += prev * next;
        }
      }
    }
  }
}

fn update_limits<T: Copy + PartialOrd>(
  i: usize,
  xs: &[T],
  min: &mut [T],
  max: &mut [T],
) {
  for (j, &x) in xs.iter().enumerate() {
    if i == 0 || x < min[j] {
      min[j] = x;
    }
    if i == 0 || x > max[j] {
      max[j] = x;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sols_from(points: &[(f64, [f64; 2])]) -> Vec<Solution> {
    points
      .iter()
      .map(|(x, ova)| {
        let mut s = Solution::new(2, 0, 1, 0, points.len());
        s.flt[0] = *x;
        s.ova.copy_from_slice(ova);
        s
      })
      .collect()
  }

  #[test]
  fn test_fronts() {
    let mut sols = sols_from(&[
      (0.0, [1.0, 4.0]), // front 0
      (1.0, [2.0, 2.0]), // front 0
      (2.0, [3.0, 3.0]), // dominated by 1
      (3.0, [4.0, 1.0]), // front 0
      (4.0, [5.0, 5.0]), // dominated by everything above
    ]);
    let mut metrics = Metrics::new(2, 1, 0, sols.len());
    let nfronts = metrics.compute(&mut sols).unwrap();
    assert_eq!(nfronts, 3);
    let mut front0 = metrics.front(0).to_vec();
    front0.sort();
    assert_eq!(front0, vec![0, 1, 3]);
    assert_eq!(metrics.front(1), &[2]);
    assert_eq!(metrics.front(2), &[4]);
    assert_eq!(metrics.front(3), &[] as &[usize]);
    assert_eq!(
      sols.iter().map(|s| s.front_id).collect::<Vec<_>>(),
      vec![0, 0, 1, 0, 2]
    );
    assert_eq!(sols[4].nlosses, 0);
    assert_eq!(sols[1].nwins, 2);
  }

  #[test]
  fn test_fronts_partition_and_dominators_come_first() {
    let mut sols: Vec<_> = (0..30)
      .map(|i| {
        let x = i as f64;
        let mut s = Solution::new(2, 0, 1, 0, 30);
        s.flt[0] = x;
        s.ova = vec![(x * 7.0) % 11.0, (x * 5.0) % 13.0];
        s
      })
      .collect();
    let mut metrics = Metrics::new(2, 1, 0, sols.len());
    let nfronts = metrics.compute(&mut sols).unwrap();

    let mut seen = vec![0; sols.len()];
    for r in 0..nfronts {
      for &i in metrics.front(r) {
        seen[i] += 1;
        assert_eq!(sols[i].front_id, r);
      }
    }
    for (i, s) in sols.iter().enumerate() {
      assert_eq!(seen[i], if s.repeated { 0 } else { 1 });
      for (j, t) in sols.iter().enumerate() {
        if i != j && !s.repeated && !t.repeated && t.compare(s).0 {
          assert!(t.front_id < s.front_id);
        }
      }
    }
    for &i in metrics.front(0) {
      assert!(sols.iter().all(|t| t.repeated || !t.compare(&sols[i]).0));
    }
  }

  #[test]
  fn test_duplicates_are_not_ranked() {
    let mut sols = sols_from(&[
      (0.0, [1.0, 2.0]),
      (0.5, [2.0, 1.0]),
      (0.0, [1.0, 2.0]), // same genes as 0
    ]);
    let mut metrics = Metrics::new(2, 1, 0, sols.len());
    let nfronts = metrics.compute(&mut sols).unwrap();
    assert_eq!(nfronts, 1);
    assert!(!sols[0].repeated);
    assert!(sols[2].repeated);
    let mut front0 = metrics.front(0).to_vec();
    front0.sort();
    assert_eq!(front0, vec![0, 1]);
    assert_eq!(sols[0].closest, Some(2));
    assert_eq!(sols[2].closest, Some(0));
    assert_eq!(sols[0].dist_neigh, 0.0);
    assert_eq!(sols[2].nwins + sols[2].nlosses, 0);
  }

  #[test]
  fn test_singleton_front_sentinel() {
    let mut sols = sols_from(&[(0.0, [1.0, 1.0]), (1.0, [2.0, 2.0])]);
    let mut metrics = Metrics::new(2, 1, 0, 4);
    assert_eq!(metrics.compute(&mut sols).unwrap(), 2);
    assert_eq!(sols[0].dist_crowd, -1.0);
    assert_eq!(sols[1].dist_crowd, -1.0);
  }

  #[test]
  fn test_crowding_prefers_extremes() {
    let mut sols = sols_from(&[
      (0.0, [0.0, 4.0]),
      (1.0, [1.0, 3.0]),
      (2.0, [2.0, 2.0]),
      (3.0, [3.0, 1.0]),
      (4.0, [4.0, 0.0]),
    ]);
    let mut metrics = Metrics::new(2, 1, 0, sols.len());
    assert_eq!(metrics.compute(&mut sols).unwrap(), 1);
    let boundary = sols[0].dist_crowd.min(sols[4].dist_crowd);
    for s in &sols[1..4] {
      assert!(boundary >= s.dist_crowd - 1e-12);
      assert!(s.dist_crowd.is_finite());
    }
    // evenly spaced: every gap is 1/4 on both axes
    assert!((sols[0].dist_crowd - 2.0 / 16.0).abs() < 1e-12);
    assert!((sols[2].dist_crowd - 2.0 / 16.0).abs() < 1e-12);
  }

  #[test]
  fn test_degenerate_axis_is_finite() {
    let mut sols = sols_from(&[
      (0.0, [1.0, 1.0]),
      (1.0, [1.0, 1.0]),
      (2.0, [1.0, 1.0]),
    ]);
    let mut metrics = Metrics::new(2, 1, 0, sols.len());
    assert_eq!(metrics.compute(&mut sols).unwrap(), 1);
    assert!(sols.iter().all(|s| s.dist_crowd == 0.0));
  }

  #[test]
  fn test_nan_is_fatal() {
    let mut sols = sols_from(&[(0.0, [1.0, f64::NAN]), (1.0, [2.0, 2.0])]);
    let mut metrics = Metrics::new(2, 1, 0, sols.len());
    match metrics.compute(&mut sols) {
      Err(Error::NanObjective { flt, .. }) => assert_eq!(flt, vec![0.0]),
      other => panic!("expected NaN error, got {other:?}"),
    }
  }

  #[test]
  fn test_recompute_is_reproducible() {
    let mut sols = sols_from(&[
      (0.0, [0.0, 3.0]),
      (1.0, [1.0, 1.5]),
      (2.0, [2.0, 2.0]),
      (3.0, [3.0, 0.0]),
    ]);
    let mut metrics = Metrics::new(2, 1, 0, sols.len());
    metrics.compute(&mut sols).unwrap();
    let first = sols.clone();
    metrics.compute(&mut sols).unwrap();
    assert_eq!(first, sols);
  }

  #[test]
  fn test_infeasible_ranked_behind_feasible() {
    let mut sols = sols_from(&[(0.0, [0.0, 0.0]), (1.0, [5.0, 5.0])]);
    for s in sols.iter_mut() {
      s.oor = vec![0.0];
    }
    sols[0].oor[0] = -1.0;
    let mut metrics = Metrics::new(2, 1, 0, sols.len());
    assert_eq!(metrics.compute(&mut sols).unwrap(), 2);
    assert_eq!(sols[1].front_id, 0);
    assert_eq!(sols[0].front_id, 1);
  }
}
