//! A sub-population evolving on its own worker.

use std::cmp::Ordering;

use log::trace;
use rand::{rngs::StdRng, SeedableRng};

use crate::{
  config::Config,
  error::Result,
  group::Group,
  problem::{Evaluator, Problem},
  recombination::Reproduction,
  solution::Solution,
};

/// One island: a [`Group`] of the population, the random stream that drives
/// it and the scratch space used to evaluate its offspring.
///
/// An island touches nothing but its own group, so islands can step through
/// a generation on separate threads.
#[derive(Clone, Debug)]
pub struct Island {
  /// Worker index, forwarded to [`Problem::evaluate`].
  pub id: usize,
  /// Current solutions and offspring slots.
  pub group: Group,
  rng: StdRng,
  evaluator: Evaluator,
}

impl Island {
  /// Takes island `id`'s share of `solutions` and seeds its random stream.
  /// The share is not evaluated yet.
  pub(crate) fn new(
    id: usize,
    config: &Config,
    solutions: &[Solution],
    seed: u64,
  ) -> Self {
    let mut rng = StdRng::seed_from_u64(seed);
    let group = Group::new(id, config.ncpu, solutions, &mut rng);
    Self {
      id,
      group,
      rng,
      evaluator: Evaluator::new(id, config),
    }
  }

  /// Number of problem evaluations since the last reset.
  pub fn nfeval(&self) -> usize {
    self.evaluator.nfeval()
  }

  /// Current solutions.
  pub fn population(&self) -> &[Solution] {
    self.group.current()
  }

  /// Replaces the current solutions with `solutions`, which must have the
  /// same length, and clears the evaluation counter.
  pub(crate) fn reset(&mut self, solutions: &[Solution]) {
    assert_eq!(solutions.len(), self.group.ncur, "island {} resized", self.id);
    for (s, new) in self.group.current_mut().iter_mut().zip(solutions) {
      s.copy_from(new);
    }
    self.evaluator.reset();
    self.group.draw_pairs(&mut self.rng);
  }

  /// Evaluates every current solution. Used once, on the initial population.
  pub(crate) fn evaluate_current<P: Problem + ?Sized>(&mut self, problem: &P) {
    let ncur = self.group.ncur;
    for s in self.group.all[..ncur].iter_mut() {
      self.evaluator.evaluate(problem, s);
    }
  }

  /// Fills the offspring slots from freshly drawn parent pairs and evaluates
  /// them.
  pub(crate) fn breed<P, R>(&mut self, problem: &P, reproduction: &R)
  where
    P: Problem + ?Sized,
    R: Reproduction + ?Sized,
  {
    self.group.draw_pairs(&mut self.rng);
    let (pairs, cur, fut) = self.group.split();
    for (&[i, j], slots) in pairs.iter().zip(fut.chunks_exact_mut(2)) {
      let (c, d) = slots.split_at_mut(1);
      let offspring = [&mut c[0], &mut d[0]];
      reproduction.reproduce(&cur[i], &cur[j], offspring, &mut self.rng);
    }
    for s in fut.iter_mut() {
      self.evaluator.evaluate(problem, s);
    }
  }

  /// Ranks parents and offspring together with the island's own metrics.
  pub(crate) fn rank(&mut self) -> Result<usize> {
    let nfronts = self.group.metrics.compute(&mut self.group.all)?;
    trace!("island {}: {nfronts} fronts", self.id);
    Ok(nfronts)
  }

  /// Ranks only the current solutions. Offspring slots are left alone.
  pub(crate) fn rank_current(&mut self) -> Result<usize> {
    let ncur = self.group.ncur;
    self.group.metrics.compute(&mut self.group.all[..ncur])
  }

  /// Elitist truncation: reorders `all` so the best `ncur` solutions become
  /// the current ones and the rest are recycled as offspring slots.
  ///
  /// Ranked solutions come before repeated ones, lower fronts before higher
  /// ones, and within a front the more isolated solution comes first.
  pub(crate) fn select(&mut self) {
    let all = std::mem::take(&mut self.group.all);
    let mut order: Vec<usize> = (0..all.len()).collect();
    order.sort_by(|&a, &b| survival(&all[a], &all[b]));

    let mut some_solutions: Vec<_> = all.into_iter().map(Some).collect();
    self.group.all = order
      .into_iter()
      .map(|idx| some_solutions[idx].take().expect("must be something here"))
      .collect();
  }
}

fn survival(a: &Solution, b: &Solution) -> Ordering {
  a.repeated
    .cmp(&b.repeated)
    .then(a.front_id.cmp(&b.front_id))
    .then(b.dist_crowd.total_cmp(&a.dist_crowd))
}

#[cfg(test)]
mod tests {
  use rand::RngCore;

  use super::*;

  fn config() -> Config {
    Config::builder()
      .nova(2)
      .nsol(8)
      .ncpu(1)
      .flt_min(vec![0.0])
      .flt_max(vec![1.0])
      .build()
      .validate()
      .unwrap()
  }

  fn problem(
    f: &mut [f64],
    _: &mut [f64],
    _: &mut [f64],
    x: &[f64],
    _: &[i64],
    _: usize,
  ) {
    f[0] = x[0];
    f[1] = 1.0 - x[0];
  }

  fn island(genes: &[f64]) -> Island {
    let c = config();
    let sols: Vec<_> = genes
      .iter()
      .map(|&x| {
        let mut s = Solution::new(2, 0, 1, 0, 16);
        s.flt[0] = x;
        s
      })
      .collect();
    let mut isl = Island::new(0, &c, &sols, 5);
    isl.evaluate_current(&problem);
    isl
  }

  #[test]
  fn test_breed_fills_offspring() {
    let mut isl = island(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8]);
    let halve = |a: &Solution,
                 b: &Solution,
                 [c, d]: [&mut Solution; 2],
                 _: &mut dyn RngCore| {
      c.flt[0] = a.flt[0] / 2.0;
      d.flt[0] = b.flt[0] / 2.0;
    };
    isl.breed(&problem, &halve);
    assert_eq!(isl.nfeval(), 16);
    let offspring = &isl.group.all[8..];
    let mut parents: Vec<_> =
      offspring.iter().map(|s| s.flt[0] * 2.0).collect();
    parents.sort_by(f64::total_cmp);
    let expected = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8];
    assert!(parents.iter().zip(expected).all(|(a, b)| (a - b).abs() < 1e-12));
    assert!(offspring
      .iter()
      .all(|s| (s.ova[0] + s.ova[1] - 1.0).abs() < 1e-12));
  }

  #[test]
  fn test_select_drops_dominated_and_repeated() {
    let mut isl = island(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8]);
    // offspring: four copies of a parent plus four dominated by everything
    let n = isl.group.ncur;
    for k in 0..n {
      let s = &mut isl.group.all[n + k];
      if k < 4 {
        s.flt[0] = 0.1;
        s.ova = vec![0.1, 0.9];
      } else {
        s.flt[0] = 0.95 + k as f64 / 100.0;
        s.ova = vec![2.0, 2.0];
      }
    }
    isl.rank().unwrap();
    isl.select();
    let kept: Vec<_> = isl.population().iter().map(|s| s.flt[0]).collect();
    assert!(isl.population().iter().all(|s| !s.repeated && s.front_id == 0));
    assert!(kept.iter().all(|&x| x <= 0.8));
    assert_eq!(isl.group.all.len(), 16);
  }

  #[test]
  fn test_reset_replaces_population() {
    let mut isl = island(&[0.1; 8]);
    let fresh: Vec<_> = (0..8)
      .map(|i| {
        let mut s = Solution::new(2, 0, 1, 0, 16);
        s.flt[0] = i as f64 / 10.0;
        s
      })
      .collect();
    isl.reset(&fresh);
    assert_eq!(isl.nfeval(), 0);
    assert_eq!(isl.population()[3].flt[0], 0.3);
  }
}
