//! Generational loop over a set of islands.
//!
//! Every generation each island breeds and evaluates its offspring, the
//! merged parents and offspring are ranked, and elitist truncation keeps the
//! best half. Breeding and truncation always run per island, in parallel when
//! the configuration allows it; ranking runs per island or over the whole
//! population depending on [`Ranking`]. Every `dt_exc` generations the
//! islands exchange individuals.
//!
//! Islands draw from their own random streams, all derived from the run seed,
//! so a fixed seed and island count reproduce a run exactly no matter how the
//! thread pool schedules the work.

use std::{
  cmp::Ordering,
  sync::{
    atomic::{self, AtomicBool},
    Arc,
  },
  time::{Duration, Instant},
};

use itertools::Itertools;
use log::{debug, info};
use rand::{rngs::StdRng, seq::index, Rng, SeedableRng};
use rayon::prelude::*;

use crate::{
  config::{Config, Migration, Ranking},
  error::Result,
  group::partition,
  island::Island,
  metrics::Metrics,
  problem::Problem,
  recombination::{Operators, Reproduction},
  sampling,
  solution::Solution,
};

/// Phase the evolver is in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum State {
  /// Built or reset, not running.
  Idle,
  /// Breeding and evaluating offspring.
  Evaluating,
  /// Ranking parents and offspring.
  Ranking,
  /// Truncating to the next generation.
  Selecting,
  /// Exchanging individuals between islands.
  Migrating,
  /// Last run finished.
  Done,
}

/// Shared flag that stops a run at the next generation boundary.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
  /// Requests cancellation.
  pub fn cancel(&self) {
    self.0.store(true, atomic::Ordering::Relaxed);
  }

  /// Returns `true` once cancellation was requested.
  pub fn is_cancelled(&self) -> bool {
    self.0.load(atomic::Ordering::Relaxed)
  }

  fn clear(&self) {
    self.0.store(false, atomic::Ordering::Relaxed);
  }
}

/// What a call to [`Evolver::run`] did.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct RunSummary {
  /// Generations completed.
  pub generations: usize,
  /// Problem evaluations, initial population included.
  pub nfeval: usize,
  /// Wall-clock time of the run.
  pub elapsed: Duration,
  /// `true` if cancellation or the time budget ended the run before `tf`.
  pub stopped_early: bool,
}

/// Island-parallel multi-objective evolver.
///
/// # Examples
/// ```
/// # use archipelago::{config::Config, evolver::Evolver};
/// let config = Config::builder()
///   .nova(2)
///   .nsol(20)
///   .ncpu(2)
///   .tf(10)
///   .seed(1)
///   .flt_min(vec![0.0])
///   .flt_max(vec![1.0])
///   .build();
/// let problem = |f: &mut [f64],
///                _: &mut [f64],
///                _: &mut [f64],
///                x: &[f64],
///                _: &[i64],
///                _: usize| {
///   f[0] = x[0];
///   f[1] = 1.0 - x[0] * x[0];
/// };
/// let mut evolver = Evolver::with_operators(config, problem).unwrap();
/// let summary = evolver.run().unwrap();
/// assert_eq!(summary.generations, 10);
/// assert!(!evolver.pareto_front().is_empty());
/// ```
pub struct Evolver<P, R = Operators> {
  config: Config,
  problem: P,
  reproduction: R,
  islands: Vec<Island>,
  rng: StdRng,
  global: Option<Metrics>,
  state: State,
  cancel: CancelFlag,
}

impl<P: Problem> Evolver<P, Operators> {
  /// Builds an evolver that reproduces with the default [`Operators`] for
  /// the configured encoding.
  ///
  /// # Errors
  ///
  /// See [`Evolver::new`].
  pub fn with_operators(config: Config, problem: P) -> Result<Self> {
    let config = config.validate()?;
    let operators = Operators::new(&config);
    Self::new(config, problem, operators)
  }
}

impl<P: Problem, R: Reproduction> Evolver<P, R> {
  /// Validates `config`, samples and evaluates the initial population and
  /// splits it into `ncpu` islands.
  ///
  /// # Errors
  ///
  /// Returns [`Error::Configuration`](crate::Error::Configuration) if the
  /// configuration is rejected and
  /// [`Error::NanObjective`](crate::Error::NanObjective) if the initial
  /// population cannot be ranked.
  pub fn new(config: Config, problem: P, reproduction: R) -> Result<Self> {
    let config = config.validate()?;
    let rng = match config.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    };
    let global = match config.ranking {
      Ranking::Global => Some(Metrics::new(
        config.nova,
        config.nflt,
        config.nint,
        2 * config.nsol,
      )),
      Ranking::Island => None,
    };
    let mut evolver = Self {
      config,
      problem,
      reproduction,
      islands: Vec::new(),
      rng,
      global,
      state: State::Idle,
      cancel: CancelFlag::default(),
    };
    evolver.populate()?;
    Ok(evolver)
  }

  /// Samples a fresh population into the islands, evaluates and ranks it.
  /// Island random streams carry on, so consecutive runs differ.
  ///
  /// # Errors
  ///
  /// Returns [`Error::NanObjective`](crate::Error::NanObjective) if the new
  /// population cannot be ranked.
  pub fn reset(&mut self) -> Result<()> {
    self.cancel.clear();
    self.populate()
  }

  fn populate(&mut self) -> Result<()> {
    let sols = sampling::population(&self.config, &mut self.rng);
    let ncpu = self.config.ncpu;
    if self.islands.is_empty() {
      self.islands = (0..ncpu)
        .map(|cpu| Island::new(cpu, &self.config, &sols, self.rng.gen()))
        .collect();
    } else {
      for isl in self.islands.iter_mut() {
        isl.reset(&sols[partition(isl.id, ncpu, sols.len())]);
      }
    }

    let problem = &self.problem;
    for_each_island(&mut self.islands, self.config.parallel, |isl| {
      isl.evaluate_current(problem);
      isl.rank_current().map(drop)
    })?;
    enter(&mut self.state, State::Idle);
    Ok(())
  }

  /// Runs `tf` generations, or fewer if cancelled or out of time.
  ///
  /// # Errors
  ///
  /// Returns [`Error::NanObjective`](crate::Error::NanObjective) if an
  /// offspring's objectives contain NaN. The population is left as it was at
  /// the failing generation.
  pub fn run(&mut self) -> Result<RunSummary> {
    let start = Instant::now();
    let (tf, dt_exc) = (self.config.tf, self.config.dt_exc);
    let mut generations = 0;
    let mut stopped_early = false;

    while generations < tf {
      if self.cancel.is_cancelled() {
        info!("cancelled after {generations} generations");
        stopped_early = true;
        break;
      }
      if self.config.time_budget.is_some_and(|b| start.elapsed() >= b) {
        info!("time budget exhausted after {generations} generations");
        stopped_early = true;
        break;
      }

      self.generation()?;
      generations += 1;

      if generations % dt_exc == 0 && generations < tf {
        enter(&mut self.state, State::Migrating);
        self.migrate();
      }
    }

    enter(&mut self.state, State::Done);
    let summary = RunSummary {
      generations,
      nfeval: self.nfeval(),
      elapsed: start.elapsed(),
      stopped_early,
    };
    info!(
      "{} generations, {} evaluations, {} feasible, {:?}",
      summary.generations,
      summary.nfeval,
      self.feasible().len(),
      summary.elapsed
    );
    Ok(summary)
  }

  fn generation(&mut self) -> Result<()> {
    let parallel = self.config.parallel;
    let (problem, reproduction) = (&self.problem, &self.reproduction);

    enter(&mut self.state, State::Evaluating);
    for_each_island(&mut self.islands, parallel, |isl| {
      isl.breed(problem, reproduction);
      Ok(())
    })?;

    enter(&mut self.state, State::Ranking);
    match self.global.as_mut() {
      Some(metrics) => rank_globally(metrics, &mut self.islands)?,
      None => for_each_island(&mut self.islands, parallel, |isl| {
        isl.rank().map(drop)
      })?,
    }

    enter(&mut self.state, State::Selecting);
    for_each_island(&mut self.islands, parallel, |isl| {
      isl.select();
      Ok(())
    })
  }

  fn migrate(&mut self) {
    let n = self.islands.len();
    if n < 2 {
      return;
    }
    let pairs: Vec<(usize, usize)> = if self.config.exc_one {
      let picked = index::sample(&mut self.rng, n, 2);
      let (i, j) = (picked.index(0), picked.index(1));
      vec![(i.min(j), i.max(j))]
    } else {
      (0..n).tuple_combinations().collect()
    };

    for (i, j) in pairs {
      let (left, right) = self.islands.split_at_mut(j);
      let (a, b) = (&mut left[i], &mut right[0]);
      let k = self.rng.gen_range(0..a.group.ncur);
      let l = self.rng.gen_range(0..b.group.ncur);
      let (x, y) = (&mut a.group.all[k], &mut b.group.all[l]);
      match self.config.migration {
        Migration::Swap => {
          std::mem::swap(x, y);
          debug!("swapped {i}:{k} with {j}:{l}");
        }
        Migration::Tournament => match tournament(x, y) {
          Ordering::Less => {
            y.copy_from(x);
            debug!("{i}:{k} replaced {j}:{l}");
          }
          Ordering::Greater => {
            x.copy_from(y);
            debug!("{j}:{l} replaced {i}:{k}");
          }
          Ordering::Equal => debug!("{i}:{k} and {j}:{l} tied"),
        },
      }
    }
  }

  /// Handle that cancels a running [`run`](Evolver::run) at the next
  /// generation boundary. Cleared by [`reset`](Evolver::reset).
  pub fn cancel_flag(&self) -> CancelFlag {
    self.cancel.clone()
  }

  /// Current phase.
  pub fn state(&self) -> State {
    self.state
  }

  /// Validated configuration in use.
  pub fn config(&self) -> &Config {
    &self.config
  }

  /// The islands, in worker order.
  pub fn islands(&self) -> &[Island] {
    &self.islands
  }

  /// Problem evaluations since construction or the last reset.
  pub fn nfeval(&self) -> usize {
    self.islands.iter().map(Island::nfeval).sum()
  }

  /// Current solutions of every island.
  pub fn populations(&self) -> Vec<&[Solution]> {
    self.islands.iter().map(Island::population).collect()
  }

  /// Current solutions, across all islands, that satisfy every constraint.
  pub fn feasible(&self) -> Vec<&Solution> {
    self
      .islands
      .iter()
      .flat_map(Island::population)
      .filter(|s| s.is_feasible())
      .collect()
  }

  /// Objective values of the feasible solutions.
  pub fn results(&self) -> Vec<Vec<f64>> {
    self.feasible().into_iter().map(|s| s.ova.clone()).collect()
  }

  /// Feasible solutions not dominated by any other feasible solution, taken
  /// across all islands.
  pub fn pareto_front(&self) -> Vec<&Solution> {
    let feasible = self.feasible();
    feasible
      .iter()
      .filter(|s| !feasible.iter().any(|o| o.compare(s).0))
      .copied()
      .collect()
  }

  /// Objectives `i` and `j` of [`pareto_front`](Evolver::pareto_front), as
  /// two columns.
  pub fn front_ovas(&self, i: usize, j: usize) -> (Vec<f64>, Vec<f64>) {
    self.pareto_front().iter().map(|s| (s.ova[i], s.ova[j])).unzip()
  }

  /// The best current solution: feasible before infeasible, then smaller
  /// violation, then smaller first objective.
  pub fn best(&self) -> Option<&Solution> {
    self
      .islands
      .iter()
      .flat_map(Island::population)
      .min_by(|a, b| {
        let (u, v) = (
          crate::score::violation(&a.oor),
          crate::score::violation(&b.oor),
        );
        u.total_cmp(&v).then(a.ova[0].total_cmp(&b.ova[0]))
      })
  }
}

fn enter(state: &mut State, next: State) {
  if *state != next {
    debug!("{state:?} -> {next:?}");
    *state = next;
  }
}

/// Applies `f` to every island, on the thread pool if `parallel`. Returning
/// is the generation barrier.
fn for_each_island<F>(
  islands: &mut [Island],
  parallel: bool,
  f: F,
) -> Result<()>
where
  F: Fn(&mut Island) -> Result<()> + Sync + Send,
{
  if parallel {
    islands.par_iter_mut().try_for_each(f)
  } else {
    islands.iter_mut().try_for_each(f)
  }
}

/// Ranks all islands' parents and offspring as one buffer. Index relations
/// (`win_over`, `closest`) refer to the merged buffer.
fn rank_globally(metrics: &mut Metrics, islands: &mut [Island]) -> Result<()> {
  let mut merged = Vec::with_capacity(metrics.capacity());
  for isl in islands.iter_mut() {
    merged.append(&mut isl.group.all);
  }
  let ranked = metrics.compute(&mut merged);

  let mut rest = merged.into_iter();
  for isl in islands.iter_mut() {
    let n = 2 * isl.group.ncur;
    isl.group.all.extend(rest.by_ref().take(n));
  }
  let nfronts = ranked?;
  debug!("{nfronts} global fronts");
  Ok(())
}

/// Winner of a migration tournament: dominance first, then a ranked solution
/// over a repeated one, then the lower front, then the larger crowding
/// distance. `Less` means `a` wins.
fn tournament(a: &Solution, b: &Solution) -> Ordering {
  match a.compare(b) {
    (true, _) => Ordering::Less,
    (_, true) => Ordering::Greater,
    _ => a
      .repeated
      .cmp(&b.repeated)
      .then(a.front_id.cmp(&b.front_id))
      .then(b.dist_crowd.total_cmp(&a.dist_crowd)),
  }
}

#[cfg(test)]
mod tests {
  use rand::RngCore;

  use super::*;

  fn convex(
    f: &mut [f64],
    _: &mut [f64],
    _: &mut [f64],
    x: &[f64],
    _: &[i64],
    _: usize,
  ) {
    f[0] = x[0];
    f[1] = 1.0 - x[0] * x[0];
  }

  fn config() -> Config {
    Config::builder()
      .nova(2)
      .nsol(24)
      .ncpu(3)
      .tf(20)
      .seed(42)
      .flt_min(vec![0.0])
      .flt_max(vec![1.0])
      .build()
  }

  fn fingerprint<P: Problem, R: Reproduction>(
    e: &Evolver<P, R>,
  ) -> Vec<(f64, usize, f64)> {
    e.populations()
      .into_iter()
      .flatten()
      .map(|s| (s.flt[0], s.front_id, s.dist_crowd))
      .collect()
  }

  #[test]
  fn test_population_size_is_kept() {
    let mut e = Evolver::with_operators(config(), convex).unwrap();
    assert_eq!(e.state(), State::Idle);
    assert_eq!(e.nfeval(), 24);
    let summary = e.run().unwrap();
    assert_eq!(e.state(), State::Done);
    assert_eq!(summary.generations, 20);
    assert!(!summary.stopped_early);
    assert_eq!(summary.nfeval, 24 + 20 * 24);
    assert_eq!(e.populations().iter().map(|p| p.len()).sum::<usize>(), 24);
    assert!(e.islands().iter().all(|i| i.group.all.len() == 16));
  }

  #[test]
  fn test_fixed_seed_reproduces_run() {
    for parallel in [true, false] {
      let c = Config { parallel, ..config() };
      let mut a = Evolver::with_operators(c.clone(), convex).unwrap();
      let mut b = Evolver::with_operators(c, convex).unwrap();
      a.run().unwrap();
      b.run().unwrap();
      assert_eq!(fingerprint(&a), fingerprint(&b));
    }
  }

  #[test]
  fn test_parallel_matches_serial() {
    let mut a = Evolver::with_operators(config(), convex).unwrap();
    let serial = Config { parallel: false, ..config() };
    let mut b = Evolver::with_operators(serial, convex).unwrap();
    a.run().unwrap();
    b.run().unwrap();
    assert_eq!(fingerprint(&a), fingerprint(&b));
  }

  #[test]
  fn test_global_ranking() {
    let c = Config {
      ranking: Ranking::Global,
      migration: Migration::Swap,
      exc_one: false,
      ..config()
    };
    let mut e = Evolver::with_operators(c, convex).unwrap();
    e.run().unwrap();
    assert!(e.islands().iter().all(|i| i.group.all.len() == 16));
    // every point of this problem lies on its front
    assert_eq!(e.pareto_front().len(), 24);
    assert_eq!(e.results().len(), 24);
  }

  #[test]
  fn test_cancel_before_run() {
    let mut e = Evolver::with_operators(config(), convex).unwrap();
    e.cancel_flag().cancel();
    let summary = e.run().unwrap();
    assert!(summary.stopped_early);
    assert_eq!(summary.generations, 0);
    e.reset().unwrap();
    assert!(!e.cancel_flag().is_cancelled());
  }

  #[test]
  fn test_time_budget() {
    let c = Config {
      time_budget: Some(Duration::ZERO),
      ..config()
    };
    let mut e = Evolver::with_operators(c, convex).unwrap();
    let summary = e.run().unwrap();
    assert!(summary.stopped_early);
    assert_eq!(summary.generations, 0);
  }

  #[test]
  fn test_nan_is_fatal() {
    let nan = |f: &mut [f64],
               _: &mut [f64],
               _: &mut [f64],
               x: &[f64],
               _: &[i64],
               _: usize| {
      f[0] = if x[0] > 2.0 { f64::NAN } else { x[0] };
      f[1] = 1.0 - x[0];
    };
    // offspring are pushed outside the sampled range
    let jump = |_: &Solution,
                _: &Solution,
                [c, d]: [&mut Solution; 2],
                _: &mut dyn RngCore| {
      c.flt[0] = 3.0;
      d.flt[0] = 3.0;
    };
    let mut e = Evolver::new(config(), nan, jump).unwrap();
    assert!(matches!(e.run(), Err(crate::Error::NanObjective { .. })));
  }

  #[test]
  fn test_tournament_prefers_dominating() {
    let mut a = Solution::new(2, 0, 1, 0, 2);
    let mut b = a.clone();
    a.ova = vec![0.0, 0.0];
    b.ova = vec![1.0, 1.0];
    assert_eq!(tournament(&a, &b), Ordering::Less);
    b.ova = vec![-1.0, 1.0];
    b.front_id = 1;
    assert_eq!(tournament(&a, &b), Ordering::Less);
    b.front_id = 0;
    b.dist_crowd = 1.0;
    assert_eq!(tournament(&a, &b), Ordering::Greater);
  }

  #[test]
  fn test_tournament_puts_repeated_last() {
    let mut a = Solution::new(2, 0, 1, 0, 2);
    let mut b = a.clone();
    a.ova = vec![0.0, 1.0];
    b.ova = vec![1.0, 0.0];
    a.repeated = true;
    b.front_id = 1;
    assert_eq!(tournament(&a, &b), Ordering::Greater);
    assert_eq!(tournament(&b, &a), Ordering::Less);
  }

  type ProblemFn =
    fn(&mut [f64], &mut [f64], &mut [f64], &[f64], &[i64], usize);

  fn two_islands(migration: Migration) -> Evolver<ProblemFn> {
    let c = Config {
      nsol: 8,
      ncpu: 2,
      migration,
      ..config()
    };
    Evolver::with_operators(c, convex as ProblemFn).unwrap()
  }

  // island `k` holds genes `10k + i` with objectives `(obj, obj)`
  fn fill(e: &mut Evolver<impl Problem>, k: usize, obj: f64) {
    for (i, s) in e.islands[k].group.current_mut().iter_mut().enumerate() {
      s.flt[0] = (10 * k + i) as f64;
      s.ova = vec![obj, obj];
      s.repeated = false;
      s.front_id = 0;
      s.dist_crowd = 0.5;
    }
  }

  fn genes(e: &Evolver<impl Problem>, k: usize) -> Vec<f64> {
    e.islands[k].population().iter().map(|s| s.flt[0]).collect()
  }

  #[test]
  fn test_tournament_migration_copies_winner() {
    let mut e = two_islands(Migration::Tournament);
    fill(&mut e, 0, 0.0);
    fill(&mut e, 1, 1.0);
    let before = genes(&e, 0);
    e.migrate();

    assert_eq!(genes(&e, 0), before);
    let moved: Vec<_> = e.islands[1]
      .population()
      .iter()
      .filter(|s| s.flt[0] < 10.0)
      .collect();
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].ova, vec![0.0, 0.0]);
    assert_eq!(e.populations().iter().map(|p| p.len()).sum::<usize>(), 8);
  }

  #[test]
  fn test_swap_migration_keeps_genes() {
    let mut e = two_islands(Migration::Swap);
    fill(&mut e, 0, 0.0);
    fill(&mut e, 1, 1.0);
    let mut before = [genes(&e, 0), genes(&e, 1)].concat();
    e.migrate();

    let (a, b) = (genes(&e, 0), genes(&e, 1));
    assert_eq!(a.iter().filter(|&&x| x >= 10.0).count(), 1);
    assert_eq!(b.iter().filter(|&&x| x < 10.0).count(), 1);
    let mut after = [a, b].concat();
    before.sort_by(f64::total_cmp);
    after.sort_by(f64::total_cmp);
    assert_eq!(before, after);
  }

  #[test]
  fn test_tied_migration_changes_nothing() {
    let mut e = two_islands(Migration::Tournament);
    fill(&mut e, 0, 0.5);
    fill(&mut e, 1, 0.5);
    let before = [genes(&e, 0), genes(&e, 1)];
    e.migrate();
    assert_eq!([genes(&e, 0), genes(&e, 1)], before);
  }

  #[test]
  fn test_feasible_subset() {
    let constrained = |f: &mut [f64],
                       g: &mut [f64],
                       _: &mut [f64],
                       x: &[f64],
                       _: &[i64],
                       _: usize| {
      f[0] = x[0];
      f[1] = 1.0 - x[0];
      g[0] = x[0] - 0.5;
    };
    let c = Config { ng: 1, ..config() };
    let mut e = Evolver::with_operators(c, constrained).unwrap();
    e.run().unwrap();
    assert!(e.feasible().iter().all(|s| s.flt[0] >= 0.5));
    assert!(e.best().is_some_and(|s| s.is_feasible()));
    let (f0, f1) = e.front_ovas(0, 1);
    assert_eq!(f0.len(), f1.len());
  }
}
