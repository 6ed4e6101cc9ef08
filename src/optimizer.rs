//! Repeated runs of one evolver and statistics over them.

use std::{
  ops::Not,
  time::{Duration, Instant},
};

use log::info;
use typed_builder::TypedBuilder;

use crate::{
  error::Result,
  evolver::{Evolver, RunSummary},
  front::{FrontAssessor, FrontQuality},
  problem::Problem,
  recombination::Reproduction,
};

/// Whether a trial ended with a feasible best solution.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TrialStatus {
  /// The best solution satisfies every constraint.
  Feasible,
  /// Even the best solution violates some constraint.
  Infeasible,
}

/// Outcome of one trial.
#[derive(Clone, Debug, PartialEq)]
pub struct TrialReport {
  /// Feasibility of `flt`/`int`.
  pub status: TrialStatus,
  /// Float genes of the best solution.
  pub flt: Vec<f64>,
  /// Integer genes of the best solution.
  pub int: Vec<i64>,
  /// Objectives of the best solution.
  pub ova: Vec<f64>,
  /// Generations, evaluations and wall time of the run.
  pub run: RunSummary,
  /// Front quality, if a reference front was given.
  pub quality: Option<FrontQuality>,
}

/// Minimum, average, maximum and sample standard deviation.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Summary {
  /// Smallest value.
  pub min: f64,
  /// Mean value.
  pub ave: f64,
  /// Largest value.
  pub max: f64,
  /// Sample standard deviation, `0` for a single value.
  pub dev: f64,
}

impl Summary {
  /// Statistics of `values`, or `None` if there are none.
  pub fn of(values: &[f64]) -> Option<Self> {
    if values.is_empty() {
      return None;
    }
    let n = values.len() as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let ave = values.iter().sum::<f64>() / n;
    let dev = if values.len() < 2 {
      0.0
    } else {
      (values.iter().map(|x| (x - ave).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    };
    Some(Self { min, ave, max, dev })
  }
}

/// All trials of an [`Optimizer`] run.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
  /// One report per trial, in order.
  pub trials: Vec<TrialReport>,
  /// Wall time of all trials, resets included.
  pub elapsed: Duration,
}

impl Report {
  /// Number of trials with a feasible best solution.
  pub fn nfeasible(&self) -> usize {
    self.feasible().count()
  }

  /// Evaluations used by the first trial.
  pub fn nfeval(&self) -> usize {
    self.trials.first().map_or(0, |t| t.run.nfeval)
  }

  /// Statistics of objective `i` of the feasible best solutions.
  pub fn objective(&self, i: usize) -> Option<Summary> {
    let values: Vec<f64> = self.feasible().map(|t| t.ova[i]).collect();
    Summary::of(&values)
  }

  /// Statistics of the distance errors of every assessed trial.
  pub fn distance_error(&self) -> Option<Summary> {
    let values: Vec<f64> = self
      .trials
      .iter()
      .filter_map(|t| t.quality.map(|q| q.distance_error))
      .collect();
    Summary::of(&values)
  }

  /// Statistics of the spreads of every assessed trial.
  pub fn spread(&self) -> Option<Summary> {
    let values: Vec<f64> = self
      .trials
      .iter()
      .filter_map(|t| t.quality.map(|q| q.spread))
      .collect();
    Summary::of(&values)
  }

  fn feasible(&self) -> impl Iterator<Item = &TrialReport> {
    self
      .trials
      .iter()
      .filter(|t| t.status == TrialStatus::Feasible)
  }
}

/// Runs an evolver `ntrials` times from fresh populations.
///
/// # Examples
/// ```
/// # use archipelago::{config::Config, evolver::Evolver, optimizer::Optimizer};
/// let config = Config::builder()
///   .nova(1)
///   .nsol(12)
///   .ncpu(2)
///   .tf(20)
///   .seed(3)
///   .flt_min(vec![-5.0])
///   .flt_max(vec![5.0])
///   .build();
/// let sphere = |f: &mut [f64],
///               _: &mut [f64],
///               _: &mut [f64],
///               x: &[f64],
///               _: &[i64],
///               _: usize| {
///   f[0] = x[0] * x[0];
/// };
/// let mut optimizer = Optimizer::builder()
///   .evolver(Evolver::with_operators(config, sphere).unwrap())
///   .ntrials(3)
///   .build();
/// let report = optimizer.run().unwrap();
/// assert_eq!(report.nfeasible(), 3);
/// assert!(report.objective(0).unwrap().max < 0.5);
/// ```
#[derive(TypedBuilder)]
pub struct Optimizer<P, R> {
  evolver: Evolver<P, R>,
  #[builder(setter(
    transform = |n: usize| {
      n.eq(&0)
        .not()
        .then_some(n)
        .unwrap_or_else(|| panic!("number of trials must be positive"))
    },
    doc = "
Number of trials.

# Panics

Panics if `ntrials` is zero.",
  ))]
  ntrials: usize,
  /// Known front to assess every trial against.
  #[builder(default, setter(strip_option))]
  reference: Option<FrontAssessor>,
}

impl<P: Problem, R: Reproduction> Optimizer<P, R> {
  /// The evolver, as left by the last trial.
  pub fn evolver(&self) -> &Evolver<P, R> {
    &self.evolver
  }

  /// Runs every trial. The first trial uses the population the evolver was
  /// built with; later ones start from a fresh sample.
  ///
  /// # Errors
  ///
  /// Fails on the first trial whose run fails.
  pub fn run(&mut self) -> Result<Report> {
    let start = Instant::now();
    let mut trials = Vec::with_capacity(self.ntrials);
    for trial in 0..self.ntrials {
      if trial > 0 {
        self.evolver.reset()?;
      }
      let run = self.evolver.run()?;
      let report = self.report(run);
      info!(
        "trial {trial}: {:?} f = {:?} in {:?}",
        report.status, report.ova, report.run.elapsed
      );
      trials.push(report);
    }
    Ok(Report {
      trials,
      elapsed: start.elapsed(),
    })
  }

  fn report(&self, run: RunSummary) -> TrialReport {
    let best = self
      .evolver
      .best()
      .expect("an evolver always holds solutions");
    TrialReport {
      status: if best.is_feasible() {
        TrialStatus::Feasible
      } else {
        TrialStatus::Infeasible
      },
      flt: best.flt.clone(),
      int: best.int.clone(),
      ova: best.ova.clone(),
      run,
      quality: self.reference.as_ref().map(|r| r.assess(&self.evolver)),
    }
  }
}
