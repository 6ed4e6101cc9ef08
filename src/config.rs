//! Run configuration, its defaults and its validation.

use std::time::Duration;

use log::warn;
use typed_builder::TypedBuilder;

use crate::{
  error::{Error, Result},
  group::partition,
};

/// How integer genes are interpreted by the default operators.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Encoding {
  /// Integers bounded by `int_min`/`int_max`.
  #[default]
  Generic,
  /// That many bits, each `0` or `1`.
  Binary(usize),
  /// An ordering of `0..n`.
  Permutation(usize),
}

/// How the initial population is sampled.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Sampling {
  /// Independent uniform draws.
  Random,
  /// Latin hypercube for float genes, uniform draws for integer genes.
  #[default]
  Latin,
}

/// How islands exchange individuals.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Migration {
  /// A random individual of each island trades places.
  Swap,
  /// A random individual of each island is compared and the loser is
  /// overwritten by a copy of the winner.
  #[default]
  Tournament,
}

/// Which solutions are ranked together before truncation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Ranking {
  /// Each island ranks its own parents and offspring.
  #[default]
  Island,
  /// Parents and offspring of all islands are ranked as one population.
  Global,
}

/// Parameters of a run. Build it with [`Config::builder`] and pass it
/// through [`Config::validate`] before handing it to an evolver.
///
/// # Examples
/// ```
/// # use archipelago::config::Config;
/// let config = Config::builder()
///   .nova(2)
///   .nsol(40)
///   .ncpu(2)
///   .flt_min(vec![0.0])
///   .flt_max(vec![1.0])
///   .build()
///   .validate()
///   .unwrap();
/// assert_eq!(config.dt_exc, 10);
/// ```
#[derive(TypedBuilder, Clone, Debug, PartialEq)]
pub struct Config {
  /// Number of objective values.
  #[builder(default = 1)]
  pub nova: usize,
  /// Number of inequality constraints, `g(x) >= 0`.
  #[builder(default = 0)]
  pub ng: usize,
  /// Number of equality constraints, `h(x) = 0`.
  #[builder(default = 0)]
  pub nh: usize,
  /// Total number of solutions.
  #[builder(default = 40)]
  pub nsol: usize,
  /// Number of islands, one per worker.
  #[builder(default = 4)]
  pub ncpu: usize,
  /// Number of generations.
  #[builder(default = 100)]
  pub tf: usize,
  /// Generations between migrations. `0` means `tf / 10`.
  #[builder(default = 0)]
  pub dt_exc: usize,
  /// Seed of the random number generators. `None` seeds from entropy.
  #[builder(default, setter(strip_option))]
  pub seed: Option<u64>,
  /// Run islands in parallel.
  #[builder(default = true)]
  pub parallel: bool,
  /// Tolerance on `|h(x)|` for equality constraints.
  #[builder(default = 0.1)]
  pub eps_h: f64,
  /// Initial sampling method.
  #[builder(default)]
  pub sampling: Sampling,
  /// Interpretation of integer genes.
  #[builder(default)]
  pub encoding: Encoding,
  /// Migration method.
  #[builder(default)]
  pub migration: Migration,
  /// Migrate between one random pair of islands instead of every pair.
  #[builder(default = true)]
  pub exc_one: bool,
  /// Ranking scope.
  #[builder(default)]
  pub ranking: Ranking,
  /// Wall-clock budget, checked between generations.
  #[builder(default, setter(strip_option))]
  pub time_budget: Option<Duration>,

  /// Lower bounds of float genes.
  #[builder(default)]
  pub flt_min: Vec<f64>,
  /// Upper bounds of float genes.
  #[builder(default)]
  pub flt_max: Vec<f64>,
  /// Lower bounds of generic integer genes.
  #[builder(default)]
  pub int_min: Vec<i64>,
  /// Upper bounds of generic integer genes.
  #[builder(default)]
  pub int_max: Vec<i64>,

  /// Probability of crossover for floats.
  #[builder(default = 0.8)]
  pub flt_pc: f64,
  /// Probability of mutating each float gene.
  #[builder(default = 0.1)]
  pub flt_pm: f64,
  /// Distribution index of simulated binary crossover.
  #[builder(default = 15.0)]
  pub eta_c: f64,
  /// Distribution index of polynomial mutation.
  #[builder(default = 20.0)]
  pub eta_m: f64,
  /// Probability of crossover for ints.
  #[builder(default = 0.8)]
  pub int_pc: f64,
  /// Number of cuts in crossover of ints.
  #[builder(default = 1)]
  pub int_ncuts: usize,
  /// Probability of mutation for ints.
  #[builder(default = 0.01)]
  pub int_pm: f64,
  /// Number of changes during mutation of ints.
  #[builder(default = 1)]
  pub int_nchanges: usize,

  /// Number of float genes. Derived.
  #[builder(setter(skip), default)]
  pub nflt: usize,
  /// Number of integer genes. Derived.
  #[builder(setter(skip), default)]
  pub nint: usize,
  /// Width of each float range. Derived.
  #[builder(setter(skip), default)]
  pub del_flt: Vec<f64>,
  /// Width of each generic integer range. Derived.
  #[builder(setter(skip), default)]
  pub del_int: Vec<i64>,
}

/// Smallest population the evolver accepts.
pub const MIN_NSOL: usize = 6;

impl Config {
  /// Number of constraint residuals, `ng + nh`.
  pub fn noor(&self) -> usize {
    self.ng + self.nh
  }

  /// Normalises lenient settings, computes derived values and rejects
  /// configurations that cannot run.
  ///
  /// Normalisation: fewer than 2 islands means one serial island; more
  /// islands than `nsol / 2` are clamped; `tf` is at least 1; `dt_exc`
  /// defaults to `tf / 10`; cut and change counts are clamped to the number
  /// of integer genes.
  ///
  /// # Errors
  ///
  /// Returns [`Error::Configuration`] if there are no objectives, no genes,
  /// too few solutions, mismatched or inverted bounds, probabilities outside
  /// `[0, 1]`, or a split that leaves some island with an odd number of
  /// solutions.
  pub fn validate(mut self) -> Result<Self> {
    if self.nova < 1 {
      return Err(config_error("number of objective values must be positive"));
    }
    if self.nsol < MIN_NSOL {
      return Err(config_error(format!(
        "number of solutions must be at least {MIN_NSOL}, got {}",
        self.nsol
      )));
    }
    if self.ncpu < 2 {
      self.ncpu = 1;
      self.parallel = false;
    }
    if self.ncpu > self.nsol / 2 {
      warn!(
        "number of islands {} exceeds half the population, using {}",
        self.ncpu,
        self.nsol / 2
      );
      self.ncpu = self.nsol / 2;
    }
    if let Some(cpu) = (0..self.ncpu)
      .find(|&cpu| partition(cpu, self.ncpu, self.nsol).len() % 2 != 0)
    {
      return Err(config_error(format!(
        "{} solutions across {} islands give island {cpu} an odd share",
        self.nsol, self.ncpu
      )));
    }
    self.tf = self.tf.max(1);
    if self.dt_exc < 1 {
      self.dt_exc = (self.tf / 10).max(1);
    }

    if self.flt_min.len() != self.flt_max.len() {
      return Err(config_error(format!(
        "flt_min has {} entries but flt_max has {}",
        self.flt_min.len(),
        self.flt_max.len()
      )));
    }
    self.nflt = self.flt_min.len();
    self.del_flt = Vec::with_capacity(self.nflt);
    for (i, (lo, hi)) in self.flt_min.iter().zip(&self.flt_max).enumerate() {
      if !(lo <= hi) {
        return Err(config_error(format!(
          "float gene {i} has inverted bounds [{lo}, {hi}]"
        )));
      }
      self.del_flt.push(hi - lo);
    }

    self.nint = match self.encoding {
      Encoding::Generic => {
        if self.int_min.len() != self.int_max.len() {
          return Err(config_error(format!(
            "int_min has {} entries but int_max has {}",
            self.int_min.len(),
            self.int_max.len()
          )));
        }
        self.int_min.len()
      }
      Encoding::Binary(n) => {
        self.int_min = vec![0; n];
        self.int_max = vec![1; n];
        n
      }
      Encoding::Permutation(n) => {
        self.int_min = vec![0; n];
        self.int_max = vec![n.saturating_sub(1) as i64; n];
        n
      }
    };
    self.del_int = Vec::with_capacity(self.nint);
    for (i, (lo, hi)) in self.int_min.iter().zip(&self.int_max).enumerate() {
      if lo > hi {
        return Err(config_error(format!(
          "integer gene {i} has inverted bounds [{lo}, {hi}]"
        )));
      }
      self.del_int.push(hi - lo);
    }
    if self.nflt == 0 && self.nint == 0 {
      return Err(config_error(
        "either floats or ints must be set via bounds or the encoding",
      ));
    }

    for (name, p) in [
      ("flt_pc", self.flt_pc),
      ("flt_pm", self.flt_pm),
      ("int_pc", self.int_pc),
      ("int_pm", self.int_pm),
    ] {
      if !(0.0..=1.0).contains(&p) {
        return Err(config_error(format!("{name} = {p} is not a probability")));
      }
    }
    if self.nint > 0 {
      self.int_ncuts = self.int_ncuts.min(self.nint);
      self.int_nchanges = self.int_nchanges.min(self.nint);
    }
    Ok(self)
  }

  /// Clamps `x` into the range of float gene `i`.
  pub fn enforce_range(&self, i: usize, x: f64) -> f64 {
    x.clamp(self.flt_min[i], self.flt_max[i])
  }
}

fn config_error(msg: impl Into<String>) -> Error {
  Error::Configuration(msg.into())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn base() -> Config {
    Config::builder()
      .nova(2)
      .nsol(40)
      .ncpu(4)
      .flt_min(vec![0.0, -1.0])
      .flt_max(vec![1.0, 1.0])
      .build()
  }

  #[test]
  fn test_defaults_and_derived() {
    let c = base().validate().unwrap();
    assert_eq!(c.tf, 100);
    assert_eq!(c.dt_exc, 10);
    assert_eq!(c.nflt, 2);
    assert_eq!(c.nint, 0);
    assert_eq!(c.del_flt, vec![1.0, 2.0]);
    assert_eq!(c.noor(), 0);
    assert_eq!(c.enforce_range(1, 3.0), 1.0);
    assert_eq!(c.enforce_range(1, -3.0), -1.0);
  }

  #[test]
  fn test_ncpu_is_normalised() {
    let c = Config { ncpu: 0, ..base() }.validate().unwrap();
    assert_eq!(c.ncpu, 1);
    assert!(!c.parallel);

    let c = Config::builder()
      .nsol(8)
      .ncpu(10)
      .flt_min(vec![0.0])
      .flt_max(vec![1.0])
      .build()
      .validate()
      .unwrap();
    assert_eq!(c.ncpu, 4);
  }

  #[test]
  fn test_fatal_configurations() {
    assert!(Config { nova: 0, ..base() }.validate().is_err());
    assert!(Config { nsol: 4, ..base() }.validate().is_err());
    assert!(Config { nsol: 42, ..base() }.validate().is_err());
    assert!(Config { flt_max: vec![1.0], ..base() }.validate().is_err());
    let inverted = Config { flt_max: vec![-1.0, 1.0], ..base() };
    assert!(inverted.validate().is_err());
    assert!(Config { int_pm: 1.5, ..base() }.validate().is_err());
    let none = Config::builder().nsol(10).ncpu(1).build().validate();
    assert!(matches!(none, Err(Error::Configuration(_))));
  }

  #[test]
  fn test_int_encodings() {
    let c = Config::builder()
      .nsol(10)
      .ncpu(1)
      .encoding(Encoding::Permutation(5))
      .int_ncuts(9)
      .build()
      .validate()
      .unwrap();
    assert_eq!(c.nint, 5);
    assert_eq!(c.int_max, vec![4; 5]);
    assert_eq!(c.int_ncuts, 5);

    let c = Config::builder()
      .nsol(10)
      .ncpu(1)
      .encoding(Encoding::Binary(12))
      .build()
      .validate()
      .unwrap();
    assert_eq!(c.nint, 12);
    assert_eq!(c.del_int, vec![1; 12]);
  }
}
