//! Objective and constraint evaluation.

use crate::{config::Config, solution::Solution};

/// A minimisation problem
///
/// ```text
///   min  {f0(x), f1(x), ...}
///   s.t. g_i(x) >= 0
///        h_j(x) = 0
/// ```
///
/// evaluated for one decision vector at a time. `cpu` is the index of the
/// island doing the evaluation, so implementors may keep per-worker scratch
/// space.
///
/// # Examples
/// ```
/// # use archipelago::problem::Problem;
/// // minimise x² and (x - 2)² subject to x >= 0
/// let p = |f: &mut [f64],
///          g: &mut [f64],
///          _: &mut [f64],
///          x: &[f64],
///          _: &[i64],
///          _: usize| {
///   f[0] = x[0] * x[0];
///   f[1] = (x[0] - 2.0).powi(2);
///   g[0] = x[0];
/// };
/// # fn takes_problem<P: Problem>(_: &P) {}
/// # takes_problem(&p);
/// ```
///
/// **Note that you always can implement this trait instead of using closures.**
pub trait Problem: Sync {
  /// Writes objectives into `f`, inequality residuals into `g` and equality
  /// residuals into `h` for the genes `flt` and `int`.
  fn evaluate(
    &self,
    f: &mut [f64],
    g: &mut [f64],
    h: &mut [f64],
    flt: &[f64],
    int: &[i64],
    cpu: usize,
  );
}

impl<F> Problem for F
where
  F: Fn(&mut [f64], &mut [f64], &mut [f64], &[f64], &[i64], usize) + Sync,
{
  fn evaluate(
    &self,
    f: &mut [f64],
    g: &mut [f64],
    h: &mut [f64],
    flt: &[f64],
    int: &[i64],
    cpu: usize,
  ) {
    self(f, g, h, flt, int, cpu)
  }
}

/// Per-island scratch space that turns a [`Problem`]'s raw output into a
/// solution's `ova` and `oor`.
#[derive(Clone, Debug)]
pub(crate) struct Evaluator {
  cpu: usize,
  eps_h: f64,
  ff: Vec<f64>,
  gg: Vec<f64>,
  hh: Vec<f64>,
  nfeval: usize,
}

impl Evaluator {
  pub(crate) fn new(cpu: usize, config: &Config) -> Self {
    Self {
      cpu,
      eps_h: config.eps_h,
      ff: vec![0.0; config.nova],
      gg: vec![0.0; config.ng],
      hh: vec![0.0; config.nh],
      nfeval: 0,
    }
  }

  /// Number of problem evaluations so far.
  pub(crate) fn nfeval(&self) -> usize {
    self.nfeval
  }

  pub(crate) fn reset(&mut self) {
    self.nfeval = 0;
  }

  /// Evaluates `sol`. Inequality residuals are stored as they are; an
  /// equality residual becomes `eps_h - |h|`, so it is satisfied within the
  /// tolerance. Values the problem leaves unwritten are zero.
  pub(crate) fn evaluate<P: Problem + ?Sized>(
    &mut self,
    problem: &P,
    sol: &mut Solution,
  ) {
    let ng = self.gg.len();
    self.ff.fill(0.0);
    self.gg.fill(0.0);
    self.hh.fill(0.0);
    problem.evaluate(
      &mut self.ff,
      &mut self.gg,
      &mut self.hh,
      &sol.flt,
      &sol.int,
      self.cpu,
    );
    sol.ova.copy_from_slice(&self.ff);
    sol.oor[..ng].copy_from_slice(&self.gg);
    for (oor, h) in sol.oor[ng..].iter_mut().zip(&self.hh) {
      *oor = self.eps_h - h.abs();
    }
    self.nfeval += 1;
  }
}
