//! **Archipelago** is an island-parallel multi-objective evolutionary
//! optimizer. Given objective functions and inequality/equality constraints
//! over real, integer, binary or permutation genes, it evolves a population
//! toward the Pareto-optimal trade-off surface.
//!
//! Here's a [quick start example](#example) for the impatient.
//!
//! # Workflow
//!
//! The population is split into **islands**, one per worker. Every generation
//! each island:
//! 1. **Breeds** one offspring per parent slot from randomly drawn parent
//!    pairs, with a [`Reproduction`] operator
//! 2. **Evaluates** every offspring with the user's [`Problem`]
//! 3. **Ranks** parents and offspring together: non-dominated sorting plus
//!    crowding distance, with duplicates flagged and left unranked (see
//!    [`Metrics`])
//! 4. **Truncates** back to its original size, keeping lower fronts first and
//!    more isolated solutions within a front
//!
//! Islands run these steps in parallel and never touch each other's
//! solutions. Every `dt_exc` generations, after all islands are done, they
//! **migrate**: a random individual of one island either trades places with
//! or competes against a random individual of another one.
//!
//! Ranking can also be done over the whole population at once
//! ([`Ranking::Global`]), which compares fronts across islands at the cost of
//! a sequential step per generation.
//!
//! # Closures
//!
//! [`Problem`] and [`Reproduction`] are implemented for closures of the right
//! shape, so a problem is usually just a closure that writes objectives into
//! `f`, inequality residuals (`g(x) >= 0` is satisfied) into `g` and equality
//! residuals into `h`. [`Operators`] provides crossover and mutation for every
//! encoding when you don't need a custom operator.
//!
//! # Constraints
//!
//! Feasible solutions always dominate infeasible ones, and among infeasible
//! solutions the one with the smaller total violation dominates. An equality
//! `h(x) = 0` is satisfied within `eps_h`.
//!
//! # Reproducibility
//!
//! Islands draw from independent random streams derived from
//! [`Config::seed`]. A fixed seed and island count reproduce a run exactly,
//! serial or parallel.
//!
//! # Example
//!
//! A two-objective problem whose Pareto front is `f1 = 1 - sqrt(f0)`:
//! ```
//! # fn main() -> archipelago::Result<()> {
//! use archipelago::{Config, Evolver, FrontAssessor, FrontGrid, FrontQuality};
//!
//! let config = Config::builder()
//!   .nova(2)
//!   .nsol(40)
//!   .ncpu(2)
//!   .tf(100)
//!   .seed(7)
//!   .flt_min(vec![0.0, 0.0])
//!   .flt_max(vec![1.0, 1.0])
//!   .build();
//! let problem = |f: &mut [f64],
//!                _: &mut [f64],
//!                _: &mut [f64],
//!                x: &[f64],
//!                _: &[i64],
//!                _: usize| {
//!   let g = 1.0 + x[1];
//!   f[0] = x[0];
//!   f[1] = g * (1.0 - (x[0] / g).sqrt());
//! };
//! let mut evolver = Evolver::with_operators(config, problem)?;
//! evolver.run()?;
//!
//! let grid = FrontGrid::builder().fmin([0.0, 0.0]).fmax([1.0, 1.0]).build();
//! let assessor = FrontAssessor::new(|f0| 1.0 - f0.sqrt(), grid)?;
//! let quality = assessor.assess(&evolver);
//! let FrontQuality { distance_error, spread } = quality;
//! println!("distance error {distance_error}, spread {spread}");
//! # Ok(())
//! # }
//! ```
//!
//! [`Ranking::Global`]: crate::config::Ranking::Global
//! [`Config::seed`]: crate::config::Config::seed

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod evolver;
pub mod front;
pub mod group;
pub mod island;
pub mod metrics;
pub mod mutation;
pub mod optimizer;
pub mod problem;
pub mod recombination;
pub mod sampling;
mod score;
pub mod solution;

pub use config::{Config, Encoding, Migration, Ranking, Sampling};
pub use error::{Error, Result};
pub use evolver::{CancelFlag, Evolver, RunSummary, State};
pub use front::{FrontAssessor, FrontGrid, FrontQuality};
pub use metrics::Metrics;
pub use optimizer::{Optimizer, Report, Summary, TrialReport, TrialStatus};
pub use problem::Problem;
pub use recombination::{Operators, Reproduction};
pub use solution::Solution;
