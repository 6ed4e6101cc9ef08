//! Error type shared by the whole crate.

use thiserror::Error;

/// Fatal conditions that abort a run.
///
/// Infeasible offspring, degenerate objective ranges and empty bin selections
/// are handled locally and never show up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
  /// Configuration is inconsistent or describes an unviable run.
  #[error("Configuration error: {0}")]
  Configuration(String),

  /// An objective evaluated to NaN, so ranking cannot proceed.
  #[error(
    "NaN found in objective value array\n\tflt = {flt:?}\n\tint = {int:?}\n\
     \tova = {ova:?}\n\toor = {oor:?}"
  )]
  NanObjective {
    /// Float genes of the offending solution.
    flt: Vec<f64>,
    /// Integer genes of the offending solution.
    int: Vec<i64>,
    /// Objective values of the offending solution.
    ova: Vec<f64>,
    /// Constraint residuals of the offending solution.
    oor: Vec<f64>,
  },

  /// A reference-front exclusion range is empty, inverted or not a number.
  #[error("Invalid exclusion range on f{axis}: ({lo}, {hi})")]
  InvalidExclusion {
    /// Objective axis, `0` or `1`.
    axis: usize,
    /// Lower end of the range.
    lo: f64,
    /// Upper end of the range.
    hi: f64,
  },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
