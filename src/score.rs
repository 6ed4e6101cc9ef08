//! Objective values and the dominance relation between them.

use std::cmp::Ordering;

/// An alias for a single objective value. All objectives are minimized.
pub type Score = f64;

/// Describes pareto dominance for slices of `Score`s under minimization.
pub(crate) trait ParetoDominance {
  /// Returns `Less` if `self` dominates `other`, `Greater` if `other`
  /// dominates `self`, otherwise `Equal`. `self` dominates `other` if no
  /// `self` value is larger than its counterpart and at least one is smaller.
  fn dominance(&self, other: &Self) -> Ordering;
}

impl ParetoDominance for [Score] {
  fn dominance(&self, other: &Self) -> Ordering {
    let mut ord = Ordering::Equal;
    for (a, b) in self.iter().zip(other) {
      match (ord, a.partial_cmp(b).unwrap_or(Ordering::Equal)) {
        (Ordering::Equal, next_ord) => ord = next_ord,
        (Ordering::Greater, Ordering::Less)
        | (Ordering::Less, Ordering::Greater) => return Ordering::Equal,
        _ => {}
      }
    }
    ord
  }
}

/// Total constraint violation of a residual vector. Residuals `>= 0` are
/// satisfied and contribute nothing; a NaN residual is an infinite violation.
pub(crate) fn violation(oor: &[Score]) -> Score {
  oor
    .iter()
    .map(|&r| match r {
      r if r.is_nan() => f64::INFINITY,
      r if r < 0.0 => -r,
      _ => 0.0,
    })
    .sum()
}

#[cfg(test)]
mod tests {
  use std::cmp::Ordering;

  use super::*;

  #[test]
  fn test_pareto_dominance() {
    assert_eq!([1.0, 2.0, 3.0].dominance(&[1.0, 2.0, 3.0]), Ordering::Equal);
    assert_eq!([1.0, 2.0, 3.0].dominance(&[3.0, 2.0, 1.0]), Ordering::Equal);
    assert_eq!(
      [-2.0, 1.0, 3.0].dominance(&[2.0, -1.0, -3.0]),
      Ordering::Equal
    );

    assert_eq!(
      [10.0, 2.0, 3.0].dominance(&[1.0, 2.0, 3.0]),
      Ordering::Greater
    );
    assert_eq!(
      [1.0, 2.0, 30.0].dominance(&[1.0, 2.0, 3.0]),
      Ordering::Greater
    );

    assert_eq!([1.0, 2.0, 3.0].dominance(&[1.0, 20.0, 3.0]), Ordering::Less);
    assert_eq!(
      [-1.0, 2.0, -3.0].dominance(&[2.0, 2.0, 4.0]),
      Ordering::Less
    );
    // negative values are simply smaller, not farther from zero
    assert_eq!([-5.0].dominance(&[1.0]), Ordering::Less);

    assert_eq!([1.0; 0].dominance(&[0.0; 0]), Ordering::Equal);
  }

  #[test]
  fn test_violation() {
    assert_eq!(violation(&[]), 0.0);
    assert_eq!(violation(&[0.0, 1.0, 2.5]), 0.0);
    assert_eq!(violation(&[-1.0, 3.0, -0.5]), 1.5);
    assert_eq!(violation(&[1.0, f64::NAN]), f64::INFINITY);
  }
}
