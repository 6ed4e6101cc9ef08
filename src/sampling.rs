//! Initial population sampling.

use rand::{seq::SliceRandom, Rng};

use crate::{
  config::{Config, Encoding, Sampling},
  solution::Solution,
};

/// Draws `config.nsol` unevaluated solutions.
///
/// Float genes follow `config.sampling`. Integer genes are uniform within
/// their bounds, except for the permutation encoding where every solution
/// receives a shuffled `0..nint`.
pub fn population<R: Rng + ?Sized>(
  config: &Config,
  rng: &mut R,
) -> Vec<Solution> {
  let nsol = config.nsol;
  let (nova, noor) = (config.nova, config.noor());
  let mut sols: Vec<_> = (0..nsol)
    .map(|_| Solution::new(nova, noor, config.nflt, config.nint, 2 * nsol))
    .collect();

  match config.sampling {
    Sampling::Random => {
      for s in sols.iter_mut() {
        for (i, x) in s.flt.iter_mut().enumerate() {
          *x = config.flt_min[i] + rng.gen::<f64>() * config.del_flt[i];
        }
      }
    }
    Sampling::Latin => {
      let mut strata: Vec<usize> = (0..nsol).collect();
      for i in 0..config.nflt {
        strata.shuffle(rng);
        for (s, &k) in sols.iter_mut().zip(&strata) {
          let u: f64 = rng.gen();
          let t = (k as f64 + u) / nsol as f64;
          s.flt[i] = config.flt_min[i] + config.del_flt[i] * t;
        }
      }
    }
  }

  for s in sols.iter_mut() {
    match config.encoding {
      Encoding::Permutation(_) => {
        s.int.iter_mut().enumerate().for_each(|(i, x)| *x = i as i64);
        s.int.shuffle(rng);
      }
      Encoding::Generic | Encoding::Binary(_) => {
        for (i, x) in s.int.iter_mut().enumerate() {
          *x = rng.gen_range(config.int_min[i]..=config.int_max[i]);
        }
      }
    }
  }
  sols
}
