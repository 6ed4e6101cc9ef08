//! Partitioning of the population across parallel workers.

use std::ops::Range;

use rand::{seq::SliceRandom, Rng};

use crate::{metrics::Metrics, solution::Solution};

/// Contiguous range of global indices owned by worker `cpu` out of `ncpu`
/// when `n` solutions are split. Integer arithmetic only, so every index
/// belongs to exactly one worker for any `(cpu, ncpu, n)`.
pub fn partition(cpu: usize, ncpu: usize, n: usize) -> Range<usize> {
  (cpu * n) / ncpu..((cpu + 1) * n) / ncpu
}

/// The slice of the population evolved by one worker.
///
/// `all[..ncur]` are the current parents and `all[ncur..]` are offspring
/// buffers owned exclusively by this group.
#[derive(Clone, Debug)]
pub struct Group {
  /// Number of current solutions, `all.len() / 2`.
  pub ncur: usize,
  /// Current solutions followed by their offspring slots.
  pub all: Vec<Solution>,
  /// Indices of current solutions, shuffled to draw pairs.
  pub indices: Vec<usize>,
  /// Parent pairs used by the next reproduction step.
  pub pairs: Vec<[usize; 2]>,
  /// Ranking state scoped to `all`.
  pub metrics: Metrics,
}

impl Group {
  /// Takes worker `cpu`'s share of `solutions`, allocates as many offspring
  /// slots and draws the first parent pairs.
  ///
  /// # Panics
  ///
  /// Panics if `solutions` is empty, `cpu >= ncpu`, or the share is odd or
  /// empty.
  pub fn new<R: Rng + ?Sized>(
    cpu: usize,
    ncpu: usize,
    solutions: &[Solution],
    rng: &mut R,
  ) -> Self {
    assert!(!solutions.is_empty(), "cannot split an empty population");
    assert!(cpu < ncpu, "worker {cpu} out of {ncpu}");
    let range = partition(cpu, ncpu, solutions.len());
    let ncur = range.len();
    assert!(
      ncur > 0 && ncur % 2 == 0,
      "worker {cpu} got {ncur} solutions, must be even and non-zero"
    );

    let proto = &solutions[0];
    let (nova, noor) = (proto.ova.len(), proto.oor.len());
    let (nflt, nint) = (proto.flt.len(), proto.int.len());
    let mut all = Vec::with_capacity(2 * ncur);
    all.extend(solutions[range].iter().cloned());
    all.extend(
      (0..ncur).map(|_| Solution::new(nova, noor, nflt, nint, 2 * ncur)),
    );
    all.iter_mut().for_each(|s| s.reserve_wins(2 * ncur));

    let mut group = Self {
      ncur,
      all,
      indices: (0..ncur).collect(),
      pairs: vec![[0, 0]; ncur / 2],
      metrics: Metrics::new(nova, nflt, nint, 2 * ncur),
    };
    group.draw_pairs(rng);
    group
  }

  /// Redraws `pairs`: each current solution appears in exactly one pair and
  /// no pair repeats an index.
  pub fn draw_pairs<R: Rng + ?Sized>(&mut self, rng: &mut R) {
    self.indices.shuffle(rng);
    let chunks = self.indices.chunks_exact(2);
    for (pair, chunk) in self.pairs.iter_mut().zip(chunks) {
      *pair = [chunk[0], chunk[1]];
    }
  }

  /// Current solutions.
  pub fn current(&self) -> &[Solution] {
    &self.all[..self.ncur]
  }

  /// Current solutions, mutably.
  pub fn current_mut(&mut self) -> &mut [Solution] {
    &mut self.all[..self.ncur]
  }

  /// Splits the group into its parent pairs, current solutions and offspring
  /// slots. Pair `k` fills offspring slots `2k` and `2k + 1`.
  pub fn split(&mut self) -> (&[[usize; 2]], &[Solution], &mut [Solution]) {
    let (cur, fut) = self.all.split_at_mut(self.ncur);
    (&self.pairs, &*cur, fut)
  }
}
