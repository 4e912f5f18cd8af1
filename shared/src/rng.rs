use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, VecDeque};

/// Source of uniformly distributed indices.
///
/// Every random decision the wheel makes goes through this trait, so tests can
/// replace true randomness with a fixed script and assert exact outcomes.
pub trait IndexSource {
    /// Returns an index in `[0, len)`. Returns 0 when `len` is 0.
    fn pick(&mut self, len: usize) -> usize;
}

impl<S: IndexSource + ?Sized> IndexSource for &mut S {
    fn pick(&mut self, len: usize) -> usize {
        (**self).pick(len)
    }
}

impl<S: IndexSource + ?Sized> IndexSource for Box<S> {
    fn pick(&mut self, len: usize) -> usize {
        (**self).pick(len)
    }
}

/// Production source backed by `rand`'s standard generator.
#[derive(Debug, Clone)]
pub struct RandSource {
    rng: StdRng,
}

impl RandSource {
    pub fn from_entropy() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    /// Reproducible source, handy for rehearsing an event with a known seed.
    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Default for RandSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl IndexSource for RandSource {
    fn pick(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }
}

/// Replays a fixed list of indices. Each value is reduced modulo the requested
/// length; once the script runs out every pick returns 0.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    script: VecDeque<usize>,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = usize>) -> Self {
        Self { script: script.into_iter().collect() }
    }
}

impl IndexSource for ScriptedSource {
    fn pick(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.script.pop_front().map(|v| v % len).unwrap_or(0)
    }
}

/// Picks one element uniformly, or `None` for an empty slice.
pub fn choose<T: Copy>(source: &mut impl IndexSource, items: &[T]) -> Option<T> {
    if items.is_empty() {
        return None;
    }
    items.get(source.pick(items.len())).copied()
}

/// Fisher-Yates shuffle in place.
pub fn shuffle<T>(source: &mut impl IndexSource, slice: &mut [T]) {
    for i in (1..slice.len()).rev() {
        let j = source.pick(i + 1);
        slice.swap(i, j);
    }
}

/// Draws `count` distinct positions from `[0, range)`. Asking for more
/// positions than the range holds returns the whole range.
pub fn sample_positions(source: &mut impl IndexSource, range: usize, count: usize) -> BTreeSet<usize> {
    let mut remaining: Vec<usize> = (0..range).collect();
    let mut picked = BTreeSet::new();
    while picked.len() < count && !remaining.is_empty() {
        let idx = source.pick(remaining.len());
        picked.insert(remaining.swap_remove(idx));
    }
    picked
}
