//! Score simulation for the demo drivers.
//!
//! Points are drawn from a small LCG so a seeded run is reproducible.

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Seed from the wall clock.
    pub fn from_clock() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos() ^ (d.as_secs() as u32))
            .unwrap_or(1);
        Self::new(nanos)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Uniform-ish value in `lo..=hi`.
    pub fn next_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        // High bits of an LCG are the better-distributed ones.
        lo + (self.next_u32() >> 16) % (hi - lo + 1)
    }
}

/// Smallest increment a simulated round awards.
pub const MIN_ROUND_POINTS: i64 = 1;
/// Largest increment a simulated round awards.
pub const MAX_ROUND_POINTS: i64 = 10;

/// A fixed number of simulated scoring rounds.
///
/// Yields each round's delta; [`ScoreFeed::total`] is the sum so far, which is
/// what a player reports as its final score.
#[derive(Debug, Clone)]
pub struct ScoreFeed {
    rng: SimpleRng,
    rounds_left: u32,
    total: i64,
}

impl ScoreFeed {
    pub fn new(rng: SimpleRng, rounds: u32) -> Self {
        Self {
            rng,
            rounds_left: rounds,
            total: 0,
        }
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn rounds_left(&self) -> u32 {
        self.rounds_left
    }
}

impl Iterator for ScoreFeed {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.rounds_left == 0 {
            return None;
        }
        self.rounds_left -= 1;
        let delta = i64::from(
            self.rng
                .next_inclusive(MIN_ROUND_POINTS as u32, MAX_ROUND_POINTS as u32),
        );
        self.total += delta;
        Some(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_seed_is_replaced() {
        let mut a = SimpleRng::new(0);
        let mut b = SimpleRng::new(1);
        assert_eq!(a.next_u32(), b.next_u32());
    }

    #[test]
    fn same_seed_same_sequence() {
        let a: Vec<i64> = ScoreFeed::new(SimpleRng::new(42), 5).collect();
        let b: Vec<i64> = ScoreFeed::new(SimpleRng::new(42), 5).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn feed_yields_bounded_deltas_and_tracks_total() {
        let mut feed = ScoreFeed::new(SimpleRng::new(7), 5);
        let mut sum = 0;
        let mut count = 0;
        for delta in feed.by_ref() {
            assert!((MIN_ROUND_POINTS..=MAX_ROUND_POINTS).contains(&delta));
            sum += delta;
            count += 1;
        }
        assert_eq!(count, 5);
        assert_eq!(feed.total(), sum);
        assert_eq!(feed.rounds_left(), 0);
        assert_eq!(feed.next(), None);
    }

    #[test]
    fn range_covers_both_ends() {
        let mut rng = SimpleRng::new(12345);
        let draws: Vec<u32> = (0..2000).map(|_| rng.next_inclusive(1, 10)).collect();
        assert!(draws.contains(&1));
        assert!(draws.contains(&10));
        assert!(draws.iter().all(|d| (1..=10).contains(d)));
    }
}
