//! Per-server randomness.
//!
//! One seedable generator per server drives both the simulated WAN latency
//! and quorum member selection. Seeding it from config makes both
//! reproducible under test; unseeded servers draw from OS entropy.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug)]
pub struct ServerRng {
    inner: Mutex<StdRng>,
}

impl ServerRng {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        ServerRng {
            inner: Mutex::new(rng),
        }
    }

    /// Uniform delay in `[0, 2)` seconds, simulating WAN latency.
    pub fn latency_delay(&self) -> Duration {
        let mut rng = self.inner.lock().expect("rng lock");
        Duration::from_millis(rng.gen_range(0..2_000))
    }

    /// Uniform sample of `k` items without replacement. Returns fewer than
    /// `k` when the slice is shorter.
    pub fn sample<T: Clone>(&self, items: &[T], k: usize) -> Vec<T> {
        let mut rng = self.inner.lock().expect("rng lock");
        items.choose_multiple(&mut *rng, k).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_rng_is_reproducible() {
        let a = ServerRng::new(Some(7));
        let b = ServerRng::new(Some(7));
        let items: Vec<u32> = (0..10).collect();
        assert_eq!(a.sample(&items, 4), b.sample(&items, 4));
        assert_eq!(a.latency_delay(), b.latency_delay());
    }

    #[test]
    fn sample_is_without_replacement() {
        let rng = ServerRng::new(Some(1));
        let items: Vec<u32> = (0..5).collect();
        for _ in 0..50 {
            let mut picked = rng.sample(&items, 3);
            picked.sort_unstable();
            picked.dedup();
            assert_eq!(picked.len(), 3);
        }
    }

    #[test]
    fn sample_clamps_to_slice_length() {
        let rng = ServerRng::new(Some(2));
        let items = vec![1u32];
        assert_eq!(rng.sample(&items, 3), vec![1]);
    }

    #[test]
    fn latency_delay_stays_under_two_seconds() {
        let rng = ServerRng::new(Some(3));
        for _ in 0..200 {
            assert!(rng.latency_delay() < Duration::from_secs(2));
        }
    }
}
