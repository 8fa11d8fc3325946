//! Binomial / multinomial draws over the run's single random stream.

use rand::Rng;
use rand_distr::{Binomial, Distribution};

/// Random primitives the spread kernel needs. Implemented for every `Rng`,
/// so the engine threads one seeded generator through the whole run.
pub trait QuantumSampler {
    /// Number of successes out of `n` trials with probability `p`.
    ///
    /// Deterministically 0 for `n == 0`, `p <= 0` or NaN `p`, and `n` for
    /// `p >= 1`; no draw is consumed in those cases.
    fn binomial(&mut self, n: u64, p: f64) -> u64;

    /// Split `n` items over `weights.len()` buckets, writing counts into
    /// `out`. The counts always sum to exactly `n` when `weights` is
    /// non-empty.
    fn multinomial_into(&mut self, n: u64, weights: &[f64], out: &mut [u64]);

    fn multinomial(&mut self, n: u64, weights: &[f64]) -> Vec<u64> {
        let mut out = vec![0; weights.len()];
        self.multinomial_into(n, weights, &mut out);
        out
    }
}

impl<R: Rng + ?Sized> QuantumSampler for R {
    fn binomial(&mut self, n: u64, p: f64) -> u64 {
        if n == 0 || p.is_nan() || p <= 0.0 {
            return 0;
        }
        if p >= 1.0 {
            return n;
        }
        match Binomial::new(n, p) {
            Ok(dist) => dist.sample(self),
            Err(_) => 0,
        }
    }

    fn multinomial_into(&mut self, n: u64, weights: &[f64], out: &mut [u64]) {
        out.iter_mut().for_each(|c| *c = 0);
        let buckets = weights.len().min(out.len());
        if buckets == 0 {
            return;
        }

        // Conditional binomials: bucket i draws from what is left, with its
        // share of the remaining weight. The last bucket takes the remainder.
        let mut remaining = n;
        let mut remaining_weight: f64 = weights[..buckets].iter().map(|w| w.max(0.0)).sum();
        for i in 0..buckets - 1 {
            if remaining == 0 {
                return;
            }
            let w = weights[i].max(0.0);
            let p = if remaining_weight > 0.0 {
                (w / remaining_weight).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let drawn = self.binomial(remaining, p);
            out[i] = drawn;
            remaining -= drawn;
            remaining_weight -= w;
        }
        out[buckets - 1] = remaining;
    }
}
