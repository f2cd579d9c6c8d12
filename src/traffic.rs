//! Seeded random PHY activity.

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::config::TrafficConfig;
use crate::sim::event::PhyActivity;

/// Generates a reproducible stream of receptions and transmissions.
///
/// Packets never overlap: each one starts an exponentially distributed gap
/// after the previous one ended. A transmission lasts its full airtime and
/// is timed by the radio itself; a reception is ended explicitly after a
/// uniformly drawn fraction of its nominal airtime, with either outcome.
#[derive(Debug, Clone)]
pub struct TrafficGenerator {
    config: TrafficConfig,
    rng: StdRng,
}

impl TrafficGenerator {
    /// Creates a generator seeded from `config.seed`.
    ///
    /// # Panics
    ///
    /// Panics if the mean interval or an airtime is not positive.
    pub fn new(config: &TrafficConfig) -> Self {
        assert!(
            config.mean_interval_s > 0.0,
            "mean_interval_s must be positive"
        );
        assert!(
            config.tx_duration_s > 0.0 && config.rx_duration_s > 0.0,
            "airtimes must be positive"
        );
        Self {
            config: config.clone(),
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    /// Draws packets starting before `horizon_s` and returns their PHY
    /// notifications as `(time_s, activity)`, in time order.
    ///
    /// The closing notification of a packet that starts near the horizon may
    /// lie past it.
    pub fn generate(&mut self, horizon_s: f64) -> Vec<(f64, PhyActivity)> {
        let mut activity = Vec::new();
        let mut t = 0.0;

        loop {
            t += self.exponential_gap();
            if t >= horizon_s {
                break;
            }

            if self.rng.random::<f64>() < self.config.tx_probability {
                let duration_s = self.config.tx_duration_s;
                activity.push((t, PhyActivity::TxStart { duration_s }));
                t += duration_s;
            } else {
                let duration_s = self.config.rx_duration_s;
                activity.push((t, PhyActivity::RxStart { duration_s }));

                let min = self.config.rx_min_fraction;
                let fraction = min + (1.0 - min) * self.rng.random::<f64>();
                t += duration_s * fraction;
                let end = if self.rng.random::<f64>() < self.config.rx_error_probability {
                    PhyActivity::RxEndError
                } else {
                    PhyActivity::RxEndOk
                };
                activity.push((t, end));
            }
        }
        activity
    }

    fn exponential_gap(&mut self) -> f64 {
        // inverse CDF; 1 - u lies in (0, 1]
        let u: f64 = self.rng.random();
        -self.config.mean_interval_s * (1.0 - u).ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(seed: u64) -> TrafficConfig {
        TrafficConfig {
            seed,
            ..TrafficConfig::default()
        }
    }

    #[test]
    fn test_seed_determinism() {
        let a = TrafficGenerator::new(&config(42)).generate(600.0);
        let b = TrafficGenerator::new(&config(42)).generate(600.0);
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_produce_different_traces() {
        let a = TrafficGenerator::new(&config(42)).generate(600.0);
        let b = TrafficGenerator::new(&config(99)).generate(600.0);
        assert_ne!(a, b, "different seeds should produce different traces");
    }

    #[test]
    fn test_times_are_ordered_and_packets_start_before_horizon() {
        let trace = TrafficGenerator::new(&config(7)).generate(300.0);
        assert!(trace.windows(2).all(|w| w[0].0 <= w[1].0));
        for (t, activity) in &trace {
            if matches!(activity, PhyActivity::TxStart { .. } | PhyActivity::RxStart { .. }) {
                assert!(*t < 300.0);
            }
        }
    }

    #[test]
    fn test_every_reception_is_closed() {
        let trace = TrafficGenerator::new(&config(3)).generate(1000.0);
        let starts = trace
            .iter()
            .filter(|(_, a)| matches!(a, PhyActivity::RxStart { .. }))
            .count();
        let ends = trace
            .iter()
            .filter(|(_, a)| matches!(a, PhyActivity::RxEndOk | PhyActivity::RxEndError))
            .count();
        assert_eq!(starts, ends);
    }

    #[test]
    fn test_transmit_only_traffic() {
        let cfg = TrafficConfig {
            tx_probability: 1.0,
            ..config(5)
        };
        let trace = TrafficGenerator::new(&cfg).generate(200.0);
        assert!(!trace.is_empty());
        assert!(
            trace
                .iter()
                .all(|(_, a)| *a == PhyActivity::TxStart { duration_s: 0.2 })
        );
    }

    #[test]
    fn test_early_end_stays_within_nominal_airtime() {
        let cfg = TrafficConfig {
            tx_probability: 0.0,
            rx_min_fraction: 0.25,
            ..config(11)
        };
        let trace = TrafficGenerator::new(&cfg).generate(500.0);
        for pair in trace.chunks(2) {
            let held = pair[1].0 - pair[0].0;
            assert!(held >= 0.25 * 0.2 - 1e-12 && held <= 0.2 + 1e-12);
        }
    }

    #[test]
    fn test_mean_gap_is_roughly_configured() {
        let cfg = TrafficConfig {
            tx_probability: 1.0,
            mean_interval_s: 2.0,
            ..config(13)
        };
        let trace = TrafficGenerator::new(&cfg).generate(20_000.0);
        // each cycle is one gap plus 0.2 s of airtime
        let mean_cycle = 20_000.0 / trace.len() as f64;
        assert!((mean_cycle - 2.2).abs() < 0.2, "mean cycle {mean_cycle}");
    }
}
