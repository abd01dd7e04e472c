//! Samplers turning uniform draws into inter-arrival and service times.

use rand::Rng;

use crate::models::ServiceDistribution;

/// Smallest service time handed to a server.
pub const MIN_SERVICE_SECONDS: f64 = 1e-9;
/// Per-tick arrival probability never exceeds this under the Bernoulli approximation.
pub const MAX_TICK_ARRIVAL_PROBABILITY: f64 = 0.95;

const MIN_UNIFORM: f64 = 1e-12;

/// Exponential sample with the given mean, never negative.
pub fn exp_sample<R: Rng + ?Sized>(mean_seconds: f64, rng: &mut R) -> f64 {
    // 1 - u maps [0, 1) onto (0, 1]; the floor keeps ln finite.
    let u = (1.0 - rng.gen::<f64>()).max(MIN_UNIFORM);
    (-mean_seconds * u.ln()).max(0.0)
}

pub fn service_time<R: Rng + ?Sized>(
    mean_seconds: f64,
    distribution: ServiceDistribution,
    rng: &mut R,
) -> f64 {
    let base = mean_seconds.max(MIN_SERVICE_SECONDS);
    match distribution {
        ServiceDistribution::Deterministic => base,
        ServiceDistribution::Exponential => exp_sample(base, rng).max(MIN_SERVICE_SECONDS),
        ServiceDistribution::Uniform => {
            let min = base * 0.5;
            let max = base * 1.5;
            min + rng.gen::<f64>() * (max - min)
        }
    }
}

pub fn tick_arrival_probability(mean_inter_arrival_seconds: f64, tick_seconds: f64) -> f64 {
    if mean_inter_arrival_seconds <= 0.0 || !mean_inter_arrival_seconds.is_finite() {
        return 0.0;
    }
    let lambda = 1.0 / mean_inter_arrival_seconds;
    (lambda * tick_seconds).clamp(0.0, MAX_TICK_ARRIVAL_PROBABILITY)
}
