//! Sample statistics shared by the engine and the replication runner.

use serde::Serialize;

/// Replication count below which intervals are flagged as unreliable.
pub const MIN_RELIABLE_REPLICATIONS: usize = 30;
/// Relative spread (coefficient of variation, half-width over mean) considered too wide.
pub const MAX_RELATIVE_SPREAD: f64 = 0.3;
const NORMAL_CRITICAL_95: f64 = 1.96;

// t_{0.975, df} for df = 1..=29.
const T_TABLE_95: [f64; 29] = [
    12.706, 4.303, 3.182, 2.776, 2.571, 2.447, 2.365, 2.306, 2.262, 2.228, 2.201, 2.179, 2.160,
    2.145, 2.131, 2.120, 2.110, 2.101, 2.093, 2.086, 2.080, 2.074, 2.069, 2.064, 2.060, 2.056,
    2.052, 2.048, 2.045,
];

/// Linearly interpolated quantile, `p` in `[0, 1]`. Empty input yields 0.
pub fn percentile(samples: &[f64], p: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let p = if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 };
    let idx = (sorted.len() - 1) as f64 * p;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let weight = idx - lo as f64;
    sorted[lo] * (1.0 - weight) + sorted[hi] * weight
}

/// Two-sided 95% Student-t critical value.
pub fn t_critical_95(df: usize) -> f64 {
    match df {
        1..=29 => T_TABLE_95[df - 1],
        _ => NORMAL_CRITICAL_95,
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean, Bessel-corrected standard deviation and 95% confidence interval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Summary {
    pub n: usize,
    pub mean: f64,
    pub sd: f64,
    pub half_width: f64,
    pub ci_low: f64,
    pub ci_high: f64,
}

pub fn summarize(values: &[f64]) -> Summary {
    let n = values.len();
    if n == 0 {
        return Summary::default();
    }
    // Covers n == 1 too. Equal samples have no spread even when the summed mean drifts.
    if values.iter().all(|value| *value == values[0]) {
        let mean = values[0];
        return Summary {
            n,
            mean,
            sd: 0.0,
            half_width: 0.0,
            ci_low: mean,
            ci_high: mean,
        };
    }
    let mean = mean(values);

    let var_sum: f64 = values.iter().map(|x| (x - mean) * (x - mean)).sum();
    let sd = (var_sum / (n - 1) as f64).sqrt();
    let half_width = t_critical_95(n - 1) * sd / (n as f64).sqrt();
    Summary {
        n,
        mean,
        sd,
        half_width,
        ci_low: mean - half_width,
        ci_high: mean + half_width,
    }
}

impl Summary {
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean == 0.0 {
            0.0
        } else {
            self.sd / self.mean.abs()
        }
    }

    /// Advisory flags about how much the interval can be trusted.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut flags = Vec::new();
        if self.n < MIN_RELIABLE_REPLICATIONS {
            flags.push(Diagnostic::FewReplications);
        }
        if self.mean != 0.0 && self.coefficient_of_variation() > MAX_RELATIVE_SPREAD {
            flags.push(Diagnostic::HighVariation);
        }
        if self.mean != 0.0 && self.half_width > self.mean.abs() * MAX_RELATIVE_SPREAD {
            flags.push(Diagnostic::WideInterval);
        }
        flags
    }

    pub fn level(&self) -> Level {
        overall_level(&self.diagnostics())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnostic {
    FewReplications,
    HighVariation,
    WideInterval,
}

impl Diagnostic {
    pub fn level(&self) -> Level {
        match self {
            Diagnostic::FewReplications | Diagnostic::HighVariation => Level::Warn,
            Diagnostic::WideInterval => Level::Bad,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Diagnostic::FewReplications => "fewer than 30 replications, interval may be unreliable",
            Diagnostic::HighVariation => "coefficient of variation above 30%",
            Diagnostic::WideInterval => "interval half-width above 30% of the mean",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Ok,
    Warn,
    Bad,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Level::Ok => "ok",
            Level::Warn => "warn",
            Level::Bad => "bad",
        };
        f.write_str(label)
    }
}

pub fn overall_level(diagnostics: &[Diagnostic]) -> Level {
    diagnostics
        .iter()
        .map(Diagnostic::level)
        .max()
        .unwrap_or(Level::Ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn percentile_extremes_are_min_and_max() {
        let samples = [4.0, 1.0, 9.0, 3.0];
        assert_eq!(percentile(&samples, 0.0), 1.0);
        assert_eq!(percentile(&samples, 1.0), 9.0);
    }

    #[test]
    fn percentile_interpolates_between_order_statistics() {
        let samples = [0.0, 2.0, 4.0];
        assert!(close(percentile(&samples, 0.5), 2.0));
        assert!(close(percentile(&samples, 0.9), 3.6));
        assert!(close(percentile(&samples, 0.25), 1.0));
    }

    #[test]
    fn percentile_of_single_sample_is_that_sample() {
        for p in [0.0, 0.1, 0.5, 0.9, 1.0] {
            assert_eq!(percentile(&[7.5], p), 7.5);
        }
    }

    #[test]
    fn percentile_of_empty_is_zero() {
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn inexact_constant_samples_have_zero_width() {
        let summary = summarize(&[0.1; 3]);
        assert_eq!(summary.mean, 0.1);
        assert_eq!(summary.sd, 0.0);
        assert_eq!(summary.half_width, 0.0);
        assert_eq!(summary.ci_low, summary.ci_high);
    }

    #[test]
    fn t_table_switches_to_normal_at_thirty() {
        assert_eq!(t_critical_95(1), 12.706);
        assert_eq!(t_critical_95(29), 2.045);
        assert_eq!(t_critical_95(30), 1.96);
        assert_eq!(t_critical_95(0), 1.96);
    }

    #[test]
    fn single_value_collapses_interval() {
        let summary = summarize(&[3.5]);
        assert_eq!(summary.sd, 0.0);
        assert_eq!(summary.ci_low, 3.5);
        assert_eq!(summary.ci_high, 3.5);
    }

    #[test]
    fn constant_values_have_zero_width() {
        let summary = summarize(&[2.0; 12]);
        assert_eq!(summary.mean, 2.0);
        assert_eq!(summary.sd, 0.0);
        assert_eq!(summary.ci_high - summary.ci_low, 0.0);
    }

    #[test]
    fn summary_uses_bessel_correction_and_t_value() {
        let summary = summarize(&[1.0, 2.0, 3.0, 4.0]);
        assert!(close(summary.mean, 2.5));
        let sd = (5.0f64 / 3.0).sqrt();
        assert!(close(summary.sd, sd));
        assert!(close(summary.half_width, 3.182 * sd / 2.0));
        assert!(close(summary.ci_low, 2.5 - 3.182 * sd / 2.0));
    }

    #[test]
    fn empty_summary_is_zero() {
        assert_eq!(summarize(&[]), Summary::default());
    }

    #[test]
    fn diagnostics_flag_small_noisy_runs() {
        let summary = summarize(&[1.0, 10.0, 2.0, 12.0]);
        let flags = summary.diagnostics();
        assert!(flags.contains(&Diagnostic::FewReplications));
        assert!(flags.contains(&Diagnostic::HighVariation));
        assert!(flags.contains(&Diagnostic::WideInterval));
        assert_eq!(summary.level(), Level::Bad);
    }

    #[test]
    fn diagnostics_are_quiet_for_tight_large_runs() {
        let values: Vec<f64> = (0..40).map(|i| 10.0 + (i % 2) as f64 * 0.1).collect();
        let summary = summarize(&values);
        assert!(summary.diagnostics().is_empty());
        assert_eq!(summary.level(), Level::Ok);
    }

    #[test]
    fn zero_mean_skips_relative_checks() {
        let summary = summarize(&[0.0; 5]);
        assert_eq!(summary.diagnostics(), vec![Diagnostic::FewReplications]);
        assert_eq!(summary.level(), Level::Warn);
    }
}
