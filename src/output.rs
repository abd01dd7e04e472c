use serde::Serialize;
use std::fmt::Write as _;

use crate::assessment::LoadAssessment;
use crate::cli::FormatArg;
use crate::error::{Error, Result};
use crate::models::{
    ArrivalDistribution, QueuePolicyConfig, RunOptions, ServiceDistribution, SimConfig,
};
use crate::replication::{ReplicationOptions, ReplicationReport};
use crate::state::{Metrics, RunReport, WindowStats};
use crate::stats::{Diagnostic, Level, Summary};

/// Renders run and replication reports for one output format.
pub trait Formatter {
    fn run(&self, report: &RunReport) -> Result<String>;
    fn replications(&self, report: &ReplicationReport) -> Result<String>;
}

pub struct HumanFormatter;
pub struct SummaryFormatter;
pub struct JsonFormatter;
pub struct CsvFormatter;

impl Formatter for HumanFormatter {
    fn run(&self, report: &RunReport) -> Result<String> {
        let mut out = String::new();
        out.push_str("Metadata:\n");
        write_config(&mut out, &report.config);
        write_run_options(&mut out, &report.options);
        write_metrics(&mut out, &report.metrics);
        if let (Some(window), Some(seconds)) = (&report.window, report.options.window_seconds) {
            write_window(&mut out, window, seconds);
        }
        let _ = writeln!(out, "Assessment: {}", describe_assessment(&report.assessment));
        Ok(out)
    }

    fn replications(&self, report: &ReplicationReport) -> Result<String> {
        let mut out = String::new();
        out.push_str("Metadata:\n");
        write_config(&mut out, &report.config);
        write_replication_options(&mut out, &report.options);

        out.push_str("Replications:\n");
        for run in &report.runs {
            let m = &run.metrics;
            let _ = writeln!(
                out,
                "rep {} (seed {}): avg wait {:.2}s, avg queue {:.2}, utilization {:.2}%, throughput {:.4}/s, balked {}, reneged {}",
                run.index + 1,
                seed_label(run.seed),
                m.avg_wait,
                m.avg_queue_length,
                m.utilization_pct,
                m.throughput,
                m.balked,
                m.reneged
            );
        }
        write_summaries(&mut out, report);
        Ok(out)
    }
}

impl Formatter for SummaryFormatter {
    fn run(&self, report: &RunReport) -> Result<String> {
        let mut out = String::new();
        write_metrics(&mut out, &report.metrics);
        let _ = writeln!(out, "Assessment: {}", describe_assessment(&report.assessment));
        Ok(out)
    }

    fn replications(&self, report: &ReplicationReport) -> Result<String> {
        let mut out = String::new();
        write_summaries(&mut out, report);
        Ok(out)
    }
}

impl Formatter for JsonFormatter {
    fn run(&self, report: &RunReport) -> Result<String> {
        to_json(report)
    }

    fn replications(&self, report: &ReplicationReport) -> Result<String> {
        let diagnostics: Vec<MetricDiagnostics> = report
            .summary
            .entries()
            .into_iter()
            .map(|(metric, summary)| MetricDiagnostics {
                metric,
                level: summary.level(),
                diagnostics: summary.diagnostics(),
            })
            .collect();
        to_json(&ReplicationJson {
            overall: overall_replication_level(report),
            report,
            diagnostics,
        })
    }
}

impl Formatter for CsvFormatter {
    fn run(&self, report: &RunReport) -> Result<String> {
        let m = &report.metrics;
        let mut out = String::from(
            "measured_seconds,arrived,served,balked,reneged,avg_wait,avg_queue_length,max_queue_length,utilization_pct,arrival_rate,throughput,wait_p50,wait_p90\n",
        );
        let _ = writeln!(
            out,
            "{:.6},{},{},{},{},{:.6},{:.6},{},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.measured_seconds,
            m.arrived,
            m.served,
            m.balked,
            m.reneged,
            m.avg_wait,
            m.avg_queue_length,
            m.max_queue_length,
            m.utilization_pct,
            m.arrival_rate,
            m.throughput,
            m.wait_p50,
            m.wait_p90
        );
        Ok(out)
    }

    /// One row per replication under a `# reps=…` metadata line.
    fn replications(&self, report: &ReplicationReport) -> Result<String> {
        let options = &report.options;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "# reps={}, duration={}s, baseSeed={}",
            options.count,
            options.run_seconds,
            seed_label(options.base_seed)
        );
        out.push_str("rep,seed,avg_wait,avg_queue_length,utilization_pct,throughput,arrival_rate,balked,reneged,wait_p90\n");
        for run in &report.runs {
            let m = &run.metrics;
            let _ = writeln!(
                out,
                "{},{},{:.6},{:.6},{:.6},{:.6},{:.6},{},{},{:.6}",
                run.index + 1,
                run.seed.map(|seed| seed.to_string()).unwrap_or_default(),
                m.avg_wait,
                m.avg_queue_length,
                m.utilization_pct,
                m.throughput,
                m.arrival_rate,
                m.balked,
                m.reneged,
                m.wait_p90
            );
        }
        Ok(out)
    }
}

pub fn formatter_for(format: FormatArg) -> Box<dyn Formatter> {
    match format {
        FormatArg::Human => Box::new(HumanFormatter),
        FormatArg::Summary => Box::new(SummaryFormatter),
        FormatArg::Json => Box::new(JsonFormatter),
        FormatArg::Csv => Box::new(CsvFormatter),
    }
}

/// Text for `show-config`.
pub fn describe_config(
    config: &SimConfig,
    run: &RunOptions,
    replications: &ReplicationOptions,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Servers: {}", config.servers);
    let _ = writeln!(out, "Policy: {}", config.policy);
    let _ = writeln!(
        out,
        "Arrivals: {} (mean {:.2}s)",
        config.arrival_distribution, config.mean_inter_arrival_seconds
    );
    let _ = writeln!(
        out,
        "Service: {} (mean {:.2}s)",
        config.service_distribution, config.mean_service_seconds
    );
    let _ = writeln!(out, "Priority: {}", priority_label(config));
    let _ = writeln!(out, "Max queue: {}", max_queue_label(config.max_queue));
    let _ = writeln!(out, "Patience: {}", patience_label(config.patience_seconds));
    let _ = writeln!(out, "Tick: {:.2}s", config.tick_seconds);
    let _ = writeln!(out, "Seed: {}", seed_label(config.seed));
    let _ = writeln!(
        out,
        "Run: {:.2}s after {:.2}s warm-up",
        run.duration_seconds, run.warmup_seconds
    );
    if let Some(window) = run.window_seconds {
        let _ = writeln!(out, "Window: {:.2}s", window);
    }
    let _ = writeln!(
        out,
        "Replications: {} x {:.2}s after {:.2}s warm-up, base seed {}, {} thread(s)",
        replications.count,
        replications.run_seconds,
        replications.warmup_seconds,
        seed_label(replications.base_seed),
        replications.threads
    );
    out
}

/// Text for `list-policies`.
pub fn list_policies() -> String {
    let mut out = String::from("Policies:\n");
    for policy in QueuePolicyConfig::ALL {
        let about = match policy {
            QueuePolicyConfig::SingleFifo => "one shared line feeding every server",
            QueuePolicyConfig::MultiShortest => "one line per server, arrivals join the shortest",
        };
        let _ = writeln!(out, "{}: {}", policy, about);
    }
    out.push_str("Arrival distributions:\n");
    for distribution in ArrivalDistribution::ALL {
        let _ = writeln!(out, "{}", distribution);
    }
    out.push_str("Service distributions:\n");
    for distribution in ServiceDistribution::ALL {
        let _ = writeln!(out, "{}", distribution);
    }
    out
}

pub fn describe_assessment(assessment: &LoadAssessment) -> String {
    match assessment {
        LoadAssessment::Balanced => "balanced".to_string(),
        LoadAssessment::Underused { suggested_servers } => {
            format!("underused (try {} server(s))", suggested_servers)
        }
        LoadAssessment::Strained {
            reasons,
            suggested_servers,
            suggested_service_seconds,
        } => {
            let reasons: Vec<String> = reasons.iter().map(ToString::to_string).collect();
            format!(
                "strained by {} (try {} server(s) or {:.0}s mean service)",
                reasons.join(", "),
                suggested_servers,
                suggested_service_seconds
            )
        }
    }
}

#[derive(Serialize)]
struct MetricDiagnostics {
    metric: &'static str,
    level: Level,
    diagnostics: Vec<Diagnostic>,
}

#[derive(Serialize)]
struct ReplicationJson<'a> {
    #[serde(flatten)]
    report: &'a ReplicationReport,
    diagnostics: Vec<MetricDiagnostics>,
    overall: Level,
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value)
        .map_err(|err| Error::Output(format!("failed to encode JSON: {}", err)))?;
    out.push('\n');
    Ok(out)
}

fn overall_replication_level(report: &ReplicationReport) -> Level {
    report
        .summary
        .entries()
        .iter()
        .map(|(_, summary)| summary.level())
        .max()
        .unwrap_or(Level::Ok)
}

fn write_config(out: &mut String, config: &SimConfig) {
    let _ = writeln!(out, "servers: {}", config.servers);
    let _ = writeln!(out, "policy: {}", config.policy);
    let _ = writeln!(
        out,
        "arrivals: {} (mean {:.2}s)",
        config.arrival_distribution, config.mean_inter_arrival_seconds
    );
    let _ = writeln!(
        out,
        "service: {} (mean {:.2}s)",
        config.service_distribution, config.mean_service_seconds
    );
    let _ = writeln!(out, "priority: {}", priority_label(config));
    let _ = writeln!(out, "max_queue: {}", max_queue_label(config.max_queue));
    let _ = writeln!(out, "patience: {}", patience_label(config.patience_seconds));
    let _ = writeln!(out, "tick: {:.2}s", config.tick_seconds);
    let _ = writeln!(out, "seed: {}", seed_label(config.seed));
}

fn write_run_options(out: &mut String, options: &RunOptions) {
    let _ = writeln!(out, "duration: {:.2}s", options.duration_seconds);
    let _ = writeln!(out, "warmup: {:.2}s", options.warmup_seconds);
}

fn write_replication_options(out: &mut String, options: &ReplicationOptions) {
    let _ = writeln!(out, "replications: {}", options.count);
    let _ = writeln!(out, "run: {:.2}s", options.run_seconds);
    let _ = writeln!(out, "warmup: {:.2}s", options.warmup_seconds);
    let _ = writeln!(out, "base_seed: {}", seed_label(options.base_seed));
    let _ = writeln!(out, "threads: {}", options.threads);
}

fn write_metrics(out: &mut String, m: &Metrics) {
    out.push_str("Metrics:\n");
    let _ = writeln!(out, "measured: {:.2}s", m.measured_seconds);
    let _ = writeln!(out, "arrived: {}", m.arrived);
    let _ = writeln!(out, "served: {}", m.served);
    let _ = writeln!(out, "balked: {}", m.balked);
    let _ = writeln!(out, "reneged: {}", m.reneged);
    let _ = writeln!(out, "avg wait: {:.2}s", m.avg_wait);
    let _ = writeln!(out, "wait p50: {:.2}s", m.wait_p50);
    let _ = writeln!(out, "wait p90: {:.2}s", m.wait_p90);
    let _ = writeln!(out, "avg queue length: {:.2}", m.avg_queue_length);
    let _ = writeln!(out, "max queue length: {}", m.max_queue_length);
    let _ = writeln!(out, "utilization: {:.2}%", m.utilization_pct);
    let _ = writeln!(out, "arrival rate: {:.4}/s", m.arrival_rate);
    let _ = writeln!(out, "throughput: {:.4}/s", m.throughput);
    let _ = writeln!(
        out,
        "service rate per server: {:.4}/s",
        m.service_rate_per_server
    );
}

fn write_window(out: &mut String, window: &WindowStats, seconds: f64) {
    let _ = writeln!(out, "Window (last {}s):", seconds);
    let _ = writeln!(out, "range: {:.2}s - {:.2}s", window.start, window.end);
    let _ = writeln!(out, "arrived: {}", window.arrived);
    let _ = writeln!(out, "served: {}", window.served);
    let _ = writeln!(out, "balked: {}", window.balked);
    let _ = writeln!(out, "reneged: {}", window.reneged);
    let _ = writeln!(out, "avg wait: {:.2}s", window.avg_wait);
    let _ = writeln!(out, "wait p90: {:.2}s", window.wait_p90);
    let _ = writeln!(out, "avg queue length: {:.2}", window.avg_queue_length);
    let _ = writeln!(out, "utilization: {:.2}%", window.utilization_pct);
    let _ = writeln!(out, "throughput: {:.4}/s", window.throughput);
}

fn write_summaries(out: &mut String, report: &ReplicationReport) {
    out.push_str("Summary:\n");
    for (metric, summary) in report.summary.entries() {
        write_summary_line(out, metric, summary);
    }
    let _ = writeln!(out, "Overall: {}", overall_replication_level(report));
}

fn write_summary_line(out: &mut String, metric: &str, summary: &Summary) {
    let _ = writeln!(
        out,
        "{}: mean {:.4}, sd {:.4}, 95% CI [{:.4}, {:.4}] [{}]",
        metric,
        summary.mean,
        summary.sd,
        summary.ci_low,
        summary.ci_high,
        summary.level()
    );
    for diagnostic in summary.diagnostics() {
        let _ = writeln!(out, "  {}: {}", diagnostic.level(), diagnostic.message());
    }
}

fn priority_label(config: &SimConfig) -> String {
    if config.priority_enabled {
        format!("on (p={:.2})", config.priority_probability)
    } else {
        "off".to_string()
    }
}

fn max_queue_label(max_queue: usize) -> String {
    if max_queue == 0 {
        "unbounded".to_string()
    } else {
        max_queue.to_string()
    }
}

fn patience_label(patience: f64) -> String {
    if patience > 0.0 {
        format!("{:.2}s", patience)
    } else {
        "off".to_string()
    }
}

fn seed_label(seed: Option<u64>) -> String {
    seed.map(|seed| seed.to_string())
        .unwrap_or_else(|| "none".to_string())
}
