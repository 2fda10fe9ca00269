//! Lightweight performance aggregation utilities.
//!
//! Coarse-grained timing and counter tracking for the dataset pipeline and the
//! generation driver. Always enabled; the CLI prints a summary with `--verbose`.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetricKind {
    Duration,
    Counter,
}

#[derive(Debug, Clone, Copy)]
struct MetricInfo {
    name: &'static str,
    kind: MetricKind,
}

/// Named metrics tracked by the perf collector.
#[derive(Debug, Clone, Copy)]
#[repr(u8)]
pub enum Metric {
    DatasetDecode,
    DatasetFiles,
    DatasetWindows,
    CheckpointLoad,
    GenerationInit,
    GenerationStep,
    GenerationFinalize,
    GeneratedFrames,
}

impl Metric {
    const COUNT: usize = 8;

    fn index(self) -> usize {
        self as usize
    }
}

const METRICS: [MetricInfo; Metric::COUNT] = [
    MetricInfo {
        name: "dataset.decode",
        kind: MetricKind::Duration,
    },
    MetricInfo {
        name: "dataset.files",
        kind: MetricKind::Counter,
    },
    MetricInfo {
        name: "dataset.windows",
        kind: MetricKind::Counter,
    },
    MetricInfo {
        name: "checkpoint.load",
        kind: MetricKind::Duration,
    },
    MetricInfo {
        name: "generate.init",
        kind: MetricKind::Duration,
    },
    MetricInfo {
        name: "generate.step",
        kind: MetricKind::Duration,
    },
    MetricInfo {
        name: "generate.finalize",
        kind: MetricKind::Duration,
    },
    MetricInfo {
        name: "generate.frames",
        kind: MetricKind::Counter,
    },
];

struct PerfCollector {
    start: Instant,
    totals_us: [AtomicU64; Metric::COUNT],
    counts: [AtomicU64; Metric::COUNT],
}

impl PerfCollector {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            totals_us: std::array::from_fn(|_| AtomicU64::new(0)),
            counts: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    fn add_duration(&self, metric: Metric, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        let index = metric.index();
        self.totals_us[index].fetch_add(micros, Ordering::Relaxed);
        self.counts[index].fetch_add(1, Ordering::Relaxed);
    }

    fn add_count(&self, metric: Metric, delta: u64) {
        self.counts[metric.index()].fetch_add(delta, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PerfSnapshot {
        PerfSnapshot {
            uptime: self.start.elapsed(),
            totals_us: std::array::from_fn(|idx| self.totals_us[idx].load(Ordering::Relaxed)),
            counts: std::array::from_fn(|idx| self.counts[idx].load(Ordering::Relaxed)),
        }
    }
}

static COLLECTOR: OnceLock<PerfCollector> = OnceLock::new();

fn collector() -> &'static PerfCollector {
    COLLECTOR.get_or_init(PerfCollector::new)
}

/// A RAII timer that records its duration when dropped.
pub struct PerfSpan {
    metric: Metric,
    start: Instant,
}

impl Drop for PerfSpan {
    fn drop(&mut self) {
        collector().add_duration(self.metric, self.start.elapsed());
    }
}

/// Begin a named timing span.
pub fn span(metric: Metric) -> PerfSpan {
    PerfSpan {
        metric,
        start: Instant::now(),
    }
}

/// Record a counter delta for a named metric.
pub fn add_count(metric: Metric, delta: u64) {
    collector().add_count(metric, delta);
}

/// Snapshot of collected performance data.
#[derive(Debug)]
pub struct PerfSnapshot {
    uptime: Duration,
    totals_us: [u64; Metric::COUNT],
    counts: [u64; Metric::COUNT],
}

impl PerfSnapshot {
    /// Current value of a counter metric.
    pub fn count(&self, metric: Metric) -> u64 {
        self.counts[metric.index()]
    }

    /// Format a human-readable report.
    pub fn format(&self) -> String {
        let mut duration_rows: Vec<(usize, u64, u64)> = Vec::new();
        let mut counter_rows: Vec<(usize, u64)> = Vec::new();

        for (idx, metric) in METRICS.iter().enumerate() {
            let total_us = self.totals_us[idx];
            let count = self.counts[idx];
            match metric.kind {
                MetricKind::Duration if count > 0 || total_us > 0 => {
                    duration_rows.push((idx, total_us, count));
                }
                MetricKind::Counter if count > 0 => counter_rows.push((idx, count)),
                _ => {}
            }
        }

        duration_rows.sort_by(|a, b| b.1.cmp(&a.1));
        counter_rows.sort_by(|a, b| b.1.cmp(&a.1));

        let mut output = String::new();
        let _ = writeln!(
            &mut output,
            "Performance summary (uptime: {:.3}s)",
            self.uptime.as_secs_f64()
        );

        if duration_rows.is_empty() && counter_rows.is_empty() {
            let _ = writeln!(&mut output, "No performance data recorded.");
            return output;
        }

        if !duration_rows.is_empty() {
            let _ = writeln!(&mut output, "Durations:");
            let _ = writeln!(
                &mut output,
                "  {:<24} {:>10} {:>8} {:>10}",
                "name", "total", "count", "avg"
            );
            for (idx, total_us, count) in duration_rows {
                let avg_ms = if count == 0 {
                    0.0
                } else {
                    (total_us as f64) / (count as f64) / 1000.0
                };
                let _ = writeln!(
                    &mut output,
                    "  {:<24} {:>10.3}s {:>8} {:>10.3}ms",
                    METRICS[idx].name,
                    (total_us as f64) / 1_000_000.0,
                    count,
                    avg_ms
                );
            }
        }

        if !counter_rows.is_empty() {
            let _ = writeln!(&mut output, "Counters:");
            for (idx, value) in counter_rows {
                let _ = writeln!(&mut output, "  {:<24} {}", METRICS[idx].name, value);
            }
        }

        output
    }
}

/// Snapshot of everything recorded so far.
pub fn snapshot() -> PerfSnapshot {
    collector().snapshot()
}

/// Format a report of all collected metrics.
pub fn report() -> String {
    snapshot().format()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_table_matches_enum() {
        assert_eq!(METRICS.len(), Metric::COUNT);
        assert_eq!(METRICS[Metric::GeneratedFrames.index()].name, "generate.frames");
        assert_eq!(METRICS[Metric::DatasetDecode.index()].name, "dataset.decode");
    }

    #[test]
    fn counters_and_spans_show_up_in_report() {
        let before = snapshot().count(Metric::GeneratedFrames);
        add_count(Metric::GeneratedFrames, 3);
        {
            let _span = span(Metric::GenerationStep);
        }
        let after = snapshot();
        assert!(after.count(Metric::GeneratedFrames) >= before + 3);
        let report = after.format();
        assert!(report.contains("generate.frames"));
        assert!(report.contains("generate.step"));
    }
}
