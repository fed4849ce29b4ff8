use crate::domain::ntp::{PollReport, QueryResult};
#[cfg(feature = "json")]
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct Stats {
    pub count: usize,
    pub failures: usize,
    pub rtt_avg: f64,
    pub rtt_min: f64,
    pub rtt_max: f64,
    pub offset_avg: f64,
}

/// Summarize successful exchanges; all fields are zero when `results` is empty.
pub fn compute_stats(results: &[QueryResult], failures: usize) -> Stats {
    let count = results.len();
    if count == 0 {
        return Stats {
            count,
            failures,
            rtt_avg: 0.0,
            rtt_min: 0.0,
            rtt_max: 0.0,
            offset_avg: 0.0,
        };
    }
    let rtt_avg = results.iter().map(|r| r.rtt_ms()).sum::<f64>() / count as f64;
    let rtt_min = results.iter().map(|r| r.rtt_ms()).fold(f64::INFINITY, f64::min);
    let rtt_max = results
        .iter()
        .map(|r| r.rtt_ms())
        .fold(f64::NEG_INFINITY, f64::max);
    let offset_avg = results.iter().map(|r| r.offset_ms()).sum::<f64>() / count as f64;
    Stats {
        count,
        failures,
        rtt_avg,
        rtt_min,
        rtt_max,
        offset_avg,
    }
}

/// Accumulates reports per target, in configuration order.
#[derive(Debug, Default)]
pub struct StatsCollector {
    targets: Vec<(String, Vec<QueryResult>, usize)>,
}

impl StatsCollector {
    pub fn record(&mut self, report: &PollReport) {
        if self.targets.len() <= report.index {
            self.targets
                .resize_with(report.index + 1, || (String::new(), Vec::new(), 0));
        }
        let entry = &mut self.targets[report.index];
        if entry.0.is_empty() {
            entry.0 = report.target.clone();
        }
        match &report.outcome {
            Ok(result) => entry.1.push(result.clone()),
            Err(_) => entry.2 += 1,
        }
    }

    /// Total number of recorded reports.
    pub fn total(&self) -> usize {
        self.targets.iter().map(|(_, ok, failed)| ok.len() + failed).sum()
    }

    pub fn summary(&self) -> Vec<(String, Stats)> {
        self.targets
            .iter()
            .filter(|(name, _, _)| !name.is_empty())
            .map(|(name, ok, failed)| (name.clone(), compute_stats(ok, *failed)))
            .collect()
    }
}
