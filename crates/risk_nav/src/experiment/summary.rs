use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::config::Agent;
use super::run::RunRecord;

/// Means over every run that shared one agent and α.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaSummary {
    pub agent: Agent,
    pub alpha: f64,
    /// Runs in the group, one per seed.
    pub runs: usize,
    pub mean_steps: f64,
    pub mean_final_length: f64,
    pub mean_panic_events: f64,
    pub total_panic_events: u64,
    pub total_rescued: u64,
    /// Pooled over runs: rescued episodes over all episodes.
    pub rescue_rate: f64,
    /// Pooled over runs: risk drops over episodes whose window elapsed.
    pub risk_drop_rate: f64,
    pub mean_panic_ratio: f64,
    pub mean_moved_ratio: f64,
    pub mean_deadlock_steps: f64,
    pub mean_recharge_cycles: f64,
    pub mean_cells_cleaned: f64,
    pub mean_risk_threshold: f64,
    /// Runs that hit the step limit alive.
    pub survived: usize,
    /// Terminated runs per death label.
    pub deaths: BTreeMap<String, usize>,
}

/// Gated minus baseline, per mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryDelta {
    /// α of the gated side.
    pub alpha: f64,
    pub steps: f64,
    pub final_length: f64,
    pub moved_ratio: f64,
    pub deadlock_steps: f64,
    pub recharge_cycles: f64,
    pub cells_cleaned: f64,
    pub survived: i64,
}

impl AlphaSummary {
    /// `self - baseline` for the comparable means.
    pub fn delta_from(&self, baseline: &AlphaSummary) -> SummaryDelta {
        SummaryDelta {
            alpha: self.alpha,
            steps: self.mean_steps - baseline.mean_steps,
            final_length: self.mean_final_length - baseline.mean_final_length,
            moved_ratio: self.mean_moved_ratio - baseline.mean_moved_ratio,
            deadlock_steps: self.mean_deadlock_steps - baseline.mean_deadlock_steps,
            recharge_cycles: self.mean_recharge_cycles - baseline.mean_recharge_cycles,
            cells_cleaned: self.mean_cells_cleaned - baseline.mean_cells_cleaned,
            survived: self.survived as i64 - baseline.survived as i64,
        }
    }
}

/// Groups records by agent and α, in order of first appearance.
pub fn summarize(records: &[RunRecord]) -> Vec<AlphaSummary> {
    let mut groups: Vec<(Agent, f64, Vec<&RunRecord>)> = Vec::new();
    for record in records {
        match groups.iter_mut().find(|(agent, alpha, _)| {
            *agent == record.agent && alpha.to_bits() == record.alpha.to_bits()
        }) {
            Some((_, _, group)) => group.push(record),
            None => groups.push((record.agent, record.alpha, vec![record])),
        }
    }
    groups
        .into_iter()
        .map(|(agent, alpha, group)| summarize_group(agent, alpha, &group))
        .collect()
}

fn summarize_group(agent: Agent, alpha: f64, group: &[&RunRecord]) -> AlphaSummary {
    let total_panic_events: u64 = group.iter().map(|record| record.panic_events).sum();
    let total_rescued: u64 = group.iter().map(|record| record.rescued).sum();
    let drop_checks: u64 = group.iter().map(|record| record.risk_drop_checks).sum();
    let drops: u64 = group.iter().map(|record| record.risk_drops).sum();
    let mut deaths = BTreeMap::new();
    let mut survived = 0;
    for record in group {
        match record.death {
            Some(death) => *deaths.entry(death.label().to_string()).or_insert(0) += 1,
            None => survived += 1,
        }
    }

    AlphaSummary {
        agent,
        alpha,
        runs: group.len(),
        mean_steps: mean(group, |record| record.steps as f64),
        mean_final_length: mean(group, |record| record.final_length as f64),
        mean_panic_events: mean(group, |record| record.panic_events as f64),
        total_panic_events,
        total_rescued,
        rescue_rate: pooled(total_rescued, total_panic_events),
        risk_drop_rate: pooled(drops, drop_checks),
        mean_panic_ratio: mean(group, |record| record.panic_ratio),
        mean_moved_ratio: mean(group, |record| record.moved_ratio),
        mean_deadlock_steps: mean(group, |record| record.deadlock_steps as f64),
        mean_recharge_cycles: mean(group, |record| record.recharge_cycles as f64),
        mean_cells_cleaned: mean(group, |record| record.cells_cleaned as f64),
        mean_risk_threshold: mean(group, |record| record.mean_risk_threshold),
        survived,
        deaths,
    }
}

fn pooled(hits: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    hits as f64 / total as f64
}

fn mean<F>(group: &[&RunRecord], value: F) -> f64
where
    F: Fn(&RunRecord) -> f64,
{
    if group.is_empty() {
        return 0.0;
    }
    group.iter().map(|record| value(*record)).sum::<f64>() / group.len() as f64
}
