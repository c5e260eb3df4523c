//! Panic/survival state machine with episode and rescue accounting.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::pricing::Thresholds;

// ============================================================================
// Mode
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Goal seeking.
    #[default]
    Normal,
    /// Escaping a structural trap.
    Panic,
    /// Heading for the safe point because the resource is nearly gone.
    Survival,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Panic => "panic",
            Mode::Survival => "survival",
        }
    }
}

// ============================================================================
// Episodes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescueStatus {
    /// The rescue window has not elapsed yet.
    Pending,
    Rescued,
    Lost,
}

/// One contiguous stretch of panic, recorded once at entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanicEpisode {
    /// Position in the run's episode sequence, starting at 0.
    pub seq: u64,
    /// Step at which the agent entered panic.
    pub start_step: u64,
    /// Risk score that triggered the entry.
    pub start_risk: f64,
    pub rescue: RescueStatus,
    /// Step at which the rescue was judged; `None` while pending.
    pub resolved_step: Option<u64>,
    /// Whether risk had fallen by the diagnostic margin when the rescue
    /// window elapsed. `None` if the run ended before that.
    pub risk_dropped: Option<bool>,
}

impl PanicEpisode {
    pub fn rescued(&self) -> bool {
        self.rescue == RescueStatus::Rescued
    }

    pub fn is_pending(&self) -> bool {
        self.rescue == RescueStatus::Pending
    }
}

/// How an episode is judged once its rescue window has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RescueRule {
    /// Rescued if the run is still going.
    Survival,
    /// Rescued if risk fell below `start_risk - margin`.
    RiskDrop { margin: f64 },
}

impl Default for RescueRule {
    fn default() -> Self {
        RescueRule::Survival
    }
}

/// Bounded episode history with exact lifetime counters.
///
/// Evicted or drained episodes still count towards `panic_events`,
/// `rescued` and `lost`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeLog {
    episodes: VecDeque<PanicEpisode>,
    capacity: usize,
    next_seq: u64,
    rescued: u64,
    lost: u64,
    evicted: u64,
    risk_drop_checks: u64,
    risk_drops: u64,
}

impl Default for EpisodeLog {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EpisodeLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            episodes: VecDeque::new(),
            capacity: capacity.max(1),
            next_seq: 0,
            rescued: 0,
            lost: 0,
            evicted: 0,
            risk_drop_checks: 0,
            risk_drops: 0,
        }
    }

    fn open(&mut self, start_step: u64, start_risk: f64) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        if self.episodes.len() >= self.capacity {
            self.episodes.pop_front();
            self.evicted += 1;
        }
        self.episodes.push_back(PanicEpisode {
            seq,
            start_step,
            start_risk,
            rescue: RescueStatus::Pending,
            resolved_step: None,
            risk_dropped: None,
        });
        seq
    }

    fn resolve(&mut self, seq: u64, status: RescueStatus, step: u64, risk_dropped: Option<bool>) {
        match status {
            RescueStatus::Rescued => self.rescued += 1,
            RescueStatus::Lost => self.lost += 1,
            RescueStatus::Pending => return,
        }
        if let Some(dropped) = risk_dropped {
            self.risk_drop_checks += 1;
            if dropped {
                self.risk_drops += 1;
            }
        }
        if let Some(episode) = self.episodes.iter_mut().find(|episode| episode.seq == seq) {
            episode.rescue = status;
            episode.resolved_step = Some(step);
            episode.risk_dropped = risk_dropped;
        }
    }

    /// Number of panic episodes ever started.
    pub fn panic_events(&self) -> u64 {
        self.next_seq
    }

    pub fn rescued(&self) -> u64 {
        self.rescued
    }

    pub fn lost(&self) -> u64 {
        self.lost
    }

    pub fn resolved(&self) -> u64 {
        self.rescued + self.lost
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Episodes whose rescue window elapsed while the run was still going.
    pub fn risk_drop_checks(&self) -> u64 {
        self.risk_drop_checks
    }

    /// Of those, the episodes whose risk fell by the diagnostic margin.
    pub fn risk_drops(&self) -> u64 {
        self.risk_drops
    }

    pub fn risk_drop_rate(&self) -> f64 {
        if self.risk_drop_checks == 0 {
            return 0.0;
        }
        self.risk_drops as f64 / self.risk_drop_checks as f64
    }

    /// Rescued episodes over all episodes; 0 when none happened.
    pub fn rescue_rate(&self) -> f64 {
        if self.next_seq == 0 {
            return 0.0;
        }
        self.rescued as f64 / self.next_seq as f64
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &PanicEpisode> {
        self.episodes.iter()
    }

    pub fn to_vec(&self) -> Vec<PanicEpisode> {
        self.episodes.iter().cloned().collect()
    }

    /// Hands the retained episodes to the caller. Counters are kept.
    pub fn drain(&mut self) -> Vec<PanicEpisode> {
        self.episodes.drain(..).collect()
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanicConfig {
    /// Steps after an episode's start at which its rescue is judged.
    pub rescue_window: u64,
    /// How an elapsed window is judged.
    pub rescue_rule: RescueRule,
    /// Minimum length of a panic stretch, in steps. 0 or 1: panic lasts
    /// exactly as long as the risk stays high.
    pub escape_burst: u32,
    /// Steps after a panic entry during which no new panic can start.
    pub cooldown: u32,
    /// Episodes retained in the log; counters are unaffected.
    pub episode_capacity: usize,
    /// When false, risk never opens a panic and only the resource alarm
    /// changes modes. Baseline agents run with this off.
    pub risk_gate: bool,
    /// Drop below the entry risk recorded as a diagnostic when a rescue
    /// window elapses. Independent of the rescue rule.
    pub risk_drop_margin: f64,
}

impl Default for PanicConfig {
    fn default() -> Self {
        Self {
            rescue_window: 20,
            rescue_rule: RescueRule::Survival,
            escape_burst: 0,
            cooldown: 0,
            episode_capacity: 1024,
            risk_gate: true,
            risk_drop_margin: 0.15,
        }
    }
}

impl PanicConfig {
    /// Robot preset: four-step escape bursts with a six-step cooldown.
    pub fn bursty() -> Self {
        Self {
            rescue_window: 12,
            rescue_rule: RescueRule::Survival,
            escape_burst: 4,
            cooldown: 6,
            ..Self::default()
        }
    }

    pub fn sanitized(mut self) -> Self {
        if self.episode_capacity == 0 {
            self.episode_capacity = 1;
        }
        if self.risk_drop_margin < 0.0 {
            self.risk_drop_margin = 0.0;
        }
        if let RescueRule::RiskDrop { margin } = &mut self.rescue_rule {
            if *margin < 0.0 {
                *margin = 0.0;
            }
        }
        self
    }
}

// ============================================================================
// State Machine
// ============================================================================

/// Per-step inputs to the machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MachineInput {
    pub step: u64,
    /// Combined risk score in [0, 1].
    pub risk: f64,
    /// Raw resource level, compared against the alarm.
    pub resource_level: f64,
    /// Thresholds priced for this step.
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRescue {
    /// Episode sequence number.
    pub seq: u64,
    pub start_step: u64,
    /// `Rescued` or `Lost`.
    pub status: RescueStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Mode before the step.
    pub from: Mode,
    /// Mode the step runs in.
    pub to: Mode,
    /// Sequence number of the episode opened by this step, if any.
    pub episode_started: Option<u64>,
    /// Rescues whose window elapsed at this step.
    pub resolved: Vec<ResolvedRescue>,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PendingRescue {
    seq: u64,
    start_step: u64,
    start_risk: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanicStateMachine {
    config: PanicConfig,
    mode: Mode,
    cooldown_remaining: u32,
    burst_remaining: u32,
    pending: VecDeque<PendingRescue>,
    log: EpisodeLog,
    panic_steps: u64,
}

impl PanicStateMachine {
    pub fn new(config: PanicConfig) -> Self {
        let config = config.sanitized();
        Self {
            log: EpisodeLog::new(config.episode_capacity),
            config,
            mode: Mode::Normal,
            cooldown_remaining: 0,
            burst_remaining: 0,
            pending: VecDeque::new(),
            panic_steps: 0,
        }
    }

    pub fn config(&self) -> &PanicConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn log(&self) -> &EpisodeLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut EpisodeLog {
        &mut self.log
    }

    /// Steps spent in panic so far.
    pub fn panic_steps(&self) -> u64 {
        self.panic_steps
    }

    pub fn cooldown_remaining(&self) -> u32 {
        self.cooldown_remaining
    }

    pub fn pending_rescues(&self) -> usize {
        self.pending.len()
    }

    /// Evaluates one step. Priority: survival alarm, running escape burst,
    /// risk threshold (outside cooldown), normal.
    pub fn transition(&mut self, input: MachineInput) -> Transition {
        let resolved = self.resolve_due(input.step, input.risk);
        if self.cooldown_remaining > 0 {
            self.cooldown_remaining -= 1;
        }

        let from = self.mode;
        let mut episode_started = None;
        let low_resource = input
            .thresholds
            .resource_alarm
            .is_some_and(|alarm| input.resource_level < alarm);

        let to = if low_resource {
            Mode::Survival
        } else if from == Mode::Panic && self.burst_remaining > 0 {
            self.burst_remaining -= 1;
            Mode::Panic
        } else if self.config.risk_gate
            && self.cooldown_remaining == 0
            && input.risk >= input.thresholds.risk
        {
            if from != Mode::Panic {
                let seq = self.log.open(input.step, input.risk);
                self.pending.push_back(PendingRescue {
                    seq,
                    start_step: input.step,
                    start_risk: input.risk,
                });
                self.burst_remaining = self.config.escape_burst.saturating_sub(1);
                self.cooldown_remaining = self.config.cooldown;
                episode_started = Some(seq);
            }
            Mode::Panic
        } else {
            Mode::Normal
        };

        if to != Mode::Panic {
            self.burst_remaining = 0;
        } else {
            self.panic_steps += 1;
        }
        self.mode = to;

        if from != to {
            tracing::debug!(
                step = input.step,
                from = from.label(),
                to = to.label(),
                risk = input.risk,
                risk_threshold = input.thresholds.risk,
                "mode transition"
            );
        }

        Transition {
            from,
            to,
            episode_started,
            resolved,
        }
    }

    /// Closes the run. Episodes still waiting for their window are lost if
    /// the run terminated; otherwise a survival-judged episode whose window
    /// elapsed exactly at the final step counts as rescued and the rest stay
    /// pending.
    pub fn conclude(&mut self, final_step: u64, terminated: bool) -> Vec<ResolvedRescue> {
        let mut resolved = Vec::new();
        let mut still_pending = VecDeque::new();
        while let Some(pending) = self.pending.pop_front() {
            let due = final_step >= pending.start_step + self.config.rescue_window;
            let status = if terminated {
                RescueStatus::Lost
            } else if due && self.config.rescue_rule == RescueRule::Survival {
                RescueStatus::Rescued
            } else {
                still_pending.push_back(pending);
                continue;
            };
            self.log.resolve(pending.seq, status, final_step, None);
            resolved.push(ResolvedRescue {
                seq: pending.seq,
                start_step: pending.start_step,
                status,
            });
        }
        self.pending = still_pending;
        resolved
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    fn resolve_due(&mut self, step: u64, risk: f64) -> Vec<ResolvedRescue> {
        let mut resolved = Vec::new();
        while let Some(front) = self.pending.front() {
            if step < front.start_step + self.config.rescue_window {
                break;
            }
            let Some(pending) = self.pending.pop_front() else {
                break;
            };
            let status = match self.config.rescue_rule {
                RescueRule::Survival => RescueStatus::Rescued,
                RescueRule::RiskDrop { margin } => {
                    if risk < pending.start_risk - margin {
                        RescueStatus::Rescued
                    } else {
                        RescueStatus::Lost
                    }
                }
            };
            let risk_dropped = risk < pending.start_risk - self.config.risk_drop_margin;
            self.log.resolve(pending.seq, status, step, Some(risk_dropped));
            tracing::debug!(
                step,
                episode = pending.seq,
                start_step = pending.start_step,
                rescued = status == RescueStatus::Rescued,
                risk_dropped,
                "rescue evaluated"
            );
            resolved.push(ResolvedRescue {
                seq: pending.seq,
                start_step: pending.start_step,
                status,
            });
        }
        resolved
    }
}
