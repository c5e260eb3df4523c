use super::*;

fn input(step: u64, risk: f64) -> MachineInput {
    MachineInput {
        step,
        risk,
        resource_level: 100.0,
        thresholds: Thresholds {
            risk: 0.35,
            resource_alarm: None,
        },
    }
}

#[test]
fn long_panic_counts_as_one_episode() {
    let mut machine = PanicStateMachine::new(PanicConfig::default());
    for step in 0..60 {
        let transition = machine.transition(input(step, 0.9));
        assert_eq!(transition.to, Mode::Panic);
        assert_eq!(transition.episode_started.is_some(), step == 0);
    }
    assert_eq!(machine.log().panic_events(), 1);
    assert_eq!(machine.panic_steps(), 60);

    assert_eq!(machine.transition(input(60, 0.1)).to, Mode::Normal);
    let again = machine.transition(input(61, 0.9));
    assert_eq!(again.episode_started, Some(1));
    assert_eq!(machine.log().panic_events(), 2);
}

#[test]
fn threshold_is_inclusive() {
    let mut machine = PanicStateMachine::new(PanicConfig::default());
    assert_eq!(machine.transition(input(0, 0.35)).to, Mode::Panic);
    let mut machine = PanicStateMachine::new(PanicConfig::default());
    assert_eq!(machine.transition(input(0, 0.3499)).to, Mode::Normal);
}

#[test]
fn survival_rule_rescues_after_window() {
    let mut machine = PanicStateMachine::new(PanicConfig::default());
    machine.transition(input(0, 0.9));
    for step in 1..20 {
        assert!(machine.transition(input(step, 0.9)).resolved.is_empty());
    }
    let transition = machine.transition(input(20, 0.9));
    assert_eq!(
        transition.resolved,
        vec![ResolvedRescue {
            seq: 0,
            start_step: 0,
            status: RescueStatus::Rescued,
        }]
    );
    assert_eq!(machine.log().rescued(), 1);
    assert_eq!(machine.log().rescue_rate(), 1.0);
    assert_eq!(machine.pending_rescues(), 0);
}

#[test]
fn risk_drop_rule_needs_lower_risk() {
    let config = PanicConfig {
        rescue_rule: RescueRule::RiskDrop { margin: 0.15 },
        ..PanicConfig::default()
    };

    let mut dropped = PanicStateMachine::new(config.clone());
    dropped.transition(input(0, 0.9));
    let transition = dropped.transition(input(20, 0.5));
    assert_eq!(transition.resolved[0].status, RescueStatus::Rescued);

    let mut stuck = PanicStateMachine::new(config);
    stuck.transition(input(0, 0.9));
    let transition = stuck.transition(input(20, 0.8));
    assert_eq!(transition.resolved[0].status, RescueStatus::Lost);
    assert_eq!(stuck.log().lost(), 1);
    assert_eq!(stuck.log().rescue_rate(), 0.0);
}

#[test]
fn risk_drop_is_recorded_next_to_survival_rescues() {
    let mut machine = PanicStateMachine::new(PanicConfig::default());
    machine.transition(input(0, 0.9));
    machine.transition(input(1, 0.0));
    machine.transition(input(2, 0.9));
    // First window: 0.7 is below 0.9 - 0.15.
    assert_eq!(machine.transition(input(20, 0.7)).resolved.len(), 1);
    // Second window: 0.8 is not.
    assert_eq!(machine.transition(input(22, 0.8)).resolved.len(), 1);
    machine.transition(input(23, 0.0));
    machine.transition(input(24, 0.9));
    machine.conclude(30, true);

    let log = machine.log();
    assert_eq!(log.panic_events(), 3);
    assert_eq!(log.rescued(), 2);
    assert_eq!(log.risk_drop_checks(), 2);
    assert_eq!(log.risk_drops(), 1);
    assert_eq!(log.risk_drop_rate(), 0.5);
    assert_eq!(
        log.iter().map(|episode| episode.risk_dropped).collect::<Vec<_>>(),
        vec![Some(true), Some(false), None]
    );
}

#[test]
fn disabled_risk_gate_leaves_only_the_alarm() {
    let config = PanicConfig {
        risk_gate: false,
        ..PanicConfig::default()
    };
    let mut machine = PanicStateMachine::new(config);
    for step in 0..30 {
        assert_eq!(machine.transition(input(step, 1.0)).to, Mode::Normal);
    }
    assert_eq!(machine.log().panic_events(), 0);
    assert_eq!(machine.panic_steps(), 0);

    let starving = MachineInput {
        step: 30,
        risk: 1.0,
        resource_level: 10.0,
        thresholds: Thresholds {
            risk: 0.35,
            resource_alarm: Some(20.0),
        },
    };
    assert_eq!(machine.transition(starving).to, Mode::Survival);
}

#[test]
fn conclude_settles_pending_rescues() {
    let mut terminated = PanicStateMachine::new(PanicConfig::default());
    terminated.transition(input(0, 0.9));
    let resolved = terminated.conclude(5, true);
    assert_eq!(resolved[0].status, RescueStatus::Lost);
    assert_eq!(terminated.log().lost(), 1);

    let mut early = PanicStateMachine::new(PanicConfig::default());
    early.transition(input(0, 0.9));
    assert!(early.conclude(5, false).is_empty());
    assert_eq!(early.pending_rescues(), 1);
    assert_eq!(early.conclude(20, false)[0].status, RescueStatus::Rescued);
    assert!(early.log().iter().all(|episode| !episode.is_pending()));
}

#[test]
fn bursts_hold_panic_and_cooldown_blocks_reentry() {
    let mut machine = PanicStateMachine::new(PanicConfig::bursty());
    let modes: Vec<Mode> = (0..13)
        .map(|step| machine.transition(input(step, 0.9)).to)
        .collect();
    use Mode::{Normal as N, Panic as P};
    assert_eq!(modes, vec![P, P, P, P, N, N, P, P, P, P, N, N, P]);
    assert_eq!(machine.log().panic_events(), 3);
}

#[test]
fn burst_outlasts_a_risk_drop() {
    let mut machine = PanicStateMachine::new(PanicConfig::bursty());
    machine.transition(input(0, 0.9));
    for step in 1..4 {
        assert_eq!(machine.transition(input(step, 0.0)).to, Mode::Panic);
    }
    assert_eq!(machine.transition(input(4, 0.0)).to, Mode::Normal);
}

#[test]
fn low_resource_forces_survival() {
    let mut machine = PanicStateMachine::new(PanicConfig::default());
    let alarm = Thresholds {
        risk: 0.35,
        resource_alarm: Some(20.0),
    };
    let starving = MachineInput {
        step: 0,
        risk: 0.9,
        resource_level: 10.0,
        thresholds: alarm,
    };
    let transition = machine.transition(starving);
    assert_eq!(transition.to, Mode::Survival);
    assert_eq!(transition.episode_started, None);

    // Leaving survival into panic opens an episode.
    let charged = MachineInput {
        step: 1,
        resource_level: 50.0,
        ..starving
    };
    let transition = machine.transition(charged);
    assert_eq!(transition.to, Mode::Panic);
    assert_eq!(transition.episode_started, Some(0));

    let calm = MachineInput {
        step: 2,
        risk: 0.0,
        ..charged
    };
    assert_eq!(machine.transition(calm).to, Mode::Normal);
}

#[test]
fn episode_log_keeps_counters_past_capacity() {
    let config = PanicConfig {
        episode_capacity: 2,
        ..PanicConfig::default()
    };
    let mut machine = PanicStateMachine::new(config);
    for step in 0..6 {
        let risk = if step % 2 == 0 { 0.9 } else { 0.0 };
        machine.transition(input(step, risk));
    }
    let log = machine.log();
    assert_eq!(log.panic_events(), 3);
    assert_eq!(log.len(), 2);
    assert_eq!(log.evicted(), 1);
    assert_eq!(log.iter().map(|episode| episode.seq).collect::<Vec<_>>(), vec![1, 2]);

    let drained = machine.log_mut().drain();
    assert_eq!(drained.len(), 2);
    assert!(machine.log().is_empty());
    assert_eq!(machine.log().panic_events(), 3);
}

#[test]
fn reset_returns_to_normal() {
    let mut machine = PanicStateMachine::new(PanicConfig::bursty());
    machine.transition(input(0, 0.9));
    machine.reset();
    assert_eq!(machine.mode(), Mode::Normal);
    assert_eq!(machine.cooldown_remaining(), 0);
    assert_eq!(machine.log().panic_events(), 0);
}
