use super::*;

fn snake_engine(alpha: f64) -> NavigationEngine<HungerPricing> {
    NavigationEngine::new(
        EngineConfig::snake(),
        HungerPricing::new(HungerPricingConfig::default(), alpha),
    )
    .expect("valid config")
}

fn robot_pricing() -> StressPricing {
    StressPricing::for_battery(60.0, 1.0)
}

fn boxed_in(grid: GridDims, head: GridPos) -> ObstacleMap {
    ObstacleMap::from_cells(grid, Direction::ALL.map(|direction| head.step(direction)))
}

#[test]
fn open_grid_decision_heads_for_goal() {
    let terrain = ObstacleMap::empty(dims(20, 20));
    let body = [pos(10, 10)];
    let snapshot = WorldSnapshot::new(0, &terrain, &body, ResourceReading::hunger(0, 200))
        .expect("snapshot")
        .with_goal(Some(pos(15, 10)));
    let mut engine = snake_engine(0.0);
    let decision = engine.decide(&snapshot);
    assert_eq!(decision.action, Action::Move(Direction::Right));
    assert_eq!(decision.mode, Mode::Normal);
    assert_eq!(decision.source, ActionSource::Goal);
    assert!(!decision.fallback);
    assert_eq!(decision.risk.score, 0.0);
}

#[test]
fn boxed_in_agent_emits_stay() {
    let grid = dims(10, 10);
    let head = pos(5, 5);
    let terrain = boxed_in(grid, head);
    let body = [head];
    let snapshot = WorldSnapshot::new(3, &terrain, &body, ResourceReading::hunger(3, 200))
        .expect("snapshot")
        .with_goal(Some(pos(0, 0)));

    let mut engine = snake_engine(1.0);
    let decision = engine.decide(&snapshot);
    assert_eq!(decision.action, Action::Stay);
    assert_eq!(decision.source, ActionSource::Idle);
    assert!(decision.fallback);

    let mut robot =
        NavigationEngine::new(EngineConfig::vacuum(), robot_pricing()).expect("valid config");
    let snapshot = WorldSnapshot::new(0, &terrain, &body, ResourceReading::battery(60, 60))
        .expect("snapshot")
        .with_safe_point(Some(pos(0, 0)));
    assert_eq!(robot.decide(&snapshot).action, Action::Stay);
}

#[test]
fn panic_escapes_toward_tail() {
    let terrain = ObstacleMap::empty(dims(10, 10));
    let body = [pos(5, 5), pos(4, 5), pos(3, 5)];
    let snapshot = WorldSnapshot::new(0, &terrain, &body, ResourceReading::hunger(0, 200))
        .expect("snapshot")
        .with_goal(Some(pos(9, 5)));
    let mut engine =
        NavigationEngine::new(EngineConfig::snake(), fixed_risk(0.0)).expect("valid config");
    let decision = engine.decide(&snapshot);
    assert_eq!(decision.mode, Mode::Panic);
    assert_eq!(decision.action, Action::Move(Direction::Up));
    assert_eq!(decision.source, ActionSource::Escape);
    assert_eq!(decision.transition.episode_started, Some(0));
}

#[test]
fn panic_without_tail_path_falls_back_to_open_space() {
    let terrain = ObstacleMap::empty(dims(10, 10));
    let body = [pos(0, 0)];
    let snapshot = WorldSnapshot::new(0, &terrain, &body, ResourceReading::hunger(0, 200))
        .expect("snapshot");
    let mut engine =
        NavigationEngine::new(EngineConfig::snake(), fixed_risk(0.0)).expect("valid config");
    let decision = engine.decide(&snapshot);
    assert_eq!(decision.mode, Mode::Panic);
    assert_eq!(decision.source, ActionSource::OpenSpace);
    assert!(decision.fallback);
    assert!(matches!(decision.action, Action::Move(_)));
}

#[test]
fn continuous_panic_is_one_episode() {
    let terrain = ObstacleMap::empty(dims(10, 10));
    let body = [pos(5, 5), pos(4, 5), pos(3, 5)];
    let mut engine =
        NavigationEngine::new(EngineConfig::snake(), fixed_risk(0.0)).expect("valid config");
    for step in 0..60 {
        let snapshot = WorldSnapshot::new(step, &terrain, &body, ResourceReading::hunger(step, 200))
            .expect("snapshot");
        assert_eq!(engine.decide(&snapshot).mode, Mode::Panic);
    }
    assert_eq!(engine.episode_log().panic_events(), 1);
    assert_eq!(engine.panic_steps(), 60);
    // Rescue judged at step 20 while the run was alive.
    assert_eq!(engine.episode_log().rescued(), 1);
}

#[test]
fn baseline_engine_measures_risk_without_panicking() {
    let terrain = ObstacleMap::empty(dims(10, 10));
    let body = [pos(5, 5), pos(4, 5), pos(3, 5)];
    let config = EngineConfig::snake().baseline();
    assert!(config.is_baseline());
    let mut engine = NavigationEngine::new(config, fixed_risk(0.0)).expect("valid config");
    for step in 0..30 {
        let resource = ResourceReading::hunger(step, 200);
        let snapshot = WorldSnapshot::new(step, &terrain, &body, resource)
            .expect("snapshot")
            .with_goal(Some(pos(9, 5)));
        let decision = engine.decide(&snapshot);
        assert_eq!(decision.mode, Mode::Normal);
        assert_eq!(decision.action, Action::Move(Direction::Right));
        assert!(decision.risk.score > 0.0);
    }
    assert_eq!(engine.episode_log().panic_events(), 0);

    let robot = EngineConfig::vacuum().baseline();
    assert!(robot.stress.is_none());
    assert!(!robot.panic.risk_gate);
    assert_eq!(robot.panic.escape_burst, PanicConfig::bursty().escape_burst);
    assert_eq!(robot.risk, EngineConfig::vacuum().risk);
}

#[test]
fn survival_heads_greedily_for_safe_point() {
    let terrain = ObstacleMap::empty(dims(10, 10));
    let body = [pos(3, 3)];
    let snapshot = WorldSnapshot::new(0, &terrain, &body, ResourceReading::battery(10, 60))
        .expect("snapshot")
        .with_goal(Some(pos(9, 9)))
        .with_safe_point(Some(pos(0, 0)));
    let policy = FixedPolicy(Thresholds {
        risk: 0.9,
        resource_alarm: Some(30.0),
    });
    let mut engine = NavigationEngine::new(EngineConfig::vacuum(), policy).expect("valid config");
    let decision = engine.decide(&snapshot);
    assert_eq!(decision.mode, Mode::Survival);
    assert_eq!(decision.source, ActionSource::Survival);
    assert_eq!(decision.action, Action::Move(Direction::Up));
}

#[test]
fn greedy_skips_blocked_moves() {
    let grid = dims(10, 10);
    let obstacles = ObstacleMap::from_cells(grid, [pos(3, 2)]);
    assert_eq!(greedy_toward(pos(3, 3), pos(0, 0), &obstacles), Some(Direction::Left));
    assert_eq!(greedy_toward(pos(0, 0), pos(0, 0), &obstacles), None);
}

#[test]
fn windowed_risk_waits_for_full_window() {
    let terrain = ObstacleMap::empty(dims(10, 10));
    let body = [pos(4, 4)];
    let mut engine =
        NavigationEngine::new(EngineConfig::vacuum(), robot_pricing()).expect("valid config");
    for step in 0..9 {
        let snapshot = WorldSnapshot::new(step, &terrain, &body, ResourceReading::battery(60, 60))
            .expect("snapshot");
        assert_eq!(engine.decide(&snapshot).risk.score, 0.0);
    }
    let snapshot = WorldSnapshot::new(9, &terrain, &body, ResourceReading::battery(60, 60))
        .expect("snapshot");
    let decision = engine.decide(&snapshot);
    // Ten identical positions: a collapsed trajectory.
    assert_eq!(decision.risk.score, 1.0);
    assert_eq!(decision.mode, Mode::Panic);
    assert_eq!(decision.source, ActionSource::OpenSpace);
    assert!(decision.stress.is_some());
}

#[test]
fn forced_escape_feeds_stress() {
    let grid = dims(10, 10);
    let head = pos(5, 5);
    let terrain = boxed_in(grid, head);
    let body = [head];
    let policy = fixed_risk(0.0);
    let mut engine = NavigationEngine::new(EngineConfig::vacuum(), policy).expect("valid config");
    let full = ResourceReading::battery(60, 60);
    let first = engine.decide(&WorldSnapshot::new(0, &terrain, &body, full).expect("snapshot"));
    assert_eq!(first.mode, Mode::Panic);
    assert!(first.fallback);
    let second = engine.decide(&WorldSnapshot::new(1, &terrain, &body, full).expect("snapshot"));
    let damage = second.stress.map(|sample| sample.damage).unwrap_or_default();
    assert!(damage > 0.1);
}

#[test]
fn snapshot_rejects_bad_bodies() {
    let terrain = ObstacleMap::empty(dims(5, 5));
    let reading = ResourceReading::hunger(0, 10);
    assert_eq!(
        WorldSnapshot::new(0, &terrain, &[], reading).err(),
        Some(SnapshotError::EmptyBody)
    );
    let body = [pos(1, 1), pos(5, 1)];
    assert_eq!(
        WorldSnapshot::new(0, &terrain, &body, reading).err(),
        Some(SnapshotError::BodyOutOfBounds {
            index: 1,
            pos: pos(5, 1),
        })
    );
}

#[test]
fn resource_scarcity_directions() {
    assert_eq!(ResourceReading::hunger(50, 200).scarcity(), 0.25);
    assert_eq!(ResourceReading::hunger(400, 200).scarcity(), 1.0);
    assert_eq!(ResourceReading::battery(45, 60).scarcity(), 0.25);
    assert_eq!(ResourceReading::battery(5, 0).scarcity(), 0.0);
}

#[test]
fn invalid_weights_are_rejected() {
    let mut config = EngineConfig::snake();
    config.risk.topo_weight = 0.5;
    let err = NavigationEngine::new(config, fixed_risk(0.5)).err();
    assert!(matches!(err, Some(ConfigError::InvalidRiskWeights { .. })));

    let mut config = EngineConfig::vacuum();
    if let Some(stress) = config.stress.as_mut() {
        stress.rho = 1.5;
    }
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue { field: "stress.rho", .. })
    ));
}

#[test]
fn presets_validate() {
    assert!(EngineConfig::snake().validate().is_ok());
    assert!(EngineConfig::vacuum().validate().is_ok());
    assert_eq!(EngineConfig::default(), EngineConfig::snake());
}
