use risk_nav::experiment::{
    run_baseline, run_snake, run_vacuum, Agent, ExperimentConfig, RunRecord, Variant,
};

fn snake_records(alpha: f64, config: &ExperimentConfig) -> Vec<RunRecord> {
    (1000..1050)
        .map(|seed| run_snake(seed, alpha, config).expect("run").record)
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let values: Vec<f64> = values.collect();
    values.iter().sum::<f64>() / values.len().max(1) as f64
}

#[test]
fn higher_alpha_raises_thresholds_and_changes_panics() {
    let mut config = ExperimentConfig::default();
    config.sweep.max_steps = 2000;

    let cautious = snake_records(0.0, &config);
    let hungry = snake_records(2.0, &config);

    let cautious_threshold = mean(cautious.iter().map(|record| record.mean_risk_threshold));
    let hungry_threshold = mean(hungry.iter().map(|record| record.mean_risk_threshold));
    assert!(hungry_threshold >= cautious_threshold);

    let cautious_panics: Vec<u64> = cautious.iter().map(|record| record.panic_events).collect();
    let hungry_panics: Vec<u64> = hungry.iter().map(|record| record.panic_events).collect();
    assert_ne!(cautious_panics, hungry_panics);
}

#[test]
fn baseline_robot_never_panics_where_gated_robot_does() {
    let config = ExperimentConfig::default();
    let mut gated_panics = 0;
    for seed in 1000..1020 {
        let baseline = run_baseline(Variant::Vacuum, seed, &config).expect("run").record;
        assert_eq!(baseline.agent, Agent::Baseline);
        assert_eq!(baseline.panic_events, 0);

        let gated = run_vacuum(seed, 1.0, &config).expect("run").record;
        assert_eq!(gated.agent, Agent::Gated);
        gated_panics += gated.panic_events;
    }
    assert!(gated_panics > 0);
}

#[test]
fn repeated_sweeps_are_identical() {
    let mut config = ExperimentConfig::default();
    config.sweep.max_steps = 300;
    for seed in [7, 8, 9] {
        let first = run_snake(seed, 1.5, &config).expect("run");
        let second = run_snake(seed, 1.5, &config).expect("run");
        assert_eq!(first.actions, second.actions);
        assert_eq!(first.record, second.record);

        let first = run_vacuum(seed, 1.5, &config).expect("run");
        let second = run_vacuum(seed, 1.5, &config).expect("run");
        assert_eq!(first.actions, second.actions);
        assert_eq!(first.log, second.log);
    }
}
