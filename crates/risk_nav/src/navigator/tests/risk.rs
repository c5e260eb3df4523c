use super::*;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn collinear_points_have_zero_entropy_and_full_risk() {
    let line = [pos(0, 0), pos(1, 0), pos(2, 0), pos(3, 0), pos(4, 0)];
    let entropy = shape_entropy(&line).expect("entropy");
    assert!(entropy < 1e-9);

    let gate = StructGate::new(RiskConfig::default());
    assert!(approx(gate.geometric_risk(&line), 1.0));

    let diagonal = [pos(0, 0), pos(1, 1), pos(2, 2), pos(3, 3)];
    assert!(approx(gate.geometric_risk(&diagonal), 1.0));
}

#[test]
fn isotropic_points_have_zero_risk() {
    let square = [pos(0, 0), pos(2, 0), pos(0, 2), pos(2, 2)];
    let entropy = shape_entropy(&square).expect("entropy");
    assert!(entropy > 0.999);

    let gate = StructGate::new(RiskConfig::default());
    assert!(approx(gate.geometric_risk(&square), 0.0));
}

#[test]
fn collapsed_points_count_as_degenerate() {
    let stuck = [pos(3, 3); 6];
    assert_eq!(shape_entropy(&stuck), Some(0.0));
    let gate = StructGate::new(RiskConfig::windowed());
    assert!(approx(gate.geometric_risk(&stuck), 1.0));
}

#[test]
fn too_few_points_give_no_entropy() {
    assert_eq!(shape_entropy(&[]), None);
    assert_eq!(shape_entropy(&[pos(1, 1)]), None);
    let gate = StructGate::new(RiskConfig::default());
    assert_eq!(gate.geometric_risk(&[pos(1, 1)]), 0.0);
}

#[test]
fn assess_reports_zero_below_min_points() {
    let gate = StructGate::new(RiskConfig::default());
    let map = ObstacleMap::empty(dims(10, 10));
    let body = [pos(5, 5), pos(5, 6)];
    let risk = gate.assess(&body, pos(5, 5), body.len(), &map);
    assert_eq!(risk, RiskAssessment::default());
}

#[test]
fn assess_combines_weighted_components() {
    let gate = StructGate::new(RiskConfig::default());
    let grid = dims(10, 10);
    let body = [pos(5, 5), pos(6, 5), pos(7, 5)];
    let map = ObstacleMap::empty(grid).with_body(&body);
    let risk = gate.assess(&body, pos(5, 5), body.len(), &map);
    // Plenty of room: only the straight body contributes.
    assert!(approx(risk.topological, 0.0));
    assert!(approx(risk.geometric, 1.0));
    assert!(approx(risk.score, 0.3));
}

#[test]
fn topological_risk_rises_when_confined() {
    let gate = StructGate::new(RiskConfig::default());
    let grid = dims(5, 5);
    // Head at the end of a dead-end corridor of two open cells.
    let mut map = ObstacleMap::empty(grid);
    for cell in grid.cells() {
        if cell.y != 0 || cell.x > 1 {
            map.block(cell);
        }
    }
    let risk = gate.topological_risk(pos(0, 0), 8, &map);
    assert!(approx(risk, 1.0 - 2.0 / 8.0));
    assert_eq!(gate.topological_risk(pos(0, 0), 1, &map), 0.0);
}

#[test]
fn risk_score_stays_in_unit_interval() {
    let gate = StructGate::new(RiskConfig::default());
    let grid = dims(6, 6);
    let body: Vec<GridPos> = (0..6)
        .map(|x| pos(x, 0))
        .chain((0..6).rev().map(|x| pos(x, 1)))
        .collect();
    let map = ObstacleMap::empty(grid).with_body(&body);
    let risk = gate.assess(&body, body[0], body.len(), &map);
    for value in [risk.geometric, risk.topological, risk.score] {
        assert!((0.0..=1.0).contains(&value));
    }
}

#[test]
fn windowed_geometry_ignores_topology() {
    let gate = StructGate::new(RiskConfig::windowed());
    let grid = dims(3, 3);
    let head = pos(1, 1);
    let map = ObstacleMap::from_cells(grid, Direction::ALL.map(|direction| head.step(direction)));
    let trail = [head; 10];
    let risk = gate.assess(&trail, head, 1, &map);
    assert_eq!(risk.topological, 0.0);
    assert!(approx(risk.score, 1.0));
    assert_eq!(gate.assess(&trail[..9], head, 1, &map), RiskAssessment::default());
}

#[test]
fn trajectory_window_evicts_oldest() {
    let mut window = TrajectoryWindow::new(3);
    for x in 0..5 {
        window.push(pos(x, 0));
    }
    assert!(window.is_full());
    assert_eq!(window.to_vec(), vec![pos(2, 0), pos(3, 0), pos(4, 0)]);
    window.clear();
    assert!(window.is_empty());
    assert_eq!(TrajectoryWindow::new(0).capacity(), 1);
}

#[test]
fn sanitized_config_repairs_window() {
    let config = RiskConfig {
        window: 0,
        min_points: 7,
        trajectory: TrajectorySource::Window,
        topo_weight: -1.0,
        ..RiskConfig::default()
    }
    .sanitized();
    assert_eq!(config.window, 1);
    assert_eq!(config.min_points, 1);
    assert_eq!(config.topo_weight, 0.0);
}
