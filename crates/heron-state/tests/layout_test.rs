use heron_state::{
    Clock, ElementKind, Error, LayoutConfig, Phase, State, StateChart, StateLayout, StepClock,
    Transition,
};
use std::time::Duration;

fn clock() -> StepClock {
    StepClock::new(Duration::from_millis(1))
}

fn layout(chart: StateChart) -> StateLayout<StepClock> {
    StateLayout::new(chart, LayoutConfig::default(), clock()).unwrap()
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

fn traffic_light() -> StateChart {
    StateChart::new(
        vec![
            State::new("*"),
            State::new("Red"),
            State::new("Green"),
            State::new("Amber").with_size(90.0, 40.0),
        ],
        vec![
            Transition::new("t0", "*", "Red"),
            Transition::new("t1", "Red", "Green")
                .with_trigger("go")
                .with_action(["lamp.green", "timer.start"]),
            Transition::new("t2", "Red", "Amber")
                .with_trigger("go")
                .with_action(["lamp.green", "alarm.raise"]),
            Transition::new("t3", "Green", "Amber").with_trigger("timeout"),
            Transition::new("t4", "Amber", "Red").with_trigger("timeout"),
            Transition::new("t5", "Amber", "Amber").with_trigger("blink"),
        ],
    )
}

#[test]
fn two_states_reach_full_stability() {
    let chart = StateChart::new(
        vec![State::new("A"), State::new("B")],
        vec![Transition::new("t0", "A", "B").with_trigger("go")],
    );
    let mut layout = layout(chart);
    assert_eq!(layout.phase(), Phase::None);

    let snap = layout.run_to_stable().unwrap();
    assert_eq!(snap.phase, Phase::Stable);
    assert_eq!(snap.stability, 100);
    assert!(!snap.refused);
    assert!(layout.iterations() > 0);

    let a = snap.node("A").unwrap();
    let b = snap.node("B").unwrap();
    let t = snap.node("t.t0.B").unwrap();
    assert_eq!(t.kind, ElementKind::Transition);
    assert_eq!(snap.edges.len(), 2);
    assert!(snap.edges.iter().all(|e| !e.self_loop));

    // Repulsion between the two states and the transition box outweighs the short connector
    // springs, so the states settle a little over 200 apart rather than at the rest length.
    let ab = distance((a.x, a.y), (b.x, b.y));
    let at = distance((a.x, a.y), (t.x, t.y));
    let tb = distance((t.x, t.y), (b.x, b.y));
    assert!((200.0..260.0).contains(&ab), "A-B distance {ab}");
    assert!((at - tb).abs() < 1.0, "A-t {at} vs t-B {tb}");
    assert!(at + tb - ab < 1.0, "transition box off the A-B line");
}

#[test]
fn self_loop_is_seeded_on_a_ring_around_its_state() {
    let chart = StateChart::new(
        vec![State::new("A")],
        vec![Transition::new("t0", "A", "A").with_trigger("tick")],
    );
    // One update per phase with a vanishing time step: the full phase shows its seed.
    let mut config = LayoutConfig {
        slice_ms: 1,
        phase_budget_ms: 1,
        ..Default::default()
    };
    config.physics.initial_dt = 1e-6;
    let mut layout = StateLayout::new(chart, config, clock()).unwrap();
    let progress = layout.step().unwrap();
    assert_eq!(progress.phase, Phase::Stable);
    assert_eq!(progress.iterations, 3);

    let snap = layout.snapshot();
    let a = snap.node("A").unwrap();
    let from_a = |id: &str| {
        let n = snap.node(id).unwrap_or_else(|| panic!("missing {id}"));
        distance((a.x, a.y), (n.x, n.y))
    };
    assert!((from_a("t.t0.A") - 10.0).abs() < 1e-6);
    assert!((from_a("A.0.t.t0.A") - 5.0).abs() < 1e-6);
    assert!((from_a("t.t0.A.0.A") - 5.0).abs() < 1e-6);
}

#[test]
fn self_loop_stays_around_its_state() {
    let chart = StateChart::new(
        vec![State::new("A")],
        vec![Transition::new("t0", "A", "A").with_trigger("tick")],
    );
    let mut layout = layout(chart);
    let snap = layout.run_to_stable().unwrap();
    assert_eq!(snap.stability, 100);
    assert_eq!(snap.edges.iter().filter(|e| e.self_loop).count(), 4);

    // The loop relaxes outward from its seed ring until repulsion and springs balance.
    let a = snap.node("A").unwrap();
    let from_a = |id: &str| {
        let n = snap.node(id).unwrap_or_else(|| panic!("missing {id}"));
        distance((a.x, a.y), (n.x, n.y))
    };
    let t = from_a("t.t0.A");
    assert!((110.0..145.0).contains(&t), "self-loop box {t} from A");
    for id in ["A.0.t.t0.A", "t.t0.A.0.A"] {
        let d = from_a(id);
        assert!((85.0..120.0).contains(&d), "{id} {d} from A");
        assert!(d < t, "{id} beyond the self-loop box");
    }
}

#[test]
fn oversized_chart_is_refused_without_integrating() {
    let states = (0..5000).map(|i| State::new(format!("s{i}"))).collect();
    let mut layout = layout(StateChart::new(states, Vec::new()));

    assert!(layout.is_refused());
    assert_eq!(layout.phase(), Phase::Stable);

    let progress = layout.step().unwrap();
    assert_eq!(progress.iterations, 0);
    assert_eq!(layout.iterations(), 0);

    let snap = layout.snapshot();
    assert!(snap.refused);
    assert_eq!(snap.nodes.len(), 1);
    assert_eq!(snap.nodes[0].id, "0");
    let warning = snap.nodes[0].payload.as_ref().and_then(|p| p.as_str()).unwrap();
    assert!(warning.starts_with("more than 4000 nodes"), "{warning}");
    assert!(warning.contains("cowardly refusing to\ndraw state diagram"));
}

#[test]
fn system_clock_runs_to_stable() {
    let chart = StateChart::new(
        vec![State::new("A"), State::new("B")],
        vec![Transition::new("t0", "A", "B")],
    );
    let mut layout = StateLayout::with_system_clock(chart, LayoutConfig::default()).unwrap();
    let snap = layout.run_to_stable().unwrap();
    assert_eq!(snap.phase, Phase::Stable);
    assert_eq!(snap.stability, 100);
    assert!(layout.clock().now() > Duration::ZERO);
}

#[test]
fn node_limit_counts_states_and_transitions() {
    let chart = StateChart::new(
        vec![State::new("a"), State::new("b")],
        vec![Transition::new("t0", "a", "b"), Transition::new("t1", "b", "a")],
    );
    let config = LayoutConfig {
        node_limit: 3,
        ..Default::default()
    };
    let layout = StateLayout::new(chart, config, clock()).unwrap();
    assert!(layout.is_refused());
}

#[test]
fn identical_input_gives_identical_layout() {
    let first = layout(traffic_light()).run_to_stable().unwrap();
    let second = layout(traffic_light()).run_to_stable().unwrap();
    assert_eq!(first, second);
}

#[test]
fn reset_replays_the_same_layout() {
    let mut layout = layout(traffic_light());
    let first = layout.run_to_stable().unwrap();
    layout.reset().unwrap();
    assert_eq!(layout.phase(), Phase::None);
    assert_eq!(layout.iterations(), 0);
    assert!(layout.snapshot().nodes.is_empty());
    assert_eq!(layout.run_to_stable().unwrap(), first);
}

#[test]
fn clustered_chart_lays_out_choices_and_the_initial_dot() {
    let snap = layout(traffic_light()).run_to_stable().unwrap();
    assert_eq!(snap.node("*").unwrap().kind, ElementKind::InitialState);
    assert_eq!(snap.node("*").unwrap().width, 30.0);

    let choice = snap.node("c.t1").unwrap();
    assert_eq!(choice.kind, ElementKind::Choice);
    assert_eq!((choice.width, choice.height), (45.0, 60.0));
    assert!(snap.node("t.p.t1.c.t1").is_some());
    assert!(snap.node("t.t1.Green").is_some());
    assert!(snap.node("t.t5.Amber").is_some());
    assert_eq!(snap.node("Amber").unwrap().width, 90.0);

    for n in &snap.nodes {
        assert!(n.x.is_finite() && n.y.is_finite(), "{} at {},{}", n.id, n.x, n.y);
    }
}

#[test]
fn disabled_clustering_keeps_transitions_direct() {
    let config = LayoutConfig {
        cluster_transitions: false,
        ..Default::default()
    };
    let mut layout = StateLayout::new(traffic_light(), config, clock()).unwrap();
    let snap = layout.run_to_stable().unwrap();
    assert!(snap.nodes.iter().all(|n| n.kind != ElementKind::Choice));
    assert!(snap.node("t.t2.Amber").is_some());
}

#[test]
fn isolated_states_converge() {
    let chart = StateChart::new(
        (0..5).map(|i| State::new(format!("s{i}"))).collect(),
        Vec::new(),
    );
    let snap = layout(chart).run_to_stable().unwrap();
    assert_eq!(snap.phase, Phase::Stable);
    for (i, a) in snap.nodes.iter().enumerate() {
        for b in &snap.nodes[i + 1..] {
            assert!(distance((a.x, a.y), (b.x, b.y)) > 0.0);
        }
    }
}

#[test]
fn phases_advance_forward_only() {
    let config = LayoutConfig {
        slice_ms: 5,
        ..Default::default()
    };
    let mut layout = StateLayout::new(traffic_light(), config, clock()).unwrap();
    let order = [Phase::Simple, Phase::NoSelf, Phase::Full, Phase::Stable];

    let mut last = (0, 0u8);
    for _ in 0..100_000 {
        let p = layout.step().unwrap();
        let rank = order.iter().position(|&ph| ph == p.phase).unwrap();
        assert!(rank >= last.0, "went back from {:?} to {:?}", order[last.0], p.phase);
        if rank == last.0 && p.phase != Phase::Stable {
            assert!(p.stability >= last.1, "stability dropped within {:?}", p.phase);
        }
        last = (rank, p.stability);
        if p.phase == Phase::Stable {
            return;
        }
    }
    panic!("layout never became stable");
}

#[test]
fn spent_phase_budget_moves_on() {
    let config = LayoutConfig {
        phase_budget_ms: 1,
        ..Default::default()
    };
    let mut layout = StateLayout::new(traffic_light(), config, clock()).unwrap();
    let progress = layout.step().unwrap();
    assert_eq!(progress.phase, Phase::Stable);
}

#[test]
fn abort_before_the_first_step_freezes_the_coarse_layout() {
    let mut layout = layout(traffic_light());
    layout.abort();
    let progress = layout.step().unwrap();
    assert_eq!(progress.phase, Phase::Stable);
    assert_eq!(layout.iterations(), 0);

    // Only states and the choice exist in the coarse phase.
    let snap = layout.snapshot();
    assert_eq!(snap.nodes.len(), 5);
    assert!(snap.nodes.iter().all(|n| n.kind != ElementKind::Transition));

    layout.resume();
    assert!(layout.is_aborted(), "a stable layout stays aborted");
}

#[test]
fn resume_withdraws_a_pending_abort() {
    let mut layout = layout(traffic_light());
    layout.abort();
    layout.resume();
    let snap = layout.run_to_stable().unwrap();
    assert!(snap.node("t.t5.Amber").is_some());
}

#[test]
fn dragging_a_stable_layout_settles_again() {
    let mut layout = layout(traffic_light());
    layout.run_to_stable().unwrap();
    let before = layout.iterations();

    let amber = layout.snapshot().node("Amber").cloned().unwrap();
    layout.drag("Amber", amber.x + 300.0, amber.y - 150.0).unwrap();
    assert!(layout.is_settling());

    let snap = layout.run_to_stable().unwrap();
    assert!(!layout.is_settling());
    assert!(layout.iterations() > before);
    assert_eq!(snap.phase, Phase::Stable);
}

#[test]
fn drag_carries_self_loops_along() {
    let mut layout = layout(traffic_light());
    let snap = layout.run_to_stable().unwrap();
    let amber = snap.node("Amber").unwrap();
    let blink = snap.node("t.t5.Amber").unwrap();
    let offset = (blink.x - amber.x, blink.y - amber.y);

    layout.drag("Amber", amber.x + 300.0, amber.y - 150.0).unwrap();
    let moved = layout.snapshot();
    let amber2 = moved.node("Amber").unwrap();
    let blink2 = moved.node("t.t5.Amber").unwrap();
    assert!((amber2.x - amber.x - 300.0).abs() < 1e-9);
    assert!(((blink2.x - amber2.x) - offset.0).abs() < 1e-9);
    assert!(((blink2.y - amber2.y) - offset.1).abs() < 1e-9);
}

#[test]
fn drag_of_unknown_element_fails() {
    let mut layout = layout(traffic_light());
    assert!(matches!(
        layout.drag("Red", 0.0, 0.0),
        Err(Error::UnknownElement { .. })
    ));
    layout.run_to_stable().unwrap();
    let err = layout.drag("Purple", 0.0, 0.0).unwrap_err();
    assert!(matches!(err, Error::UnknownElement { ref id } if id == "Purple"));
}

#[test]
fn non_finite_drag_is_rejected() {
    let mut layout = layout(traffic_light());
    let before = layout.run_to_stable().unwrap();

    for (x, y) in [(f64::NAN, 0.0), (0.0, f64::INFINITY), (f64::NEG_INFINITY, 1.0)] {
        let err = layout.drag("Red", x, y).unwrap_err();
        assert!(matches!(err, Error::NonFinitePosition { ref id, .. } if id == "Red"), "{err}");
    }
    assert!(!layout.is_settling());
    assert_eq!(layout.snapshot(), before);
}

#[test]
fn degenerate_state_size_is_rejected() {
    let chart = StateChart::new(vec![State::new("a").with_size(f64::NAN, 40.0)], Vec::new());
    let err = StateLayout::new(chart, LayoutConfig::default(), clock())
        .err()
        .unwrap();
    assert!(matches!(err, Error::InvalidSize { .. }), "{err}");
}

#[test]
fn invalid_chart_is_rejected() {
    let chart = StateChart::new(
        vec![State::new("a")],
        vec![Transition::new("t0", "a", "nowhere")],
    );
    let err = StateLayout::new(chart, LayoutConfig::default(), clock())
        .err()
        .unwrap();
    assert!(matches!(err, Error::UnknownState { .. }), "{err}");
}

#[test]
fn snapshot_serializes_for_renderers() {
    let snap = layout(traffic_light()).run_to_stable().unwrap();
    let json = serde_json::to_value(&snap).unwrap();
    assert_eq!(json["phase"], "stable");
    assert_eq!(json["nodes"][0]["kind"], "initial-state");
    assert!(json["edges"][0].get("selfLoop").is_some());
}
