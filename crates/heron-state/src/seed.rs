//! Carrying a converged phase over into the next, finer one.

use crate::config::LayoutConfig;
use crate::diagram::{Diagram, ElementKind};
use heron::{Point, point};
use std::f64::consts::TAU;

fn scaled(p: Point, factor: f64) -> Point {
    point(p.x * factor, p.y * factor)
}

/// Copies the position of every element of `next` selected by `keep` from the element with the
/// same id in `prev`, scaled by `factor`.
fn copy_scaled(
    prev: &Diagram,
    next: &mut Diagram,
    factor: f64,
    keep: impl Fn(ElementKind, bool) -> bool,
) {
    for idx in 0..next.elements().len() {
        let e = &next.elements()[idx];
        if !keep(e.kind, e.self_loop) {
            continue;
        }
        if let Some(old) = prev.index_of(&e.id) {
            let p = scaled(prev.position(old), factor);
            next.place(idx, p);
        }
    }
}

/// Coarse to no-self: states spread out, transition boxes start halfway along their transition.
pub fn no_self(prev: &Diagram, next: &mut Diagram, config: &LayoutConfig) {
    copy_scaled(prev, next, config.no_self_seed_scale, |kind, _| kind.is_state_like());
    for idx in 0..next.elements().len() {
        if let Some((from, to)) = next.elements()[idx].ends {
            let p = next.position(from).lerp(next.position(to), 0.5);
            next.place(idx, p);
        }
    }
}

/// No-self to full: everything known spreads out again; self-loops ring their state and their
/// waypoints sit evenly along each connector.
pub fn full(prev: &Diagram, next: &mut Diagram, config: &LayoutConfig) {
    copy_scaled(prev, next, config.full_seed_scale, |kind, self_loop| {
        kind.is_state_like() || (kind == ElementKind::Transition && !self_loop)
    });

    for owner in 0..next.elements().len() {
        let loops: Vec<usize> = next
            .self_set(owner)
            .iter()
            .copied()
            .filter(|&i| next.elements()[i].kind == ElementKind::Transition)
            .collect();
        if loops.is_empty() {
            continue;
        }
        let center = next.position(owner);
        let step = TAU / loops.len() as f64;
        for (i, idx) in loops.into_iter().enumerate() {
            let a = step * i as f64;
            let p = point(
                center.x + a.cos() * config.self_loop_radius,
                center.y + a.sin() * config.self_loop_radius,
            );
            next.place(idx, p);
        }
    }

    let placements: Vec<(usize, Point)> = next
        .connections()
        .iter()
        .flat_map(|c| {
            let (a, b) = (next.position(c.from), next.position(c.to));
            let k = c.waypoints.len() as f64;
            c.waypoints
                .iter()
                .enumerate()
                .map(move |(j, &wp)| (wp, a.lerp(b, (j as f64 + 1.0) / (k + 1.0))))
        })
        .collect();
    for (idx, p) in placements {
        next.place(idx, p);
    }
}

#[cfg(test)]
mod tests {
    use super::{full, no_self};
    use crate::cluster::unclustered;
    use crate::config::LayoutConfig;
    use crate::diagram::{Detail, Diagram};
    use crate::model::{State, Transition};
    use heron::point;

    fn diagrams() -> (Diagram, Diagram, Diagram) {
        let states = vec![State::new("A"), State::new("B")];
        let transitions = vec![
            Transition::new("t0", "A", "B"),
            Transition::new("t1", "A", "A"),
            Transition::new("t2", "A", "A"),
        ];
        let clusters = unclustered(&transitions);
        let cfg = LayoutConfig::default();
        let d = |detail| Diagram::build(&states, &clusters, detail, &cfg).unwrap();
        (d(Detail::Coarse), d(Detail::NoSelf), d(Detail::Full))
    }

    #[test]
    fn no_self_scales_states_and_centres_transitions() {
        let (mut coarse, mut no_self_d, _) = diagrams();
        coarse.place(0, point(10.0, 20.0));
        coarse.place(1, point(30.0, -5.0));
        no_self(&coarse, &mut no_self_d, &LayoutConfig::default());

        assert_eq!(no_self_d.position(0), point(20.0, 40.0));
        assert_eq!(no_self_d.position(1), point(60.0, -10.0));
        let t = no_self_d.index_of("t.t0.B").unwrap();
        assert_eq!(no_self_d.position(t), point(40.0, 15.0));
    }

    #[test]
    fn full_rings_self_loops_around_their_state() {
        let (_, mut no_self_d, mut full_d) = diagrams();
        no_self_d.place(0, point(100.0, 100.0));
        let t0 = no_self_d.index_of("t.t0.B").unwrap();
        no_self_d.place(t0, point(150.0, 120.0));
        full(&no_self_d, &mut full_d, &LayoutConfig::default());

        let a = full_d.position(0);
        assert_eq!(a, point(200.0, 200.0));
        assert_eq!(full_d.position(full_d.index_of("t.t0.B").unwrap()), point(300.0, 240.0));

        let l1 = full_d.position(full_d.index_of("t.t1.A").unwrap());
        let l2 = full_d.position(full_d.index_of("t.t2.A").unwrap());
        assert!(((l1 - a).length() - 10.0).abs() < 1e-9);
        assert!(((l2 - a).length() - 10.0).abs() < 1e-9);
        assert!((l1 - l2).length() > 19.0, "two loops sit opposite each other");

        let wp = full_d.position(full_d.index_of("A.0.t.t1.A").unwrap());
        assert!(((wp - a).length() - 5.0).abs() < 1e-9);
    }
}
