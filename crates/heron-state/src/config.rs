use crate::error::{Error, Result};
use crate::model::Dimensions;
use heron::PhysicsConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters of the staged state-diagram layout.
///
/// Decoded with `#[serde(default)]`, so a host only spells out what it changes:
///
/// ```
/// let cfg = heron_state::LayoutConfig::from_json(r#"{ "nodeLimit": 100 }"#).unwrap();
/// assert_eq!(cfg.node_limit, 100);
/// assert_eq!(cfg.edge_stiffness, 12.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub physics: PhysicsConfig,
    /// Charts with more states plus transitions than this are refused.
    pub node_limit: usize,
    /// Energy target of the refined phases, per state, choice and transition.
    pub accuracy_per_node: f64,
    /// Energy target of the coarse phase.
    pub simple_accuracy: f64,
    pub no_self_seed_scale: f64,
    pub full_seed_scale: f64,
    /// Distance of seeded self-loop transitions from their state.
    pub self_loop_radius: f64,
    /// Rest length of the single edge standing for all transitions between two states.
    pub coarse_edge_length: f64,
    /// Rest length of a connection, shared among its segments.
    pub edge_length: f64,
    /// Stiffness of one connection; coarse edges add this once per transition they stand for.
    pub edge_stiffness: f64,
    pub state_mass: f64,
    pub state_charge: f64,
    pub transition_mass: f64,
    pub transition_charge: f64,
    pub waypoint_mass: f64,
    pub waypoint_charge: f64,
    pub state_size: Dimensions,
    pub transition_size: Dimensions,
    pub initial_state_size: Dimensions,
    pub choice_size: Dimensions,
    /// Granularity of the per-call deadline.
    pub slice_ms: u64,
    /// Wall-clock budget of each phase before moving on unconverged.
    pub phase_budget_ms: u64,
    /// Factor shared trigger and action prefixes into choice pseudo-states.
    pub cluster_transitions: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            node_limit: 4000,
            accuracy_per_node: 0.001,
            simple_accuracy: 1.0,
            no_self_seed_scale: 2.0,
            full_seed_scale: 2.0,
            self_loop_radius: 10.0,
            coarse_edge_length: 40.0,
            edge_length: 2.0,
            edge_stiffness: 12.0,
            state_mass: 4.0,
            state_charge: 6.0,
            transition_mass: 2.0,
            transition_charge: 3.0,
            waypoint_mass: 0.3,
            waypoint_charge: 3.0,
            state_size: Dimensions::new(120.0, 48.0),
            transition_size: Dimensions::new(80.0, 28.0),
            initial_state_size: Dimensions::new(30.0, 30.0),
            choice_size: Dimensions::new(45.0, 60.0),
            slice_ms: 1000,
            phase_budget_ms: 30_000,
            cluster_transitions: true,
        }
    }
}

impl LayoutConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.physics.validate()?;
        for (field, value) in [
            ("accuracyPerNode", self.accuracy_per_node),
            ("simpleAccuracy", self.simple_accuracy),
            ("noSelfSeedScale", self.no_self_seed_scale),
            ("fullSeedScale", self.full_seed_scale),
            ("selfLoopRadius", self.self_loop_radius),
            ("coarseEdgeLength", self.coarse_edge_length),
            ("edgeLength", self.edge_length),
            ("edgeStiffness", self.edge_stiffness),
            ("stateMass", self.state_mass),
            ("stateCharge", self.state_charge),
            ("transitionMass", self.transition_mass),
            ("transitionCharge", self.transition_charge),
            ("waypointMass", self.waypoint_mass),
            ("waypointCharge", self.waypoint_charge),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfig {
                    field,
                    reason: format!("expected a finite positive number, got {value}"),
                });
            }
        }
        for (field, size) in [
            ("stateSize", self.state_size),
            ("transitionSize", self.transition_size),
            ("initialStateSize", self.initial_state_size),
            ("choiceSize", self.choice_size),
        ] {
            if !size.is_valid() {
                return Err(Error::InvalidConfig {
                    field,
                    reason: format!("expected a positive size, got {}x{}", size.width, size.height),
                });
            }
        }
        if self.slice_ms == 0 {
            return Err(Error::InvalidConfig {
                field: "sliceMs",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn slice(&self) -> Duration {
        Duration::from_millis(self.slice_ms)
    }

    pub fn phase_budget(&self) -> Duration {
        Duration::from_millis(self.phase_budget_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::LayoutConfig;
    use crate::error::Error;

    #[test]
    fn defaults_validate() {
        LayoutConfig::default().validate().unwrap();
    }

    #[test]
    fn nested_physics_overrides_merge_with_defaults() {
        let cfg = LayoutConfig::from_json(
            r#"{ "physics": { "seed": 7 }, "sliceMs": 16, "clusterTransitions": false }"#,
        )
        .unwrap();
        assert_eq!(cfg.physics.seed, 7);
        assert_eq!(cfg.physics.coulomb, 10_000.0);
        assert_eq!(cfg.slice_ms, 16);
        assert!(!cfg.cluster_transitions);
        assert_eq!(cfg.node_limit, 4000);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = LayoutConfig::from_json("{ nodeLimit: 3 ").unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{err}");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = LayoutConfig::from_json(r#"{ "edgeLength": -1 }"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { field: "edgeLength", .. }));

        let err = LayoutConfig::from_json(r#"{ "physics": { "velocityDecay": 2 } }"#).unwrap_err();
        assert!(matches!(err, Error::Layout(_)), "{err}");
    }
}
