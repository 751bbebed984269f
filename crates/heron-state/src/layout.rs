//! Staged refinement: a coarse layout seeds a layout with transition boxes, which seeds the
//! complete one.
//!
//! The layout is step-driven. Each [`StateLayout::step`] integrates until the next deadline, a
//! whole number of slices past the start, and moves on to the next phase once the current one
//! is stable or has spent its budget.

use crate::clock::{Clock, SystemClock};
use crate::cluster::{Cluster, cluster_transitions, unclustered};
use crate::config::LayoutConfig;
use crate::diagram::{Detail, Diagram};
use crate::error::{Error, Result};
use crate::model::{State, StateChart};
use crate::seed;
use crate::snapshot::LayoutSnapshot;
use heron::point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    None,
    Simple,
    NoSelf,
    Full,
    Stable,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Simple => "simple",
            Self::NoSelf => "no-self",
            Self::Full => "full",
            Self::Stable => "stable",
        })
    }
}

/// Outcome of one [`StateLayout::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub phase: Phase,
    pub stability: u8,
    /// Graph updates run during this call.
    pub iterations: u64,
    pub settling: bool,
}

type Seeder = fn(&Diagram, &mut Diagram, &LayoutConfig);

struct PhasePlan {
    phase: Phase,
    detail: Detail,
    seed: Option<Seeder>,
    accuracy: fn(&Diagram, &LayoutConfig) -> f64,
}

fn coarse_accuracy(_: &Diagram, config: &LayoutConfig) -> f64 {
    config.simple_accuracy
}

fn per_node_accuracy(diagram: &Diagram, config: &LayoutConfig) -> f64 {
    config.accuracy_per_node * diagram.sd_node_count() as f64
}

static PLAN: [PhasePlan; 3] = [
    PhasePlan {
        phase: Phase::Simple,
        detail: Detail::Coarse,
        seed: None,
        accuracy: coarse_accuracy,
    },
    PhasePlan {
        phase: Phase::NoSelf,
        detail: Detail::NoSelf,
        seed: Some(seed::no_self),
        accuracy: per_node_accuracy,
    },
    PhasePlan {
        phase: Phase::Full,
        detail: Detail::Full,
        seed: Some(seed::full),
        accuracy: per_node_accuracy,
    },
];

/// The diagram of the phase in progress and its convergence bookkeeping.
struct Stage {
    plan: usize,
    diagram: Diagram,
    accuracy: f64,
    /// Highest energy seen; `None` until the first update.
    max_energy: Option<f64>,
    started: Duration,
}

/// `floor((1 - ln(acc/E) / min(ln(acc/Emax), ln(acc/E))) * 100)`, clamped to `0..=100`.
fn stability(accuracy: f64, energy: f64, max_energy: f64) -> u8 {
    if energy <= accuracy {
        return 100;
    }
    let log_en = (accuracy / energy).ln();
    let min_en = (accuracy / max_energy).ln().min(log_en);
    let pct = ((1.0 - log_en / min_en) * 100.0).floor();
    if pct.is_nan() {
        0
    } else {
        pct.clamp(0.0, 100.0) as u8
    }
}

pub struct StateLayout<C: Clock = SystemClock> {
    states: Vec<State>,
    clusters: Vec<Cluster>,
    config: LayoutConfig,
    clock: C,
    phase: Phase,
    stage: Option<Stage>,
    stability: u8,
    deadline: Duration,
    iterations: u64,
    aborted: bool,
    settling: bool,
    refused: bool,
}

impl StateLayout<SystemClock> {
    pub fn with_system_clock(chart: StateChart, config: LayoutConfig) -> Result<Self> {
        Self::new(chart, config, SystemClock::new())
    }
}

impl<C: Clock> StateLayout<C> {
    /// Validates the chart and configuration. Charts above the node limit are refused: the
    /// layout is stable at once and shows a single warning state.
    pub fn new(chart: StateChart, config: LayoutConfig, clock: C) -> Result<Self> {
        config.validate()?;
        chart.validate()?;

        let node_count = chart.node_count();
        let refused = node_count > config.node_limit;
        let (states, clusters) = if refused {
            tracing::warn!(
                nodes = node_count,
                limit = config.node_limit,
                "refusing to lay out state diagram"
            );
            let warning = format!(
                "more than {} nodes\n\ncowardly refusing to\ndraw state diagram",
                config.node_limit
            );
            let placeholder = State::new("0").with_payload(serde_json::Value::String(warning));
            (vec![placeholder], Vec::new())
        } else if config.cluster_transitions {
            (chart.states, cluster_transitions(&chart.transitions))
        } else {
            (chart.states, unclustered(&chart.transitions))
        };

        let mut layout = Self {
            states,
            clusters,
            config,
            clock,
            phase: Phase::None,
            stage: None,
            stability: 0,
            deadline: Duration::ZERO,
            iterations: 0,
            aborted: false,
            settling: false,
            refused,
        };
        if refused {
            layout.show_placeholder()?;
        }
        Ok(layout)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stability(&self) -> u8 {
        self.stability
    }

    /// Graph updates across all phases since construction or the last reset.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn is_refused(&self) -> bool {
        self.refused
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// A drag in the stable phase is still being absorbed.
    pub fn is_settling(&self) -> bool {
        self.settling
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn diagram(&self) -> Option<&Diagram> {
        self.stage.as_ref().map(|s| &s.diagram)
    }

    /// Runs the layout until the next deadline.
    pub fn step(&mut self) -> Result<Progress> {
        let before = self.iterations;
        let now = self.clock.now();
        if self.phase == Phase::None {
            self.deadline = now;
            self.enter(0)?;
        }
        while self.deadline <= now {
            self.deadline += self.config.slice();
        }

        if self.phase == Phase::Stable {
            if self.settling {
                self.settle();
            }
            return Ok(self.progress(before));
        }

        loop {
            if self.aborted {
                self.finish();
                break;
            }
            self.stabilize();
            let Some(stage) = &self.stage else {
                break;
            };
            let spent =
                self.clock.now().saturating_sub(stage.started) >= self.config.phase_budget();
            if self.stability < 100 && !spent {
                break;
            }
            if spent && self.stability < 100 {
                tracing::debug!(
                    phase = %self.phase,
                    stability = self.stability,
                    "phase budget spent"
                );
            }
            let next = stage.plan + 1;
            if next < PLAN.len() {
                self.enter(next)?;
            } else {
                self.finish();
                break;
            }
        }
        Ok(self.progress(before))
    }

    /// Steps until the layout is stable and no drag is being absorbed.
    pub fn run_to_stable(&mut self) -> Result<LayoutSnapshot> {
        loop {
            let progress = self.step()?;
            if progress.phase == Phase::Stable && !progress.settling {
                return Ok(self.snapshot());
            }
        }
    }

    /// Freezes the layout at the next step, skipping any remaining phases.
    pub fn abort(&mut self) {
        self.aborted = true;
        self.settling = false;
    }

    /// Withdraws an abort that has not taken effect yet.
    pub fn resume(&mut self) {
        if self.phase != Phase::Stable {
            self.aborted = false;
        }
    }

    /// Drops all progress; the next step starts over from the coarse phase.
    pub fn reset(&mut self) -> Result<()> {
        self.phase = Phase::None;
        self.stage = None;
        self.stability = 0;
        self.deadline = Duration::ZERO;
        self.iterations = 0;
        self.aborted = false;
        self.settling = false;
        if self.refused {
            self.show_placeholder()?;
        }
        Ok(())
    }

    /// Moves element `id` so that its centre is at `(x, y)`. States take their self-loops along.
    pub fn drag(&mut self, id: &str, x: f64, y: f64) -> Result<()> {
        if !x.is_finite() || !y.is_finite() {
            return Err(Error::NonFinitePosition {
                id: id.to_string(),
                x,
                y,
            });
        }
        let stage = self
            .stage
            .as_mut()
            .ok_or_else(|| Error::UnknownElement { id: id.to_string() })?;
        let idx = stage
            .diagram
            .index_of(id)
            .ok_or_else(|| Error::UnknownElement { id: id.to_string() })?;
        stage.diagram.drag(idx, point(x, y));
        if self.phase == Phase::Stable && !self.aborted && !self.refused {
            self.settling = true;
        }
        Ok(())
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot::capture(self.phase, self.stability, self.refused, self.diagram())
    }

    fn progress(&self, before: u64) -> Progress {
        Progress {
            phase: self.phase,
            stability: self.stability,
            iterations: self.iterations - before,
            settling: self.settling,
        }
    }

    fn show_placeholder(&mut self) -> Result<()> {
        let diagram = Diagram::build(&self.states, &self.clusters, Detail::Full, &self.config)?;
        self.stage = Some(Stage {
            plan: PLAN.len() - 1,
            diagram,
            accuracy: 0.0,
            max_energy: None,
            started: Duration::ZERO,
        });
        self.phase = Phase::Stable;
        self.stability = 100;
        Ok(())
    }

    fn enter(&mut self, plan_idx: usize) -> Result<()> {
        let plan = &PLAN[plan_idx];
        let mut diagram = Diagram::build(&self.states, &self.clusters, plan.detail, &self.config)?;
        if let (Some(seed), Some(prev)) = (plan.seed, &self.stage) {
            seed(&prev.diagram, &mut diagram, &self.config);
        }
        let accuracy = (plan.accuracy)(&diagram, &self.config);
        tracing::debug!(
            phase = %plan.phase,
            nodes = diagram.graph().nodes().len(),
            edges = diagram.graph().edges().len(),
            accuracy,
            "phase graph built"
        );
        self.stage = Some(Stage {
            plan: plan_idx,
            diagram,
            accuracy,
            max_energy: None,
            started: self.clock.now(),
        });
        self.phase = plan.phase;
        self.stability = 0;
        Ok(())
    }

    fn stabilize(&mut self) {
        let Some(stage) = self.stage.as_mut() else {
            return;
        };
        let graph = stage.diagram.graph_mut();
        let accuracy = stage.accuracy;

        let mut max_energy = match stage.max_energy {
            Some(e) => e,
            None => {
                self.iterations += 1;
                graph.update()
            }
        };
        let mut result = 0;
        let mut slice_iterations = 0u64;
        let mut now = self.clock.now();
        while now < self.deadline && graph.energy() > accuracy {
            result = stability(accuracy, graph.energy(), max_energy);
            graph.update();
            slice_iterations += 1;
            max_energy = max_energy.max(graph.energy());
            now = self.clock.now();
        }
        stage.max_energy = Some(max_energy);
        self.iterations += slice_iterations;
        if graph.energy() <= accuracy {
            result = 100;
        }
        self.stability = self.stability.max(result);
        tracing::trace!(
            phase = %self.phase,
            iterations = slice_iterations,
            energy = graph.energy(),
            stability = self.stability,
            "stabilize"
        );
    }

    /// Absorbs a drag in the stable phase: at least one update, then on until the energy is
    /// back under the final phase's target or the deadline passes.
    fn settle(&mut self) {
        let Some(stage) = self.stage.as_mut() else {
            self.settling = false;
            return;
        };
        let graph = stage.diagram.graph_mut();
        loop {
            graph.update();
            self.iterations += 1;
            if graph.energy() <= stage.accuracy {
                self.settling = false;
                break;
            }
            if self.clock.now() >= self.deadline {
                break;
            }
        }
    }

    fn finish(&mut self) {
        self.phase = Phase::Stable;
        tracing::info!(
            iterations = self.iterations,
            aborted = self.aborted,
            stability = self.stability,
            "state diagram layout stable"
        );
    }
}
