//! Turns a clustered chart into the physics graph of one layout phase.
//!
//! Every diagram element (state, choice, transition box, connector waypoint) is one
//! [`heron::Node`]; elements and graph nodes share indices and ids. Connectors between
//! elements are chains of springs: a connection with `k` waypoints has `k + 1` segments.

use crate::cluster::Cluster;
use crate::config::LayoutConfig;
use crate::error::{Error, Result};
use crate::model::{Dimensions, State, Transition};
use heron::{Edge, Graph, Node, Point};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Reference extents for scaling charges by rendered size.
const STATE_CHARGE_EXTENT: f64 = 128.0;
const TRANSITION_CHARGE_EXTENT: f64 = 250.0;

/// How much of the chart a diagram simulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
    /// States and choices only, one coarse spring per connected pair.
    Coarse,
    /// Transition boxes for every transition except self-loops.
    NoSelf,
    /// Everything, with real element sizes.
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    InitialState,
    State,
    Choice,
    Transition,
    Waypoint,
}

impl ElementKind {
    /// States, the initial pseudo-state and choices.
    pub fn is_state_like(self) -> bool {
        matches!(self, Self::InitialState | Self::State | Self::Choice)
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    pub id: String,
    pub kind: ElementKind,
    /// Rendered size, independent of the size the phase simulates.
    pub size: Dimensions,
    pub payload: Option<serde_json::Value>,
    /// Source and target element of a transition box.
    pub ends: Option<(usize, usize)>,
    /// A self-loop transition box, or a waypoint on one of its connectors.
    pub self_loop: bool,
}

#[derive(Debug, Clone)]
pub struct Connection {
    pub from: usize,
    pub to: usize,
    pub waypoints: Vec<usize>,
    /// Graph edge indices, from the source end onwards.
    pub segments: Range<usize>,
    pub self_loop: bool,
}

/// A connection before its waypoints and segments exist.
#[derive(Debug, Clone)]
struct Link {
    from: usize,
    to: usize,
    waypoints: usize,
    length: f64,
    stiffness: f64,
}

#[derive(Debug, Clone)]
pub struct Diagram {
    detail: Detail,
    elements: Vec<Element>,
    connections: Vec<Connection>,
    /// Self-loop elements that follow a state when it is dragged.
    self_sets: FxHashMap<usize, Vec<usize>>,
    graph: Graph,
}

impl Diagram {
    pub fn build(
        states: &[State],
        clusters: &[Cluster],
        detail: Detail,
        config: &LayoutConfig,
    ) -> Result<Self> {
        let mut builder = Builder::new(detail, config);
        for s in states {
            let (kind, size) = if s.is_initial() {
                (ElementKind::InitialState, config.initial_state_size)
            } else {
                (ElementKind::State, s.size.unwrap_or(config.state_size))
            };
            builder.push(Element {
                id: s.id.clone(),
                kind,
                size,
                payload: s.payload.clone(),
                ends: None,
                self_loop: false,
            });
        }
        for id in Cluster::choice_ids(clusters) {
            builder.push(Element {
                id: id.to_string(),
                kind: ElementKind::Choice,
                size: config.choice_size,
                payload: None,
                ends: None,
                self_loop: false,
            });
        }
        builder.walk(clusters)?;
        builder.finish()
    }

    pub fn detail(&self) -> Detail {
        self.detail
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.graph.lookup(id)
    }

    pub fn position(&self, idx: usize) -> Point {
        self.graph.node(idx).position
    }

    /// States, choices and transition boxes; waypoints do not count.
    pub fn sd_node_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| e.kind != ElementKind::Waypoint)
            .count()
    }

    pub fn self_set(&self, idx: usize) -> &[usize] {
        self.self_sets.get(&idx).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn place(&mut self, idx: usize, pos: Point) {
        self.graph.place(idx, pos);
    }

    /// Moves element `idx` to `pos`, carrying its self-loop set along, and restarts the clock of
    /// the simulation so the neighbourhood reacts.
    pub fn drag(&mut self, idx: usize, pos: Point) {
        let delta = pos - self.position(idx);
        self.graph.place(idx, pos);
        if let Some(set) = self.self_sets.get(&idx) {
            for &member in set {
                let p = self.graph.node(member).position + delta;
                self.graph.place(member, p);
            }
        }
        self.graph.restart();
    }
}

struct Builder<'a> {
    detail: Detail,
    config: &'a LayoutConfig,
    elements: Vec<Element>,
    index: FxHashMap<String, usize>,
    links: Vec<Link>,
}

impl<'a> Builder<'a> {
    fn new(detail: Detail, config: &'a LayoutConfig) -> Self {
        Self {
            detail,
            config,
            elements: Vec::new(),
            index: FxHashMap::default(),
            links: Vec::new(),
        }
    }

    fn push(&mut self, element: Element) -> usize {
        let idx = self.elements.len();
        if element.kind.is_state_like() {
            self.index.insert(element.id.clone(), idx);
        }
        self.elements.push(element);
        idx
    }

    fn endpoint(&self, t: &Transition, id: &str) -> Result<usize> {
        self.index.get(id).copied().ok_or_else(|| Error::UnknownState {
            transition: t.id.clone(),
            state: id.to_string(),
        })
    }

    fn walk(&mut self, clusters: &[Cluster]) -> Result<()> {
        for cluster in clusters {
            match cluster {
                Cluster::Plain(transitions) => {
                    for t in transitions {
                        self.transition(t)?;
                    }
                }
                Cluster::Choice {
                    common, clusters, ..
                } => {
                    self.transition(common)?;
                    self.walk(clusters)?;
                }
            }
        }
        Ok(())
    }

    fn transition(&mut self, t: &Transition) -> Result<()> {
        let from = self.endpoint(t, &t.from)?;
        let to = self.endpoint(t, &t.to)?;
        let (length, stiffness) = (self.config.edge_length, self.config.edge_stiffness);

        if self.elements[from].kind == ElementKind::InitialState {
            self.link(from, to, 0, length, stiffness);
            return Ok(());
        }

        match self.detail {
            Detail::Coarse => {
                if from != to {
                    self.coarse(from, to);
                }
            }
            Detail::NoSelf if from == to => {}
            Detail::NoSelf | Detail::Full => {
                let self_loop = from == to;
                let node = self.push(Element {
                    id: format!("t.{}.{}", t.id, t.to),
                    kind: ElementKind::Transition,
                    size: t.size.unwrap_or(self.config.transition_size),
                    payload: None,
                    ends: Some((from, to)),
                    self_loop,
                });
                let waypoints = usize::from(self_loop);
                self.link(from, node, waypoints, length, stiffness);
                self.link(node, to, waypoints, length, stiffness);
            }
        }
        Ok(())
    }

    /// One spring per unordered pair; every further transition stiffens it.
    fn coarse(&mut self, a: usize, b: usize) {
        let existing = self
            .links
            .iter_mut()
            .find(|l| (l.from == a && l.to == b) || (l.from == b && l.to == a));
        match existing {
            Some(link) => link.stiffness += self.config.edge_stiffness,
            None => self.link(
                a,
                b,
                0,
                self.config.coarse_edge_length,
                self.config.edge_stiffness,
            ),
        }
    }

    fn link(&mut self, from: usize, to: usize, waypoints: usize, length: f64, stiffness: f64) {
        self.links.push(Link {
            from,
            to,
            waypoints,
            length,
            stiffness,
        });
    }

    fn finish(mut self) -> Result<Diagram> {
        let mut connections = Vec::with_capacity(self.links.len());
        for link in std::mem::take(&mut self.links) {
            let self_loop = self.elements[link.from].self_loop || self.elements[link.to].self_loop;
            let k = link.waypoints;
            let from_id = self.elements[link.from].id.clone();
            let to_id = self.elements[link.to].id.clone();
            let waypoints: Vec<usize> = (0..k)
                .map(|i| {
                    let radius = 3.0 * (k - i) as f64 / (k + 1) as f64;
                    self.push(Element {
                        id: format!("{from_id}.{i}.{to_id}"),
                        kind: ElementKind::Waypoint,
                        size: Dimensions::new(2.0 * radius, 2.0 * radius),
                        payload: None,
                        ends: None,
                        self_loop,
                    })
                })
                .collect();
            connections.push((link, waypoints, self_loop));
        }

        let nodes: Vec<Node> = self.elements.iter().map(|e| self.node_for(e)).collect();

        let mut edges = Vec::new();
        let connections: Vec<Connection> = connections
            .into_iter()
            .map(|(link, waypoints, self_loop)| {
                let start = edges.len();
                let chain: Vec<usize> = std::iter::once(link.from)
                    .chain(waypoints.iter().copied())
                    .chain(std::iter::once(link.to))
                    .collect();
                let count = (waypoints.len() + 1) as f64;
                for pair in chain.windows(2) {
                    let (a, b) = (&nodes[pair[0]], &nodes[pair[1]]);
                    let length = if self.detail == Detail::Full && !waypoints.is_empty() {
                        ((a.width + a.height) / 4.0 + (b.width + b.height) / 4.0) / 2.0
                    } else {
                        link.length / count
                    };
                    edges.push(
                        Edge::new(a.id.clone(), b.id.clone())
                            .with_length(length)
                            .with_stiffness(link.stiffness),
                    );
                }
                Connection {
                    from: link.from,
                    to: link.to,
                    waypoints,
                    segments: start..edges.len(),
                    self_loop,
                }
            })
            .collect();

        let self_sets = self.self_sets(&connections);
        let graph = Graph::new(nodes, edges, self.config.physics.clone())?;
        tracing::debug!(
            detail = ?self.detail,
            elements = self.elements.len(),
            connections = connections.len(),
            "state diagram built"
        );
        Ok(Diagram {
            detail: self.detail,
            elements: self.elements,
            connections,
            self_sets,
            graph,
        })
    }

    fn node_for(&self, e: &Element) -> Node {
        let cfg = self.config;
        let full = self.detail == Detail::Full;
        let (w, h) = (e.size.width, e.size.height);
        let node = match e.kind {
            ElementKind::InitialState | ElementKind::Choice => {
                Node::new(&e.id).with_mass(cfg.state_mass).with_charge(cfg.state_charge)
            }
            ElementKind::State => {
                let charge = if full {
                    cfg.state_charge * w.max(h) / STATE_CHARGE_EXTENT
                } else {
                    cfg.state_charge
                };
                Node::new(&e.id).with_mass(cfg.state_mass).with_charge(charge)
            }
            ElementKind::Transition => {
                let charge = if full {
                    cfg.transition_charge * (w + h) / TRANSITION_CHARGE_EXTENT
                } else {
                    cfg.transition_charge
                };
                Node::new(&e.id).with_mass(cfg.transition_mass).with_charge(charge)
            }
            ElementKind::Waypoint => Node::new(&e.id)
                .with_mass(cfg.waypoint_mass)
                .with_charge(cfg.waypoint_charge),
        };
        if full { node.with_size(w, h) } else { node }
    }

    fn self_sets(&self, connections: &[Connection]) -> FxHashMap<usize, Vec<usize>> {
        let mut sets: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
        for (idx, e) in self.elements.iter().enumerate() {
            if e.kind == ElementKind::Transition && e.self_loop {
                if let Some((owner, _)) = e.ends {
                    sets.entry(owner).or_default().push(idx);
                }
            }
        }
        for c in connections.iter().filter(|c| c.self_loop) {
            let owner = if self.elements[c.from].kind.is_state_like() {
                c.from
            } else {
                c.to
            };
            if let Some(&first) = c.waypoints.first() {
                sets.entry(owner).or_default().push(first);
            }
        }
        sets
    }
}
