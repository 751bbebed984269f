use crate::config::PhysicsConfig;
use crate::error::{Error, Result};
use crate::geom::{Point, Vector, point};
use crate::physics::{Edge, Node};
use crate::quadtree::QuadTree;
use crate::rng::XorShift64Star;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Nodes, springs and the spatial index of one layout run.
///
/// The graph owns everything it simulates. Positions change only through [`Graph::update`] and
/// [`Graph::place`], both of which keep the quad-tree in sync.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    incident: Vec<Vec<usize>>,
    id_to_idx: FxHashMap<String, usize>,
    tree: QuadTree,
    config: PhysicsConfig,
    rng: XorShift64Star,
    dt: f64,
    energy: f64,
    max_distance: u32,
}

impl Graph {
    /// Resolves edge endpoints, precomputes bounded graph distances and places the nodes on a
    /// circle ordered by their distance to the most eccentric node.
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>, config: PhysicsConfig) -> Result<Self> {
        config.validate()?;

        let mut nodes = nodes;
        let mut id_to_idx: FxHashMap<String, usize> = FxHashMap::default();
        id_to_idx.reserve(nodes.len());
        for (idx, n) in nodes.iter_mut().enumerate() {
            n.index = idx;
            if id_to_idx.insert(n.id.clone(), idx).is_some() {
                return Err(Error::DuplicateNode { id: n.id.clone() });
            }
        }

        let mut edges = edges;
        let mut incident: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for (idx, e) in edges.iter_mut().enumerate() {
            let lookup = |id: &str| {
                id_to_idx.get(id).copied().ok_or_else(|| Error::MissingEndpoint {
                    edge: format!("{} -> {}", e.from, e.to),
                    node: id.to_string(),
                })
            };
            let a = lookup(&e.from)?;
            let b = lookup(&e.to)?;
            e.from_index = a;
            e.to_index = b;
            incident[a].push(idx);
            if a != b {
                incident[b].push(idx);
            }
        }

        let rng = XorShift64Star::new(config.seed);
        let mut graph = Self {
            nodes,
            edges,
            incident,
            id_to_idx,
            tree: QuadTree::new(config.quad_min_size),
            dt: config.initial_dt,
            energy: 1.0,
            max_distance: 0,
            config,
            rng,
        };
        graph.set_distances();
        graph.initial_layout();
        for (idx, n) in graph.nodes.iter().enumerate() {
            graph.tree.insert(idx, n.position);
        }
        tracing::debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            max_distance = graph.max_distance,
            "graph constructed"
        );
        Ok(graph)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    pub fn lookup(&self, id: &str) -> Option<usize> {
        self.id_to_idx.get(id).copied()
    }

    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.lookup(id).map(|idx| &self.nodes[idx])
    }

    pub fn tree(&self) -> &QuadTree {
        &self.tree
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Mean kinetic energy per node after the last [`Graph::update`].
    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Largest hop count between any two nodes, within the distance limit.
    pub fn max_distance(&self) -> u32 {
        self.max_distance
    }

    pub fn graph_distance(&self, a: usize, b: usize) -> u32 {
        self.nodes[a].graph_distance(b, self.config.distance_limit)
    }

    /// Moves node `idx` to `pos` and refreshes its quad-tree leaf.
    pub fn place(&mut self, idx: usize, pos: Point) {
        self.nodes[idx].position = pos;
        self.tree.relocate(idx, pos);
    }

    /// Resets the adaptive time step, e.g. after a node was dragged.
    pub fn restart(&mut self) {
        self.dt = self.config.initial_dt;
    }

    /// One synchronous integration step. Returns the mean kinetic energy per node.
    pub fn update(&mut self) -> f64 {
        if self.nodes.is_empty() {
            self.energy = 0.0;
            return self.energy;
        }

        let nodes = &self.nodes;
        let edges = &self.edges;
        let tree = &self.tree;
        let cfg = &self.config;
        let rng = &mut self.rng;

        let mut forces: Vec<Vector> = Vec::with_capacity(nodes.len());
        let mut others: Vec<usize> = Vec::new();
        for (i, node) in nodes.iter().enumerate() {
            let mut force = Vector::zero();
            others.clear();
            tree.query(node.position, cfg.query_radius, &mut others);
            for &j in &others {
                if j != i {
                    force += node.repel(&nodes[j], cfg, rng);
                }
            }
            for &e in &self.incident[i] {
                let edge = &edges[e];
                if let Some(other) = edge.other_end(i) {
                    force += node.attract(&nodes[other], edge, rng);
                }
            }
            forces.push(force);
        }

        // Integrate only after every force is known.
        let mut kinetic = 0.0;
        for (i, force) in forces.into_iter().enumerate() {
            let node = &mut self.nodes[i];
            node.force = force;
            node.update_physics(self.dt, self.config.velocity_decay);
            kinetic += node.kinetic_energy();
            self.tree.relocate(i, node.position);
        }

        self.energy = kinetic / self.nodes.len() as f64;
        self.dt *= if self.energy < 1.0 {
            self.energy
        } else {
            self.config.dt_decay
        };
        self.energy
    }

    /// Bounded breadth-first search from every node.
    fn set_distances(&mut self) {
        let limit = self.config.distance_limit;
        let n = self.nodes.len();
        let mut visited = vec![false; n];
        let mut front: VecDeque<(usize, u32)> = VecDeque::new();
        let mut max_distance = 0;

        for source in 0..n {
            visited.iter_mut().for_each(|v| *v = false);
            let mut distances: FxHashMap<usize, u32> = FxHashMap::default();
            distances.insert(source, 0);
            visited[source] = true;
            front.clear();
            front.push_back((source, 0));

            while let Some((cur, dist)) = front.pop_front() {
                if dist >= limit {
                    continue;
                }
                for &e in &self.incident[cur] {
                    let Some(next) = self.edges[e].other_end(cur) else {
                        continue;
                    };
                    if !visited[next] {
                        visited[next] = true;
                        distances.insert(next, dist + 1);
                        max_distance = max_distance.max(dist + 1);
                        front.push_back((next, dist + 1));
                    }
                }
            }
            self.nodes[source].distances = distances;
        }
        self.max_distance = max_distance;
    }

    /// Places nodes on a circle of radius `10·√n`, by angle proportional to their distance
    /// from the first node that attains the maximum distance.
    fn initial_layout(&mut self) {
        let Some(start) = self
            .nodes
            .iter()
            .position(|n| n.distances.values().any(|&d| d == self.max_distance))
        else {
            return;
        };
        let r = 10.0 * (self.nodes.len() as f64).sqrt();
        let span = f64::from(self.max_distance) + 1.0;
        let limit = self.config.distance_limit;
        let from_start: Vec<u32> = (0..self.nodes.len())
            .map(|idx| self.nodes[start].graph_distance(idx, limit))
            .collect();
        for (node, d) in self.nodes.iter_mut().zip(from_start) {
            let a = std::f64::consts::TAU * f64::from(d) / span;
            node.position = point(r * (1.0 + a.cos()), r * (1.0 + a.sin()));
        }
    }
}
