use crate::diagram::{Diagram, ElementKind};
use crate::layout::Phase;
use serde::{Deserialize, Serialize};

/// What a renderer needs to draw the current layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSnapshot {
    pub phase: Phase,
    /// Progress of the current phase, 0 to 100.
    pub stability: u8,
    /// The chart was too large and `nodes` holds the warning placeholder only.
    pub refused: bool,
    pub nodes: Vec<NodeLayout>,
    pub edges: Vec<EdgeLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLayout {
    pub id: String,
    pub kind: ElementKind,
    /// Centre.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeLayout {
    pub from: String,
    pub to: String,
    pub self_loop: bool,
}

impl LayoutSnapshot {
    pub(crate) fn capture(
        phase: Phase,
        stability: u8,
        refused: bool,
        diagram: Option<&Diagram>,
    ) -> Self {
        let Some(diagram) = diagram else {
            return Self {
                phase,
                stability,
                refused,
                nodes: Vec::new(),
                edges: Vec::new(),
            };
        };

        let nodes = diagram
            .elements()
            .iter()
            .zip(diagram.graph().nodes())
            .map(|(e, n)| NodeLayout {
                id: e.id.clone(),
                kind: e.kind,
                x: n.position.x,
                y: n.position.y,
                width: e.size.width,
                height: e.size.height,
                payload: e.payload.clone(),
            })
            .collect();

        let graph_edges = diagram.graph().edges();
        let edges = diagram
            .connections()
            .iter()
            .flat_map(|c| {
                graph_edges[c.segments.clone()].iter().map(|e| EdgeLayout {
                    from: e.from.clone(),
                    to: e.to.clone(),
                    self_loop: c.self_loop,
                })
            })
            .collect();

        Self {
            phase,
            stability,
            refused,
            nodes,
            edges,
        }
    }

    pub fn node(&self, id: &str) -> Option<&NodeLayout> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
