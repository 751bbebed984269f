//! Dynamic quad-tree over node indices.
//!
//! Cells live in an arena owned by the tree. Leaves hold node indices, and the tree remembers
//! which leaf holds each node, so relocating a node never needs a search from the root. The
//! tree grows by wrapping a twice-as-large root around the old one, and an emptied branch
//! collapses back into a leaf.

use crate::geom::{Point, Square, point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(usize);

#[derive(Debug, Clone)]
struct Cell {
    square: Square,
    parent: Option<CellId>,
    kind: CellKind,
}

#[derive(Debug, Clone)]
enum CellKind {
    Leaf(Vec<usize>),
    Branch([CellId; 4]),
}

#[derive(Debug, Clone)]
pub struct QuadTree {
    cells: Vec<Cell>,
    free: Vec<CellId>,
    root: CellId,
    min_size: f64,
    leaf_of: Vec<Option<CellId>>,
    len: usize,
}

impl QuadTree {
    /// An empty tree whose root is a single `min_size` leaf at the origin.
    pub fn new(min_size: f64) -> Self {
        Self::with_origin(point(0.0, 0.0), min_size)
    }

    pub fn with_origin(origin: Point, min_size: f64) -> Self {
        Self {
            cells: vec![Cell {
                square: Square::new(origin, min_size),
                parent: None,
                kind: CellKind::Leaf(Vec::new()),
            }],
            free: Vec::new(),
            root: CellId(0),
            min_size,
            leaf_of: Vec::new(),
            len: 0,
        }
    }

    pub fn root(&self) -> CellId {
        self.root
    }

    pub fn bounds(&self) -> Square {
        self.square(self.root)
    }

    pub fn square(&self, cell: CellId) -> Square {
        self.cells[cell.0].square
    }

    pub fn parent(&self, cell: CellId) -> Option<CellId> {
        self.cells[cell.0].parent
    }

    pub fn is_leaf(&self, cell: CellId) -> bool {
        matches!(self.cells[cell.0].kind, CellKind::Leaf(_))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The leaf currently holding node `id`.
    pub fn leaf_of(&self, id: usize) -> Option<CellId> {
        self.leaf_of.get(id).copied().flatten()
    }

    pub fn contains_node(&self, id: usize) -> bool {
        self.leaf_of(id).is_some()
    }

    /// Node indices stored directly in `cell` (empty for branches).
    pub fn nodes_in(&self, cell: CellId) -> &[usize] {
        match &self.cells[cell.0].kind {
            CellKind::Leaf(nodes) => nodes,
            CellKind::Branch(_) => &[],
        }
    }

    /// Number of leaves reachable from the root.
    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self.root];
        while let Some(cell) = stack.pop() {
            match &self.cells[cell.0].kind {
                CellKind::Leaf(_) => count += 1,
                CellKind::Branch(children) => stack.extend(children.iter().copied()),
            }
        }
        count
    }

    /// Places node `id` at `pos`, growing the tree if needed. Returns the (possibly new) root.
    ///
    /// Non-finite positions, and positions too far out for the tree to reach, are not indexed.
    pub fn insert(&mut self, id: usize, pos: Point) -> CellId {
        if !is_finite(pos) {
            tracing::warn!(node = id, "quad-tree: refusing to index a non-finite position");
            return self.root;
        }
        if self.contains_node(id) {
            self.remove(id);
        }
        if !self.fit(pos) {
            tracing::warn!(node = id, "quad-tree: position beyond the representable bounds");
            return self.root;
        }
        let root = self.root;
        self.add_below(root, id, pos);
        self.len += 1;
        self.root
    }

    /// Deletes node `id`. Branches left without any node collapse back into leaves.
    pub fn remove(&mut self, id: usize) -> bool {
        let Some(leaf) = self.detach(id) else {
            return false;
        };
        self.len -= 1;
        let mut cur = self.cells[leaf.0].parent;
        while let Some(cell) = cur {
            if !self.subtree_is_empty(cell) {
                break;
            }
            self.collapse(cell);
            cur = self.cells[cell.0].parent;
        }
        true
    }

    /// Re-files node `id` after its position changed to `pos`. Returns the (possibly new) root.
    pub fn relocate(&mut self, id: usize, pos: Point) -> CellId {
        let Some(leaf) = self.leaf_of(id) else {
            return self.insert(id, pos);
        };
        if !is_finite(pos) {
            tracing::warn!(node = id, "quad-tree: ignoring a non-finite relocation");
            return self.root;
        }
        if self.cells[leaf.0].square.contains(pos) {
            return self.root;
        }

        if !self.fit(pos) {
            tracing::warn!(node = id, "quad-tree: dropping a node moved out of bounds");
            self.remove(id);
            return self.root;
        }
        self.detach(id);

        // The root contains `pos` after `fit`, so the walk always ends.
        let mut cur = leaf;
        let target = loop {
            let Some(parent) = self.cells[cur.0].parent else {
                break cur;
            };
            if self.cells[parent.0].square.contains(pos) {
                break parent;
            }
            if self.subtree_is_empty(parent) {
                self.collapse(parent);
            }
            cur = parent;
        };
        self.add_below(target, id, pos);
        self.root
    }

    /// Nodes whose leaf intersects the box of half-width `radius` around `center`.
    ///
    /// This over-approximates: callers filter by exact distance themselves.
    pub fn query(&self, center: Point, radius: f64, out: &mut Vec<usize>) {
        let mut stack = vec![self.root];
        while let Some(cell) = stack.pop() {
            let c = &self.cells[cell.0];
            if !c.square.intersects_box(center, radius) {
                continue;
            }
            match &c.kind {
                CellKind::Leaf(nodes) => out.extend_from_slice(nodes),
                CellKind::Branch(children) => stack.extend(children.iter().rev().copied()),
            }
        }
    }

    pub fn range_query(&self, center: Point, radius: f64) -> Vec<usize> {
        let mut out = Vec::new();
        self.query(center, radius, &mut out);
        out
    }

    fn alloc(&mut self, cell: Cell) -> CellId {
        if let Some(id) = self.free.pop() {
            self.cells[id.0] = cell;
            id
        } else {
            self.cells.push(cell);
            CellId(self.cells.len() - 1)
        }
    }

    /// Grows the root until it contains `pos`. Returns `false`, leaving the tree grown as far
    /// as it could, once the next root would overflow.
    fn fit(&mut self, pos: Point) -> bool {
        while !self.cells[self.root.0].square.contains(pos) {
            let sq = self.cells[self.root.0].square;
            // Index the old root takes inside its new parent.
            let direction = if pos.x < sq.origin.x {
                if pos.y < sq.origin.y { 2 } else { 1 }
            } else if pos.y < sq.origin.y {
                3
            } else {
                0
            };
            let wider = parent_square(sq, direction);
            if !wider.is_finite() {
                return false;
            }
            self.grow(wider, direction);
        }
        true
    }

    fn grow(&mut self, square: Square, direction: usize) {
        let old = self.root;
        let parent = self.alloc(Cell {
            square,
            parent: None,
            kind: CellKind::Leaf(Vec::new()),
        });
        self.divide(parent);
        if let CellKind::Branch(mut children) = self.cells[parent.0].kind {
            let placeholder = children[direction];
            self.cells[placeholder.0].parent = None;
            self.free.push(placeholder);
            children[direction] = old;
            self.cells[parent.0].kind = CellKind::Branch(children);
        }
        self.cells[old.0].parent = Some(parent);
        self.root = parent;
    }

    fn divide(&mut self, cell: CellId) {
        let sq = self.cells[cell.0].square;
        debug_assert!(self.nodes_in(cell).is_empty(), "only empty leaves subdivide");
        let children = [0, 1, 2, 3].map(|i| {
            self.alloc(Cell {
                square: sq.quadrant(i),
                parent: Some(cell),
                kind: CellKind::Leaf(Vec::new()),
            })
        });
        self.cells[cell.0].kind = CellKind::Branch(children);
    }

    /// Descends from `start` (which contains `pos`) to the leaf for `pos`, subdividing leaves
    /// larger than the minimum size on the way.
    fn add_below(&mut self, start: CellId, id: usize, pos: Point) {
        let mut cell = start;
        loop {
            let children = match &self.cells[cell.0].kind {
                CellKind::Leaf(_) => None,
                CellKind::Branch(children) => Some(*children),
            };
            match children {
                Some(children) => {
                    cell = children
                        .iter()
                        .copied()
                        .find(|c| self.cells[c.0].square.contains(pos))
                        .unwrap_or(children[3]);
                }
                None if self.cells[cell.0].square.side > self.min_size => self.divide(cell),
                None => break,
            }
        }
        if let CellKind::Leaf(nodes) = &mut self.cells[cell.0].kind {
            nodes.push(id);
        }
        if self.leaf_of.len() <= id {
            self.leaf_of.resize(id + 1, None);
        }
        self.leaf_of[id] = Some(cell);
    }

    /// Takes node `id` out of its leaf without restructuring. Returns the former leaf.
    fn detach(&mut self, id: usize) -> Option<CellId> {
        let leaf = self.leaf_of.get_mut(id)?.take()?;
        if let CellKind::Leaf(nodes) = &mut self.cells[leaf.0].kind {
            if let Some(pos) = nodes.iter().position(|&n| n == id) {
                nodes.swap_remove(pos);
            }
        }
        Some(leaf)
    }

    fn subtree_is_empty(&self, cell: CellId) -> bool {
        let mut stack = vec![cell];
        while let Some(c) = stack.pop() {
            match &self.cells[c.0].kind {
                CellKind::Leaf(nodes) => {
                    if !nodes.is_empty() {
                        return false;
                    }
                }
                CellKind::Branch(children) => stack.extend(children.iter().copied()),
            }
        }
        true
    }

    /// Turns an empty branch back into a leaf, recycling its descendants.
    fn collapse(&mut self, cell: CellId) {
        let CellKind::Branch(children) = self.cells[cell.0].kind else {
            return;
        };
        let mut stack: Vec<CellId> = children.to_vec();
        while let Some(c) = stack.pop() {
            if let CellKind::Branch(grand) = self.cells[c.0].kind {
                stack.extend(grand);
            }
            self.cells[c.0].kind = CellKind::Leaf(Vec::new());
            self.cells[c.0].parent = None;
            self.free.push(c);
        }
        self.cells[cell.0].kind = CellKind::Leaf(Vec::new());
    }
}

/// The square twice the size of `sq` that holds it as quadrant `direction`.
fn parent_square(sq: Square, direction: usize) -> Square {
    let px = if direction == 0 || direction == 3 {
        sq.origin.x
    } else {
        sq.origin.x - sq.side
    };
    let py = if direction == 0 || direction == 1 {
        sq.origin.y
    } else {
        sq.origin.y - sq.side
    };
    Square::new(point(px, py), sq.side * 2.0)
}

fn is_finite(p: Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}
