//! Octree spatial index for fixed-radius neighbor queries
//!
//! The tree is built once over a snapshot of the point coordinates and is
//! immutable afterwards, so it can be shared between threads for queries.
//! Nodes live in a flat arena and refer to their children by index.

use pointfeature_core::{distance_squared, within_radius, Aabb, Error, NearestNeighborSearch, Point3f, Result};

/// Default maximum number of points stored in a leaf
pub const DEFAULT_LEAF_THRESHOLD: usize = 15;

/// Default maximum subdivision depth
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Index of a node inside the octree arena
pub type NodeId = u32;

/// Contents of an octree node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Point indices stored in this leaf
    Leaf(Vec<u32>),
    /// One slot per octant, `None` for octants without points
    Internal([Option<NodeId>; 8]),
}

/// A node of the octree together with its bounding box
#[derive(Debug, Clone, PartialEq)]
pub struct OctreeNode {
    pub bounds: Aabb,
    pub kind: NodeKind,
}

impl OctreeNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }
}

/// Build parameters for [`Octree`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctreeParams {
    /// A node with at most this many points is not subdivided
    pub leaf_threshold: usize,
    /// Nodes at this depth become leaves regardless of their point count
    pub max_depth: usize,
}

impl Default for OctreeParams {
    fn default() -> Self {
        Self {
            leaf_threshold: DEFAULT_LEAF_THRESHOLD,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Octree over a static set of points
#[derive(Debug, Clone)]
pub struct Octree {
    points: Vec<Point3f>,
    nodes: Vec<OctreeNode>,
    root: NodeId,
    params: OctreeParams,
    depth: usize,
}

impl Octree {
    /// Build an octree over `points` using their tight bounding box
    ///
    /// # Arguments
    /// * `points` - Point coordinates, indexed by position in the slice
    /// * `params` - Leaf threshold and depth limit
    ///
    /// # Returns
    /// * `Result<Octree>` - The built tree, or an error for non-finite
    ///   coordinates or a zero leaf threshold
    ///
    /// # Example
    /// ```rust
    /// use pointfeature_core::{NearestNeighborSearch, Point3f};
    /// use pointfeature_algorithms::octree::{Octree, OctreeParams};
    ///
    /// fn main() -> pointfeature_core::Result<()> {
    ///     let points = vec![
    ///         Point3f::new(0.0, 0.0, 0.0),
    ///         Point3f::new(1.0, 0.0, 0.0),
    ///         Point3f::new(5.0, 5.0, 5.0),
    ///     ];
    ///     let tree = Octree::build(&points, OctreeParams::default())?;
    ///     assert_eq!(tree.find_radius_neighbors(&points[0], 1.0).len(), 2);
    ///     Ok(())
    /// }
    /// ```
    pub fn build(points: &[Point3f], params: OctreeParams) -> Result<Self> {
        let bounds = Aabb::from_points(points)
            .unwrap_or_else(|| Aabb::from_min_max_unchecked(Point3f::origin(), Point3f::origin()));
        Self::build_with_bounds(points, bounds, params)
    }

    /// Build an octree over `points` seeded with a caller supplied root box.
    ///
    /// Every point must lie inside `bounds`.
    pub fn build_with_bounds(points: &[Point3f], bounds: Aabb, params: OctreeParams) -> Result<Self> {
        if params.leaf_threshold == 0 {
            return Err(Error::Configuration(
                "octree leaf threshold must be at least 1".to_string(),
            ));
        }
        if points.len() > u32::MAX as usize {
            return Err(Error::InvalidData(format!(
                "octree supports at most {} points, got {}",
                u32::MAX,
                points.len()
            )));
        }
        if let Some(i) = points
            .iter()
            .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        {
            return Err(Error::InvalidData(format!(
                "point {} has a non-finite coordinate",
                i
            )));
        }
        if let Some(i) = points.iter().position(|p| !bounds.contains(p)) {
            return Err(Error::InvalidData(format!(
                "point {} lies outside the octree bounds",
                i
            )));
        }

        let mut tree = Self {
            points: points.to_vec(),
            nodes: Vec::new(),
            root: 0,
            params,
            depth: 0,
        };

        let indices: Vec<u32> = (0..points.len() as u32).collect();
        tree.root = tree.build_node(bounds, indices, 0);

        log::debug!(
            "Built octree over {} points: {} nodes, {} leaves, depth {}",
            tree.points.len(),
            tree.nodes.len(),
            tree.leaf_count(),
            tree.depth
        );

        Ok(tree)
    }

    fn build_node(&mut self, bounds: Aabb, indices: Vec<u32>, depth: usize) -> NodeId {
        self.depth = self.depth.max(depth);

        if !self.should_split(&bounds, &indices, depth) {
            return self.push_node(bounds, NodeKind::Leaf(indices));
        }

        let mut partitions: [Vec<u32>; 8] = Default::default();
        for &i in &indices {
            partitions[bounds.octant_of(&self.points[i as usize])].push(i);
        }

        // Splitting only helps if the points do not all end up in one octant
        // whose box is no smaller than the parent's.
        if let Some(octant) = partitions.iter().position(|p| p.len() == indices.len()) {
            if bounds.octant_bounds(octant) == bounds {
                return self.push_node(bounds, NodeKind::Leaf(indices));
            }
        }
        drop(indices);

        // Reserve the parent slot so that it precedes its children in the arena
        let id = self.push_node(bounds, NodeKind::Internal([None; 8]));
        let mut children = [None; 8];
        for (octant, partition) in partitions.into_iter().enumerate() {
            if partition.is_empty() {
                continue;
            }
            children[octant] = Some(self.build_node(bounds.octant_bounds(octant), partition, depth + 1));
        }
        self.nodes[id as usize].kind = NodeKind::Internal(children);
        id
    }

    fn should_split(&self, bounds: &Aabb, indices: &[u32], depth: usize) -> bool {
        if indices.len() <= self.params.leaf_threshold || depth >= self.params.max_depth {
            return false;
        }
        if bounds.is_point() {
            return false;
        }
        // A cluster of coincident points can never be separated
        match Aabb::from_indexed_points(&self.points, indices) {
            Some(tight) => !tight.is_point(),
            None => false,
        }
    }

    fn push_node(&mut self, bounds: Aabb, kind: NodeKind) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(OctreeNode { bounds, kind });
        id
    }

    /// Visit every indexed point within `radius` of `query`, passing its index
    /// and squared distance to `visit`.
    ///
    /// Nodes are pruned with the same inclusive test as points, applied to the
    /// distance to the node box, which never exceeds the distance to a point inside it.
    pub fn visit_radius<F>(&self, query: &Point3f, radius: f64, mut visit: F)
    where
        F: FnMut(usize, f64),
    {
        if !(radius >= 0.0) || self.points.is_empty() {
            return;
        }

        let mut worklist = vec![self.root];
        while let Some(id) = worklist.pop() {
            let node = &self.nodes[id as usize];
            if !within_radius(node.bounds.min_distance_squared(query), radius) {
                continue;
            }
            match &node.kind {
                NodeKind::Leaf(indices) => {
                    for &i in indices {
                        let d2 = distance_squared(&self.points[i as usize], query);
                        if within_radius(d2, radius) {
                            visit(i as usize, d2);
                        }
                    }
                }
                NodeKind::Internal(children) => {
                    worklist.extend(children.iter().flatten().copied());
                }
            }
        }
    }

    /// Root node id
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&OctreeNode> {
        self.nodes.get(id as usize)
    }

    /// Bounding box of the root node
    pub fn bounds(&self) -> &Aabb {
        &self.nodes[self.root as usize].bounds
    }

    pub fn points(&self) -> &[Point3f] {
        &self.points
    }

    pub fn params(&self) -> OctreeParams {
        self.params
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Depth of the deepest node, the root being at depth 0
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl NearestNeighborSearch for Octree {
    fn find_radius_neighbors(&self, query: &Point3f, radius: f64) -> Vec<(usize, f64)> {
        let mut found = Vec::new();
        self.visit_radius(query, radius, |i, d2| found.push((i, d2.sqrt())));
        found
    }

    fn find_radius_indices_into(&self, query: &Point3f, radius: f64, out: &mut Vec<usize>) {
        out.clear();
        self.visit_radius(query, radius, |i, _| out.push(i));
    }

    fn len(&self) -> usize {
        self.points.len()
    }
}
