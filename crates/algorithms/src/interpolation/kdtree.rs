//! 2D k-d tree for spatial indexing
//!
//! Nearest, k-nearest and fixed-radius queries over projected survey
//! points. Used for node snapping, the IDW fallback and for merging points
//! that collapse together after projection.
//!
//! Ties in distance are broken by input index, so query results never depend
//! on the tree's internal layout.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::SamplePoint;

/// A 2D k-d tree over sample points.
#[derive(Debug, Clone)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    /// Points in input order; nodes refer to them by index
    points: Vec<SamplePoint>,
}

#[derive(Debug, Clone, Copy)]
struct KdNode {
    point_idx: usize,
    /// Split on x when true, y otherwise
    split_x: bool,
    left: Option<usize>,
    right: Option<usize>,
}

/// Result of a nearest-neighbor query
#[derive(Debug, Clone, Copy)]
pub struct NearestResult {
    pub point: SamplePoint,
    pub distance_sq: f64,
    /// Position of the point in the slice the tree was built from
    pub index: usize,
}

/// Heap entry ordered by (distance, index)
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance_sq: f64,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_sq
            .total_cmp(&other.distance_sq)
            .then(self.index.cmp(&other.index))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl KdTree {
    /// Build a k-d tree by median splitting, alternating x and y.
    pub fn build(points: &[SamplePoint]) -> Self {
        let mut indices: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(points.len());
        if !points.is_empty() {
            build_recursive(points, &mut indices, true, &mut nodes);
        }
        Self {
            nodes,
            points: points.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The closest point to (qx, qy), `None` for an empty tree
    pub fn nearest(&self, qx: f64, qy: f64) -> Option<NearestResult> {
        self.k_nearest(qx, qy, 1).into_iter().next()
    }

    /// Up to `k` closest points, sorted by ascending distance
    pub fn k_nearest(&self, qx: f64, qy: f64, k: usize) -> Vec<NearestResult> {
        if self.nodes.is_empty() || k == 0 {
            return Vec::new();
        }

        // Max-heap holding the k best so far; the top is the worst of them
        let mut heap = BinaryHeap::with_capacity(k + 1);
        self.knn_recursive(0, qx, qy, k, &mut heap);

        heap.into_sorted_vec()
            .into_iter()
            .map(|c| self.result(c))
            .collect()
    }

    /// All points within `radius` of (qx, qy), in input order
    pub fn within_radius(&self, qx: f64, qy: f64, radius: f64) -> Vec<NearestResult> {
        if self.nodes.is_empty() || !(radius >= 0.0) {
            return Vec::new();
        }

        let mut found = Vec::new();
        self.radius_recursive(0, qx, qy, radius * radius, &mut found);
        found.sort_unstable_by_key(|c| c.index);
        found.into_iter().map(|c| self.result(c)).collect()
    }

    fn result(&self, c: Candidate) -> NearestResult {
        NearestResult {
            point: self.points[c.index],
            distance_sq: c.distance_sq,
            index: c.index,
        }
    }

    /// Signed offset of the query from the node's splitting line
    fn split_offset(&self, node: &KdNode, qx: f64, qy: f64) -> f64 {
        let p = &self.points[node.point_idx];
        if node.split_x {
            qx - p.x
        } else {
            qy - p.y
        }
    }

    fn knn_recursive(
        &self,
        node_idx: usize,
        qx: f64,
        qy: f64,
        k: usize,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        let node = self.nodes[node_idx];
        let candidate = Candidate {
            distance_sq: self.points[node.point_idx].dist_sq(qx, qy),
            index: node.point_idx,
        };

        if heap.len() < k {
            heap.push(candidate);
        } else if heap.peek().is_some_and(|worst| candidate < *worst) {
            heap.pop();
            heap.push(candidate);
        }

        let diff = self.split_offset(&node, qx, qy);
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(child) = near {
            self.knn_recursive(child, qx, qy, k, heap);
        }

        // Equal distance still matters because ties resolve by index
        let bound = match heap.peek() {
            Some(worst) if heap.len() >= k => worst.distance_sq,
            _ => f64::INFINITY,
        };
        if diff * diff <= bound {
            if let Some(child) = far {
                self.knn_recursive(child, qx, qy, k, heap);
            }
        }
    }

    fn radius_recursive(
        &self,
        node_idx: usize,
        qx: f64,
        qy: f64,
        radius_sq: f64,
        found: &mut Vec<Candidate>,
    ) {
        let node = self.nodes[node_idx];
        let distance_sq = self.points[node.point_idx].dist_sq(qx, qy);
        if distance_sq <= radius_sq {
            found.push(Candidate {
                distance_sq,
                index: node.point_idx,
            });
        }

        let diff = self.split_offset(&node, qx, qy);
        let crosses = diff * diff <= radius_sq;

        if let Some(left) = node.left {
            if diff < 0.0 || crosses {
                self.radius_recursive(left, qx, qy, radius_sq, found);
            }
        }
        if let Some(right) = node.right {
            if diff >= 0.0 || crosses {
                self.radius_recursive(right, qx, qy, radius_sq, found);
            }
        }
    }
}

/// Build the subtree over `indices`, returning its root node index.
///
/// Points equal to the median along the split axis may land on either side,
/// which is why queries descend into both children when the offset is zero.
fn build_recursive(
    points: &[SamplePoint],
    indices: &mut [usize],
    split_x: bool,
    nodes: &mut Vec<KdNode>,
) -> usize {
    let key = |i: usize| if split_x { points[i].x } else { points[i].y };
    let median = indices.len() / 2;
    indices.select_nth_unstable_by(median, |&a, &b| key(a).total_cmp(&key(b)).then(a.cmp(&b)));

    let node_idx = nodes.len();
    nodes.push(KdNode {
        point_idx: indices[median],
        split_x,
        left: None,
        right: None,
    });

    let (lower, rest) = indices.split_at_mut(median);
    let upper = &mut rest[1..];

    if !lower.is_empty() {
        let left = build_recursive(points, lower, !split_x, nodes);
        nodes[node_idx].left = Some(left);
    }
    if !upper.is_empty() {
        let right = build_recursive(points, upper, !split_x, nodes);
        nodes[node_idx].right = Some(right);
    }

    node_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_points() -> Vec<SamplePoint> {
        vec![
            SamplePoint::new(2.0, 3.0, 10.0),
            SamplePoint::new(5.0, 4.0, 20.0),
            SamplePoint::new(9.0, 6.0, 30.0),
            SamplePoint::new(4.0, 7.0, 40.0),
            SamplePoint::new(8.0, 1.0, 50.0),
            SamplePoint::new(7.0, 2.0, 60.0),
            SamplePoint::new(1.0, 8.0, 70.0),
            SamplePoint::new(6.0, 5.0, 80.0),
        ]
    }

    fn brute_force(pts: &[SamplePoint], qx: f64, qy: f64) -> Vec<(f64, usize)> {
        let mut d: Vec<(f64, usize)> = pts
            .iter()
            .enumerate()
            .map(|(i, p)| (p.dist_sq(qx, qy), i))
            .collect();
        d.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        d
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::build(&[]);
        assert!(tree.is_empty());
        assert!(tree.nearest(0.0, 0.0).is_none());
        assert!(tree.k_nearest(0.0, 0.0, 3).is_empty());
        assert!(tree.within_radius(0.0, 0.0, 10.0).is_empty());
    }

    #[test]
    fn test_nearest_exact() {
        let tree = KdTree::build(&sample_points());
        assert_eq!(tree.len(), 8);
        let result = tree.nearest(5.0, 4.0).unwrap();
        assert_eq!(result.distance_sq, 0.0);
        assert_eq!(result.index, 1);
        assert_eq!(result.point.value, 20.0);
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let pts = sample_points();
        let tree = KdTree::build(&pts);

        for qx in 0..10 {
            for qy in 0..10 {
                let (qx, qy) = (qx as f64 + 0.5, qy as f64 + 0.5);
                let got = tree.nearest(qx, qy).unwrap();
                let want = brute_force(&pts, qx, qy)[0];
                assert_eq!((got.distance_sq, got.index), want, "at ({qx}, {qy})");
            }
        }
    }

    #[test]
    fn test_k_nearest_sorted_and_exact() {
        let pts = sample_points();
        let tree = KdTree::build(&pts);

        let results = tree.k_nearest(5.0, 5.0, 3);
        let want = brute_force(&pts, 5.0, 5.0);
        assert_eq!(results.len(), 3);
        for (r, w) in results.iter().zip(&want) {
            assert_eq!((r.distance_sq, r.index), *w);
        }

        assert_eq!(tree.k_nearest(5.0, 5.0, 100).len(), pts.len());
    }

    #[test]
    fn test_ties_resolve_by_index() {
        // Four points equidistant from the origin
        let pts = vec![
            SamplePoint::new(1.0, 0.0, 0.0),
            SamplePoint::new(0.0, 1.0, 1.0),
            SamplePoint::new(-1.0, 0.0, 2.0),
            SamplePoint::new(0.0, -1.0, 3.0),
        ];
        let tree = KdTree::build(&pts);
        let idx: Vec<usize> = tree.k_nearest(0.0, 0.0, 2).iter().map(|r| r.index).collect();
        assert_eq!(idx, vec![0, 1]);
    }

    #[test]
    fn test_within_radius() {
        let pts = sample_points();
        let tree = KdTree::build(&pts);

        let results = tree.within_radius(5.0, 5.0, 2.0);
        let want: Vec<usize> = (0..pts.len())
            .filter(|&i| pts[i].dist_sq(5.0, 5.0) <= 4.0)
            .collect();
        let got: Vec<usize> = results.iter().map(|r| r.index).collect();
        assert_eq!(got, want);

        // Zero radius still finds coincident points
        let exact = tree.within_radius(6.0, 5.0, 0.0);
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].index, 7);
    }

    #[test]
    fn test_duplicate_coordinates() {
        let pts = vec![
            SamplePoint::new(3.0, 3.0, 1.0),
            SamplePoint::new(3.0, 3.0, 2.0),
            SamplePoint::new(3.0, 3.0, 3.0),
            SamplePoint::new(0.0, 0.0, 4.0),
        ];
        let tree = KdTree::build(&pts);
        assert_eq!(tree.within_radius(3.0, 3.0, 1e-9).len(), 3);
        assert_eq!(tree.nearest(3.0, 3.0).unwrap().index, 0);
    }

    #[test]
    fn test_large_dataset() {
        let pts: Vec<SamplePoint> = (0..1000)
            .map(|i| {
                let x = ((i * 7 + 13) % 100) as f64;
                let y = ((i * 11 + 37) % 100) as f64;
                SamplePoint::new(x, y, i as f64)
            })
            .collect();
        let tree = KdTree::build(&pts);
        assert_eq!(tree.len(), 1000);

        for &(qx, qy) in &[(50.0, 50.0), (0.3, 99.2), (71.7, 12.1)] {
            let got = tree.k_nearest(qx, qy, 6);
            let want = brute_force(&pts, qx, qy);
            for (g, w) in got.iter().zip(&want) {
                assert_eq!((g.distance_sq, g.index), *w);
            }
        }
    }
}
