//! This code is heavily based on <https://godoc.org/code.google.com/p/eaburns/kdtree>
//!
//! Original code is under New BSD License.
//! Author: Ethan Burns <burns.ethan@gmail.com>

use super::point::{GeoPoint, PointList};

/// KD-Tree over (latitude, longitude) pairs
///
/// Points are separated from nodes. Nodes hold only indices into the Points slice.
/// Splits are made in raw degree space, so [`KDTree::nearest`] ranks candidates
/// by Euclidean degree distance; callers needing true geographic order must
/// re-score the returned candidates.
pub struct KDTree {
    /// All points in the tree
    pub points: PointList,
    /// Root node of the tree
    pub root: Option<Box<KDTreeNode>>,
}

/// A node in the K-D tree
pub struct KDTreeNode {
    /// Index of the point associated with this node
    pub point_id: usize,
    /// Indices of points equal to this node's point
    pub equal_ids: Vec<usize>,

    split: usize,
    left: Option<Box<KDTreeNode>>,
    right: Option<Box<KDTreeNode>>,
}

impl KDTree {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Finds all points in the K-D tree that are within a given distance from the given point
    ///
    /// `dist` is in the units of [`GeoPoint::sq_dist`] before squaring
    /// (degrees scaled by latitude), not kilometers.
    ///
    /// To avoid allocation, the `nodes` vector can be pre-allocated with a larger
    /// capacity and re-used across multiple calls.
    pub fn in_range(&self, pt: &GeoPoint, dist: f64, mut nodes: Vec<usize>) -> Vec<usize> {
        if dist < 0.0 {
            return nodes;
        }
        self.in_range_recursive(self.root.as_deref(), pt, dist, &mut nodes);
        nodes
    }

    fn in_range_recursive(
        &self,
        t: Option<&KDTreeNode>,
        pt: &GeoPoint,
        r: f64,
        nodes: &mut Vec<usize>,
    ) {
        let Some(t) = t else {
            return;
        };

        let diff = pt.0[t.split] - self.points[t.point_id].0[t.split];

        let (this_side, other_side) = if diff < 0.0 {
            (t.left.as_deref(), t.right.as_deref())
        } else {
            (t.right.as_deref(), t.left.as_deref())
        };

        let mut p1 = GeoPoint([0.0, 0.0]);
        p1.0[1 - t.split] = (pt.0[1 - t.split] + self.points[t.point_id].0[1 - t.split]) / 2.0;
        p1.0[t.split] = pt.0[t.split];

        let mut p2 = GeoPoint([0.0, 0.0]);
        p2.0[1 - t.split] = (pt.0[1 - t.split] + self.points[t.point_id].0[1 - t.split]) / 2.0;
        p2.0[t.split] = self.points[t.point_id].0[t.split];

        let dist = p1.sq_dist(&p2);

        self.in_range_recursive(this_side, pt, r, nodes);
        if dist <= r * r {
            if self.points[t.point_id].sq_dist(pt) < r * r {
                nodes.push(t.point_id);
                nodes.extend_from_slice(&t.equal_ids);
            }
            self.in_range_recursive(other_side, pt, r, nodes);
        }
    }

    /// Returns indices of the `k` points closest to `pt` in Euclidean degree space
    ///
    /// Results are ordered by that distance, ties broken by index. Fewer than
    /// `k` indices come back only when the tree holds fewer points.
    pub fn nearest(&self, pt: &GeoPoint, k: usize) -> Vec<usize> {
        if k == 0 {
            return Vec::new();
        }
        let mut best: Vec<(f64, usize)> = Vec::with_capacity(k + 1);
        self.nearest_recursive(self.root.as_deref(), pt, k, &mut best);
        best.into_iter().map(|(_, id)| id).collect()
    }

    fn nearest_recursive(
        &self,
        t: Option<&KDTreeNode>,
        pt: &GeoPoint,
        k: usize,
        best: &mut Vec<(f64, usize)>,
    ) {
        let Some(t) = t else {
            return;
        };

        let here = &self.points[t.point_id];
        let diff = pt.0[t.split] - here.0[t.split];

        let (this_side, other_side) = if diff < 0.0 {
            (t.left.as_deref(), t.right.as_deref())
        } else {
            (t.right.as_deref(), t.left.as_deref())
        };

        self.nearest_recursive(this_side, pt, k, best);

        let d = here.planar_sq_dist(pt);
        push_candidate(best, k, d, t.point_id);
        for &id in &t.equal_ids {
            push_candidate(best, k, d, id);
        }

        // Everything on the other side is at least |diff| away along the split axis
        let worst = best.last().map_or(f64::INFINITY, |&(d, _)| d);
        if best.len() < k || diff * diff <= worst {
            self.nearest_recursive(other_side, pt, k, best);
        }
    }
}

/// Inserts `(d, id)` into the sorted candidate list, keeping at most `k` entries
fn push_candidate(best: &mut Vec<(f64, usize)>, k: usize, d: f64, id: usize) {
    let pos = best.partition_point(|&(bd, bid)| bd < d || (bd == d && bid < id));
    if pos >= k {
        return;
    }
    best.insert(pos, (d, id));
    best.truncate(k);
}

/// Creates a new K-D tree built from the given points
pub fn new_kd_tree(points: PointList) -> KDTree {
    let mut result = KDTree { points, root: None };

    if !result.points.is_empty() {
        result.root = build_tree(0, &pre_sort(&result.points));
    }

    result
}

/// Builds a tree node by finding the median point and recursively building left and right subtrees
fn build_tree(depth: usize, nodes: &PreSorted<'_>) -> Option<Box<KDTreeNode>> {
    let split = depth % 2;
    match nodes.cur[split].len() {
        0 => None,
        1 => Some(Box::new(KDTreeNode {
            point_id: nodes.cur[split][0],
            equal_ids: Vec::new(),
            split,
            left: None,
            right: None,
        })),
        _ => {
            let (med, equal, left, right) = nodes.split_med(split);
            Some(Box::new(KDTreeNode {
                point_id: med,
                equal_ids: equal,
                split,
                left: build_tree(depth + 1, &left),
                right: build_tree(depth + 1, &right),
            }))
        }
    }
}

/// Holds nodes pre-sorted on each dimension
struct PreSorted<'a> {
    points: &'a [GeoPoint],
    /// Currently sorted set of point IDs by dimension
    cur: [Vec<usize>; 2],
}

/// Pre-sorts nodes on each dimension
fn pre_sort(points: &[GeoPoint]) -> PreSorted<'_> {
    let mut p = PreSorted {
        points,
        cur: [Vec::new(), Vec::new()],
    };
    for i in 0..2 {
        p.cur[i] = (0..points.len()).collect();
        p.cur[i].sort_by(|&a, &b| {
            let a_val = points[a].0[i];
            let b_val = points[b].0[i];
            if a_val == b_val {
                // For equal values, sort by the other dimension
                points[a].0[1 - i]
                    .partial_cmp(&points[b].0[1 - i])
                    .unwrap_or(std::cmp::Ordering::Equal)
            } else {
                a_val
                    .partial_cmp(&b_val)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }
        });
    }
    p
}

impl<'a> PreSorted<'a> {
    /// Returns the median node on the split dimension and two PreSorted structs
    /// that contain the nodes (still sorted on each dimension) that are less than
    /// and greater than or equal to the median node value on the given splitting dimension.
    fn split_med(&self, dim: usize) -> (usize, Vec<usize>, PreSorted<'a>, PreSorted<'a>) {
        let mut m = self.cur[dim].len() / 2;
        while m > 0
            && self.points[self.cur[dim][m - 1]].0[dim] == self.points[self.cur[dim][m]].0[dim]
        {
            m -= 1;
        }
        let mut mh = m;
        while mh < self.cur[dim].len() - 1
            && self.points[self.cur[dim][mh + 1]] == self.points[self.cur[dim][m]]
        {
            mh += 1;
        }
        let med = self.cur[dim][m];
        let equal = self.cur[dim][m + 1..=mh].to_vec();
        let pivot = self.points[med].0[dim];

        let mut left = PreSorted {
            points: self.points,
            cur: [Vec::new(), Vec::new()],
        };
        left.cur[dim] = self.cur[dim][..m].to_vec();

        let mut right = PreSorted {
            points: self.points,
            cur: [Vec::new(), Vec::new()],
        };
        right.cur[dim] = self.cur[dim][mh + 1..].to_vec();

        let d = 1 - dim;
        left.cur[d] = Vec::with_capacity(self.cur[d].len());
        right.cur[d] = Vec::with_capacity(self.cur[d].len());

        for &n in &self.cur[d] {
            if n == med || equal.contains(&n) {
                continue;
            }
            if self.points[n].0[dim] < pivot {
                left.cur[d].push(n);
            } else {
                right.cur[d].push(n);
            }
        }

        (med, equal, left, right)
    }
}
