//! 几何校验
//!
//! 纯函数谓词：多边形相交（内部重叠）与点在多边形内（严格内部）。
//! 顶点数少于 4 的环尚未构成多边形，一律返回 `false`。
//!
//! 相交判定分三步：
//! 1. 包围盒排除；
//! 2. 两条边在各自内部严格交叉；
//! 3. 一方的采样点（角点、边中点、向内微移的边中点）严格落在另一方内部。
//!
//! 只共享边或顶点时第 2、3 步都不成立，因此默认不算相交；
//! 需要把边界接触也视为相交时使用 [`IntersectionPolicy::RejectTouching`]。

use crate::math::{cross, distance_to_segment, Point2, Vector2, BOUNDARY_EPSILON};
use crate::ring::Ring;
use serde::{Deserialize, Serialize};

/// 判定共线的相对角度容差
const ORIENTATION_EPSILON: f64 = 1e-12;

/// 边中点向内微移的距离（相对边长）
const NUDGE_FACTOR: f64 = 1e-6;

/// 边界接触的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntersectionPolicy {
    /// 只共享边界不算相交（默认）
    #[default]
    AllowTouching,
    /// 边界接触也算相交
    RejectTouching,
}

/// 几何校验器
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeometryValidator {
    policy: IntersectionPolicy,
}

impl GeometryValidator {
    pub fn new(policy: IntersectionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> IntersectionPolicy {
        self.policy
    }

    /// 两个多边形是否相交
    pub fn intersects(&self, a: &Ring, b: &Ring) -> bool {
        if !a.is_polygon() || !b.is_polygon() {
            return false;
        }
        if !a.bounding_box().intersects(&b.bounding_box()) {
            return false;
        }
        if interiors_overlap(a, b) {
            return true;
        }
        match self.policy {
            IntersectionPolicy::AllowTouching => false,
            IntersectionPolicy::RejectTouching => boundaries_touch(a, b),
        }
    }

    /// 点是否严格位于多边形内部
    pub fn point_inside(&self, point: &Point2, ring: &Ring) -> bool {
        point_inside(point, ring)
    }
}

/// 使用默认策略判断两个多边形是否相交
pub fn intersects(a: &Ring, b: &Ring) -> bool {
    GeometryValidator::default().intersects(a, b)
}

/// 点是否严格位于多边形内部（边界上不算）
pub fn point_inside(point: &Point2, ring: &Ring) -> bool {
    if !ring.is_polygon() {
        return false;
    }
    if !ring.bounding_box().contains(point) {
        return false;
    }
    if on_boundary(point, ring) {
        return false;
    }

    // 射线法：向 +x 方向发射射线，统计穿越次数
    let mut inside = false;
    for (a, b) in ring.edges() {
        if (a.y > point.y) != (b.y > point.y) {
            let x = a.x + (point.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if point.x < x {
                inside = !inside;
            }
        }
    }
    inside
}

fn on_boundary(point: &Point2, ring: &Ring) -> bool {
    ring.edges()
        .any(|(a, b)| distance_to_segment(point, &a, &b) <= BOUNDARY_EPSILON)
}

/// 三点方向：1 逆时针，-1 顺时针，0 共线
fn orientation(a: &Point2, b: &Point2, c: &Point2) -> i8 {
    let value = cross(a, b, c);
    let scale = (b - a).norm() * (c - a).norm();
    if value.abs() <= ORIENTATION_EPSILON * scale {
        0
    } else if value > 0.0 {
        1
    } else {
        -1
    }
}

/// 两条线段是否在各自内部严格交叉
fn segments_cross(p1: &Point2, p2: &Point2, q1: &Point2, q2: &Point2) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);
    d1 * d2 < 0 && d3 * d4 < 0
}

fn interiors_overlap(a: &Ring, b: &Ring) -> bool {
    for (a1, a2) in a.edges() {
        for (b1, b2) in b.edges() {
            if segments_cross(&a1, &a2, &b1, &b2) {
                return true;
            }
        }
    }

    interior_samples(a).iter().any(|p| point_inside(p, b))
        || interior_samples(b).iter().any(|p| point_inside(p, a))
}

/// 采样点：角点、边中点，以及落在环内部的微移边中点
fn interior_samples(ring: &Ring) -> Vec<Point2> {
    let mut samples: Vec<Point2> = ring.corners().to_vec();

    for (start, end) in ring.edges() {
        let dir = end - start;
        let len = dir.norm();
        let mid = start + dir * 0.5;
        samples.push(mid);

        if len <= BOUNDARY_EPSILON {
            continue;
        }
        let normal = Vector2::new(-dir.y, dir.x) / len;
        let offset = len * NUDGE_FACTOR;
        for candidate in [mid + normal * offset, mid - normal * offset] {
            if point_inside(&candidate, ring) {
                samples.push(candidate);
            }
        }
    }

    samples
}

/// 边界是否有接触（含顶点落在对方边上）
fn boundaries_touch(a: &Ring, b: &Ring) -> bool {
    a.corners().iter().any(|p| on_boundary(p, b)) || b.corners().iter().any(|p| on_boundary(p, a))
}
