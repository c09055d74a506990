//! 基础数学类型
//!
//! 坐标统一使用 (经度, 纬度)：`x` 为经度，`y` 为纬度。

use serde::{Deserialize, Serialize};

/// 二维点（x = 经度, y = 纬度）
pub type Point2 = nalgebra::Point2<f64>;

/// 二维向量
pub type Vector2 = nalgebra::Vector2<f64>;

/// 通用浮点容差
pub const EPSILON: f64 = 1e-10;

/// 判定点落在边界上的距离容差（度）
pub const BOUNDARY_EPSILON: f64 = 1e-12;

/// 由经纬度构造点
#[inline]
pub fn lng_lat(lng: f64, lat: f64) -> Point2 {
    Point2::new(lng, lat)
}

/// 二维叉积 (b - a) × (c - a)
///
/// 正值表示 a→b→c 逆时针，负值为顺时针，零为共线。
#[inline]
pub fn cross(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// 点到线段的距离
pub fn distance_to_segment(point: &Point2, start: &Point2, end: &Point2) -> f64 {
    let v = end - start;
    let w = point - start;

    let c1 = w.dot(&v);
    if c1 <= 0.0 {
        return (point - start).norm();
    }

    let c2 = v.dot(&v);
    if c2 <= c1 {
        return (point - end).norm();
    }

    let b = c1 / c2;
    let pb = start + v * b;
    (point - pb).norm()
}

/// 轴对齐包围盒
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox2 {
    pub min: Point2,
    pub max: Point2,
}

impl BoundingBox2 {
    pub fn new(min: Point2, max: Point2) -> Self {
        Self { min, max }
    }

    /// 空包围盒（min > max，与任何包围盒都不相交）
    pub fn empty() -> Self {
        Self {
            min: Point2::new(f64::MAX, f64::MAX),
            max: Point2::new(f64::MIN, f64::MIN),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Point2>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.expand_to_include(&p);
        }
        bbox
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn expand_to_include(&mut self, point: &Point2) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    /// 闭区间相交（边界接触也算相交）
    pub fn intersects(&self, other: &BoundingBox2) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn contains(&self, point: &Point2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn center(&self) -> Point2 {
        Point2::new((self.min.x + self.max.x) / 2.0, (self.min.y + self.max.y) / 2.0)
    }
}
