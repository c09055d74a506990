//! 多边形边界环
//!
//! 环是首尾相同的有序顶点序列（经度, 纬度）。至少 4 个顶点
//! （3 个不同角点 + 闭合重复点）才构成多边形；顶点更少的环
//! 仍可出现在绘制过程中，但不参与相交判断。

use crate::error::ZoneError;
use crate::math::{BoundingBox2, Point2};
use serde::{Deserialize, Serialize};

/// 构成多边形所需的最少顶点数（含闭合点）
pub const MIN_POLYGON_VERTICES: usize = 4;

/// 多边形边界环
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ring {
    vertices: Vec<Point2>,
}

impl Ring {
    /// 按原样包装顶点序列（不自动闭合）
    pub fn new(vertices: Vec<Point2>) -> Self {
        Self { vertices }
    }

    /// 由角点构造闭合环，末尾补上首点（已闭合则不重复补）
    pub fn closed(corners: impl IntoIterator<Item = Point2>) -> Self {
        let mut vertices: Vec<Point2> = corners.into_iter().collect();
        if let (Some(first), Some(last)) = (vertices.first().copied(), vertices.last().copied()) {
            if vertices.len() == 1 || first != last {
                vertices.push(first);
            }
        }
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point2] {
        &self.vertices
    }

    pub fn into_vertices(self) -> Vec<Point2> {
        self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// 首尾顶点是否相同
    pub fn is_closed(&self) -> bool {
        match (self.vertices.first(), self.vertices.last()) {
            (Some(first), Some(last)) => self.vertices.len() > 1 && first == last,
            _ => false,
        }
    }

    /// 是否已构成多边形（顶点数 >= 4）
    pub fn is_polygon(&self) -> bool {
        self.vertices.len() >= MIN_POLYGON_VERTICES
    }

    /// 不含闭合点的角点
    pub fn corners(&self) -> &[Point2] {
        if self.is_closed() {
            &self.vertices[..self.vertices.len() - 1]
        } else {
            &self.vertices
        }
    }

    /// 遍历所有边；未闭合的环补上最后一条闭合边
    pub fn edges(&self) -> impl Iterator<Item = (Point2, Point2)> + '_ {
        let corners = self.corners();
        let n = corners.len();
        let count = if n < 2 { 0 } else { n };
        (0..count).map(move |i| (corners[i], corners[(i + 1) % n]))
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        if self.vertices.is_empty() {
            return BoundingBox2::empty();
        }
        BoundingBox2::from_points(self.vertices.iter().copied())
    }

    /// 有向面积（鞋带公式），逆时针为正
    pub fn signed_area(&self) -> f64 {
        let twice: f64 = self
            .edges()
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum();
        twice / 2.0
    }

    /// 校验环能否作为已提交区域的边界
    pub fn validate(&self) -> Result<(), ZoneError> {
        if let Some(index) = self
            .vertices
            .iter()
            .position(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(ZoneError::NonFinite { index });
        }
        if !self.is_polygon() {
            return Err(ZoneError::TooFewVertices {
                count: self.vertices.len(),
                min: MIN_POLYGON_VERTICES,
            });
        }
        if !self.is_closed() {
            return Err(ZoneError::NotClosed);
        }
        Ok(())
    }

    /// 移动一个角点，返回新环；移动首点时同步移动闭合点
    pub fn with_vertex(&self, index: usize, point: Point2) -> Ring {
        let mut vertices = self.vertices.clone();
        let closed = self.is_closed();
        if let Some(v) = vertices.get_mut(index) {
            *v = point;
        }
        if closed {
            let last = vertices.len() - 1;
            if index == 0 {
                vertices[last] = point;
            } else if index == last {
                vertices[0] = point;
            }
        }
        Ring { vertices }
    }
}

impl FromIterator<Point2> for Ring {
    fn from_iter<T: IntoIterator<Item = Point2>>(iter: T) -> Self {
        Ring::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{lng_lat, EPSILON};

    fn unit_square() -> Ring {
        Ring::closed([
            lng_lat(0.0, 0.0),
            lng_lat(1.0, 0.0),
            lng_lat(1.0, 1.0),
            lng_lat(0.0, 1.0),
        ])
    }

    #[test]
    fn test_closed_appends_first_vertex_once() {
        let ring = unit_square();
        assert_eq!(ring.len(), 5);
        assert!(ring.is_closed());

        let again = Ring::closed(ring.vertices().iter().copied());
        assert_eq!(again, ring);
    }

    #[test]
    fn test_polygon_threshold() {
        let triangle = Ring::closed([lng_lat(0.0, 0.0), lng_lat(1.0, 0.0), lng_lat(0.0, 1.0)]);
        assert_eq!(triangle.len(), 4);
        assert!(triangle.is_polygon());

        let segment = Ring::closed([lng_lat(0.0, 0.0), lng_lat(1.0, 0.0)]);
        assert_eq!(segment.len(), 3);
        assert!(!segment.is_polygon());
        assert_eq!(
            segment.validate(),
            Err(ZoneError::TooFewVertices { count: 3, min: 4 })
        );
    }

    #[test]
    fn test_validate_rejects_open_and_non_finite() {
        let open = Ring::new(vec![
            lng_lat(0.0, 0.0),
            lng_lat(1.0, 0.0),
            lng_lat(1.0, 1.0),
            lng_lat(0.0, 1.0),
        ]);
        assert_eq!(open.validate(), Err(ZoneError::NotClosed));

        let bad = Ring::closed([lng_lat(0.0, 0.0), lng_lat(f64::NAN, 0.0), lng_lat(0.0, 1.0)]);
        assert_eq!(bad.validate(), Err(ZoneError::NonFinite { index: 1 }));

        assert!(unit_square().validate().is_ok());
    }

    #[test]
    fn test_edges_and_area() {
        let ring = unit_square();
        assert_eq!(ring.edges().count(), 4);
        assert!((ring.signed_area() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_with_vertex_moves_closing_point() {
        let moved = unit_square().with_vertex(0, lng_lat(-1.0, -1.0));
        assert!(moved.is_closed());
        assert_eq!(moved.vertices()[4], lng_lat(-1.0, -1.0));
    }
}
