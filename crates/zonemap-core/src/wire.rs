//! 区域的线上表示
//!
//! ```json
//! { "id": "...", "label": "...", "color": "#4BD80D",
//!   "points": [{ "lat": "30.05", "lng": "31.29" }, ...] }
//! ```
//!
//! 坐标以十进制度数字符串传输，避免浮点往返漂移。
//! 旧后端使用 `_id` 字段名，读取时一并接受。

use crate::error::ZoneError;
use crate::math::{lng_lat, Point2};
use crate::ring::Ring;
use crate::zone::{PersistedId, Zone, ZoneStyle};
use serde::{Deserialize, Serialize};

/// 线上坐标点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePoint {
    pub lat: String,
    pub lng: String,
}

impl WirePoint {
    /// 使用最短往返表示格式化坐标
    pub fn from_point(point: &Point2) -> Self {
        Self {
            lat: point.y.to_string(),
            lng: point.x.to_string(),
        }
    }

    pub fn to_point(&self) -> Result<Point2, ZoneError> {
        Ok(lng_lat(parse_degrees(&self.lng)?, parse_degrees(&self.lat)?))
    }
}

fn parse_degrees(value: &str) -> Result<f64, ZoneError> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|e: std::num::ParseFloatError| ZoneError::InvalidCoordinate {
            value: value.to_string(),
            reason: e.to_string(),
        })?;
    if !parsed.is_finite() {
        return Err(ZoneError::InvalidCoordinate {
            value: value.to_string(),
            reason: "not a finite number".to_string(),
        });
    }
    Ok(parsed)
}

/// 区域记录（持久化接口的请求/响应体）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecord {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub label: String,
    pub color: String,
    pub points: Vec<WirePoint>,
}

impl ZoneRecord {
    /// 由本地区域生成记录（携带已知的持久化 id）
    pub fn from_zone(zone: &Zone) -> Self {
        Self {
            id: zone.persisted_id.as_ref().map(|id| id.as_str().to_string()),
            label: zone.style.label.clone(),
            color: zone.style.color.clone(),
            points: zone.ring.vertices().iter().map(WirePoint::from_point).collect(),
        }
    }

    pub fn persisted_id(&self) -> Option<PersistedId> {
        self.id.as_deref().map(PersistedId::new)
    }

    pub fn style(&self) -> Result<ZoneStyle, ZoneError> {
        ZoneStyle::new(self.label.clone(), self.color.clone())
    }

    /// 解析坐标并校验为合法的闭合多边形
    pub fn ring(&self) -> Result<Ring, ZoneError> {
        let ring: Ring = self
            .points
            .iter()
            .map(WirePoint::to_point)
            .collect::<Result<Vec<_>, _>>()
            .map(Ring::new)?;
        ring.validate()?;
        Ok(ring)
    }

    /// 去掉 id 后的副本（用于创建请求）
    pub fn without_id(&self) -> Self {
        Self {
            id: None,
            ..self.clone()
        }
    }
}
