//! ZoneMap 核心
//!
//! 提供地理区域（多边形）的几何校验、区域模型与有序区域存储。
//!
//! # 架构设计
//!
//! - `Ring`: 闭合的经纬度顶点序列
//! - `GeometryValidator`: 相交与包含判断，无状态
//! - `Zone`: 已提交的区域（草稿 id、持久化 id、名称、颜色、边界）
//! - `ZoneStore`: 按草稿 id 寻址的有序区域集合，带选择指针与变更订阅
//!
//! # 示例
//!
//! ```rust
//! use zonemap_core::prelude::*;
//!
//! let a = Ring::closed([lng_lat(0.0, 0.0), lng_lat(2.0, 0.0), lng_lat(2.0, 2.0), lng_lat(0.0, 2.0)]);
//! let b = Ring::closed([lng_lat(1.0, 1.0), lng_lat(3.0, 1.0), lng_lat(3.0, 3.0), lng_lat(1.0, 3.0)]);
//!
//! assert!(intersects(&a, &b));
//! assert!(point_inside(&lng_lat(0.5, 0.5), &a));
//! ```

pub mod error;
pub mod math;
pub mod ring;
pub mod store;
pub mod validator;
pub mod wire;
pub mod zone;

pub use error::ZoneError;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::error::ZoneError;
    pub use crate::math::{lng_lat, BoundingBox2, Point2, Vector2, EPSILON};
    pub use crate::ring::{Ring, MIN_POLYGON_VERTICES};
    pub use crate::store::{StoreEvent, Upsert, ZoneStore};
    pub use crate::validator::{intersects, point_inside, GeometryValidator, IntersectionPolicy};
    pub use crate::wire::{WirePoint, ZoneRecord};
    pub use crate::zone::{DraftId, PersistedId, SyncStatus, Zone, ZoneStyle, DEFAULT_COLOR};
}
