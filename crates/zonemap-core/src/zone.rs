//! 区域模型
//!
//! 区域由绘图面分配的 `DraftId` 标识；首次远端创建成功后
//! 再附上持久化 id。

use crate::error::ZoneError;
use crate::ring::Ring;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 未指定颜色时的默认填充色
pub const DEFAULT_COLOR: &str = "#000";

/// 绘图面分配的要素 id，在要素生命周期内保持不变
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftId(String);

impl DraftId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 生成随机 id（32 位十六进制，与常见绘图控件的要素 id 格式一致）
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 远端存储分配的持久化 id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedId(String);

impl PersistedId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersistedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 区域的显示属性：名称与填充色
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneStyle {
    pub label: String,
    pub color: String,
}

impl ZoneStyle {
    /// 校验并构造；颜色为空时使用默认色
    pub fn new(label: impl Into<String>, color: impl Into<String>) -> Result<Self, ZoneError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(ZoneError::EmptyLabel);
        }

        let color = color.into();
        let color = if color.trim().is_empty() {
            DEFAULT_COLOR.to_string()
        } else {
            color
        };
        if !is_color_token(&color) {
            return Err(ZoneError::InvalidColor(color));
        }

        Ok(Self { label, color })
    }
}

/// 颜色记号：`#rgb` / `#rrggbb` / `#rrggbbaa`，或纯字母的颜色名
fn is_color_token(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => matches!(hex.len(), 3 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => !color.is_empty() && color.chars().all(|c| c.is_ascii_alphabetic()),
    }
}

/// 与远端的同步状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncStatus {
    /// 本地修改尚未被远端确认
    #[default]
    Pending,
    /// 本地内容与最近一次远端确认一致
    Synced,
    /// 最近一次同步失败，已回滚到上次确认的状态
    Failed,
}

/// 已提交的区域
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub draft_id: DraftId,
    pub persisted_id: Option<PersistedId>,
    pub style: ZoneStyle,
    pub ring: Ring,
    pub sync: SyncStatus,
}

impl Zone {
    /// 新建区域（尚无持久化 id，状态为待同步）
    pub fn new(draft_id: DraftId, style: ZoneStyle, ring: Ring) -> Self {
        Self {
            draft_id,
            persisted_id: None,
            style,
            ring,
            sync: SyncStatus::Pending,
        }
    }

    /// 从远端加载的区域（已同步）
    pub fn synced(draft_id: DraftId, persisted_id: PersistedId, style: ZoneStyle, ring: Ring) -> Self {
        Self {
            draft_id,
            persisted_id: Some(persisted_id),
            style,
            ring,
            sync: SyncStatus::Synced,
        }
    }

    pub fn label(&self) -> &str {
        &self.style.label
    }

    pub fn color(&self) -> &str {
        &self.style.color
    }

    /// 替换边界后的副本
    pub fn with_ring(&self, ring: Ring) -> Self {
        Self {
            ring,
            ..self.clone()
        }
    }

    /// 替换名称与颜色后的副本
    pub fn with_style(&self, style: ZoneStyle) -> Self {
        Self {
            style,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_validation() {
        assert_eq!(ZoneStyle::new("  ", "#fff"), Err(ZoneError::EmptyLabel));
        assert_eq!(
            ZoneStyle::new("a", "#12"),
            Err(ZoneError::InvalidColor("#12".to_string()))
        );
        assert!(ZoneStyle::new("a", "#4BD80D").is_ok());
        assert!(ZoneStyle::new("a", "red").is_ok());

        let defaulted = ZoneStyle::new("a", "").unwrap();
        assert_eq!(defaulted.color, DEFAULT_COLOR);
    }

    #[test]
    fn test_generated_draft_ids_are_unique() {
        let a = DraftId::generate();
        let b = DraftId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }
}
