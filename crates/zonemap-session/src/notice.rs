//! 面向用户的提示

use thiserror::Error;
use zonemap_core::zone::DraftId;
use zonemap_sync::SyncOpKind;

/// 会话向用户展示的提示
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// 正在绘制的草稿与已有区域相交，草稿已丢弃
    #[error("Current zone being drawn intersects with an existing zone, please redraw valid zone.")]
    DraftIntersects,

    /// 拖动后的边界与其他区域相交，已回滚
    #[error("Zones can't intersect")]
    ZonesIntersect,

    /// 边界角点不足，已回滚
    #[error("A zone needs at least three corners.")]
    TooFewCorners,

    /// 远端同步失败，本地已回到上次确认的状态
    #[error("Could not {kind} zone on the server, local changes were reverted: {reason}")]
    SyncFailed {
        draft_id: DraftId,
        kind: SyncOpKind,
        reason: String,
    },
}

impl Notice {
    pub fn is_sync_failure(&self) -> bool {
        matches!(self, Notice::SyncFailed { .. })
    }
}
