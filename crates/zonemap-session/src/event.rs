//! 会话输入
//!
//! 绘图面事件与表单输入都是封闭的枚举，字段显式，不透传原始对象。

use crate::surface::SurfaceMode;
use serde::{Deserialize, Serialize};
use zonemap_core::ring::Ring;
use zonemap_core::zone::{DraftId, ZoneStyle};

/// 绘图面事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceEvent {
    /// 草稿绘制完成
    DraftComplete { draft_id: DraftId, ring: Ring },
    /// 拖动顶点后的新边界
    VertexUpdated { draft_id: DraftId, ring: Ring },
    /// 用户删除了要素
    Deleted { draft_id: DraftId },
    /// 选择变化（`None` 为取消选择）
    SelectionChanged { draft_id: Option<DraftId> },
    /// 地图点击
    PointerClick { lng: f64, lat: f64 },
    /// 交互模式变化
    ModeChanged { mode: SurfaceMode },
}

impl SurfaceEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SurfaceEvent::DraftComplete { .. } => "draft_complete",
            SurfaceEvent::VertexUpdated { .. } => "vertex_updated",
            SurfaceEvent::Deleted { .. } => "deleted",
            SurfaceEvent::SelectionChanged { .. } => "selection_changed",
            SurfaceEvent::PointerClick { .. } => "pointer_click",
            SurfaceEvent::ModeChanged { .. } => "mode_changed",
        }
    }
}

/// 名称/颜色表单与提示框的用户输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// 确认新区域的名称与颜色
    ConfirmCreate(ZoneStyle),
    CancelCreate,
    /// 打开选中区域的编辑表单
    EditSelected,
    /// 确认修改名称与颜色
    ConfirmUpdate(ZoneStyle),
    CancelUpdate,
    /// 关闭当前提示
    DismissNotice,
}
