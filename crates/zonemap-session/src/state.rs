//! 会话状态

use zonemap_core::ring::Ring;
use zonemap_core::zone::DraftId;

/// 调和状态机的状态
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    /// 选择模式下没有选中任何区域
    Idle,
    /// 绘制模式（初始状态）
    #[default]
    Drawing,
    /// 草稿已完成，等待名称与颜色
    AwaitingCreateMetadata { draft_id: DraftId, ring: Ring },
    /// 正在拖动选中区域的顶点
    Editing,
    /// 编辑表单已打开，绑定到打开时的区域
    AwaitingUpdateMetadata { draft_id: DraftId },
    /// 选中了一个区域
    Selected,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Drawing => "Drawing",
            SessionState::AwaitingCreateMetadata { .. } => "AwaitingCreateMetadata",
            SessionState::Editing => "Editing",
            SessionState::AwaitingUpdateMetadata { .. } => "AwaitingUpdateMetadata",
            SessionState::Selected => "Selected",
        }
    }

    /// 是否有表单打开（此时模式切换不改变状态）
    pub fn is_awaiting_metadata(&self) -> bool {
        matches!(
            self,
            SessionState::AwaitingCreateMetadata { .. } | SessionState::AwaitingUpdateMetadata { .. }
        )
    }

    /// 状态是否绑定到指定区域
    pub fn refers_to(&self, id: &DraftId) -> bool {
        match self {
            SessionState::AwaitingCreateMetadata { draft_id, .. }
            | SessionState::AwaitingUpdateMetadata { draft_id } => draft_id == id,
            _ => false,
        }
    }
}
