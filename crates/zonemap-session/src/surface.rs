//! 绘图面接口
//!
//! 会话通过 [`DrawingSurface`] 驱动地图上的要素与填充图层，
//! 用户在绘图面上的操作以 [`SurfaceEvent`] 的形式回送给会话。
//!
//! [`RecordingSurface`] 是无界面的实现：保存要素、图层与正在绘制的草稿，
//! 并记录收到的每条命令，供测试和脚本回放使用。

use crate::event::SurfaceEvent;
use serde::{Deserialize, Serialize};
use zonemap_core::math::Point2;
use zonemap_core::ring::Ring;
use zonemap_core::zone::{DraftId, ZoneStyle};

/// 绘图面交互模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceMode {
    /// 逐点绘制多边形
    #[default]
    DrawPolygon,
    /// 选择整个要素
    SimpleSelect,
    /// 拖动要素顶点
    DirectSelect,
}

impl SurfaceMode {
    pub fn name(&self) -> &'static str {
        match self {
            SurfaceMode::DrawPolygon => "draw_polygon",
            SurfaceMode::SimpleSelect => "simple_select",
            SurfaceMode::DirectSelect => "direct_select",
        }
    }
}

/// 会话对绘图面的控制能力
pub trait DrawingSurface {
    /// 添加要素，返回绘图面分配的 id
    fn add_feature(&mut self, ring: &Ring, style: &ZoneStyle) -> DraftId;

    fn remove_feature(&mut self, draft_id: &DraftId);

    /// 替换要素的几何（用于回滚拖动）
    fn replace_feature_geometry(&mut self, draft_id: &DraftId, ring: &Ring);

    fn set_mode(&mut self, mode: SurfaceMode);

    /// 丢弃正在绘制的草稿
    fn discard_active_draft(&mut self);

    /// 绘制或刷新区域的填充图层
    fn render_zone_layer(&mut self, draft_id: &DraftId, ring: &Ring, style: &ZoneStyle);

    fn remove_zone_layer(&mut self, draft_id: &DraftId);

    fn select_feature(&mut self, draft_id: &DraftId);

    /// 正在绘制的草稿及其当前边界
    fn active_draft(&self) -> Option<(DraftId, Ring)>;
}

/// 绘图面收到的命令
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    AddFeature { draft_id: DraftId },
    RemoveFeature { draft_id: DraftId },
    ReplaceGeometry { draft_id: DraftId, ring: Ring },
    SetMode(SurfaceMode),
    DiscardActiveDraft { draft_id: Option<DraftId> },
    RenderLayer { draft_id: DraftId, style: ZoneStyle },
    RemoveLayer { draft_id: DraftId },
    SelectFeature { draft_id: DraftId },
}

/// 绘图面上的要素
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceFeature {
    pub draft_id: DraftId,
    pub ring: Ring,
}

/// 区域填充图层
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneLayer {
    pub draft_id: DraftId,
    pub ring: Ring,
    pub style: ZoneStyle,
}

#[derive(Debug, Clone)]
struct ActiveDraft {
    draft_id: DraftId,
    corners: Vec<Point2>,
}

/// 无界面绘图面
#[derive(Debug, Default)]
pub struct RecordingSurface {
    features: Vec<SurfaceFeature>,
    layers: Vec<ZoneLayer>,
    active: Option<ActiveDraft>,
    mode: SurfaceMode,
    selected: Option<DraftId>,
    commands: Vec<SurfaceCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== 查询 ==========

    pub fn features(&self) -> &[SurfaceFeature] {
        &self.features
    }

    pub fn feature(&self, draft_id: &DraftId) -> Option<&Ring> {
        self.features
            .iter()
            .find(|f| &f.draft_id == draft_id)
            .map(|f| &f.ring)
    }

    pub fn layers(&self) -> &[ZoneLayer] {
        &self.layers
    }

    pub fn layer(&self, draft_id: &DraftId) -> Option<&ZoneLayer> {
        self.layers.iter().find(|l| &l.draft_id == draft_id)
    }

    pub fn mode(&self) -> SurfaceMode {
        self.mode
    }

    pub fn selected(&self) -> Option<&DraftId> {
        self.selected.as_ref()
    }

    /// 已收到的命令
    pub fn commands(&self) -> &[SurfaceCommand] {
        &self.commands
    }

    /// 取出并清空命令记录
    pub fn take_commands(&mut self) -> Vec<SurfaceCommand> {
        std::mem::take(&mut self.commands)
    }

    // ========== 模拟用户操作 ==========
    //
    // 以下方法修改绘图面状态并返回对应的事件，由调用方交给会话处理。

    /// 开始绘制新草稿
    pub fn begin_draft(&mut self) -> DraftId {
        let draft_id = DraftId::generate();
        self.mode = SurfaceMode::DrawPolygon;
        self.active = Some(ActiveDraft {
            draft_id: draft_id.clone(),
            corners: Vec::new(),
        });
        draft_id
    }

    /// 在地图上点击；绘制模式下同时为草稿添加一个角点
    pub fn click(&mut self, point: Point2) -> SurfaceEvent {
        if self.mode == SurfaceMode::DrawPolygon {
            if self.active.is_none() {
                self.begin_draft();
            }
            if let Some(active) = self.active.as_mut() {
                active.corners.push(point);
            }
        }
        SurfaceEvent::PointerClick {
            lng: point.x,
            lat: point.y,
        }
    }

    /// 完成草稿，草稿成为绘图面上的要素
    pub fn complete_draft(&mut self) -> Option<SurfaceEvent> {
        let active = self.active.take()?;
        if active.corners.is_empty() {
            return None;
        }
        let ring = Ring::closed(active.corners);
        self.features.push(SurfaceFeature {
            draft_id: active.draft_id.clone(),
            ring: ring.clone(),
        });
        self.mode = SurfaceMode::SimpleSelect;
        Some(SurfaceEvent::DraftComplete {
            draft_id: active.draft_id,
            ring,
        })
    }

    /// 拖动要素的一个角点
    pub fn drag_vertex(&mut self, draft_id: &DraftId, index: usize, point: Point2) -> Option<SurfaceEvent> {
        let feature = self.features.iter_mut().find(|f| &f.draft_id == draft_id)?;
        if index >= feature.ring.len() {
            return None;
        }
        feature.ring = feature.ring.with_vertex(index, point);
        self.mode = SurfaceMode::DirectSelect;
        Some(SurfaceEvent::VertexUpdated {
            draft_id: draft_id.clone(),
            ring: feature.ring.clone(),
        })
    }

    /// 用户在绘图面上删除要素
    pub fn delete_feature(&mut self, draft_id: &DraftId) -> Option<SurfaceEvent> {
        let index = self.features.iter().position(|f| &f.draft_id == draft_id)?;
        self.features.remove(index);
        if self.selected.as_ref() == Some(draft_id) {
            self.selected = None;
        }
        Some(SurfaceEvent::Deleted {
            draft_id: draft_id.clone(),
        })
    }

    /// 用户选择要素（`None` 为取消选择）
    pub fn select(&mut self, draft_id: Option<DraftId>) -> SurfaceEvent {
        self.selected = draft_id.clone();
        SurfaceEvent::SelectionChanged { draft_id }
    }

    /// 用户切换模式
    pub fn change_mode(&mut self, mode: SurfaceMode) -> SurfaceEvent {
        self.mode = mode;
        SurfaceEvent::ModeChanged { mode }
    }
}

impl DrawingSurface for RecordingSurface {
    fn add_feature(&mut self, ring: &Ring, _style: &ZoneStyle) -> DraftId {
        let draft_id = DraftId::generate();
        self.features.push(SurfaceFeature {
            draft_id: draft_id.clone(),
            ring: ring.clone(),
        });
        self.commands.push(SurfaceCommand::AddFeature {
            draft_id: draft_id.clone(),
        });
        draft_id
    }

    fn remove_feature(&mut self, draft_id: &DraftId) {
        self.features.retain(|f| &f.draft_id != draft_id);
        if self.selected.as_ref() == Some(draft_id) {
            self.selected = None;
        }
        self.commands.push(SurfaceCommand::RemoveFeature {
            draft_id: draft_id.clone(),
        });
    }

    fn replace_feature_geometry(&mut self, draft_id: &DraftId, ring: &Ring) {
        if let Some(feature) = self.features.iter_mut().find(|f| &f.draft_id == draft_id) {
            feature.ring = ring.clone();
        }
        self.commands.push(SurfaceCommand::ReplaceGeometry {
            draft_id: draft_id.clone(),
            ring: ring.clone(),
        });
    }

    fn set_mode(&mut self, mode: SurfaceMode) {
        self.mode = mode;
        self.commands.push(SurfaceCommand::SetMode(mode));
    }

    fn discard_active_draft(&mut self) {
        let draft_id = self.active.take().map(|a| a.draft_id);
        self.commands
            .push(SurfaceCommand::DiscardActiveDraft { draft_id });
    }

    fn render_zone_layer(&mut self, draft_id: &DraftId, ring: &Ring, style: &ZoneStyle) {
        let layer = ZoneLayer {
            draft_id: draft_id.clone(),
            ring: ring.clone(),
            style: style.clone(),
        };
        match self.layers.iter_mut().find(|l| &l.draft_id == draft_id) {
            Some(existing) => *existing = layer,
            None => self.layers.push(layer),
        }
        self.commands.push(SurfaceCommand::RenderLayer {
            draft_id: draft_id.clone(),
            style: style.clone(),
        });
    }

    fn remove_zone_layer(&mut self, draft_id: &DraftId) {
        self.layers.retain(|l| &l.draft_id != draft_id);
        self.commands.push(SurfaceCommand::RemoveLayer {
            draft_id: draft_id.clone(),
        });
    }

    fn select_feature(&mut self, draft_id: &DraftId) {
        self.selected = Some(draft_id.clone());
        self.commands.push(SurfaceCommand::SelectFeature {
            draft_id: draft_id.clone(),
        });
    }

    fn active_draft(&self) -> Option<(DraftId, Ring)> {
        self.active
            .as_ref()
            .map(|a| (a.draft_id.clone(), Ring::closed(a.corners.iter().copied())))
    }
}
