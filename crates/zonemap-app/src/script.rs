//! 会话脚本回放
//!
//! 脚本是 JSON 步骤数组，驱动无界面绘图面：
//!
//! ```json
//! [
//!   { "step": "begin_draft" },
//!   { "step": "click", "lng": 31.18, "lat": 30.033 },
//!   { "step": "complete_draft" },
//!   { "step": "confirm_create", "label": "New zone", "color": "#abc" },
//!   { "step": "settle" }
//! ]
//! ```
//!
//! 区域按名称引用。

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use zonemap_core::math::lng_lat;
use zonemap_core::zone::{DraftId, ZoneStyle};
use zonemap_session::{Reaction, Reconciler, RecordingSurface, SurfaceMode, UserInput};

/// 脚本步骤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    BeginDraft,
    Click {
        lng: f64,
        lat: f64,
    },
    CompleteDraft,
    ConfirmCreate {
        label: String,
        #[serde(default)]
        color: String,
    },
    CancelCreate,
    DragVertex {
        zone: String,
        index: usize,
        lng: f64,
        lat: f64,
    },
    Delete {
        zone: String,
    },
    Select {
        zone: String,
    },
    ClearSelection,
    EditSelected,
    ConfirmUpdate {
        label: String,
        #[serde(default)]
        color: String,
    },
    CancelUpdate,
    DismissNotice,
    SetMode {
        mode: SurfaceMode,
    },
    /// 等待远端操作完成
    Settle,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::BeginDraft => "begin_draft",
            Step::Click { .. } => "click",
            Step::CompleteDraft => "complete_draft",
            Step::ConfirmCreate { .. } => "confirm_create",
            Step::CancelCreate => "cancel_create",
            Step::DragVertex { .. } => "drag_vertex",
            Step::Delete { .. } => "delete",
            Step::Select { .. } => "select",
            Step::ClearSelection => "clear_selection",
            Step::EditSelected => "edit_selected",
            Step::ConfirmUpdate { .. } => "confirm_update",
            Step::CancelUpdate => "cancel_update",
            Step::DismissNotice => "dismiss_notice",
            Step::SetMode { .. } => "set_mode",
            Step::Settle => "settle",
        }
    }
}

/// 回放统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub steps: usize,
    pub rejected: usize,
}

pub fn from_json(text: &str) -> Result<Vec<Step>> {
    Ok(serde_json::from_str(text)?)
}

pub fn load(path: &Path) -> Result<Vec<Step>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    from_json(&text).with_context(|| format!("invalid script {}", path.display()))
}

/// 依次执行步骤；任一步骤在当前状态下无效时停止
pub async fn replay(reconciler: &mut Reconciler<RecordingSurface>, steps: &[Step]) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (index, step) in steps.iter().enumerate() {
        let reaction = run_step(reconciler, step)
            .await
            .with_context(|| format!("step {} ({}) failed", index + 1, step.name()))?;

        match &reaction {
            Reaction::Rejected(notice) => {
                summary.rejected += 1;
                info!("Step {} ({}) rejected: {}", index + 1, step.name(), notice);
            }
            other => debug!("Step {} ({}): {:?}", index + 1, step.name(), other),
        }
        summary.steps += 1;
    }

    Ok(summary)
}

async fn run_step(reconciler: &mut Reconciler<RecordingSurface>, step: &Step) -> Result<Reaction> {
    let reaction = match step {
        Step::BeginDraft => {
            reconciler.surface_mut().begin_draft();
            Reaction::Continue
        }
        Step::Click { lng, lat } => {
            let event = reconciler.surface_mut().click(lng_lat(*lng, *lat));
            reconciler.handle(event)
        }
        Step::CompleteDraft => {
            let event = reconciler
                .surface_mut()
                .complete_draft()
                .ok_or_else(|| anyhow!("no draft in progress"))?;
            reconciler.handle(event)
        }
        Step::ConfirmCreate { label, color } => {
            let style = ZoneStyle::new(label.as_str(), color.as_str())?;
            reconciler.apply(UserInput::ConfirmCreate(style))?
        }
        Step::CancelCreate => reconciler.apply(UserInput::CancelCreate)?,
        Step::DragVertex {
            zone,
            index,
            lng,
            lat,
        } => {
            let draft_id = zone_id(reconciler, zone)?;
            let event = reconciler
                .surface_mut()
                .drag_vertex(&draft_id, *index, lng_lat(*lng, *lat))
                .ok_or_else(|| anyhow!("zone \"{}\" has no vertex {}", zone, index))?;
            reconciler.handle(event)
        }
        Step::Delete { zone } => {
            let draft_id = zone_id(reconciler, zone)?;
            let event = reconciler
                .surface_mut()
                .delete_feature(&draft_id)
                .ok_or_else(|| anyhow!("zone \"{}\" is not on the map", zone))?;
            reconciler.handle(event)
        }
        Step::Select { zone } => {
            let draft_id = zone_id(reconciler, zone)?;
            let event = reconciler.surface_mut().select(Some(draft_id));
            reconciler.handle(event)
        }
        Step::ClearSelection => {
            let event = reconciler.surface_mut().select(None);
            reconciler.handle(event)
        }
        Step::EditSelected => reconciler.apply(UserInput::EditSelected)?,
        Step::ConfirmUpdate { label, color } => {
            let style = ZoneStyle::new(label.as_str(), color.as_str())?;
            reconciler.apply(UserInput::ConfirmUpdate(style))?
        }
        Step::CancelUpdate => reconciler.apply(UserInput::CancelUpdate)?,
        Step::DismissNotice => reconciler.apply(UserInput::DismissNotice)?,
        Step::SetMode { mode } => {
            let event = reconciler.surface_mut().change_mode(*mode);
            reconciler.handle(event)
        }
        Step::Settle => {
            let applied = reconciler.settle().await;
            debug!("Applied {} sync outcomes", applied);
            Reaction::Continue
        }
    };
    Ok(reaction)
}

fn zone_id(reconciler: &Reconciler<RecordingSurface>, label: &str) -> Result<DraftId> {
    reconciler
        .store()
        .iter()
        .find(|zone| zone.label() == label)
        .map(|zone| zone.draft_id.clone())
        .ok_or_else(|| anyhow!("no zone labelled \"{}\"", label))
}
