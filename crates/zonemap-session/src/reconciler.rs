//! 绘制会话调和器
//!
//! 消费绘图面事件与表单输入，调用几何校验，修改区域存储，
//! 并把远端操作提交给同步队列。校验不通过时命令绘图面回滚显示，
//! 同步失败时把存储与绘图面回滚到远端最近一次确认的状态。
//!
//! 状态转换：
//! - `Drawing` --完成草稿--> `AwaitingCreateMetadata` --确认/取消--> `Drawing`
//! - 选择区域 --> `Selected` --打开表单--> `AwaitingUpdateMetadata` --确认/取消--> `Selected`
//! - 直接选择模式下有选中区域 --> `Editing`
//!
//! 所有处理都在调用方线程上同步完成；远端操作的结果通过
//! [`Reconciler::drain_sync_outcomes`] 或 [`Reconciler::settle`] 回到会话。

use crate::error::{SessionError, SessionResult};
use crate::event::{SurfaceEvent, UserInput};
use crate::ledger::SyncLedger;
use crate::notice::Notice;
use crate::state::SessionState;
use crate::surface::{DrawingSurface, SurfaceMode};
use futures::channel::mpsc;
use std::sync::Arc;
use zonemap_core::math::{lng_lat, Point2};
use zonemap_core::ring::Ring;
use zonemap_core::store::{StoreEvent, ZoneStore};
use zonemap_core::validator::GeometryValidator;
use zonemap_core::wire::ZoneRecord;
use zonemap_core::zone::{DraftId, PersistedId, SyncStatus, Zone, ZoneStyle};
use zonemap_sync::{SyncError, SyncOp, SyncOpKind, SyncOutcome, SyncQueue, SyncResult, ZoneRepository};

/// 会话上下文：绘图面、区域存储与校验器
pub struct SessionContext<S: DrawingSurface> {
    pub surface: S,
    pub store: ZoneStore,
    pub validator: GeometryValidator,
}

impl<S: DrawingSurface> SessionContext<S> {
    pub fn new(surface: S, validator: GeometryValidator) -> Self {
        Self {
            surface,
            store: ZoneStore::new(),
            validator,
        }
    }

    /// 候选边界是否与 `exclude` 以外的任一已提交区域相交
    pub fn intersects_any(&self, ring: &Ring, exclude: Option<&DraftId>) -> bool {
        self.store
            .iter()
            .filter(|zone| Some(&zone.draft_id) != exclude)
            .any(|zone| self.validator.intersects(ring, &zone.ring))
    }
}

/// 处理一个事件或输入的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    /// 与当前状态无关，未做处理
    Ignored,
    /// 已处理，无需进一步动作
    Continue,
    /// 需要打开新区域表单
    OpenCreateForm { draft_id: DraftId },
    /// 需要打开编辑表单，预填当前名称与颜色
    OpenUpdateForm { draft_id: DraftId, style: ZoneStyle },
    /// 新区域已提交
    Committed { draft_id: DraftId },
    /// 区域已修改
    Updated { draft_id: DraftId },
    /// 区域已删除
    Removed { draft_id: DraftId },
    /// 草稿或表单已取消
    Cancelled,
    /// 被拒绝并已回滚
    Rejected(Notice),
    /// 选择指针变化
    Selected(Option<usize>),
}

/// 绘制会话调和器
pub struct Reconciler<S: DrawingSurface> {
    context: SessionContext<S>,
    state: SessionState,
    mode: SurfaceMode,
    notice: Option<Notice>,
    queue: SyncQueue,
    outcomes: mpsc::UnboundedReceiver<SyncOutcome>,
    ledger: SyncLedger,
}

impl<S: DrawingSurface> Reconciler<S> {
    pub fn new(context: SessionContext<S>, repository: Arc<dyn ZoneRepository>) -> Self {
        let (queue, outcomes) = SyncQueue::new(repository);
        Self {
            context,
            state: SessionState::default(),
            mode: SurfaceMode::DrawPolygon,
            notice: None,
            queue,
            outcomes,
            ledger: SyncLedger::new(),
        }
    }

    // ========== 查询 ==========

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn mode(&self) -> SurfaceMode {
        self.mode
    }

    /// 当前提示
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn context(&self) -> &SessionContext<S> {
        &self.context
    }

    pub fn store(&self) -> &ZoneStore {
        &self.context.store
    }

    /// 订阅存储变更
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StoreEvent> {
        self.context.store.subscribe()
    }

    pub fn surface(&self) -> &S {
        &self.context.surface
    }

    /// 绘图面的可变引用（用于模拟用户操作）
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.context.surface
    }

    pub fn ledger(&self) -> &SyncLedger {
        &self.ledger
    }

    /// 尚未完成的远端操作数
    pub fn pending_sync(&self) -> usize {
        self.queue.pending()
    }

    pub fn into_context(self) -> SessionContext<S> {
        self.context
    }

    // ========== 加载 ==========

    /// 从远端加载全部区域，返回加载数量；无法解析的记录跳过
    pub async fn load(&mut self) -> SyncResult<usize> {
        let records = self.queue.fetch_all().await?;
        let mut loaded = 0;

        for record in records {
            let (persisted_id, style, ring) = match loaded_parts(&record) {
                Ok(parts) => parts,
                Err(e) => {
                    tracing::warn!("Skipping zone \"{}\": {}", record.label, e);
                    continue;
                }
            };

            let draft_id = self.context.surface.add_feature(&ring, &style);
            self.context.surface.render_zone_layer(&draft_id, &ring, &style);
            let zone = Zone::synced(draft_id, persisted_id, style, ring);
            self.ledger.acknowledge(zone.clone());
            self.context.store.upsert(zone);
            loaded += 1;
        }

        self.enter_drawing();
        tracing::info!("Loaded {} zones", loaded);
        Ok(loaded)
    }

    // ========== 绘图面事件 ==========

    pub fn handle(&mut self, event: SurfaceEvent) -> Reaction {
        tracing::debug!("Handling {} in {}", event.name(), self.state.name());
        match event {
            SurfaceEvent::PointerClick { lng, lat } => self.on_pointer_click(lng_lat(lng, lat)),
            SurfaceEvent::DraftComplete { draft_id, ring } => self.on_draft_complete(draft_id, ring),
            SurfaceEvent::VertexUpdated { draft_id, ring } => self.on_vertex_updated(draft_id, ring),
            SurfaceEvent::Deleted { draft_id } => self.on_deleted(draft_id),
            SurfaceEvent::SelectionChanged { draft_id } => self.on_selection_changed(draft_id),
            SurfaceEvent::ModeChanged { mode } => self.on_mode_changed(mode),
        }
    }

    fn on_pointer_click(&mut self, point: Point2) -> Reaction {
        if self.state != SessionState::Drawing {
            return Reaction::Ignored;
        }
        if self.context.store.len() < 2 {
            return Reaction::Continue;
        }

        let draft = self.context.surface.active_draft();
        let draft_id = draft.as_ref().map(|(id, _)| id);
        let draft_ring = draft
            .as_ref()
            .map(|(_, ring)| ring)
            .filter(|ring| ring.is_polygon());

        let validator = self.context.validator;
        let violates = self
            .context
            .store
            .iter()
            .filter(|zone| Some(&zone.draft_id) != draft_id)
            .any(|zone| {
                validator.point_inside(&point, &zone.ring)
                    || draft_ring.is_some_and(|ring| validator.intersects(ring, &zone.ring))
            });

        if violates {
            self.context.surface.discard_active_draft();
            self.enter_drawing();
            return self.reject(Notice::DraftIntersects);
        }
        Reaction::Continue
    }

    fn on_draft_complete(&mut self, draft_id: DraftId, ring: Ring) -> Reaction {
        if self.state.is_awaiting_metadata() {
            tracing::warn!("Draft {} completed while a form is open, discarding", draft_id);
            self.context.surface.remove_feature(&draft_id);
            return Reaction::Ignored;
        }

        if let Err(e) = ring.validate() {
            tracing::debug!("Draft {} is not a polygon: {}", draft_id, e);
            self.context.surface.remove_feature(&draft_id);
            self.enter_drawing();
            return self.reject(Notice::TooFewCorners);
        }
        if self.context.intersects_any(&ring, Some(&draft_id)) {
            self.context.surface.remove_feature(&draft_id);
            self.enter_drawing();
            return self.reject(Notice::DraftIntersects);
        }

        self.state = SessionState::AwaitingCreateMetadata {
            draft_id: draft_id.clone(),
            ring,
        };
        Reaction::OpenCreateForm { draft_id }
    }

    fn on_vertex_updated(&mut self, draft_id: DraftId, ring: Ring) -> Reaction {
        let Some(current) = self.context.store.find(&draft_id).cloned() else {
            tracing::debug!("Ignoring vertex update of uncommitted feature {}", draft_id);
            return Reaction::Ignored;
        };

        let violation = if ring.validate().is_err() {
            Some(Notice::TooFewCorners)
        } else if self.context.intersects_any(&ring, Some(&draft_id)) {
            Some(Notice::ZonesIntersect)
        } else {
            None
        };
        if let Some(notice) = violation {
            self.context
                .surface
                .replace_feature_geometry(&draft_id, &current.ring);
            self.context.surface.select_feature(&draft_id);
            return self.reject(notice);
        }

        if ring == current.ring {
            return Reaction::Continue;
        }

        let updated = Zone {
            ring,
            sync: SyncStatus::Pending,
            ..current
        };
        self.context
            .surface
            .render_zone_layer(&draft_id, &updated.ring, &updated.style);
        self.submit(SyncOp::Update {
            draft_id: draft_id.clone(),
            persisted_id: updated.persisted_id.clone(),
            record: ZoneRecord::from_zone(&updated),
        });
        self.context.store.upsert(updated);
        tracing::info!("Updated geometry of zone {}", draft_id);
        Reaction::Updated { draft_id }
    }

    fn on_deleted(&mut self, draft_id: DraftId) -> Reaction {
        if matches!(&self.state, SessionState::AwaitingCreateMetadata { draft_id: pending, .. } if *pending == draft_id)
        {
            self.enter_drawing();
            return Reaction::Cancelled;
        }

        let Some(zone) = self.context.store.remove(&draft_id) else {
            return Reaction::Ignored;
        };
        self.context.surface.remove_zone_layer(&draft_id);
        self.submit(SyncOp::Delete {
            draft_id: draft_id.clone(),
            persisted_id: zone.persisted_id.clone(),
        });
        self.after_removal(&draft_id);
        tracing::info!("Deleted zone \"{}\" ({})", zone.label(), draft_id);
        Reaction::Removed { draft_id }
    }

    fn on_selection_changed(&mut self, draft_id: Option<DraftId>) -> Reaction {
        let index = self.context.store.select_draft(draft_id.as_ref());
        if !self.state.is_awaiting_metadata() {
            self.state = match index {
                Some(_) => SessionState::Selected,
                None => self.state_for_mode(),
            };
        }
        Reaction::Selected(index)
    }

    fn on_mode_changed(&mut self, mode: SurfaceMode) -> Reaction {
        self.mode = mode;
        if !self.state.is_awaiting_metadata() {
            self.state = self.state_for_mode();
        }
        Reaction::Continue
    }

    // ========== 表单输入 ==========

    pub fn apply(&mut self, input: UserInput) -> SessionResult<Reaction> {
        match input {
            UserInput::ConfirmCreate(style) => self.confirm_create(style),
            UserInput::CancelCreate => self.cancel_create(),
            UserInput::EditSelected => self.edit_selected(),
            UserInput::ConfirmUpdate(style) => self.confirm_update(style),
            UserInput::CancelUpdate => self.cancel_update(),
            UserInput::DismissNotice => {
                self.notice = None;
                Ok(Reaction::Continue)
            }
        }
    }

    fn confirm_create(&mut self, style: ZoneStyle) -> SessionResult<Reaction> {
        let (draft_id, ring) = match &self.state {
            SessionState::AwaitingCreateMetadata { draft_id, ring } => (draft_id.clone(), ring.clone()),
            _ => return Err(SessionError::NoPendingDraft),
        };

        let zone = Zone::new(draft_id.clone(), style, ring);
        self.context
            .surface
            .render_zone_layer(&draft_id, &zone.ring, &zone.style);
        self.submit(SyncOp::Create {
            draft_id: draft_id.clone(),
            record: ZoneRecord::from_zone(&zone),
        });
        tracing::info!("Committed zone \"{}\" ({})", zone.label(), draft_id);
        self.context.store.upsert(zone);
        self.enter_drawing();
        Ok(Reaction::Committed { draft_id })
    }

    fn cancel_create(&mut self) -> SessionResult<Reaction> {
        let SessionState::AwaitingCreateMetadata { draft_id, .. } = &self.state else {
            return Err(SessionError::NoPendingDraft);
        };
        let draft_id = draft_id.clone();
        self.context.surface.remove_feature(&draft_id);
        self.enter_drawing();
        Ok(Reaction::Cancelled)
    }

    fn edit_selected(&mut self) -> SessionResult<Reaction> {
        if self.state.is_awaiting_metadata() {
            return Err(SessionError::FormOpen);
        }
        let zone = self.context.store.selected().ok_or(SessionError::NoSelection)?;
        let (draft_id, style) = (zone.draft_id.clone(), zone.style.clone());
        self.state = SessionState::AwaitingUpdateMetadata {
            draft_id: draft_id.clone(),
        };
        Ok(Reaction::OpenUpdateForm { draft_id, style })
    }

    fn confirm_update(&mut self, style: ZoneStyle) -> SessionResult<Reaction> {
        let SessionState::AwaitingUpdateMetadata { draft_id } = &self.state else {
            return Err(SessionError::NoPendingUpdate);
        };
        let draft_id = draft_id.clone();
        let Some(current) = self.context.store.find(&draft_id).cloned() else {
            self.state = self.state_for_mode();
            return Err(SessionError::UnknownZone(draft_id));
        };

        let updated = Zone {
            style,
            sync: SyncStatus::Pending,
            ..current
        };
        self.context
            .surface
            .render_zone_layer(&draft_id, &updated.ring, &updated.style);
        self.submit(SyncOp::Update {
            draft_id: draft_id.clone(),
            persisted_id: updated.persisted_id.clone(),
            record: ZoneRecord::from_zone(&updated),
        });
        tracing::info!("Updated zone {} as \"{}\"", draft_id, updated.label());
        self.context.store.upsert(updated);
        self.state = SessionState::Selected;
        Ok(Reaction::Updated { draft_id })
    }

    fn cancel_update(&mut self) -> SessionResult<Reaction> {
        if !matches!(self.state, SessionState::AwaitingUpdateMetadata { .. }) {
            return Err(SessionError::NoPendingUpdate);
        }
        self.state = match self.context.store.selected() {
            Some(_) => SessionState::Selected,
            None => self.state_for_mode(),
        };
        Ok(Reaction::Cancelled)
    }

    // ========== 同步结果 ==========

    /// 应用已到达的同步结果，返回处理数量
    pub fn drain_sync_outcomes(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(Some(outcome)) = self.outcomes.try_next() {
            self.apply_sync_outcome(outcome);
            applied += 1;
        }
        applied
    }

    /// 等待所有远端操作完成并应用结果
    pub async fn settle(&mut self) -> usize {
        self.queue.flush().await;
        self.drain_sync_outcomes()
    }

    pub fn apply_sync_outcome(&mut self, outcome: SyncOutcome) {
        let draft_id = outcome.draft_id().clone();
        let remaining = self.ledger.finish(&draft_id);

        match outcome {
            SyncOutcome::Created { record, .. } | SyncOutcome::Updated { record, .. } => {
                self.on_acknowledged(&draft_id, &record, remaining);
            }
            SyncOutcome::Deleted { .. } => {
                if remaining == 0 {
                    self.ledger.forget(&draft_id);
                }
            }
            SyncOutcome::Failed { kind, reason, .. } => {
                match kind {
                    SyncOpKind::Create => self.rollback_create(&draft_id),
                    SyncOpKind::Update => self.rollback_update(&draft_id),
                    SyncOpKind::Delete => self.rollback_delete(&draft_id),
                }
                let notice = Notice::SyncFailed {
                    draft_id,
                    kind,
                    reason,
                };
                tracing::warn!("{}", notice);
                self.notice = Some(notice);
            }
        }
    }

    fn on_acknowledged(&mut self, draft_id: &DraftId, record: &ZoneRecord, remaining: usize) {
        let Some(persisted_id) = record.persisted_id() else {
            tracing::warn!("Server acknowledged zone {} without an id", draft_id);
            return;
        };

        if self
            .context
            .store
            .find(draft_id)
            .is_some_and(|zone| zone.persisted_id.is_none())
        {
            self.context
                .store
                .attach_persisted_id(draft_id, persisted_id.clone());
        }

        match (record.style(), record.ring()) {
            (Ok(style), Ok(ring)) => self
                .ledger
                .acknowledge(Zone::synced(draft_id.clone(), persisted_id, style, ring)),
            _ => tracing::warn!("Server returned an unreadable zone for {}", draft_id),
        }

        if remaining > 0 {
            return;
        }
        match self.context.store.find(draft_id).map(|zone| zone.sync) {
            Some(SyncStatus::Pending) => {
                self.context.store.set_sync_status(draft_id, SyncStatus::Synced);
            }
            // 先前失败的回滚已被之后成功的操作覆盖，以远端最新确认为准
            Some(SyncStatus::Failed) => {
                if let Some(snapshot) = self.ledger.acknowledged(draft_id).cloned() {
                    self.restore_snapshot(draft_id, snapshot, SyncStatus::Synced);
                }
            }
            _ => {}
        }
    }

    /// 创建失败：区域从未存在于远端，从存储与绘图面移除
    fn rollback_create(&mut self, draft_id: &DraftId) {
        if self.context.store.remove(draft_id).is_some() {
            self.context.surface.remove_zone_layer(draft_id);
            self.context.surface.remove_feature(draft_id);
            self.after_removal(draft_id);
        }
        if self.ledger.in_flight(draft_id) == 0 {
            self.ledger.forget(draft_id);
        }
    }

    /// 更新失败：恢复上次确认的名称、颜色与边界
    fn rollback_update(&mut self, draft_id: &DraftId) {
        if self.context.store.find(draft_id).is_none() {
            return;
        }
        match self.ledger.acknowledged(draft_id).cloned() {
            Some(snapshot) => self.restore_snapshot(draft_id, snapshot, SyncStatus::Failed),
            None => {
                self.context.store.set_sync_status(draft_id, SyncStatus::Failed);
            }
        }
    }

    /// 用快照覆盖存储与绘图面上的区域
    fn restore_snapshot(&mut self, draft_id: &DraftId, snapshot: Zone, sync: SyncStatus) {
        let Some(current) = self.context.store.find(draft_id).cloned() else {
            return;
        };
        let restored = Zone {
            draft_id: current.draft_id,
            persisted_id: snapshot.persisted_id.or(current.persisted_id),
            style: snapshot.style,
            ring: snapshot.ring,
            sync,
        };
        self.context
            .surface
            .replace_feature_geometry(draft_id, &restored.ring);
        self.context
            .surface
            .render_zone_layer(draft_id, &restored.ring, &restored.style);
        self.context.store.upsert(restored);
    }

    /// 删除失败：按上次确认的快照把区域重新加回绘图面与存储
    fn rollback_delete(&mut self, draft_id: &DraftId) {
        if self.context.store.find(draft_id).is_some() {
            return;
        }
        let Some(snapshot) = self.ledger.forget(draft_id) else {
            tracing::warn!("No acknowledged state to restore zone {}", draft_id);
            return;
        };

        let restored_id = self
            .context
            .surface
            .add_feature(&snapshot.ring, &snapshot.style);
        self.context
            .surface
            .render_zone_layer(&restored_id, &snapshot.ring, &snapshot.style);
        let restored = Zone {
            draft_id: restored_id.clone(),
            sync: SyncStatus::Failed,
            ..snapshot
        };
        self.ledger.acknowledge(restored.clone());
        self.context.store.upsert(restored);
        tracing::info!("Restored zone {} as {}", draft_id, restored_id);
    }

    // ========== 内部 ==========

    fn submit(&mut self, op: SyncOp) {
        self.ledger.begin(op.draft_id());
        self.queue.submit(op);
    }

    fn reject(&mut self, notice: Notice) -> Reaction {
        tracing::warn!("{}", notice);
        self.notice = Some(notice.clone());
        Reaction::Rejected(notice)
    }

    /// 回到绘制模式
    fn enter_drawing(&mut self) {
        self.context.surface.set_mode(SurfaceMode::DrawPolygon);
        self.mode = SurfaceMode::DrawPolygon;
        self.state = SessionState::Drawing;
    }

    /// 当前模式与选择对应的状态（无表单打开时）
    fn state_for_mode(&self) -> SessionState {
        let selected = self.context.store.selection().is_some();
        match (self.mode, selected) {
            (SurfaceMode::DrawPolygon, _) => SessionState::Drawing,
            (SurfaceMode::DirectSelect, true) => SessionState::Editing,
            (_, true) => SessionState::Selected,
            (_, false) => SessionState::Idle,
        }
    }

    /// 区域被移除后修正绑定到它的状态
    fn after_removal(&mut self, draft_id: &DraftId) {
        let dangling = match &self.state {
            SessionState::Selected | SessionState::Editing => self.context.store.selection().is_none(),
            state => state.refers_to(draft_id),
        };
        if dangling {
            self.state = self.state_for_mode();
        }
    }
}

fn loaded_parts(record: &ZoneRecord) -> Result<(PersistedId, ZoneStyle, Ring), SyncError> {
    let persisted_id = record
        .persisted_id()
        .ok_or_else(|| SyncError::InvalidResponse("zone has no id".to_string()))?;
    Ok((persisted_id, record.style()?, record.ring()?))
}
