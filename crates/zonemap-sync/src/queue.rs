//! 按区域串行的同步队列
//!
//! 每个 `DraftId` 对应一条独立的通道（lane），由一个 tokio 任务按提交顺序
//! 逐个执行该区域的远端操作。通道记住创建时返回的持久化 id，因此在创建
//! 尚未完成时提交的更新或删除，会在轮到自己时使用这个 id。
//! 不同区域的通道并发执行。
//!
//! 调用方提交操作后立即返回，执行结果通过 [`SyncOutcome`] 通道送回。
//! `submit` 需要在 tokio 运行时内调用。

use crate::error::{SyncError, SyncResult};
use crate::repository::ZoneRepository;
use futures::channel::mpsc;
use futures::StreamExt;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use zonemap_core::wire::ZoneRecord;
use zonemap_core::zone::{DraftId, PersistedId};

/// 远端操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOp {
    Create {
        draft_id: DraftId,
        record: ZoneRecord,
    },
    Update {
        draft_id: DraftId,
        /// 调用方已知的持久化 id（通道尚未得知时使用）
        persisted_id: Option<PersistedId>,
        record: ZoneRecord,
    },
    Delete {
        draft_id: DraftId,
        persisted_id: Option<PersistedId>,
    },
}

impl SyncOp {
    pub fn draft_id(&self) -> &DraftId {
        match self {
            SyncOp::Create { draft_id, .. }
            | SyncOp::Update { draft_id, .. }
            | SyncOp::Delete { draft_id, .. } => draft_id,
        }
    }

    pub fn kind(&self) -> SyncOpKind {
        match self {
            SyncOp::Create { .. } => SyncOpKind::Create,
            SyncOp::Update { .. } => SyncOpKind::Update,
            SyncOp::Delete { .. } => SyncOpKind::Delete,
        }
    }
}

/// 操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncOpKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for SyncOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncOpKind::Create => "create",
            SyncOpKind::Update => "update",
            SyncOpKind::Delete => "delete",
        })
    }
}

/// 远端操作的执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created {
        draft_id: DraftId,
        record: ZoneRecord,
    },
    Updated {
        draft_id: DraftId,
        record: ZoneRecord,
    },
    /// `persisted_id` 为 `None` 表示该区域从未在远端创建，无需远端删除
    Deleted {
        draft_id: DraftId,
        persisted_id: Option<PersistedId>,
    },
    Failed {
        draft_id: DraftId,
        kind: SyncOpKind,
        reason: String,
    },
}

impl SyncOutcome {
    pub fn draft_id(&self) -> &DraftId {
        match self {
            SyncOutcome::Created { draft_id, .. }
            | SyncOutcome::Updated { draft_id, .. }
            | SyncOutcome::Deleted { draft_id, .. }
            | SyncOutcome::Failed { draft_id, .. } => draft_id,
        }
    }
}

/// 进行中的操作计数
#[derive(Debug, Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn begin(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// 同步队列
pub struct SyncQueue {
    repository: Arc<dyn ZoneRepository>,
    lanes: HashMap<DraftId, mpsc::UnboundedSender<SyncOp>>,
    outcomes: mpsc::UnboundedSender<SyncOutcome>,
    in_flight: Arc<InFlight>,
}

impl SyncQueue {
    /// 创建队列，同时返回结果接收端
    pub fn new(repository: Arc<dyn ZoneRepository>) -> (Self, mpsc::UnboundedReceiver<SyncOutcome>) {
        let (outcomes, receiver) = mpsc::unbounded();
        let queue = Self {
            repository,
            lanes: HashMap::new(),
            outcomes,
            in_flight: Arc::new(InFlight::default()),
        };
        (queue, receiver)
    }

    pub fn repository(&self) -> &Arc<dyn ZoneRepository> {
        &self.repository
    }

    /// 直接读取远端全部区域（会话启动时使用，不经过通道）
    pub async fn fetch_all(&self) -> SyncResult<Vec<ZoneRecord>> {
        self.repository.fetch_all().await
    }

    /// 提交操作，立即返回
    pub fn submit(&mut self, op: SyncOp) {
        let draft_id = op.draft_id().clone();
        let closes_lane = matches!(op, SyncOp::Delete { .. });
        tracing::debug!("Queued {} for zone {}", op.kind(), draft_id);

        self.in_flight.begin();
        let op = match self.lane(&draft_id).unbounded_send(op) {
            Ok(()) => None,
            Err(err) => Some(err.into_inner()),
        };
        // 通道任务已退出时重建通道再投递一次
        if let Some(op) = op {
            self.lanes.remove(&draft_id);
            if let Err(err) = self.lane(&draft_id).unbounded_send(op) {
                tracing::error!("Failed to queue {} for zone {}", err.into_inner().kind(), draft_id);
                self.in_flight.finish();
            }
        }

        if closes_lane {
            // 丢弃发送端，通道任务处理完剩余操作后退出
            self.lanes.remove(&draft_id);
        }
    }

    /// 尚未完成的操作数
    pub fn pending(&self) -> usize {
        self.in_flight.get()
    }

    /// 等待所有已提交的操作完成
    pub async fn flush(&self) {
        loop {
            let notified = self.in_flight.idle.notified();
            if self.in_flight.get() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn lane(&mut self, draft_id: &DraftId) -> &mpsc::UnboundedSender<SyncOp> {
        let repository = &self.repository;
        let outcomes = &self.outcomes;
        let in_flight = &self.in_flight;
        self.lanes.entry(draft_id.clone()).or_insert_with(|| {
            let (sender, receiver) = mpsc::unbounded();
            tokio::spawn(run_lane(
                draft_id.clone(),
                repository.clone(),
                receiver,
                outcomes.clone(),
                in_flight.clone(),
            ));
            sender
        })
    }
}

async fn run_lane(
    draft_id: DraftId,
    repository: Arc<dyn ZoneRepository>,
    mut jobs: mpsc::UnboundedReceiver<SyncOp>,
    outcomes: mpsc::UnboundedSender<SyncOutcome>,
    in_flight: Arc<InFlight>,
) {
    let mut known_id: Option<PersistedId> = None;

    while let Some(op) = jobs.next().await {
        let kind = op.kind();
        let outcome = match execute(repository.as_ref(), op, &mut known_id).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!("Zone {} {} failed: {}", draft_id, kind, err);
                SyncOutcome::Failed {
                    draft_id: draft_id.clone(),
                    kind,
                    reason: err.to_string(),
                }
            }
        };
        // 接收端已关闭时结果无人处理，直接丢弃
        let _ = outcomes.unbounded_send(outcome);
        in_flight.finish();
    }

    tracing::debug!("Sync lane for zone {} closed", draft_id);
}

async fn execute(
    repository: &dyn ZoneRepository,
    op: SyncOp,
    known_id: &mut Option<PersistedId>,
) -> SyncResult<SyncOutcome> {
    match op {
        SyncOp::Create { draft_id, record } => {
            let created = repository.create(&record).await?;
            let id = created.persisted_id().ok_or_else(|| {
                SyncError::InvalidResponse("created zone has no id".to_string())
            })?;
            tracing::info!("Created zone {} as {}", draft_id, id);
            *known_id = Some(id);
            Ok(SyncOutcome::Created {
                draft_id,
                record: created,
            })
        }
        SyncOp::Update {
            draft_id,
            persisted_id,
            record,
        } => {
            let id = known_id
                .clone()
                .or(persisted_id)
                .ok_or_else(|| SyncError::MissingPersistedId(draft_id.clone()))?;
            let updated = repository.update(&id, &record).await?;
            *known_id = Some(id);
            Ok(SyncOutcome::Updated {
                draft_id,
                record: updated,
            })
        }
        SyncOp::Delete {
            draft_id,
            persisted_id,
        } => match known_id.clone().or(persisted_id) {
            Some(id) => {
                repository.delete(&id).await?;
                tracing::info!("Deleted zone {} ({})", draft_id, id);
                Ok(SyncOutcome::Deleted {
                    draft_id,
                    persisted_id: Some(id),
                })
            }
            None => {
                tracing::debug!("Zone {} was never created remotely, nothing to delete", draft_id);
                Ok(SyncOutcome::Deleted {
                    draft_id,
                    persisted_id: None,
                })
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryRepository, RepoOp};
    use std::time::Duration;
    use zonemap_core::wire::WirePoint;

    fn record(label: &str) -> ZoneRecord {
        let p = |lng: &str, lat: &str| WirePoint {
            lng: lng.to_string(),
            lat: lat.to_string(),
        };
        ZoneRecord {
            id: None,
            label: label.to_string(),
            color: "#0D31E9".to_string(),
            points: vec![p("0", "0"), p("1", "0"), p("0", "1"), p("0", "0")],
        }
    }

    fn drain(receiver: &mut mpsc::UnboundedReceiver<SyncOutcome>) -> Vec<SyncOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(Some(outcome)) = receiver.try_next() {
            outcomes.push(outcome);
        }
        outcomes
    }

    #[tokio::test]
    async fn test_delete_waits_for_inflight_create() {
        let repo = Arc::new(MemoryRepository::new().with_latency(Duration::from_millis(20)));
        let (mut queue, mut outcomes) = SyncQueue::new(repo.clone());
        let draft = DraftId::new("f1");

        queue.submit(SyncOp::Create {
            draft_id: draft.clone(),
            record: record("a"),
        });
        queue.submit(SyncOp::Delete {
            draft_id: draft.clone(),
            persisted_id: None,
        });
        assert_eq!(queue.pending(), 2);
        queue.flush().await;
        assert_eq!(queue.pending(), 0);

        let ops: Vec<_> = repo.calls().await.into_iter().map(|c| (c.op, c.id)).collect();
        assert_eq!(
            ops,
            vec![
                (RepoOp::Create, None),
                (RepoOp::Delete, Some(PersistedId::new("zone-1"))),
            ]
        );
        assert!(repo.records().await.is_empty());

        let received = drain(&mut outcomes);
        assert!(matches!(received[0], SyncOutcome::Created { .. }));
        assert_eq!(
            received[1],
            SyncOutcome::Deleted {
                draft_id: draft,
                persisted_id: Some(PersistedId::new("zone-1")),
            }
        );
    }

    #[tokio::test]
    async fn test_update_uses_id_from_create() {
        let repo = Arc::new(MemoryRepository::new().with_latency(Duration::from_millis(10)));
        let (mut queue, mut outcomes) = SyncQueue::new(repo.clone());
        let draft = DraftId::new("f1");

        queue.submit(SyncOp::Create {
            draft_id: draft.clone(),
            record: record("a"),
        });
        queue.submit(SyncOp::Update {
            draft_id: draft.clone(),
            persisted_id: None,
            record: record("b"),
        });
        queue.flush().await;

        let records = repo.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label, "b");
        assert_eq!(records[0].id.as_deref(), Some("zone-1"));
        assert_eq!(drain(&mut outcomes).len(), 2);
    }

    #[tokio::test]
    async fn test_failed_create_reports_and_skips_remote_delete() {
        let repo = Arc::new(MemoryRepository::new());
        repo.fail_next(RepoOp::Create).await;
        let (mut queue, mut outcomes) = SyncQueue::new(repo.clone());
        let draft = DraftId::new("f1");

        queue.submit(SyncOp::Create {
            draft_id: draft.clone(),
            record: record("a"),
        });
        queue.submit(SyncOp::Delete {
            draft_id: draft.clone(),
            persisted_id: None,
        });
        queue.flush().await;

        let received = drain(&mut outcomes);
        assert!(matches!(
            &received[0],
            SyncOutcome::Failed { kind: SyncOpKind::Create, .. }
        ));
        assert_eq!(
            received[1],
            SyncOutcome::Deleted {
                draft_id: draft,
                persisted_id: None,
            }
        );
        // 只有失败的那次创建到达仓库
        assert_eq!(repo.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_update_without_any_id_fails() {
        let repo = Arc::new(MemoryRepository::new());
        let (mut queue, mut outcomes) = SyncQueue::new(repo);

        queue.submit(SyncOp::Update {
            draft_id: DraftId::new("f9"),
            persisted_id: None,
            record: record("a"),
        });
        queue.flush().await;

        let received = drain(&mut outcomes);
        assert!(matches!(
            &received[0],
            SyncOutcome::Failed { kind: SyncOpKind::Update, reason, .. } if reason.contains("no persisted id")
        ));
    }

    #[tokio::test]
    async fn test_flush_on_empty_queue_returns() {
        let (queue, _outcomes) = SyncQueue::new(Arc::new(MemoryRepository::new()));
        queue.flush().await;
        assert_eq!(queue.pending(), 0);
    }
}
