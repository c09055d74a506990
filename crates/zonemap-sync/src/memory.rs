//! 内存中的区域仓库
//!
//! 用于离线运行与测试：记录每次调用，支持注入一次性失败和固定延迟。

use crate::error::{SyncError, SyncResult};
use crate::repository::ZoneRepository;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use zonemap_core::wire::ZoneRecord;
use zonemap_core::zone::PersistedId;

/// 仓库操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoOp {
    FetchAll,
    Create,
    Update,
    Delete,
}

/// 一次仓库调用的记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCall {
    pub op: RepoOp,
    pub id: Option<PersistedId>,
    pub record: Option<ZoneRecord>,
}

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<ZoneRecord>,
    next_id: u64,
    calls: Vec<RepoCall>,
    /// 待触发的一次性失败
    failures: Vec<RepoOp>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("zone-{}", self.next_id)
    }

    fn take_failure(&mut self, op: RepoOp) -> SyncResult<()> {
        match self.failures.iter().position(|f| *f == op) {
            Some(pos) => {
                self.failures.remove(pos);
                Err(SyncError::Unavailable(format!("injected {:?} failure", op)))
            }
            None => Ok(()),
        }
    }
}

/// 内存区域仓库
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置记录；没有 id 的记录会分配新 id
    pub fn with_records(records: impl IntoIterator<Item = ZoneRecord>) -> Self {
        let mut state = MemoryState::default();
        for mut record in records {
            if record.id.is_none() {
                record.id = Some(state.allocate_id());
            }
            state.records.push(record);
        }
        Self {
            state: Mutex::new(state),
            latency: None,
        }
    }

    /// 每次调用前等待固定时长
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// 让下一次指定操作失败
    pub async fn fail_next(&self, op: RepoOp) {
        self.state.lock().await.failures.push(op);
    }

    /// 当前保存的记录
    pub async fn records(&self) -> Vec<ZoneRecord> {
        self.state.lock().await.records.clone()
    }

    /// 调用历史
    pub async fn calls(&self) -> Vec<RepoCall> {
        self.state.lock().await.calls.clone()
    }

    async fn begin(&self, call: RepoCall) -> SyncResult<()> {
        let op = call.op;
        {
            let mut state = self.state.lock().await;
            state.calls.push(call);
            state.take_failure(op)?;
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }
}

#[async_trait]
impl ZoneRepository for MemoryRepository {
    async fn fetch_all(&self) -> SyncResult<Vec<ZoneRecord>> {
        self.begin(RepoCall {
            op: RepoOp::FetchAll,
            id: None,
            record: None,
        })
        .await?;
        Ok(self.state.lock().await.records.clone())
    }

    async fn create(&self, record: &ZoneRecord) -> SyncResult<ZoneRecord> {
        self.begin(RepoCall {
            op: RepoOp::Create,
            id: None,
            record: Some(record.clone()),
        })
        .await?;

        let mut state = self.state.lock().await;
        let mut created = record.without_id();
        created.id = Some(state.allocate_id());
        state.records.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &PersistedId, record: &ZoneRecord) -> SyncResult<ZoneRecord> {
        self.begin(RepoCall {
            op: RepoOp::Update,
            id: Some(id.clone()),
            record: Some(record.clone()),
        })
        .await?;

        let mut state = self.state.lock().await;
        let slot = state
            .records
            .iter_mut()
            .find(|r| r.id.as_deref() == Some(id.as_str()))
            .ok_or_else(|| SyncError::NotFound(format!("zone {}", id)))?;
        let mut updated = record.clone();
        updated.id = Some(id.as_str().to_string());
        *slot = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: &PersistedId) -> SyncResult<()> {
        self.begin(RepoCall {
            op: RepoOp::Delete,
            id: Some(id.clone()),
            record: None,
        })
        .await?;

        let mut state = self.state.lock().await;
        let before = state.records.len();
        state.records.retain(|r| r.id.as_deref() != Some(id.as_str()));
        if state.records.len() == before {
            return Err(SyncError::NotFound(format!("zone {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonemap_core::wire::WirePoint;

    fn record(label: &str) -> ZoneRecord {
        let p = |lng: &str, lat: &str| WirePoint {
            lng: lng.to_string(),
            lat: lat.to_string(),
        };
        ZoneRecord {
            id: None,
            label: label.to_string(),
            color: "#4BD80D".to_string(),
            points: vec![p("0", "0"), p("1", "0"), p("0", "1"), p("0", "0")],
        }
    }

    #[tokio::test]
    async fn test_crud_round() {
        let repo = MemoryRepository::new();

        let created = repo.create(&record("a")).await.unwrap();
        let id = created.persisted_id().unwrap();
        assert_eq!(id.as_str(), "zone-1");

        let mut changed = created.clone();
        changed.label = "b".to_string();
        let updated = repo.update(&id, &changed).await.unwrap();
        assert_eq!(updated.label, "b");
        assert_eq!(repo.fetch_all().await.unwrap(), vec![updated]);

        repo.delete(&id).await.unwrap();
        assert!(repo.records().await.is_empty());
        assert!(matches!(repo.delete(&id).await, Err(SyncError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_seeded_records_get_ids() {
        let repo = MemoryRepository::with_records([record("a"), record("b")]);
        let ids: Vec<_> = repo
            .fetch_all()
            .await
            .unwrap()
            .into_iter()
            .filter_map(|r| r.id)
            .collect();
        assert_eq!(ids, ["zone-1", "zone-2"]);
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let repo = MemoryRepository::new();
        repo.fail_next(RepoOp::Create).await;

        assert!(matches!(
            repo.create(&record("a")).await,
            Err(SyncError::Unavailable(_))
        ));
        assert!(repo.create(&record("a")).await.is_ok());
        assert_eq!(repo.calls().await.len(), 2);
    }
}
