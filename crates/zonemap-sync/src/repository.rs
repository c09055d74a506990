//! 远端区域仓库接口

use crate::error::SyncResult;
use async_trait::async_trait;
use zonemap_core::wire::ZoneRecord;
use zonemap_core::zone::PersistedId;

/// 远端区域的增删改查
///
/// 所有操作都是异步且可能失败的。`create` 返回带有远端 id 的记录。
#[async_trait]
pub trait ZoneRepository: Send + Sync {
    async fn fetch_all(&self) -> SyncResult<Vec<ZoneRecord>>;

    async fn create(&self, record: &ZoneRecord) -> SyncResult<ZoneRecord>;

    async fn update(&self, id: &PersistedId, record: &ZoneRecord) -> SyncResult<ZoneRecord>;

    async fn delete(&self, id: &PersistedId) -> SyncResult<()>;
}
