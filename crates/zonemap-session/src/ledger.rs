//! 同步账本
//!
//! 按区域记录尚未完成的远端操作数，以及远端最近一次确认的区域快照。
//! 同步失败时会话据此把本地状态回滚到快照。

use std::collections::HashMap;
use zonemap_core::zone::{DraftId, SyncStatus, Zone};

#[derive(Debug, Default, Clone)]
struct LedgerEntry {
    in_flight: usize,
    acknowledged: Option<Zone>,
}

/// 同步账本
#[derive(Debug, Default)]
pub struct SyncLedger {
    entries: HashMap<DraftId, LedgerEntry>,
}

impl SyncLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次提交
    pub fn begin(&mut self, draft_id: &DraftId) {
        self.entries.entry(draft_id.clone()).or_default().in_flight += 1;
    }

    /// 记录一次完成，返回该区域剩余的未完成操作数
    pub fn finish(&mut self, draft_id: &DraftId) -> usize {
        match self.entries.get_mut(draft_id) {
            Some(entry) => {
                entry.in_flight = entry.in_flight.saturating_sub(1);
                entry.in_flight
            }
            None => 0,
        }
    }

    pub fn in_flight(&self, draft_id: &DraftId) -> usize {
        self.entries.get(draft_id).map_or(0, |e| e.in_flight)
    }

    pub fn total_in_flight(&self) -> usize {
        self.entries.values().map(|e| e.in_flight).sum()
    }

    /// 保存远端确认的快照
    pub fn acknowledge(&mut self, zone: Zone) {
        let snapshot = Zone {
            sync: SyncStatus::Synced,
            ..zone
        };
        let draft_id = snapshot.draft_id.clone();
        self.entries
            .entry(draft_id)
            .or_default()
            .acknowledged = Some(snapshot);
    }

    pub fn acknowledged(&self, draft_id: &DraftId) -> Option<&Zone> {
        self.entries.get(draft_id)?.acknowledged.as_ref()
    }

    /// 移除区域的全部记录，返回最后的快照
    pub fn forget(&mut self, draft_id: &DraftId) -> Option<Zone> {
        self.entries.remove(draft_id)?.acknowledged
    }
}
