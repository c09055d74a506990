//! 区域存储
//!
//! 已提交区域的有序集合，按 `DraftId` 寻址。选择指针是位置索引，
//! 集合大小变化（插入或删除）后立即失效并重置为 `None`。
//!
//! 订阅者通过 [`ZoneStore::subscribe`] 获得变更通知，
//! 渲染层据此刷新，不需要知道校验或持久化逻辑。

use crate::zone::{DraftId, PersistedId, SyncStatus, Zone};
use futures::channel::mpsc;

/// 存储变更通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Inserted { draft_id: DraftId, index: usize },
    Replaced { draft_id: DraftId, index: usize },
    Removed { draft_id: DraftId, index: usize },
    SelectionChanged(Option<usize>),
}

/// `upsert` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
    /// 内容完全相同，未做任何修改
    Unchanged,
}

/// 区域存储
#[derive(Debug, Default)]
pub struct ZoneStore {
    zones: Vec<Zone>,
    selection: Option<usize>,
    subscribers: Vec<mpsc::UnboundedSender<StoreEvent>>,
}

impl ZoneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入或原位替换
    pub fn upsert(&mut self, zone: Zone) -> Upsert {
        match self.index_of(&zone.draft_id) {
            Some(index) => {
                if self.zones[index] == zone {
                    return Upsert::Unchanged;
                }
                let draft_id = zone.draft_id.clone();
                self.zones[index] = zone;
                self.notify(StoreEvent::Replaced { draft_id, index });
                Upsert::Replaced
            }
            None => {
                let draft_id = zone.draft_id.clone();
                self.zones.push(zone);
                let index = self.zones.len() - 1;
                tracing::debug!("Inserted zone {} at {}", draft_id, index);
                self.notify(StoreEvent::Inserted { draft_id, index });
                self.reset_selection();
                Upsert::Inserted
            }
        }
    }

    /// 删除；不存在时什么都不做
    pub fn remove(&mut self, draft_id: &DraftId) -> Option<Zone> {
        let index = self.index_of(draft_id)?;
        let zone = self.zones.remove(index);
        tracing::debug!("Removed zone {} from {}", draft_id, index);
        self.notify(StoreEvent::Removed {
            draft_id: draft_id.clone(),
            index,
        });
        self.reset_selection();
        Some(zone)
    }

    pub fn find(&self, draft_id: &DraftId) -> Option<&Zone> {
        self.zones.iter().find(|z| &z.draft_id == draft_id)
    }

    pub fn index_of(&self, draft_id: &DraftId) -> Option<usize> {
        self.zones.iter().position(|z| &z.draft_id == draft_id)
    }

    /// 按持久化 id 查找
    pub fn find_persisted(&self, persisted_id: &PersistedId) -> Option<&Zone> {
        self.zones
            .iter()
            .find(|z| z.persisted_id.as_ref() == Some(persisted_id))
    }

    /// 全部区域（按插入顺序）
    pub fn all(&self) -> &[Zone] {
        &self.zones
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    // ========== 选择 ==========

    pub fn selection(&self) -> Option<usize> {
        self.selection
    }

    pub fn selected(&self) -> Option<&Zone> {
        self.selection.and_then(|i| self.zones.get(i))
    }

    /// 设置选择指针；越界索引视为 `None`
    pub fn select(&mut self, index: Option<usize>) {
        let index = index.filter(|&i| i < self.zones.len());
        if self.selection != index {
            self.selection = index;
            self.notify(StoreEvent::SelectionChanged(index));
        }
    }

    /// 选中指定要素对应的区域，找不到时清空选择
    pub fn select_draft(&mut self, draft_id: Option<&DraftId>) -> Option<usize> {
        let index = draft_id.and_then(|id| self.index_of(id));
        self.select(index);
        index
    }

    fn reset_selection(&mut self) {
        self.select(None);
    }

    // ========== 同步相关 ==========

    /// 附上远端分配的 id
    pub fn attach_persisted_id(&mut self, draft_id: &DraftId, persisted_id: PersistedId) -> bool {
        match self.find(draft_id) {
            Some(zone) => {
                let updated = Zone {
                    persisted_id: Some(persisted_id),
                    ..zone.clone()
                };
                self.upsert(updated);
                true
            }
            None => false,
        }
    }

    pub fn set_sync_status(&mut self, draft_id: &DraftId, status: SyncStatus) -> bool {
        match self.find(draft_id) {
            Some(zone) => {
                let updated = Zone {
                    sync: status,
                    ..zone.clone()
                };
                self.upsert(updated);
                true
            }
            None => false,
        }
    }

    // ========== 订阅 ==========

    /// 订阅变更通知；接收端被丢弃后自动退订
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StoreEvent> {
        let (sender, receiver) = mpsc::unbounded();
        self.subscribers.push(sender);
        receiver
    }

    fn notify(&mut self, event: StoreEvent) {
        self.subscribers
            .retain(|s| s.unbounded_send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::lng_lat;
    use crate::ring::Ring;
    use crate::zone::ZoneStyle;

    fn zone(id: &str, label: &str) -> Zone {
        Zone::new(
            DraftId::new(id),
            ZoneStyle::new(label, "#0D31E9").unwrap(),
            Ring::closed([lng_lat(0.0, 0.0), lng_lat(1.0, 0.0), lng_lat(0.0, 1.0)]),
        )
    }

    #[test]
    fn test_upsert_preserves_order() {
        let mut store = ZoneStore::new();
        store.upsert(zone("a", "A"));
        store.upsert(zone("b", "B"));
        store.upsert(zone("c", "C"));

        assert_eq!(store.upsert(zone("b", "B2")), Upsert::Replaced);
        let labels: Vec<_> = store.iter().map(|z| z.label().to_string()).collect();
        assert_eq!(labels, ["A", "B2", "C"]);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut store = ZoneStore::new();
        store.upsert(zone("a", "A"));
        store.upsert(zone("b", "B"));
        let before = store.all().to_vec();

        assert_eq!(store.upsert(zone("a", "A")), Upsert::Unchanged);
        assert_eq!(store.all(), before.as_slice());
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut store = ZoneStore::new();
        store.upsert(zone("a", "A"));
        assert!(store.remove(&DraftId::new("zzz")).is_none());
        assert_eq!(store.len(), 1);
        assert!(store.remove(&DraftId::new("a")).is_some());
        assert!(store.find(&DraftId::new("a")).is_none());
    }

    #[test]
    fn test_selection_resets_on_resize() {
        let mut store = ZoneStore::new();
        store.upsert(zone("a", "A"));
        store.upsert(zone("b", "B"));

        assert_eq!(store.select_draft(Some(&DraftId::new("b"))), Some(1));
        assert_eq!(store.selected().map(|z| z.label()), Some("B"));

        // 替换不改变大小，选择保留
        store.upsert(zone("b", "B2"));
        assert_eq!(store.selection(), Some(1));

        store.upsert(zone("c", "C"));
        assert_eq!(store.selection(), None);

        store.select(Some(0));
        store.remove(&DraftId::new("c"));
        assert_eq!(store.selection(), None);
    }

    #[test]
    fn test_select_out_of_range_is_none() {
        let mut store = ZoneStore::new();
        store.upsert(zone("a", "A"));
        store.select(Some(5));
        assert_eq!(store.selection(), None);
        assert_eq!(store.select_draft(Some(&DraftId::new("nope"))), None);
    }

    #[test]
    fn test_attach_persisted_id() {
        let mut store = ZoneStore::new();
        store.upsert(zone("a", "A"));
        assert!(store.attach_persisted_id(&DraftId::new("a"), PersistedId::new("zone-1")));
        assert!(!store.attach_persisted_id(&DraftId::new("x"), PersistedId::new("zone-2")));
        assert!(store.find_persisted(&PersistedId::new("zone-1")).is_some());
    }

    #[test]
    fn test_subscribers_receive_events() {
        let mut store = ZoneStore::new();
        let mut events = store.subscribe();

        store.upsert(zone("a", "A"));
        store.select(Some(0));
        store.upsert(zone("a", "A"));
        store.remove(&DraftId::new("a"));

        let mut received = Vec::new();
        while let Ok(Some(event)) = events.try_next() {
            received.push(event);
        }
        assert_eq!(
            received,
            vec![
                StoreEvent::Inserted { draft_id: DraftId::new("a"), index: 0 },
                StoreEvent::SelectionChanged(Some(0)),
                StoreEvent::Removed { draft_id: DraftId::new("a"), index: 0 },
                StoreEvent::SelectionChanged(None),
            ]
        );
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut store = ZoneStore::new();
        drop(store.subscribe());
        store.upsert(zone("a", "A"));
        assert!(store.subscribers.is_empty());
    }
}
