//! 绿区与蓝区上的端到端会话

use std::sync::Arc;
use std::time::Duration;
use zonemap_core::prelude::*;
use zonemap_session::{
    DrawingSurface, Notice, Reaction, Reconciler, RecordingSurface, SessionContext, SessionState,
    SurfaceMode, UserInput,
};
use zonemap_sync::{MemoryRepository, RepoOp, SyncOpKind};

const GREEN: [(&str, &str); 8] = [
    ("31.29356788952535", "30.0545901854577"),
    ("31.280607455565644", "30.056598840290533"),
    ("31.27052234966979", "30.04526959019087"),
    ("31.26496481259113", "30.039010070583316"),
    ("31.266960376097984", "30.03170984783172"),
    ("31.273826831175825", "30.04032813266413"),
    ("31.281637423827277", "30.047013637190176"),
    ("31.29356788952535", "30.0545901854577"),
];

const BLUE: [(&str, &str); 5] = [
    ("31.16374314644071", "30.032732416559284"),
    ("31.163914807818543", "30.026490216893833"),
    ("31.186230786821994", "30.023220707126313"),
    ("31.168978818437836", "30.037413678307985"),
    ("31.16374314644071", "30.032732416559284"),
];

fn record(label: &str, color: &str, points: &[(&str, &str)]) -> ZoneRecord {
    ZoneRecord {
        id: None,
        label: label.to_string(),
        color: color.to_string(),
        points: points
            .iter()
            .map(|(lng, lat)| WirePoint {
                lng: lng.to_string(),
                lat: lat.to_string(),
            })
            .collect(),
    }
}

fn seeds() -> Vec<ZoneRecord> {
    vec![
        record("The green zone", "#4BD80D", &GREEN),
        record("The blue area", "#0D31E9", &BLUE),
    ]
}

async fn session_with(repo: Arc<MemoryRepository>) -> Reconciler<RecordingSurface> {
    let context = SessionContext::new(RecordingSurface::new(), GeometryValidator::default());
    let mut reconciler = Reconciler::new(context, repo);
    assert_eq!(reconciler.load().await.unwrap(), 2);
    reconciler
}

fn zone_id(reconciler: &Reconciler<RecordingSurface>, label: &str) -> DraftId {
    reconciler
        .store()
        .iter()
        .find(|z| z.label() == label)
        .map(|z| z.draft_id.clone())
        .unwrap()
}

/// 蓝区包围盒内、与两个区域都没有公共内部的三角形
fn beside_blue() -> [Point2; 3] {
    [
        lng_lat(31.180, 30.033),
        lng_lat(31.185, 30.033),
        lng_lat(31.185, 30.037),
    ]
}

#[tokio::test]
async fn test_draft_beside_blue_is_accepted() {
    let repo = Arc::new(MemoryRepository::with_records(seeds()));
    let mut reconciler = session_with(repo.clone()).await;

    let draft = Ring::closed(beside_blue());
    for zone in reconciler.store().iter() {
        assert!(!intersects(&draft, &zone.ring), "draft overlaps {}", zone.label());
    }

    reconciler.surface_mut().begin_draft();
    for corner in beside_blue() {
        let event = reconciler.surface_mut().click(corner);
        assert_eq!(reconciler.handle(event), Reaction::Continue);
    }
    let event = reconciler.surface_mut().complete_draft().unwrap();
    let reaction = reconciler.handle(event);
    assert!(matches!(reaction, Reaction::OpenCreateForm { .. }));

    let style = ZoneStyle::new("Beside blue", "").unwrap();
    assert_eq!(style.color, DEFAULT_COLOR);
    let reaction = reconciler.apply(UserInput::ConfirmCreate(style)).unwrap();
    assert!(matches!(reaction, Reaction::Committed { .. }));

    reconciler.settle().await;
    assert_eq!(reconciler.store().len(), 3);
    assert_eq!(repo.records().await.len(), 3);
    assert!(reconciler.notice().is_none());
}

#[tokio::test]
async fn test_fourth_vertex_inside_green_discards_draft() {
    let repo = Arc::new(MemoryRepository::with_records(seeds()));
    let mut reconciler = session_with(repo.clone()).await;

    reconciler.surface_mut().begin_draft();
    for corner in beside_blue() {
        let event = reconciler.surface_mut().click(corner);
        assert_eq!(reconciler.handle(event), Reaction::Continue);
    }
    let event = reconciler.surface_mut().click(lng_lat(31.28, 30.05));
    let reaction = reconciler.handle(event);

    assert_eq!(reaction, Reaction::Rejected(Notice::DraftIntersects));
    assert_eq!(
        reconciler.notice().unwrap().to_string(),
        "Current zone being drawn intersects with an existing zone, please redraw valid zone."
    );
    assert_eq!(reconciler.state(), &SessionState::Drawing);
    assert_eq!(reconciler.surface().mode(), SurfaceMode::DrawPolygon);
    assert!(reconciler.surface().active_draft().is_none());
    assert_eq!(reconciler.store().len(), 2);

    reconciler.settle().await;
    assert_eq!(repo.calls().await.len(), 1);
}

#[tokio::test]
async fn test_click_in_green_notch_is_allowed() {
    let repo = Arc::new(MemoryRepository::with_records(seeds()));
    let mut reconciler = session_with(repo).await;

    reconciler.surface_mut().begin_draft();
    // 绿区凹口内，在包围盒内但不在多边形内
    let event = reconciler.surface_mut().click(lng_lat(31.2695, 30.033));
    assert_eq!(reconciler.handle(event), Reaction::Continue);
    assert!(reconciler.notice().is_none());
}

#[tokio::test]
async fn test_dragging_blue_into_green_is_reverted() {
    let repo = Arc::new(MemoryRepository::with_records(seeds()));
    let mut reconciler = session_with(repo.clone()).await;
    let blue = zone_id(&reconciler, "The blue area");
    let committed = reconciler.store().find(&blue).unwrap().clone();

    let event = reconciler
        .surface_mut()
        .drag_vertex(&blue, 2, lng_lat(31.28, 30.05))
        .unwrap();
    let reaction = reconciler.handle(event);

    assert_eq!(reaction, Reaction::Rejected(Notice::ZonesIntersect));
    assert_eq!(reconciler.notice().unwrap().to_string(), "Zones can't intersect");
    assert_eq!(reconciler.surface().feature(&blue), Some(&committed.ring));
    assert_eq!(reconciler.surface().selected(), Some(&blue));
    assert_eq!(reconciler.store().find(&blue), Some(&committed));

    reconciler.settle().await;
    assert!(repo
        .calls()
        .await
        .iter()
        .all(|call| call.op != RepoOp::Update));
}

#[tokio::test]
async fn test_deleting_green_issues_remote_delete() {
    let repo = Arc::new(MemoryRepository::with_records(seeds()));
    let mut reconciler = session_with(repo.clone()).await;
    let green = zone_id(&reconciler, "The green zone");
    let persisted = reconciler
        .store()
        .find(&green)
        .unwrap()
        .persisted_id
        .clone()
        .unwrap();

    let event = reconciler.surface_mut().delete_feature(&green).unwrap();
    assert_eq!(reconciler.handle(event), Reaction::Removed { draft_id: green.clone() });
    assert!(reconciler.store().find(&green).is_none());
    assert!(reconciler.surface().layer(&green).is_none());

    reconciler.settle().await;
    let deletes: Vec<_> = repo
        .calls()
        .await
        .into_iter()
        .filter(|call| call.op == RepoOp::Delete)
        .collect();
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].id, Some(persisted));
    assert_eq!(repo.records().await.len(), 1);
}

#[tokio::test]
async fn test_editing_blue_metadata_keeps_ring() {
    let repo = Arc::new(MemoryRepository::with_records(seeds()));
    let mut reconciler = session_with(repo.clone()).await;
    let blue = zone_id(&reconciler, "The blue area");
    let ring = reconciler.store().find(&blue).unwrap().ring.clone();

    let event = reconciler.surface_mut().select(Some(blue.clone()));
    reconciler.handle(event);
    let reaction = reconciler.apply(UserInput::EditSelected).unwrap();
    let Reaction::OpenUpdateForm { style, .. } = reaction else {
        panic!("expected update form");
    };
    assert_eq!(style.label, "The blue area");

    let edited = ZoneStyle::new("Blue, renamed", "#1E90FF").unwrap();
    reconciler.apply(UserInput::ConfirmUpdate(edited.clone())).unwrap();
    let zone = reconciler.store().find(&blue).unwrap();
    assert_eq!(zone.style, edited);
    assert_eq!(zone.ring, ring);
    assert_eq!(reconciler.surface().layer(&blue).unwrap().style, edited);

    reconciler.settle().await;
    let updates: Vec<_> = repo
        .calls()
        .await
        .into_iter()
        .filter(|call| call.op == RepoOp::Update)
        .collect();
    assert_eq!(updates.len(), 1);
    let sent = updates[0].record.as_ref().unwrap();
    assert_eq!(sent.points, seeds()[1].points);
    assert_eq!(sent.label, "Blue, renamed");
    assert_eq!(reconciler.store().find(&blue).unwrap().sync, SyncStatus::Synced);
}

#[tokio::test]
async fn test_delete_during_inflight_create_uses_created_id() {
    let repo = Arc::new(
        MemoryRepository::with_records(seeds()).with_latency(Duration::from_millis(20)),
    );
    let mut reconciler = session_with(repo.clone()).await;
    let mut events = reconciler.subscribe();

    reconciler.surface_mut().begin_draft();
    for corner in beside_blue() {
        let event = reconciler.surface_mut().click(corner);
        reconciler.handle(event);
    }
    let event = reconciler.surface_mut().complete_draft().unwrap();
    let Reaction::OpenCreateForm { draft_id } = reconciler.handle(event) else {
        panic!("expected create form");
    };
    reconciler
        .apply(UserInput::ConfirmCreate(ZoneStyle::new("Short lived", "#abc").unwrap()))
        .unwrap();
    let event = reconciler.surface_mut().delete_feature(&draft_id).unwrap();
    reconciler.handle(event);
    assert_eq!(reconciler.pending_sync(), 2);

    reconciler.settle().await;
    let calls: Vec<_> = repo
        .calls()
        .await
        .into_iter()
        .map(|call| (call.op, call.id))
        .collect();
    assert_eq!(
        calls[1..],
        [
            (RepoOp::Create, None),
            (RepoOp::Delete, Some(PersistedId::new("zone-3"))),
        ]
    );
    assert_eq!(repo.records().await.len(), 2);
    assert_eq!(reconciler.ledger().total_in_flight(), 0);
    assert!(reconciler.ledger().acknowledged(&draft_id).is_none());

    assert!(matches!(
        events.try_next(),
        Ok(Some(StoreEvent::Inserted { index: 2, .. }))
    ));
    assert!(matches!(
        events.try_next(),
        Ok(Some(StoreEvent::Removed { index: 2, .. }))
    ));
}

#[tokio::test]
async fn test_failed_metadata_update_is_reverted() {
    let repo = Arc::new(MemoryRepository::with_records(seeds()));
    let mut reconciler = session_with(repo.clone()).await;
    let blue = zone_id(&reconciler, "The blue area");
    repo.fail_next(RepoOp::Update).await;

    let event = reconciler.surface_mut().select(Some(blue.clone()));
    reconciler.handle(event);
    reconciler.apply(UserInput::EditSelected).unwrap();
    reconciler
        .apply(UserInput::ConfirmUpdate(ZoneStyle::new("Lost", "#fff").unwrap()))
        .unwrap();

    reconciler.settle().await;
    let zone = reconciler.store().find(&blue).unwrap();
    assert_eq!(zone.label(), "The blue area");
    assert_eq!(zone.sync, SyncStatus::Failed);
    assert_eq!(reconciler.surface().layer(&blue).unwrap().style.label, "The blue area");
    assert!(matches!(
        reconciler.notice(),
        Some(Notice::SyncFailed { kind: SyncOpKind::Update, .. })
    ));
}
