//! 预置区域与内置演示
//!
//! 没有配置远端时，内存仓库预置绿区与蓝区；没有脚本时回放内置演示：
//! 在蓝区旁新建区域、在绿区内落点、把蓝区拖进绿区、删除绿区、改蓝区名称与颜色。

use crate::script::Step;
use zonemap_core::wire::{WirePoint, ZoneRecord};
use zonemap_session::SurfaceMode;

pub const GREEN_LABEL: &str = "The green zone";
pub const BLUE_LABEL: &str = "The blue area";
pub const NEW_ZONE_LABEL: &str = "Beside blue";
pub const RENAMED_BLUE_LABEL: &str = "The blue area (renamed)";

const GREEN_POINTS: [(&str, &str); 8] = [
    ("31.29356788952535", "30.0545901854577"),
    ("31.280607455565644", "30.056598840290533"),
    ("31.27052234966979", "30.04526959019087"),
    ("31.26496481259113", "30.039010070583316"),
    ("31.266960376097984", "30.03170984783172"),
    ("31.273826831175825", "30.04032813266413"),
    ("31.281637423827277", "30.047013637190176"),
    ("31.29356788952535", "30.0545901854577"),
];

const BLUE_POINTS: [(&str, &str); 5] = [
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

/// 绿区与蓝区
pub fn seed_records() -> Vec<ZoneRecord> {
    vec![
        record(GREEN_LABEL, "#4BD80D", &GREEN_POINTS),
        record(BLUE_LABEL, "#0D31E9", &BLUE_POINTS),
    ]
}

fn click(lng: f64, lat: f64) -> Step {
    Step::Click { lng, lat }
}

/// 内置演示步骤
pub fn steps() -> Vec<Step> {
    vec![
        // 蓝区包围盒内、不与任何区域重叠的三角形
        Step::BeginDraft,
        click(31.180, 30.033),
        click(31.185, 30.033),
        click(31.185, 30.037),
        Step::CompleteDraft,
        Step::ConfirmCreate {
            label: NEW_ZONE_LABEL.to_string(),
            color: "#F5A623".to_string(),
        },
        Step::Settle,
        // 第 4 个点落在绿区内
        Step::BeginDraft,
        click(31.24, 30.06),
        click(31.25, 30.07),
        click(31.24, 30.07),
        click(31.28, 30.05),
        Step::DismissNotice,
        // 把蓝区的一个角点拖进绿区
        Step::SetMode {
            mode: SurfaceMode::DirectSelect,
        },
        Step::DragVertex {
            zone: BLUE_LABEL.to_string(),
            index: 2,
            lng: 31.28,
            lat: 30.05,
        },
        Step::DismissNotice,
        // 删除绿区
        Step::SetMode {
            mode: SurfaceMode::SimpleSelect,
        },
        Step::Delete {
            zone: GREEN_LABEL.to_string(),
        },
        // 只改蓝区的名称与颜色
        Step::Select {
            zone: BLUE_LABEL.to_string(),
        },
        Step::EditSelected,
        Step::ConfirmUpdate {
            label: RENAMED_BLUE_LABEL.to_string(),
            color: "#1E90FF".to_string(),
        },
        Step::Settle,
    ]
}
