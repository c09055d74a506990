//! ZoneMap 绘制会话
//!
//! 把绘图面事件、名称/颜色表单输入与区域存储、远端同步调和在一起。
//!
//! # 架构设计
//!
//! - `DrawingSurface`: 会话驱动的绘图面能力（`RecordingSurface` 为无界面实现）
//! - `SurfaceEvent` / `UserInput`: 封闭的输入枚举
//! - `Reconciler`: 状态机，持有显式的 `SessionContext`
//! - `SyncLedger`: 每个区域的未完成操作数与远端确认快照，用于失败回滚

pub mod error;
pub mod event;
pub mod ledger;
pub mod notice;
pub mod reconciler;
pub mod state;
pub mod surface;

pub use error::{SessionError, SessionResult};
pub use event::{SurfaceEvent, UserInput};
pub use ledger::SyncLedger;
pub use notice::Notice;
pub use reconciler::{Reaction, Reconciler, SessionContext};
pub use state::SessionState;
pub use surface::{DrawingSurface, RecordingSurface, SurfaceCommand, SurfaceMode};
