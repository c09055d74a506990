//! ZoneMap 同步
//!
//! 远端区域仓库（HTTP 与内存两种实现）以及按区域串行的同步队列。
//!
//! # 架构设计
//!
//! - `ZoneRepository`: 异步的增删改查接口
//! - `HttpRepository`: REST 实现
//! - `MemoryRepository`: 离线与测试用实现，可注入失败和延迟
//! - `SyncQueue`: 每个区域一条串行通道，结果通过通道回送

pub mod error;
pub mod http;
pub mod memory;
pub mod queue;
pub mod repository;

pub use error::{SyncError, SyncResult};
pub use http::HttpRepository;
pub use memory::{MemoryRepository, RepoCall, RepoOp};
pub use queue::{SyncOp, SyncOpKind, SyncOutcome, SyncQueue};
pub use repository::ZoneRepository;
