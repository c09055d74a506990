//! 会话错误定义

use thiserror::Error;
use zonemap_core::zone::DraftId;

/// 当前状态下不接受的用户输入
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No drawn zone is waiting for a label and color")]
    NoPendingDraft,

    #[error("No zone edit form is open")]
    NoPendingUpdate,

    #[error("A zone form is already open")]
    FormOpen,

    #[error("No zone is selected")]
    NoSelection,

    #[error("Zone {0} not found")]
    UnknownZone(DraftId),
}

pub type SessionResult<T> = Result<T, SessionError>;
