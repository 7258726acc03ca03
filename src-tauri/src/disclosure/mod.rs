//! 시크릿 노출 제어 모듈
//!
//! 크리덴셜 평문 시크릿의 조회/캐시/순간 표시/복사를 한 곳에서 관리합니다.
//!
//! - 시크릿은 세션당 크리덴셜별로 최대 1회만 네트워크에서 가져옴
//! - 평문은 사용자가 표시 버튼을 누르고 있는 동안에만 노출
//! - 복사는 명시적 사용자 동작이며 1.5초간 확인 표시

pub mod clipboard;
pub mod controller;

use crate::models::CredentialId;
use crate::session::SessionState;
use serde::Serialize;
use std::time::Duration;

pub use clipboard::{Clipboard, ClipboardError, SystemClipboard};
pub use controller::SecretDisclosureController;

/// 복사 확인 표시 유지 시간
pub const COPY_FEEDBACK_WINDOW: Duration = Duration::from_millis(1500);

/// 가려진 시크릿 표시 문자열
pub const SECRET_MASK: &str = "**********";

/// 복사 대상 필드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyKind {
    Password,
    Username,
}

/// 복사 확인 표시 (동시에 최대 1개)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyFeedback {
    pub credential_id: CredentialId,
    pub kind: CopyKind,
}

/// 화면 갱신용 상태 스냅샷 (평문은 포함하지 않음)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosureSnapshot {
    pub held: Option<CredentialId>,
    pub feedback: Option<CopyFeedback>,
}

/// 시크릿 노출 오류 (크리덴셜 단위, 복구 가능)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisclosureError {
    #[error("Vault is not open (state: {0})")]
    NotUnsealed(SessionState),

    #[error("Could not load secret for credential {id}: {message}")]
    Fetch { id: CredentialId, message: String },

    #[error("Could not copy to clipboard: {0}")]
    Clipboard(String),

    #[error("Secret was discarded before it arrived")]
    Invalidated,
}

impl DisclosureError {
    pub fn code(&self) -> &'static str {
        match self {
            DisclosureError::NotUnsealed(SessionState::Unreachable) => "VAULT_UNREACHABLE",
            DisclosureError::NotUnsealed(SessionState::Loading) => "VAULT_LOADING",
            DisclosureError::NotUnsealed(_) => "VAULT_SEALED",
            DisclosureError::Fetch { .. } => "SECRET_FETCH_FAILED",
            DisclosureError::Clipboard(_) => "CLIPBOARD_ERROR",
            DisclosureError::Invalidated => "SECRET_INVALIDATED",
        }
    }

    /// 사용자에게 보여줄 문구
    pub fn user_message(&self) -> String {
        match self {
            DisclosureError::NotUnsealed(SessionState::Unreachable) => {
                "Vault service unreachable.".to_string()
            }
            DisclosureError::NotUnsealed(SessionState::Loading) => {
                "Checking vault status. Try again in a moment.".to_string()
            }
            DisclosureError::NotUnsealed(_) => "Vault is sealed. Open it first.".to_string(),
            DisclosureError::Fetch { message, .. } => message.clone(),
            DisclosureError::Clipboard(_) => "Could not copy to clipboard.".to_string(),
            DisclosureError::Invalidated => "Secret is no longer available. Try again.".to_string(),
        }
    }
}
