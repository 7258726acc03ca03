//! 볼트 세션 게이트 모듈
//!
//! 볼트 봉인(sealed) 상태의 단일 진실 공급원과, 보호 뷰가 공유하는 진입 검사.
//!
//! - `SessionGate`: 상태 조회/갱신, 변경 구독, 관찰자 통지
//! - `ViewGuard`: 상태 변화마다 재평가되는 보호 뷰 전제 조건

pub mod gate;
pub mod guard;

use serde::Serialize;

pub use gate::{SessionGate, SessionObserver};
pub use guard::{GuardDecision, Route, ViewGuard};

/// 볼트 세션 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// 최초 상태 조회 또는 갱신 진행 중
    Loading,
    Sealed,
    Unsealed,
    /// 서비스에 연결할 수 없음 (봉인과 구분)
    Unreachable,
}

impl SessionState {
    /// 상태 조회가 끝나 확정된 상태인지
    pub fn is_settled(&self) -> bool {
        !matches!(self, SessionState::Loading)
    }

    pub fn is_unsealed(&self) -> bool {
        matches!(self, SessionState::Unsealed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Loading => "loading",
            SessionState::Sealed => "sealed",
            SessionState::Unsealed => "unsealed",
            SessionState::Unreachable => "unreachable",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
