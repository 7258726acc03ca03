//! 보호 뷰 진입 검사
//!
//! 모든 크리덴셜 관련 뷰가 공유하는 전제 조건. 진입 시 한 번이 아니라
//! 세션 상태가 바뀔 때마다 다시 평가해야 한다 (서비스 측 타임아웃, 다른 화면에서의 봉인 등).

use crate::session::{SessionGate, SessionState};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// 화면 경로
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// 마스터키 입력 화면 (봉인 상태에서 유일하게 허용)
    Unseal,
    Credentials,
    Chat,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Unseal => "/unseal",
            Route::Credentials => "/",
            Route::Chat => "/chat",
        }
    }
}

/// 뷰가 취해야 할 동작
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardDecision {
    /// 상태 확인 중: 로딩 표시만
    Loading,
    /// 자체 콘텐츠 렌더링 허용
    Render,
    /// 아무것도 그리지 않고 잠금 해제 화면으로 이동
    RedirectToUnseal,
    /// 서비스 연결 불가: 재시도 버튼만 표시
    ShowRetry,
}

/// 세션 상태와 경로로 뷰 동작 결정
pub fn evaluate(state: SessionState, route: Route) -> GuardDecision {
    match state {
        SessionState::Loading => GuardDecision::Loading,
        SessionState::Unreachable => GuardDecision::ShowRetry,
        SessionState::Sealed if route == Route::Unseal => GuardDecision::Render,
        SessionState::Sealed => GuardDecision::RedirectToUnseal,
        SessionState::Unsealed => GuardDecision::Render,
    }
}

/// 보호 뷰용 가드
///
/// 게이트 구독을 쥐고 있으면서 상태가 바뀔 때마다 결정을 다시 계산한다.
pub struct ViewGuard {
    route: Route,
    session: watch::Receiver<SessionState>,
}

impl ViewGuard {
    /// 뷰 진입 시 생성
    pub fn enter(gate: &SessionGate, route: Route) -> Self {
        Self::from_receiver(gate.subscribe(), route)
    }

    pub fn from_receiver(session: watch::Receiver<SessionState>, route: Route) -> Self {
        Self { route, session }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    /// 현재 상태 기준 결정
    pub fn decision(&self) -> GuardDecision {
        evaluate(*self.session.borrow(), self.route)
    }

    /// 열린 볼트를 전제로 하는 API 호출 허용 여부
    pub fn permits_vault_calls(&self) -> bool {
        let state = *self.session.borrow();
        state.is_unsealed() && evaluate(state, self.route) == GuardDecision::Render
    }

    /// 다음 상태 변경까지 대기 후 재평가
    ///
    /// 게이트가 사라지면 `None`.
    pub async fn changed(&mut self) -> Option<GuardDecision> {
        self.session.changed().await.ok()?;
        let state = *self.session.borrow_and_update();
        let decision = evaluate(state, self.route);
        tracing::debug!("[ViewGuard] {} on {}: {:?}", state, self.route.path(), decision);
        Some(decision)
    }
}
