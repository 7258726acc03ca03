//! 볼트 세션 명령
//!
//! 상태 조회/갱신, 마스터키로 열기, 봉인, 초기화, 화면 진입 검사.

use crate::commands::{invalid_input, AppState};
use crate::error::CommandResult;
use crate::session::{guard, GuardDecision, Route, SessionState};
use zeroize::Zeroizing;

/// 현재 세션 상태 (네트워크 호출 없음)
pub fn vault_status(state: &AppState) -> SessionState {
    state.gate.current_state()
}

/// 상태 재조회 ("다시 시도" 버튼)
pub async fn vault_refresh(state: &AppState) -> CommandResult<SessionState> {
    Ok(state.gate.refresh().await?)
}

/// 마스터키로 볼트 열기
pub async fn vault_unseal(state: &AppState, master_key: String) -> CommandResult<SessionState> {
    let master_key = Zeroizing::new(master_key);
    if master_key.trim().is_empty() {
        return Err(invalid_input("Master key is required."));
    }
    let next = state.gate.unseal(master_key).await?;
    tracing::info!("[Vault] Unseal request finished: {}", next);
    Ok(next)
}

/// 볼트 봉인. 봉인 확정 시 캐시된 시크릿은 관찰자 통지로 폐기된다.
pub async fn vault_seal(state: &AppState) -> CommandResult<SessionState> {
    Ok(state.gate.seal().await?)
}

/// 볼트 초기화 후 재조회
pub async fn vault_reset(state: &AppState) -> CommandResult<SessionState> {
    state.backend.reset().await?;
    state.disclosure.invalidate_all();
    tracing::warn!("[Vault] Vault reset requested");
    Ok(state.gate.refresh().await?)
}

/// 화면 진입 검사
pub fn guard_decision(state: &AppState, route: Route) -> GuardDecision {
    guard::evaluate(state.gate.current_state(), route)
}
