//! 명령 파사드
//!
//! 셸(데스크톱/터미널 UI)이 호출하는 명령 정의. 모든 명령은 셸이 관리하는 `AppState`를 받아
//! 직렬화 가능한 `CommandResult`를 돌려준다. 데스크톱 셸에서는 `desktop` 모듈의
//! `#[tauri::command]` 래퍼가 `State<'_, AppState>`로 이 함수들을 호출한다.
//!
//! - 볼트가 열려 있어야 하는 명령은 네트워크 호출 전에 세션 상태를 확인
//! - 시크릿 평문은 `SecretDisclosureController`를 통해서만 다룸

pub mod credentials;
pub mod secrets;
pub mod vault;

use crate::api::{VaultApiClient, VaultBackend};
use crate::config::ClientConfig;
use crate::disclosure::{Clipboard, SecretDisclosureController};
use crate::error::{CommandError, KeyPilotError};
use crate::session::{SessionGate, SessionState};
use std::sync::Arc;

/// 앱 상태 (세션 게이트 + 시크릿 노출 컨트롤러)
pub struct AppState {
    pub backend: Arc<dyn VaultBackend>,
    pub gate: Arc<SessionGate>,
    pub disclosure: Arc<SecretDisclosureController>,
}

impl AppState {
    /// 설정의 서비스 주소로 HTTP 클라이언트를 만들고 주어진 클립보드와 묶는다
    pub fn new(config: &ClientConfig, clipboard: Arc<dyn Clipboard>) -> Result<Self, KeyPilotError> {
        let client = VaultApiClient::new(config)?;
        tracing::info!("[AppState] Vault service at {}", client.base_url());
        Ok(Self::with_backend(Arc::new(client), clipboard))
    }

    pub fn with_backend(backend: Arc<dyn VaultBackend>, clipboard: Arc<dyn Clipboard>) -> Self {
        let gate = Arc::new(SessionGate::new(backend.clone()));
        let disclosure = SecretDisclosureController::for_gate(&gate, backend.clone(), clipboard);
        Self {
            backend,
            gate,
            disclosure,
        }
    }

    /// 종료 처리: 캐시된 평문을 모두 폐기
    pub fn shutdown(&self) {
        self.disclosure.invalidate_all();
        tracing::info!("[AppState] Shut down");
    }

    /// 볼트가 열려 있어야 하는 명령의 사전 조건
    pub(crate) fn require_unsealed(&self) -> Result<(), CommandError> {
        match self.gate.current_state() {
            SessionState::Unsealed => Ok(()),
            SessionState::Sealed => Err(KeyPilotError::VaultSealed.into()),
            SessionState::Unreachable => Err(KeyPilotError::VaultUnreachable.into()),
            SessionState::Loading => Err(KeyPilotError::VaultLoading.into()),
        }
    }
}

/// 입력 검증 실패
pub(crate) fn invalid_input(message: &str) -> CommandError {
    CommandError {
        code: "INVALID_INPUT".to_string(),
        message: message.to_string(),
        details: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeBackend, RecordingClipboard};

    #[tokio::test]
    async fn test_shutdown_discards_cached_secrets() {
        let backend = Arc::new(FakeBackend::new());
        backend.put_secret(1, "p@ss");
        let state = AppState::with_backend(backend.clone(), Arc::new(RecordingClipboard::new()));
        state.gate.initialize().await;

        state.disclosure.copy_secret(1).await.unwrap();
        assert!(state.disclosure.is_cached(1));

        state.shutdown();
        assert!(!state.disclosure.is_cached(1));
        assert_eq!(state.disclosure.feedback(), None);
    }

    #[tokio::test]
    async fn test_require_unsealed_maps_each_state() {
        let backend = Arc::new(FakeBackend::new());
        let state = AppState::with_backend(backend.clone(), Arc::new(RecordingClipboard::new()));
        assert_eq!(state.require_unsealed().unwrap_err().code, "VAULT_LOADING");

        backend.set_sealed(true);
        state.gate.initialize().await;
        assert_eq!(state.require_unsealed().unwrap_err().code, "VAULT_SEALED");

        backend.set_unreachable();
        state.gate.initialize().await;
        assert_eq!(state.require_unsealed().unwrap_err().code, "VAULT_UNREACHABLE");

        backend.set_sealed(false);
        state.gate.initialize().await;
        assert!(state.require_unsealed().is_ok());
    }
}
