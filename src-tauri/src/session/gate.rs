//! SessionGate - 볼트 봉인 상태 관리
//!
//! - 상태는 프로세스 전체에서 1개, 게이트만 변경
//! - 상태 조회마다 단조 증가 토큰을 발급하고, 최신 토큰이 아닌 결과는 버림
//! - 상태 조회 실패는 밖으로 던지지 않고 `Unreachable`로 흡수

use crate::api::{ApiError, VaultBackend};
use crate::session::SessionState;
use crate::utils::{lock, read, write};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::watch;
use zeroize::Zeroizing;

/// 상태 확정 관찰자
///
/// 게이트가 상태 조회 결과를 확정할 때마다 확정 순서대로 동기 호출된다.
/// 게이트 내부 잠금을 쥔 상태로 호출되므로 구현에서 게이트를 다시 호출하면 안 된다.
pub trait SessionObserver: Send + Sync {
    fn on_session_settled(&self, state: SessionState);
}

/// 상태 조회 토큰 장부
#[derive(Debug, Default)]
struct StatusLedger {
    /// 마지막으로 발급한 토큰
    issued: u64,
}

/// 볼트 세션 게이트
pub struct SessionGate {
    backend: Arc<dyn VaultBackend>,
    state: watch::Sender<SessionState>,
    ledger: Mutex<StatusLedger>,
    observers: RwLock<Vec<Arc<dyn SessionObserver>>>,
}

impl SessionGate {
    /// 게이트 생성 (초기 상태는 항상 `Loading`)
    pub fn new(backend: Arc<dyn VaultBackend>) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self {
            backend,
            state,
            ledger: Mutex::new(StatusLedger::default()),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// 최초 상태 조회 (앱 시작 시 1회)
    ///
    /// 실패해도 에러를 돌려주지 않는다. 결과는 `current_state()`로 확인.
    pub async fn initialize(&self) -> SessionState {
        match self.refresh().await {
            Ok(state) => {
                tracing::info!("[SessionGate] Initialized: {}", state);
                state
            }
            Err(e) => {
                tracing::warn!("[SessionGate] Initial status check failed: {}", e);
                SessionState::Unreachable
            }
        }
    }

    /// 상태 재조회
    ///
    /// 진행 중인 다른 갱신이 있어도 안전하다. 호출자는 자기 상태 조회의 결과만 받으며,
    /// 이후에 발급된 상태 조회가 있으면 이 결과는 관찰 상태에 반영되지 않는다.
    /// 상태 조회 실패 시 상태는 `Unreachable`이 되고 호출자에게는 에러가 반환된다.
    pub async fn refresh(&self) -> Result<SessionState, ApiError> {
        let token = self.begin_check();

        let outcome = self.backend.vault_status().await;
        let next = match &outcome {
            Ok(status) if status.sealed => SessionState::Sealed,
            Ok(_) => SessionState::Unsealed,
            Err(e) => {
                tracing::warn!("[SessionGate] Status check #{} failed: {}", token, e);
                SessionState::Unreachable
            }
        };

        self.settle(token, next);
        outcome.map(|_| next)
    }

    /// 최신 확정 상태 (동기 조회)
    pub fn current_state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// 상태 변경 구독
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// 확정 관찰자 등록
    pub fn add_observer(&self, observer: Arc<dyn SessionObserver>) {
        write(&self.observers).push(observer);
    }

    /// 마스터키로 볼트 열기 후 상태 갱신
    pub async fn unseal(&self, master_key: Zeroizing<String>) -> Result<SessionState, ApiError> {
        self.backend.unseal(master_key.as_str()).await?;
        drop(master_key);
        self.refresh().await
    }

    /// 볼트 봉인 후 상태 갱신
    pub async fn seal(&self) -> Result<SessionState, ApiError> {
        self.backend.seal().await?;
        self.refresh().await
    }

    /// 새 토큰 발급 후 상태를 `Loading`으로 강제
    fn begin_check(&self) -> u64 {
        let mut ledger = lock(&self.ledger);
        ledger.issued += 1;
        self.publish(SessionState::Loading);
        tracing::debug!("[SessionGate] Status check #{} issued", ledger.issued);
        ledger.issued
    }

    /// 상태 조회 결과 확정. 더 최신 상태 조회가 발급되어 있으면 버림.
    fn settle(&self, token: u64, next: SessionState) -> bool {
        let ledger = lock(&self.ledger);
        if token != ledger.issued {
            tracing::debug!(
                "[SessionGate] Discarding superseded status check #{} (latest #{})",
                token,
                ledger.issued
            );
            return false;
        }

        let previous = self.current_state();
        self.publish(next);
        if previous != next {
            tracing::info!("[SessionGate] {} -> {}", previous, next);
        }

        // 잠금 보유 중 통지: 관찰자는 확정 순서대로 상태를 받는다
        for observer in read(&self.observers).iter() {
            observer.on_session_settled(next);
        }
        true
    }

    fn publish(&self, next: SessionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
