//! SecretDisclosureController
//!
//! 크리덴셜별 시크릿 캐시와 순간 표시/복사 상태를 관리합니다.
//!
//! - 같은 ID에 대한 조회는 동시에 최대 1개: 진행 중인 조회가 있으면 합류
//! - 표시 버튼을 놓은 뒤 도착한 시크릿은 캐시만 채우고 화면에는 드러내지 않음
//! - 세션이 열린 상태를 벗어나면 캐시/진행 중 조회/표시 상태를 모두 폐기
//! - 평문은 세션이 열린 상태일 때만 화면/클립보드로 나감 (갱신 중에는 마스크)

use crate::api::VaultBackend;
use crate::disclosure::{
    Clipboard, CopyFeedback, CopyKind, DisclosureError, DisclosureSnapshot, COPY_FEEDBACK_WINDOW,
    SECRET_MASK,
};
use crate::models::CredentialId;
use crate::session::{SessionGate, SessionObserver, SessionState};
use crate::utils::lock;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use zeroize::Zeroizing;

type FetchOutcome = Result<(), DisclosureError>;
type PendingFetch = Shared<BoxFuture<'static, FetchOutcome>>;

/// 진행 중인 표시 버튼 누름
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Press {
    seq: u64,
    id: CredentialId,
}

#[derive(Debug, Clone, Copy)]
struct ActiveFeedback {
    seq: u64,
    feedback: CopyFeedback,
}

#[derive(Default)]
struct DisclosureState {
    cache: HashMap<CredentialId, Zeroizing<String>>,
    /// ID별 진행 중 조회 (조회 번호, 공유 future)
    pending: HashMap<CredentialId, (u64, PendingFetch)>,
    next_fetch: u64,
    held: Option<CredentialId>,
    press: Option<Press>,
    next_press: u64,
    feedback: Option<ActiveFeedback>,
    next_feedback: u64,
    /// `invalidate_all`마다 증가. 그 이전에 시작된 복사는 확인 표시를 켜지 못한다.
    epoch: u64,
}

impl DisclosureState {
    fn snapshot(&self) -> DisclosureSnapshot {
        DisclosureSnapshot {
            held: self.held,
            feedback: self.feedback.map(|f| f.feedback),
        }
    }
}

/// 조회 태스크/타이머와 공유하는 부분
struct Core {
    state: Mutex<DisclosureState>,
    view: watch::Sender<DisclosureSnapshot>,
}

impl Core {
    fn publish(&self, state: &DisclosureState) {
        let next = state.snapshot();
        self.view.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

/// 시크릿 노출 컨트롤러
pub struct SecretDisclosureController {
    backend: Arc<dyn VaultBackend>,
    clipboard: Arc<dyn Clipboard>,
    session: watch::Receiver<SessionState>,
    core: Arc<Core>,
    feedback_window: Duration,
}

impl SecretDisclosureController {
    pub fn new(
        backend: Arc<dyn VaultBackend>,
        clipboard: Arc<dyn Clipboard>,
        session: watch::Receiver<SessionState>,
    ) -> Self {
        let (view, _) = watch::channel(DisclosureSnapshot::default());
        Self {
            backend,
            clipboard,
            session,
            core: Arc::new(Core {
                state: Mutex::new(DisclosureState::default()),
                view,
            }),
            feedback_window: COPY_FEEDBACK_WINDOW,
        }
    }

    /// 게이트에 연결된 컨트롤러 생성
    ///
    /// 게이트 상태를 구독하고, 열린 상태가 아닌 상태로 확정되면 캐시를 비우도록 관찰자로 등록한다.
    pub fn for_gate(
        gate: &SessionGate,
        backend: Arc<dyn VaultBackend>,
        clipboard: Arc<dyn Clipboard>,
    ) -> Arc<Self> {
        let controller = Arc::new(Self::new(backend, clipboard, gate.subscribe()));
        gate.add_observer(controller.clone());
        controller
    }

    /// 표시 버튼 누름
    ///
    /// 시크릿이 준비되었을 때 아직 누르고 있으면 `Ok(true)`, 그 전에 놓았으면 `Ok(false)`.
    /// 조회 실패 시 해당 크리덴셜만 실패하며 다른 크리덴셜 상태는 건드리지 않는다.
    pub async fn reveal_start(&self, id: CredentialId) -> Result<bool, DisclosureError> {
        self.ensure_open()?;

        let press = {
            let mut state = lock(&self.core.state);
            state.next_press += 1;
            let press = Press {
                seq: state.next_press,
                id,
            };
            state.press = Some(press);
            // 다른 크리덴셜이 표시 중이었다면 먼저 가린다
            if state.held.is_some_and(|held| held != id) {
                state.held = None;
                self.core.publish(&state);
            }
            press
        };

        let outcome = self.ensure_cached(id).await;

        let mut state = lock(&self.core.state);
        let still_pressed = state.press == Some(press);
        match outcome {
            Ok(()) if still_pressed && state.cache.contains_key(&id) => {
                state.held = Some(id);
                self.core.publish(&state);
                tracing::debug!("[Disclosure] Revealing credential {}", id);
                Ok(true)
            }
            Ok(()) => {
                tracing::debug!("[Disclosure] Credential {} released before secret arrived", id);
                Ok(false)
            }
            Err(e) => {
                if still_pressed {
                    state.press = None;
                }
                Err(e)
            }
        }
    }

    /// 표시 버튼 놓음 (어떤 상태에서든 즉시 가림)
    pub fn reveal_end(&self) {
        let mut state = lock(&self.core.state);
        state.press = None;
        state.held = None;
        self.core.publish(&state);
    }

    /// 시크릿을 클립보드로 복사
    ///
    /// 성공하면 복사 확인 표시가 일정 시간 켜진다. 빈 시크릿은 아무 것도 하지 않는다.
    /// 클립보드 쓰기 도중 세션이 닫히면 방금 쓴 평문을 지우고 `Invalidated`를 돌려준다.
    /// 갱신 중(`Loading`)에는 새 복사를 시작하지 않는다.
    pub async fn copy_secret(&self, id: CredentialId) -> Result<(), DisclosureError> {
        self.ensure_open()?;
        let epoch = self.epoch();
        self.ensure_cached(id).await?;
        self.ensure_current(epoch)?;

        let secret = lock(&self.core.state)
            .cache
            .get(&id)
            .cloned()
            .ok_or(DisclosureError::Invalidated)?;
        if secret.is_empty() {
            return Ok(());
        }

        self.write_clipboard(secret.as_str()).await?;
        drop(secret);

        // 쓰는 동안 세션이 닫혔으면 (폐기 발생) 방금 쓴 평문을 지운다
        if self.epoch() != epoch {
            tracing::warn!(
                "[Disclosure] Session closed while copying credential {}, clearing clipboard",
                id
            );
            if let Err(wipe) = self.clipboard.write_text("").await {
                tracing::warn!("[Disclosure] Clipboard wipe failed: {}", wipe);
            }
            return Err(DisclosureError::Invalidated);
        }
        self.show_feedback(id, CopyKind::Password, epoch);
        tracing::info!("[Disclosure] Copied secret of credential {}", id);
        Ok(())
    }

    /// 사용자명을 클립보드로 복사 (네트워크 조회 없음)
    pub async fn copy_username(
        &self,
        id: CredentialId,
        username: &str,
    ) -> Result<(), DisclosureError> {
        if username.is_empty() {
            return Ok(());
        }
        let epoch = self.epoch();
        self.write_clipboard(username).await?;
        self.show_feedback(id, CopyKind::Username, epoch);
        Ok(())
    }

    /// 캐시/진행 중 조회/표시/복사 확인을 모두 폐기
    ///
    /// 폐기 이전에 시작된 조회 결과는 도착해도 캐시에 들어가지 않는다.
    pub fn invalidate_all(&self) {
        let mut state = lock(&self.core.state);
        let dropped = state.cache.len();
        let abandoned = state.pending.len();
        state.epoch += 1;
        state.cache.clear();
        state.pending.clear();
        state.held = None;
        state.press = None;
        state.feedback = None;
        self.core.publish(&state);
        if dropped > 0 || abandoned > 0 {
            tracing::info!(
                "[Disclosure] Invalidated {} cached secret(s), abandoned {} fetch(es)",
                dropped,
                abandoned
            );
        }
    }

    /// 한 크리덴셜의 캐시만 폐기 (삭제/시크릿 교체 후)
    pub fn forget(&self, id: CredentialId) {
        let mut state = lock(&self.core.state);
        state.cache.remove(&id);
        state.pending.remove(&id);
        if state.held == Some(id) {
            state.held = None;
        }
        if state.press.is_some_and(|p| p.id == id) {
            state.press = None;
        }
        self.core.publish(&state);
    }

    /// 표시 중이고 세션이 열려 있을 때만 평문 반환
    ///
    /// 갱신으로 `Loading`이 된 동안에는 누르고 있어도 가린다.
    pub fn revealed_secret(&self, id: CredentialId) -> Option<Zeroizing<String>> {
        if !self.session.borrow().is_unsealed() {
            return None;
        }
        let state = lock(&self.core.state);
        if state.held != Some(id) {
            return None;
        }
        state.cache.get(&id).cloned()
    }

    /// 화면 표시 문자열: 표시 중이면 평문, 아니면 마스크
    pub fn display_secret(&self, id: CredentialId) -> Zeroizing<String> {
        self.revealed_secret(id)
            .unwrap_or_else(|| Zeroizing::new(SECRET_MASK.to_string()))
    }

    pub fn held(&self) -> Option<CredentialId> {
        lock(&self.core.state).held
    }

    pub fn feedback(&self) -> Option<CopyFeedback> {
        lock(&self.core.state).feedback.map(|f| f.feedback)
    }

    pub fn is_cached(&self, id: CredentialId) -> bool {
        lock(&self.core.state).cache.contains_key(&id)
    }

    pub fn snapshot(&self) -> DisclosureSnapshot {
        lock(&self.core.state).snapshot()
    }

    /// 표시/복사 확인 상태 변경 구독
    pub fn subscribe(&self) -> watch::Receiver<DisclosureSnapshot> {
        self.core.view.subscribe()
    }

    fn ensure_open(&self) -> Result<(), DisclosureError> {
        let state = *self.session.borrow();
        if state.is_unsealed() {
            Ok(())
        } else {
            Err(DisclosureError::NotUnsealed(state))
        }
    }

    fn epoch(&self) -> u64 {
        lock(&self.core.state).epoch
    }

    /// `epoch` 이후 폐기가 없었고 세션이 아직 열려 있는지
    fn ensure_current(&self, epoch: u64) -> Result<(), DisclosureError> {
        if self.epoch() != epoch {
            return Err(DisclosureError::Invalidated);
        }
        self.ensure_open()
    }

    /// 캐시에 없으면 조회 (진행 중인 조회가 있으면 합류)
    async fn ensure_cached(&self, id: CredentialId) -> Result<(), DisclosureError> {
        let pending = {
            let mut state = lock(&self.core.state);
            if state.cache.contains_key(&id) {
                return Ok(());
            }
            let in_flight = state
                .pending
                .get(&id)
                .map(|(seq, fetch)| (*seq, fetch.clone()));
            match in_flight {
                Some((seq, fetch)) => {
                    tracing::debug!("[Disclosure] Joining fetch #{} for credential {}", seq, id);
                    fetch
                }
                None => self.spawn_fetch(&mut state, id),
            }
        };
        pending.await
    }

    fn spawn_fetch(&self, state: &mut DisclosureState, id: CredentialId) -> PendingFetch {
        state.next_fetch += 1;
        let seq = state.next_fetch;
        let backend = self.backend.clone();
        let core = self.core.clone();

        tracing::debug!("[Disclosure] Fetch #{} for credential {}", seq, id);
        let task = tokio::spawn(async move {
            let result = backend.fetch_secret(id).await;

            let mut state = lock(&core.state);
            // 폐기/교체된 조회면 결과를 버린다
            let current = state.pending.get(&id).is_some_and(|(s, _)| *s == seq);
            if current {
                state.pending.remove(&id);
            }
            match result {
                Ok(secret) if current => {
                    state.cache.insert(id, Zeroizing::new(secret));
                    Ok(())
                }
                Ok(secret) => {
                    drop(Zeroizing::new(secret));
                    tracing::debug!("[Disclosure] Discarding stale fetch #{}", seq);
                    Err(DisclosureError::Invalidated)
                }
                Err(e) => {
                    tracing::warn!("[Disclosure] Fetch #{} for credential {} failed: {}", seq, id, e);
                    Err(DisclosureError::Fetch {
                        id,
                        message: e.user_message(),
                    })
                }
            }
        });

        let fetch = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(DisclosureError::Fetch {
                    id,
                    message: format!("Secret fetch aborted: {}", e),
                }),
            }
        }
        .boxed()
        .shared();

        state.pending.insert(id, (seq, fetch.clone()));
        fetch
    }

    async fn write_clipboard(&self, text: &str) -> Result<(), DisclosureError> {
        self.clipboard.write_text(text).await.map_err(|e| {
            tracing::warn!("[Disclosure] Clipboard write failed: {}", e);
            DisclosureError::Clipboard(e.to_string())
        })
    }

    /// 복사 확인 표시 (이전 표시를 대체하고 일정 시간 뒤 스스로 꺼짐)
    ///
    /// 복사 시작 후 폐기가 있었으면 켜지 않는다.
    fn show_feedback(&self, id: CredentialId, kind: CopyKind, epoch: u64) {
        let seq = {
            let mut state = lock(&self.core.state);
            if state.epoch != epoch {
                return;
            }
            state.next_feedback += 1;
            let seq = state.next_feedback;
            state.feedback = Some(ActiveFeedback {
                seq,
                feedback: CopyFeedback {
                    credential_id: id,
                    kind,
                },
            });
            self.core.publish(&state);
            seq
        };

        let core = self.core.clone();
        let window = self.feedback_window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let mut state = lock(&core.state);
            if state.feedback.is_some_and(|f| f.seq == seq) {
                state.feedback = None;
                core.publish(&state);
            }
        });
    }
}

impl SessionObserver for SecretDisclosureController {
    fn on_session_settled(&self, state: SessionState) {
        if !state.is_unsealed() {
            self.invalidate_all();
        }
    }
}
