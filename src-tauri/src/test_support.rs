//! 테스트용 가짜 볼트 서비스와 클립보드

use crate::api::{ApiError, VaultBackend};
use crate::disclosure::{Clipboard, ClipboardError};
use crate::models::{
    Credential, CredentialId, CredentialUpdate, ListQuery, NewCredential, VaultStatus,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;

/// 대기 중인 태스크가 진행되도록 몇 차례 양보
pub async fn settle_tasks() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

#[derive(Default)]
struct FakeState {
    sealed: bool,
    unreachable: bool,
    scripted_status: VecDeque<oneshot::Receiver<Result<VaultStatus, ApiError>>>,
    status_calls: usize,
    reset_calls: usize,
    credentials: Vec<Credential>,
    next_id: CredentialId,
    secrets: HashMap<CredentialId, String>,
    failing_secrets: HashMap<CredentialId, String>,
    held_secrets: HashMap<CredentialId, oneshot::Receiver<()>>,
    fetches: HashMap<CredentialId, usize>,
}

/// 메모리 내 볼트 서비스
pub struct FakeBackend {
    inner: Mutex<FakeState>,
}

fn status_error(status: u16, detail: &str) -> ApiError {
    ApiError::Status {
        status,
        detail: detail.to_string(),
    }
}

impl FakeBackend {
    pub const MASTER_KEY: &'static str = "correct horse battery staple";

    /// 열린 상태로 시작
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(FakeState {
                next_id: 1,
                ..FakeState::default()
            }),
        }
    }

    pub fn set_sealed(&self, sealed: bool) {
        let mut state = self.inner.lock().unwrap();
        state.sealed = sealed;
        state.unreachable = false;
    }

    /// 이후 상태 조회가 게이트웨이 오류로 실패
    pub fn set_unreachable(&self) {
        self.inner.lock().unwrap().unreachable = true;
    }

    /// 다음 상태 조회 응답을 테스트가 직접 보낸다 (호출 순서대로 소비)
    pub fn script_status(&self) -> oneshot::Sender<Result<VaultStatus, ApiError>> {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().unwrap().scripted_status.push_back(rx);
        tx
    }

    pub fn status_calls(&self) -> usize {
        self.inner.lock().unwrap().status_calls
    }

    pub fn reset_calls(&self) -> usize {
        self.inner.lock().unwrap().reset_calls
    }

    pub fn put_secret(&self, id: CredentialId, secret: &str) {
        let mut state = self.inner.lock().unwrap();
        state.failing_secrets.remove(&id);
        state.secrets.insert(id, secret.to_string());
    }

    pub fn fail_secret(&self, id: CredentialId, detail: &str) {
        self.inner
            .lock()
            .unwrap()
            .failing_secrets
            .insert(id, detail.to_string());
    }

    /// 다음 시크릿 조회를 송신 측이 신호를 보내거나 버릴 때까지 붙잡아 둔다
    pub fn hold_secret(&self, id: CredentialId) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().unwrap().held_secrets.insert(id, rx);
        tx
    }

    pub fn fetch_count(&self, id: CredentialId) -> usize {
        self.inner
            .lock()
            .unwrap()
            .fetches
            .get(&id)
            .copied()
            .unwrap_or(0)
    }

    pub fn credentials(&self) -> Vec<Credential> {
        self.inner.lock().unwrap().credentials.clone()
    }

    fn ensure_open(state: &FakeState) -> Result<(), ApiError> {
        if state.unreachable {
            Err(status_error(503, "Vault service unreachable"))
        } else if state.sealed {
            Err(status_error(403, "Vault is sealed"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl VaultBackend for FakeBackend {
    async fn vault_status(&self) -> Result<VaultStatus, ApiError> {
        let scripted = {
            let mut state = self.inner.lock().unwrap();
            state.status_calls += 1;
            match state.scripted_status.pop_front() {
                Some(rx) => rx,
                None if state.unreachable => return Err(status_error(502, "Bad gateway")),
                None => return Ok(VaultStatus { sealed: state.sealed }),
            }
        };
        scripted
            .await
            .unwrap_or_else(|_| Err(status_error(502, "Bad gateway")))
    }

    async fn unseal(&self, master_key: &str) -> Result<(), ApiError> {
        let mut state = self.inner.lock().unwrap();
        if state.unreachable {
            return Err(status_error(503, "Vault service unreachable"));
        }
        if master_key != Self::MASTER_KEY {
            return Err(status_error(400, "Invalid master key"));
        }
        state.sealed = false;
        Ok(())
    }

    async fn seal(&self) -> Result<(), ApiError> {
        self.inner.lock().unwrap().sealed = true;
        Ok(())
    }

    async fn reset(&self) -> Result<(), ApiError> {
        let mut state = self.inner.lock().unwrap();
        state.reset_calls += 1;
        state.sealed = true;
        state.credentials.clear();
        state.secrets.clear();
        Ok(())
    }

    async fn list_credentials(&self, query: &ListQuery) -> Result<Vec<Credential>, ApiError> {
        let state = self.inner.lock().unwrap();
        Self::ensure_open(&state)?;
        Ok(state
            .credentials
            .iter()
            .filter(|c| query.credential_type.map_or(true, |t| c.credential_type == t))
            .filter(|c| {
                query
                    .category
                    .as_deref()
                    .map_or(true, |cat| c.category.as_deref() == Some(cat))
            })
            .cloned()
            .collect())
    }

    async fn get_credential(&self, id: CredentialId) -> Result<Credential, ApiError> {
        let state = self.inner.lock().unwrap();
        Self::ensure_open(&state)?;
        state
            .credentials
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| status_error(404, "Credential not found"))
    }

    async fn create_credential(&self, input: &NewCredential) -> Result<Credential, ApiError> {
        let mut state = self.inner.lock().unwrap();
        Self::ensure_open(&state)?;
        if input.name.trim().is_empty() {
            return Err(status_error(422, "field required"));
        }
        let id = state.next_id;
        state.next_id += 1;
        let now = Utc::now();
        let credential = Credential {
            id,
            credential_type: input.credential_type,
            name: input.name.clone(),
            username: input.username.clone(),
            category: input.category.clone(),
            description: input.description.clone(),
            created_at: now,
            updated_at: now,
        };
        state.secrets.insert(id, input.secret.clone());
        state.credentials.push(credential.clone());
        Ok(credential)
    }

    async fn update_credential(
        &self,
        id: CredentialId,
        update: &CredentialUpdate,
    ) -> Result<Credential, ApiError> {
        let mut state = self.inner.lock().unwrap();
        Self::ensure_open(&state)?;
        if let Some(secret) = &update.secret {
            state.secrets.insert(id, secret.clone());
        }
        let credential = state
            .credentials
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| status_error(404, "Credential not found"))?;
        if let Some(name) = &update.name {
            credential.name = name.clone();
        }
        if let Some(username) = &update.username {
            credential.username = Some(username.clone()).filter(|u| !u.is_empty());
        }
        if let Some(category) = &update.category {
            credential.category = Some(category.clone()).filter(|c| !c.is_empty());
        }
        if let Some(description) = &update.description {
            credential.description = Some(description.clone()).filter(|d| !d.is_empty());
        }
        credential.updated_at = Utc::now();
        Ok(credential.clone())
    }

    async fn delete_credential(&self, id: CredentialId) -> Result<(), ApiError> {
        let mut state = self.inner.lock().unwrap();
        Self::ensure_open(&state)?;
        let before = state.credentials.len();
        state.credentials.retain(|c| c.id != id);
        if state.credentials.len() == before {
            return Err(status_error(404, "Credential not found"));
        }
        state.secrets.remove(&id);
        Ok(())
    }

    async fn fetch_secret(&self, id: CredentialId) -> Result<String, ApiError> {
        let held = {
            let mut state = self.inner.lock().unwrap();
            *state.fetches.entry(id).or_insert(0) += 1;
            Self::ensure_open(&state)?;
            state.held_secrets.remove(&id)
        };
        if let Some(release) = held {
            let _ = release.await;
        }

        let state = self.inner.lock().unwrap();
        if let Some(detail) = state.failing_secrets.get(&id) {
            return Err(status_error(404, detail));
        }
        state
            .secrets
            .get(&id)
            .cloned()
            .ok_or_else(|| status_error(404, "Credential not found"))
    }
}

/// 쓰기 내역을 기록하는 클립보드
#[derive(Default)]
pub struct RecordingClipboard {
    writes: Mutex<Vec<String>>,
    failing: AtomicBool,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl RecordingClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// 다음 쓰기를 송신 측이 신호를 보낼 때까지 붙잡아 둔다
    pub fn hold(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clipboard for RecordingClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let held = self.gate.lock().unwrap().take();
        if let Some(release) = held {
            let _ = release.await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClipboardError::Unavailable);
        }
        self.writes.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
