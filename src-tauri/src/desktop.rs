//! 데스크톱 셸 (Tauri)
//!
//! `commands` 모듈의 명령을 `#[tauri::command]`로 노출하고, `AppState`를 Tauri가 관리합니다.
//! 클립보드는 clipboard-manager 플러그인을 통해 씁니다.

use crate::commands::{credentials, secrets, vault, AppState};
use crate::config::ClientConfig;
use crate::disclosure::{Clipboard, ClipboardError, DisclosureSnapshot};
use crate::error::CommandResult;
use crate::models::{Credential, CredentialId, CredentialUpdate, ListQuery, NewCredential};
use crate::session::{GuardDecision, Route, SessionState};
use async_trait::async_trait;
use std::sync::Arc;
use tauri::{AppHandle, Emitter, Manager, State};
use tauri_plugin_clipboard_manager::ClipboardExt;

/// 세션 상태 변경 이벤트
pub const SESSION_EVENT: &str = "vault-session";

/// 표시/복사 확인 상태 변경 이벤트
pub const DISCLOSURE_EVENT: &str = "secret-disclosure";

/// clipboard-manager 플러그인 기반 클립보드
pub struct TauriClipboard {
    app: AppHandle,
}

impl TauriClipboard {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

#[async_trait]
impl Clipboard for TauriClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.app
            .clipboard()
            .write_text(text.to_string())
            .map_err(|e| ClipboardError::Backend(e.to_string()))
    }
}

// ============================================
// 볼트 세션
// ============================================

#[tauri::command]
pub fn vault_status(state: State<'_, AppState>) -> SessionState {
    vault::vault_status(state.inner())
}

#[tauri::command]
pub async fn vault_refresh(state: State<'_, AppState>) -> CommandResult<SessionState> {
    vault::vault_refresh(state.inner()).await
}

#[tauri::command]
pub async fn vault_unseal(
    state: State<'_, AppState>,
    master_key: String,
) -> CommandResult<SessionState> {
    vault::vault_unseal(state.inner(), master_key).await
}

#[tauri::command]
pub async fn vault_seal(state: State<'_, AppState>) -> CommandResult<SessionState> {
    vault::vault_seal(state.inner()).await
}

#[tauri::command]
pub async fn vault_reset(state: State<'_, AppState>) -> CommandResult<SessionState> {
    vault::vault_reset(state.inner()).await
}

#[tauri::command]
pub fn guard_decision(state: State<'_, AppState>, route: Route) -> GuardDecision {
    vault::guard_decision(state.inner(), route)
}

// ============================================
// 크리덴셜
// ============================================

#[tauri::command]
pub async fn credentials_list(
    state: State<'_, AppState>,
    query: Option<ListQuery>,
) -> CommandResult<Vec<Credential>> {
    credentials::credentials_list(state.inner(), &query.unwrap_or_default()).await
}

#[tauri::command]
pub async fn credentials_get(
    state: State<'_, AppState>,
    id: CredentialId,
) -> CommandResult<Credential> {
    credentials::credentials_get(state.inner(), id).await
}

#[tauri::command]
pub async fn credentials_create(
    state: State<'_, AppState>,
    input: NewCredential,
) -> CommandResult<Credential> {
    credentials::credentials_create(state.inner(), input).await
}

#[tauri::command]
pub async fn credentials_update(
    state: State<'_, AppState>,
    id: CredentialId,
    update: CredentialUpdate,
) -> CommandResult<Credential> {
    credentials::credentials_update(state.inner(), id, update).await
}

#[tauri::command]
pub async fn credentials_delete(state: State<'_, AppState>, id: CredentialId) -> CommandResult<()> {
    credentials::credentials_delete(state.inner(), id).await
}

// ============================================
// 시크릿 표시/복사
// ============================================

#[tauri::command]
pub async fn secret_reveal_start(
    state: State<'_, AppState>,
    id: CredentialId,
) -> CommandResult<bool> {
    secrets::secret_reveal_start(state.inner(), id).await
}

#[tauri::command]
pub fn secret_reveal_end(state: State<'_, AppState>) {
    secrets::secret_reveal_end(state.inner());
}

/// IPC로 넘길 평문은 응답 직렬화 후 웹뷰 쪽에서만 남는다
#[tauri::command]
pub fn secret_display(state: State<'_, AppState>, id: CredentialId) -> String {
    let mut shown = secrets::secret_display(state.inner(), id);
    std::mem::take(&mut *shown)
}

#[tauri::command]
pub async fn secret_copy(state: State<'_, AppState>, id: CredentialId) -> CommandResult<()> {
    secrets::secret_copy(state.inner(), id).await
}

#[tauri::command]
pub async fn username_copy(
    state: State<'_, AppState>,
    id: CredentialId,
    username: String,
) -> CommandResult<()> {
    secrets::username_copy(state.inner(), id, &username).await
}

#[tauri::command]
pub fn disclosure_snapshot(state: State<'_, AppState>) -> DisclosureSnapshot {
    secrets::disclosure_snapshot(state.inner())
}

#[tauri::command]
pub fn password_generate(length: Option<usize>) -> CommandResult<String> {
    secrets::password_generate(length).map(|mut generated| std::mem::take(&mut *generated))
}

/// 세션/표시 상태 변경을 웹뷰 이벤트로 전달
fn forward_events(app: &AppHandle, state: &AppState) {
    let mut session = state.gate.subscribe();
    let handle = app.clone();
    tauri::async_runtime::spawn(async move {
        while session.changed().await.is_ok() {
            let current = *session.borrow_and_update();
            if let Err(e) = handle.emit(SESSION_EVENT, current) {
                tracing::warn!("[Desktop] Failed to emit {}: {}", SESSION_EVENT, e);
            }
        }
    });

    let mut disclosure = state.disclosure.subscribe();
    let handle = app.clone();
    tauri::async_runtime::spawn(async move {
        while disclosure.changed().await.is_ok() {
            let current = *disclosure.borrow_and_update();
            if let Err(e) = handle.emit(DISCLOSURE_EVENT, current) {
                tracing::warn!("[Desktop] Failed to emit {}: {}", DISCLOSURE_EVENT, e);
            }
        }
    });
}

/// Tauri 앱 실행
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    crate::init_tracing();

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_clipboard_manager::init())
        .setup(|app| {
            let config = ClientConfig::load()?;
            let clipboard = Arc::new(TauriClipboard::new(app.handle().clone()));
            let state = AppState::new(&config, clipboard)?;
            forward_events(app.handle(), &state);

            // 최초 상태 조회는 창 표시를 막지 않는다 (그동안 화면은 Loading)
            let gate = state.gate.clone();
            tauri::async_runtime::spawn(async move {
                let session = gate.initialize().await;
                tracing::info!("[Desktop] Started, vault is {}", session);
            });

            app.manage(state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            vault_status,
            vault_refresh,
            vault_unseal,
            vault_seal,
            vault_reset,
            guard_decision,
            credentials_list,
            credentials_get,
            credentials_create,
            credentials_update,
            credentials_delete,
            secret_reveal_start,
            secret_reveal_end,
            secret_display,
            secret_copy,
            username_copy,
            disclosure_snapshot,
            password_generate,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|handle, event| {
        if let tauri::RunEvent::Exit = event {
            if let Some(state) = handle.try_state::<AppState>() {
                state.shutdown();
            }
        }
    });
}
