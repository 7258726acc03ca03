//! 시크릿 표시/복사 명령
//!
//! 평문은 `SecretDisclosureController`가 쥐고 있으며, 셸은 누르고 있는 동안만
//! `secret_display`로 평문을 받는다.

use crate::commands::{invalid_input, AppState};
use crate::credentials::{generate_password, DEFAULT_PASSWORD_BYTES};
use crate::disclosure::DisclosureSnapshot;
use crate::error::CommandResult;
use crate::models::CredentialId;
use zeroize::Zeroizing;

/// 생성 비밀번호 최대 길이 (랜덤 바이트 수)
const MAX_PASSWORD_BYTES: usize = 256;

/// 표시 버튼 누름. 버튼을 놓기 전에 시크릿이 준비되면 `true`.
pub async fn secret_reveal_start(state: &AppState, id: CredentialId) -> CommandResult<bool> {
    Ok(state.disclosure.reveal_start(id).await?)
}

/// 표시 버튼 놓음
pub fn secret_reveal_end(state: &AppState) {
    state.disclosure.reveal_end();
}

/// 표시 문자열 (누르고 있는 동안 평문, 그 외 마스크)
pub fn secret_display(state: &AppState, id: CredentialId) -> Zeroizing<String> {
    state.disclosure.display_secret(id)
}

/// 시크릿 복사
pub async fn secret_copy(state: &AppState, id: CredentialId) -> CommandResult<()> {
    Ok(state.disclosure.copy_secret(id).await?)
}

/// 사용자명 복사
pub async fn username_copy(state: &AppState, id: CredentialId, username: &str) -> CommandResult<()> {
    Ok(state.disclosure.copy_username(id, username).await?)
}

/// 표시/복사 확인 상태
pub fn disclosure_snapshot(state: &AppState) -> DisclosureSnapshot {
    state.disclosure.snapshot()
}

/// 새 크리덴셜용 비밀번호 생성 (기본 24바이트)
pub fn password_generate(length: Option<usize>) -> CommandResult<Zeroizing<String>> {
    let length = length.unwrap_or(DEFAULT_PASSWORD_BYTES);
    if length == 0 || length > MAX_PASSWORD_BYTES {
        return Err(invalid_input("Password length must be between 1 and 256."));
    }
    Ok(generate_password(length))
}
