//! 크리덴셜 CRUD 명령
//!
//! 모든 명령은 볼트가 열려 있을 때만 서비스에 요청을 보낸다.

use crate::commands::{invalid_input, AppState};
use crate::credentials::is_submittable;
use crate::error::CommandResult;
use crate::models::{Credential, CredentialId, CredentialUpdate, ListQuery, NewCredential};

/// 크리덴셜 목록 (`type`/`category` 서버 필터)
pub async fn credentials_list(state: &AppState, query: &ListQuery) -> CommandResult<Vec<Credential>> {
    state.require_unsealed()?;
    let items = state.backend.list_credentials(query).await?;
    tracing::debug!("[Credentials] Listed {} credential(s)", items.len());
    Ok(items)
}

/// 단일 크리덴셜 메타데이터 (시크릿은 포함하지 않음)
pub async fn credentials_get(state: &AppState, id: CredentialId) -> CommandResult<Credential> {
    state.require_unsealed()?;
    Ok(state.backend.get_credential(id).await?)
}

/// 크리덴셜 생성
pub async fn credentials_create(state: &AppState, input: NewCredential) -> CommandResult<Credential> {
    state.require_unsealed()?;
    if !is_submittable(&input) {
        return Err(invalid_input("Name and secret are required."));
    }
    let created = state.backend.create_credential(&input.normalized()).await?;
    tracing::info!("[Credentials] Created credential {}", created.id);
    Ok(created)
}

/// 크리덴셜 수정. 시크릿이 교체되면 캐시된 이전 값을 버린다.
pub async fn credentials_update(
    state: &AppState,
    id: CredentialId,
    update: CredentialUpdate,
) -> CommandResult<Credential> {
    state.require_unsealed()?;
    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(invalid_input("Name cannot be empty."));
    }
    let updated = state.backend.update_credential(id, &update).await?;
    if update.rotates_secret() {
        state.disclosure.forget(id);
    }
    tracing::info!("[Credentials] Updated credential {}", id);
    Ok(updated)
}

/// 크리덴셜 삭제
pub async fn credentials_delete(state: &AppState, id: CredentialId) -> CommandResult<()> {
    state.require_unsealed()?;
    state.backend.delete_credential(id).await?;
    state.disclosure.forget(id);
    tracing::info!("[Credentials] Deleted credential {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CredentialType;
    use crate::test_support::{FakeBackend, RecordingClipboard};
    use std::sync::Arc;

    async fn started_app(backend: &Arc<FakeBackend>) -> AppState {
        let state = AppState::with_backend(backend.clone(), Arc::new(RecordingClipboard::new()));
        state.gate.initialize().await;
        state
    }

    fn new_credential(name: &str, secret: &str, category: Option<&str>) -> NewCredential {
        NewCredential {
            credential_type: CredentialType::Password,
            name: name.to_string(),
            username: Some("alice".to_string()),
            category: category.map(str::to_string),
            description: None,
            secret: secret.to_string(),
        }
    }

    #[tokio::test]
    async fn test_sealed_vault_refuses_without_network() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_sealed(true);
        let state = started_app(&backend).await;

        let err = credentials_list(&state, &ListQuery::default()).await.unwrap_err();
        assert_eq!(err.code, "VAULT_SEALED");
        let err = credentials_delete(&state, 1).await.unwrap_err();
        assert_eq!(err.code, "VAULT_SEALED");
    }

    #[tokio::test]
    async fn test_create_list_and_filter() {
        let backend = Arc::new(FakeBackend::new());
        let state = started_app(&backend).await;

        let err = credentials_create(&state, new_credential("  ", "x", None))
            .await
            .unwrap_err();
        assert_eq!(err.code, "INVALID_INPUT");

        let mail = credentials_create(&state, new_credential(" mail ", "s1", Some(" personal ")))
            .await
            .unwrap();
        assert_eq!(mail.name, "mail");
        assert_eq!(mail.category.as_deref(), Some("personal"));
        credentials_create(&state, new_credential("ci", "s2", Some("work")))
            .await
            .unwrap();

        let all = credentials_list(&state, &ListQuery::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        let work = credentials_list(
            &state,
            &ListQuery {
                credential_type: None,
                category: Some("work".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(work.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(), vec!["ci"]);
    }

    #[tokio::test]
    async fn test_get_single_credential() {
        let backend = Arc::new(FakeBackend::new());
        let state = started_app(&backend).await;
        let created = credentials_create(&state, new_credential("vpn", "s", Some("work")))
            .await
            .unwrap();

        let fetched = credentials_get(&state, created.id).await.unwrap();
        assert_eq!(fetched, created);
        // 메타데이터 조회는 시크릿을 가져오지 않는다
        assert_eq!(backend.fetch_count(created.id), 0);

        let err = credentials_get(&state, 999).await.unwrap_err();
        assert_eq!(err.code, "API_ERROR");
        assert_eq!(err.message, "Credential not found");

        backend.set_sealed(true);
        state.gate.refresh().await.unwrap();
        assert_eq!(credentials_get(&state, created.id).await.unwrap_err().code, "VAULT_SEALED");
    }

    #[tokio::test]
    async fn test_secret_rotation_evicts_cached_value() {
        let backend = Arc::new(FakeBackend::new());
        let state = started_app(&backend).await;
        let created = credentials_create(&state, new_credential("db", "old", None))
            .await
            .unwrap();
        assert!(state.disclosure.reveal_start(created.id).await.unwrap());
        state.disclosure.reveal_end();

        // 이름만 바꾸면 캐시 유지
        let mut rename = CredentialUpdate::default();
        rename.name = Some("db-main".to_string());
        credentials_update(&state, created.id, rename).await.unwrap();
        assert!(state.disclosure.is_cached(created.id));

        let mut rotate = CredentialUpdate::default();
        rotate.secret = Some("new".to_string());
        credentials_update(&state, created.id, rotate).await.unwrap();
        assert!(!state.disclosure.is_cached(created.id));

        assert!(state.disclosure.reveal_start(created.id).await.unwrap());
        assert_eq!(
            state.disclosure.revealed_secret(created.id).unwrap().as_str(),
            "new"
        );
    }

    #[tokio::test]
    async fn test_delete_forgets_secret() {
        let backend = Arc::new(FakeBackend::new());
        let state = started_app(&backend).await;
        let created = credentials_create(&state, new_credential("ssh", "k", None))
            .await
            .unwrap();
        state.disclosure.copy_secret(created.id).await.unwrap();

        credentials_delete(&state, created.id).await.unwrap();
        assert!(!state.disclosure.is_cached(created.id));
        assert!(backend.credentials().is_empty());

        let err = credentials_delete(&state, created.id).await.unwrap_err();
        assert_eq!(err.message, "Credential not found");
    }
}
