//! 볼트 서비스 HTTP API 연동 모듈
//!
//! - `VaultBackend`: 코어(SessionGate, SecretDisclosureController)가 의존하는 경계
//! - `VaultApiClient`: reqwest 기반 실제 구현

pub mod client;

use crate::models::{Credential, CredentialId, CredentialUpdate, ListQuery, NewCredential, VaultStatus};
use async_trait::async_trait;

pub use client::VaultApiClient;

/// 볼트 API 오류
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Failed to reach vault service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request failed with status {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// 사용자에게 보여줄 문구 (서버 detail 우선)
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { detail, .. } => detail.clone(),
            ApiError::Transport(_) => "Vault service unreachable".to_string(),
            ApiError::Decode(_) => "Unexpected response from vault service".to_string(),
            ApiError::InvalidUrl(e) => format!("Invalid vault service URL: {}", e),
        }
    }

    /// 네트워크 단절 여부 (HTTP 응답 자체를 못 받은 경우)
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

/// 볼트 서비스 경계
///
/// 테스트에서는 가짜 구현으로 응답 순서/횟수를 제어한다.
#[async_trait]
pub trait VaultBackend: Send + Sync {
    /// `GET /vault/status`
    async fn vault_status(&self) -> Result<VaultStatus, ApiError>;

    /// `POST /vault/unseal`
    async fn unseal(&self, master_key: &str) -> Result<(), ApiError>;

    /// `POST /vault/seal`
    async fn seal(&self) -> Result<(), ApiError>;

    /// `POST /vault/reset` (초기화 의미는 서비스가 결정)
    async fn reset(&self) -> Result<(), ApiError>;

    /// `GET /credentials?type=&category=`
    async fn list_credentials(&self, query: &ListQuery) -> Result<Vec<Credential>, ApiError>;

    /// `GET /credentials/{id}` (시크릿 제외 메타데이터)
    async fn get_credential(&self, id: CredentialId) -> Result<Credential, ApiError>;

    /// `POST /credentials`
    async fn create_credential(&self, input: &NewCredential) -> Result<Credential, ApiError>;

    /// `PATCH /credentials/{id}`
    async fn update_credential(
        &self,
        id: CredentialId,
        update: &CredentialUpdate,
    ) -> Result<Credential, ApiError>;

    /// `DELETE /credentials/{id}`
    async fn delete_credential(&self, id: CredentialId) -> Result<(), ApiError>;

    /// `GET /credentials/{id}/secret`
    async fn fetch_secret(&self, id: CredentialId) -> Result<String, ApiError>;
}
