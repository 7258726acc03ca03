//! KeyPilot Error Types
//!
//! 애플리케이션 전역 에러 타입 정의

use crate::api::ApiError;
use crate::disclosure::DisclosureError;
use serde::Serialize;
use thiserror::Error;

/// KeyPilot 클라이언트 에러
#[derive(Error, Debug)]
pub enum KeyPilotError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Secret error: {0}")]
    Disclosure(#[from] DisclosureError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Vault is sealed")]
    VaultSealed,

    #[error("Vault service unreachable")]
    VaultUnreachable,

    #[error("Vault state is still loading")]
    VaultLoading,
}

/// 명령 응답용 직렬화 가능한 에러
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl From<KeyPilotError> for CommandError {
    fn from(error: KeyPilotError) -> Self {
        let code = match &error {
            KeyPilotError::Api(_) => "API_ERROR",
            KeyPilotError::Disclosure(e) => e.code(),
            KeyPilotError::Io(_) => "IO_ERROR",
            KeyPilotError::Config(_) => "CONFIG_ERROR",
            KeyPilotError::VaultSealed => "VAULT_SEALED",
            KeyPilotError::VaultUnreachable => "VAULT_UNREACHABLE",
            KeyPilotError::VaultLoading => "VAULT_LOADING",
        };

        // API 에러는 서버의 detail 문구를 그대로 사용자에게 보여준다
        let message = match &error {
            KeyPilotError::Api(e) => e.user_message(),
            KeyPilotError::Disclosure(e) => e.user_message(),
            other => other.to_string(),
        };

        CommandError {
            code: code.to_string(),
            message,
            details: None,
        }
    }
}

impl From<ApiError> for CommandError {
    fn from(error: ApiError) -> Self {
        KeyPilotError::from(error).into()
    }
}

impl From<DisclosureError> for CommandError {
    fn from(error: DisclosureError) -> Self {
        KeyPilotError::from(error).into()
    }
}

/// 명령 결과 타입
pub type CommandResult<T> = Result<T, CommandError>;
