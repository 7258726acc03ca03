//! KeyPilot - 볼트 클라이언트 코어 라이브러리
//!
//! 로컬 시크릿 관리 서비스(볼트)의 봉인 상태를 추적하고, 크리덴셜 평문 시크릿의
//! 조회/표시/복사를 통제합니다. 데스크톱 셸(`desktop` 기능, Tauri)과 헤드리스 셸이
//! 이 라이브러리를 임베드합니다.

pub mod api;
pub mod commands;
pub mod config;
pub mod credentials;
#[cfg(feature = "desktop")]
pub mod desktop;
pub mod disclosure;
pub mod error;
pub mod models;
pub mod session;
mod utils;

#[cfg(test)]
mod test_support;

use disclosure::SystemClipboard;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub use commands::AppState;
pub use config::ClientConfig;
pub use error::{CommandError, CommandResult, KeyPilotError};

const DEFAULT_LOG_FILTER: &str = "keypilot_lib=info";

/// 로그 구독자 설치 (`RUST_LOG` 우선, 없으면 `keypilot_lib=info`)
///
/// 이미 설치되어 있으면 아무 것도 하지 않는다.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// 헤드리스 셸 시작: 설정 로드, OS 클립보드 연결, 최초 세션 상태 조회
///
/// 상태 조회 실패는 에러가 아니라 `Unreachable` 상태로 남는다.
/// 종료 시 `AppState::shutdown`으로 캐시된 평문을 폐기한다.
pub async fn start() -> Result<AppState, KeyPilotError> {
    let config = ClientConfig::load()?;
    let state = AppState::new(&config, Arc::new(SystemClipboard::new()))?;
    let session = state.gate.initialize().await;
    tracing::info!("[KeyPilot] Started, vault is {}", session);
    Ok(state)
}

#[cfg(feature = "desktop")]
pub use desktop::run;
