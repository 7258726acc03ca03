//! 클라이언트 설정
//!
//! 환경 변수(및 `.env.local` / `.env`)에서 볼트 서비스 주소와 타임아웃을 읽습니다.

use crate::error::KeyPilotError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// 볼트 서비스 주소 환경 변수
pub const ENV_API_URL: &str = "KEYPILOT_API_URL";
/// 요청 타임아웃(초) 환경 변수
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "KEYPILOT_REQUEST_TIMEOUT_SECS";

const ENV_PREFIX: &str = "KEYPILOT_";

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// 클라이언트 설정
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_base_url: Url,
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// 기본 타임아웃으로 설정 생성
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// `.env.local`/`.env`를 로드한 뒤 환경 변수에서 설정 구성
    pub fn load() -> Result<Self, KeyPilotError> {
        load_env_files();
        Self::from_env()
    }

    /// 현재 프로세스 환경 변수만으로 설정 구성
    pub fn from_env() -> Result<Self, KeyPilotError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, KeyPilotError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_url = Url::parse(DEFAULT_API_URL)
            .map_err(|e| KeyPilotError::Config(format!("Invalid default URL: {}", e)))?;
        let mut config = Self::new(default_url);

        if let Some(raw) = non_empty(lookup(ENV_API_URL)) {
            let url = Url::parse(&raw)
                .map_err(|e| KeyPilotError::Config(format!("{} is not a valid URL: {}", ENV_API_URL, e)))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(KeyPilotError::Config(format!(
                    "{} must use http or https, got {}",
                    ENV_API_URL,
                    url.scheme()
                )));
            }
            config.api_base_url = url;
        }

        if let Some(raw) = non_empty(lookup(ENV_REQUEST_TIMEOUT_SECS)) {
            let secs: u64 = raw.parse().map_err(|_| {
                KeyPilotError::Config(format!("{} must be a whole number of seconds", ENV_REQUEST_TIMEOUT_SECS))
            })?;
            if secs == 0 {
                return Err(KeyPilotError::Config(format!("{} must be greater than 0", ENV_REQUEST_TIMEOUT_SECS)));
            }
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// `.env.local`을 찾을 때 올라갈 최대 디렉터리 수
const ENV_SEARCH_DEPTH: usize = 8;
const ENV_LOCAL_FILE: &str = ".env.local";

/// `start`에서 루트 방향으로 가장 가까운 `.env.local`
fn find_env_local(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(ENV_SEARCH_DEPTH + 1)
        .map(|dir| dir.join(ENV_LOCAL_FILE))
        .find(|candidate| candidate.is_file())
}

/// 작업 디렉터리 기준, 실행 파일 위치 기준 순서 (중복 제거)
fn env_local_candidates() -> Vec<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let starts = std::env::current_dir().ok().into_iter().chain(exe_dir);

    let mut found: Vec<PathBuf> = Vec::new();
    for path in starts.filter_map(|start| find_env_local(&start)) {
        if !found.contains(&path) {
            found.push(path);
        }
    }
    found
}

/// 엄격 파싱에 실패한 파일(설명/코드펜스가 섞인 메모 등)에서 `KEYPILOT_*` 항목만 적용
///
/// 파싱할 수 없는 줄은 건너뛰고, 이미 값이 있는 변수는 덮어쓰지 않는다.
fn apply_keypilot_entries(path: &Path) -> Result<usize, dotenvy::Error> {
    let mut applied = 0;
    for entry in dotenvy::from_path_iter(path)? {
        let Ok((key, value)) = entry else {
            continue;
        };
        if !key.starts_with(ENV_PREFIX) {
            continue;
        }
        if std::env::var(&key).is_ok_and(|existing| !existing.trim().is_empty()) {
            continue;
        }
        std::env::set_var(&key, value);
        applied += 1;
    }
    Ok(applied)
}

fn load_env_local() {
    for path in env_local_candidates() {
        if dotenvy::from_path(&path).is_ok() {
            tracing::debug!("[Config] Loaded {}", path.display());
            return;
        }
        match apply_keypilot_entries(&path) {
            Ok(0) => {}
            Ok(applied) => {
                tracing::debug!("[Config] Applied {} KEYPILOT_* entries from {}", applied, path.display());
                return;
            }
            Err(e) => tracing::warn!("[Config] Could not read {}: {}", path.display(), e),
        }
    }
}

/// `.env.local` 다음 `.env` 순서로 로드 (없어도 무시)
pub fn load_env_files() {
    load_env_local();
    let _ = dotenvy::dotenv();
}
