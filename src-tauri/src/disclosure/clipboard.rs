//! 시스템 클립보드
//!
//! 헤드리스 셸은 `arboard`로 OS 클립보드에 직접 쓰고, 데스크톱 셸은
//! clipboard-manager 플러그인(`desktop::TauriClipboard`)을 사용합니다.

use crate::utils::lock;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// 클립보드 오류
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("No clipboard available on this system")]
    Unavailable,

    #[error("Clipboard is busy")]
    Busy,

    #[error("Clipboard write failed: {0}")]
    Backend(String),
}

impl From<arboard::Error> for ClipboardError {
    fn from(error: arboard::Error) -> Self {
        match error {
            arboard::Error::ClipboardNotSupported => ClipboardError::Unavailable,
            arboard::Error::ClipboardOccupied => ClipboardError::Busy,
            other => ClipboardError::Backend(other.to_string()),
        }
    }
}

/// 클립보드 쓰기 경계
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// OS 클립보드
///
/// 연결은 첫 쓰기 때 열고 이후 재사용한다. X11에서는 연결이 살아 있어야
/// 다른 프로그램이 붙여넣을 수 있다.
#[derive(Default)]
pub struct SystemClipboard {
    handle: Arc<Mutex<Option<arboard::Clipboard>>>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.handle).is_some()
    }

    fn write_blocking(
        handle: &Mutex<Option<arboard::Clipboard>>,
        text: &str,
    ) -> Result<(), ClipboardError> {
        let mut slot = lock(handle);
        if slot.is_none() {
            *slot = Some(arboard::Clipboard::new()?);
        }
        let written = match slot.as_mut() {
            Some(clipboard) => clipboard.set_text(text),
            None => return Err(ClipboardError::Unavailable),
        };
        if let Err(e) = written {
            // 끊긴 연결은 다음 쓰기에서 다시 연다
            *slot = None;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let handle = self.handle.clone();
        let text = zeroize::Zeroizing::new(text.to_string());
        let chars = text.chars().count();

        tokio::task::spawn_blocking(move || Self::write_blocking(&handle, text.as_str()))
            .await
            .map_err(|e| ClipboardError::Backend(format!("clipboard task aborted: {}", e)))??;

        tracing::debug!("[Clipboard] Wrote {} chars", chars);
        Ok(())
    }
}
