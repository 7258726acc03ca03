//! 볼트 서비스 REST 클라이언트
//!
//! 로컬 볼트 서비스(기본 `http://localhost:8000`)를 직접 호출합니다.

use crate::api::{ApiError, VaultBackend};
use crate::config::ClientConfig;
use crate::models::{
    error_detail, Credential, CredentialId, CredentialUpdate, ListQuery, NewCredential,
    SecretResponse, UnsealRequest, VaultStatus,
};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

/// 볼트 REST API 클라이언트
pub struct VaultApiClient {
    base_url: Url,
    /// HTTP 클라이언트 (커넥션 풀 공유)
    http: reqwest::Client,
}

impl VaultApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        // 경로 prefix(`/keypilot` 등)가 join에서 잘리지 않도록 항상 `/`로 끝나게 한다
        let mut base_url = config.api_base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.base_url.join(path)?;
        Ok(self.http.request(method, url))
    }

    /// 실패 응답이면 `detail`을 추출해 `ApiError::Status`로 변환
    async fn check(response: Response, fallback: &str) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            detail: error_detail(&body, fallback),
        })
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl VaultBackend for VaultApiClient {
    async fn vault_status(&self) -> Result<VaultStatus, ApiError> {
        let response = self.request(Method::GET, "vault/status")?.send().await?;
        let response = Self::check(response, "Vault status failed").await?;
        Self::read_json(response).await
    }

    async fn unseal(&self, master_key: &str) -> Result<(), ApiError> {
        tracing::info!("[VaultApi] Unsealing vault");

        let response = self
            .request(Method::POST, "vault/unseal")?
            .json(&UnsealRequest { master_key })
            .send()
            .await?;
        Self::check(response, "Unseal failed").await?;
        Ok(())
    }

    async fn seal(&self) -> Result<(), ApiError> {
        tracing::info!("[VaultApi] Sealing vault");

        let response = self.request(Method::POST, "vault/seal")?.send().await?;
        Self::check(response, "Seal failed").await?;
        Ok(())
    }

    async fn reset(&self) -> Result<(), ApiError> {
        tracing::warn!("[VaultApi] Resetting vault");

        let response = self.request(Method::POST, "vault/reset")?.send().await?;
        Self::check(response, "Reset failed").await?;
        Ok(())
    }

    async fn list_credentials(&self, query: &ListQuery) -> Result<Vec<Credential>, ApiError> {
        let response = self
            .request(Method::GET, "credentials")?
            .query(&query.to_params())
            .send()
            .await?;
        let response = Self::check(response, "List credentials failed").await?;
        let items: Vec<Credential> = Self::read_json(response).await?;

        tracing::debug!("[VaultApi] Listed {} credentials", items.len());
        Ok(items)
    }

    async fn get_credential(&self, id: CredentialId) -> Result<Credential, ApiError> {
        let response = self
            .request(Method::GET, &format!("credentials/{}", id))?
            .send()
            .await?;
        let response = Self::check(response, "Get credential failed").await?;
        Self::read_json(response).await
    }

    async fn create_credential(&self, input: &NewCredential) -> Result<Credential, ApiError> {
        let response = self
            .request(Method::POST, "credentials")?
            .json(input)
            .send()
            .await?;
        let response = Self::check(response, "Create failed").await?;
        let created: Credential = Self::read_json(response).await?;

        tracing::info!("[VaultApi] Credential created: {}", created.id);
        Ok(created)
    }

    async fn update_credential(
        &self,
        id: CredentialId,
        update: &CredentialUpdate,
    ) -> Result<Credential, ApiError> {
        let response = self
            .request(Method::PATCH, &format!("credentials/{}", id))?
            .json(update)
            .send()
            .await?;
        let response = Self::check(response, "Update failed").await?;
        let updated: Credential = Self::read_json(response).await?;

        tracing::info!("[VaultApi] Credential updated: {}", id);
        Ok(updated)
    }

    async fn delete_credential(&self, id: CredentialId) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &format!("credentials/{}", id))?
            .send()
            .await?;
        Self::check(response, "Delete failed").await?;

        tracing::info!("[VaultApi] Credential deleted: {}", id);
        Ok(())
    }

    async fn fetch_secret(&self, id: CredentialId) -> Result<String, ApiError> {
        let response = self
            .request(Method::GET, &format!("credentials/{}/secret", id))?
            .send()
            .await?;
        let response = Self::check(response, "Get secret failed").await?;
        let mut payload: SecretResponse = Self::read_json(response).await?;

        // 시크릿 값은 로그에 남기지 않는다
        tracing::debug!("[VaultApi] Secret fetched for credential {}", id);
        Ok(std::mem::take(&mut payload.secret))
    }
}
