//! KeyPilot Data Models
//!
//! 볼트 서비스 HTTP API와 매핑되는 Rust 데이터 모델

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// 크리덴셜 식별자 (서비스가 발급하는 정수 ID)
pub type CredentialId = i64;

/// 크리덴셜 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    Password,
    SshKey,
    ApiKey,
    /// 알 수 없는 타입 문자열도 여기로 떨어진다
    #[serde(other)]
    Other,
}

impl CredentialType {
    pub const ALL: [CredentialType; 4] = [
        CredentialType::Password,
        CredentialType::SshKey,
        CredentialType::ApiKey,
        CredentialType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialType::Password => "password",
            CredentialType::SshKey => "ssh_key",
            CredentialType::ApiKey => "api_key",
            CredentialType::Other => "other",
        }
    }

    /// 화면 표시용 라벨
    pub fn label(&self) -> &'static str {
        match self {
            CredentialType::Password => "Password",
            CredentialType::SshKey => "SSH key",
            CredentialType::ApiKey => "API key",
            CredentialType::Other => "Other",
        }
    }
}

/// 크리덴셜 스냅샷
///
/// 평문 시크릿은 포함하지 않는다. 시크릿은 `/credentials/{id}/secret`으로
/// 별도 조회하며 `SecretDisclosureController`만 다룬다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub id: CredentialId,
    #[serde(rename = "type")]
    pub credential_type: CredentialType,
    pub name: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// `GET /vault/status` 응답
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultStatus {
    pub sealed: bool,
}

/// `POST /vault/unseal` 요청 본문
#[derive(Debug, Serialize)]
pub struct UnsealRequest<'a> {
    pub master_key: &'a str,
}

/// `GET /credentials/{id}/secret` 응답 (메타데이터 필드는 무시)
#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SecretResponse {
    pub secret: String,
}

/// 목록 조회 필터 (`?type=&category=`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub credential_type: Option<CredentialType>,
    pub category: Option<String>,
}

impl ListQuery {
    /// 비어있지 않은 필터만 쿼리 파라미터로 변환
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(t) = self.credential_type {
            params.push(("type", t.as_str().to_string()));
        }
        if let Some(category) = self.category.as_deref().map(str::trim) {
            if !category.is_empty() {
                params.push(("category", category.to_string()));
            }
        }
        params
    }
}

/// 크리덴셜 생성 요청 (`POST /credentials`)
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct NewCredential {
    #[serde(rename = "type")]
    #[zeroize(skip)]
    pub credential_type: CredentialType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub secret: String,
}

impl NewCredential {
    /// 폼 입력 정리: 앞뒤 공백 제거, 빈 선택 필드는 생략 (시크릿은 그대로)
    pub fn normalized(&self) -> NewCredential {
        NewCredential {
            credential_type: self.credential_type,
            name: self.name.trim().to_string(),
            username: trimmed_non_empty(self.username.as_deref()),
            category: trimmed_non_empty(self.category.as_deref()),
            description: trimmed_non_empty(self.description.as_deref()),
            secret: self.secret.clone(),
        }
    }
}

/// 크리덴셜 수정 요청 (`PATCH /credentials/{id}`)
///
/// `secret`이 설정되면 서버에서 시크릿을 교체한다.
#[derive(Clone, Default, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct CredentialUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl CredentialUpdate {
    pub fn rotates_secret(&self) -> bool {
        self.secret.is_some()
    }
}

// 시크릿이 로그에 섞이지 않도록 Debug 출력에서 가린다
impl std::fmt::Debug for NewCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewCredential")
            .field("credential_type", &self.credential_type)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("category", &self.category)
            .field("description", &self.description)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl std::fmt::Debug for CredentialUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialUpdate")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("category", &self.category)
            .field("description", &self.description)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn trimmed_non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// 에러 응답에서 사람이 읽을 수 있는 문구 추출
///
/// `detail`은 문자열이거나 `[{msg}]` 배열(검증 에러)이다. 둘 다 아니면 `fallback`.
pub fn error_detail(body: &str, fallback: &str) -> String {
    let parsed: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return fallback.to_string(),
    };

    let detail = match parsed.get("detail") {
        Some(d) => d,
        None => return fallback.to_string(),
    };

    let message = match detail {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => items
            .first()
            .and_then(|item| item.get("msg"))
            .map(|msg| match msg {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        _ => None,
    };

    message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

/// RFC 3339 또는 타임존 없는 ISO-8601(UTC로 간주) 모두 허용
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_from_service_json() {
        let json = r#"{
            "id": 7,
            "type": "ssh_key",
            "name": "build server",
            "username": "",
            "category": "infra",
            "description": "",
            "created_at": "2025-03-01T10:15:30.123456",
            "updated_at": "2025-03-02T08:00:00Z"
        }"#;

        let c: Credential = serde_json::from_str(json).unwrap();
        assert_eq!(c.id, 7);
        assert_eq!(c.credential_type, CredentialType::SshKey);
        assert_eq!(c.username, None);
        assert_eq!(c.category.as_deref(), Some("infra"));
        assert_eq!(c.description, None);
        assert_eq!(c.created_at.format("%Y-%m-%d %H:%M:%S").to_string(), "2025-03-01 10:15:30");
        assert_eq!(c.updated_at.format("%H").to_string(), "08");
    }

    #[test]
    fn test_unknown_type_maps_to_other() {
        let json = r#"{"id":1,"type":"totp_seed","name":"x","created_at":"2025-01-01T00:00:00","updated_at":"2025-01-01T00:00:00"}"#;
        let c: Credential = serde_json::from_str(json).unwrap();
        assert_eq!(c.credential_type, CredentialType::Other);
        assert_eq!(c.credential_type.label(), "Other");
    }

    #[test]
    fn test_error_detail_string() {
        assert_eq!(error_detail(r#"{"detail":"Credential not found"}"#, "Get secret failed"), "Credential not found");
    }

    #[test]
    fn test_error_detail_validation_array() {
        let body = r#"{"detail":[{"loc":["body","name"],"msg":"field required","type":"value_error.missing"}]}"#;
        assert_eq!(error_detail(body, "Create failed"), "field required");
    }

    #[test]
    fn test_error_detail_fallbacks() {
        assert_eq!(error_detail("<html>502</html>", "Get secret failed"), "Get secret failed");
        assert_eq!(error_detail(r#"{"error":"x"}"#, "Seal failed"), "Seal failed");
        assert_eq!(error_detail(r#"{"detail":[]}"#, "Create failed"), "Create failed");
        assert_eq!(error_detail(r#"{"detail":""}"#, "Unseal failed"), "Unseal failed");
        assert_eq!(error_detail(r#"{"detail":{"code":1}}"#, "Delete failed"), "Delete failed");
    }

    #[test]
    fn test_new_credential_serialization_skips_empty_fields() {
        let input = NewCredential {
            credential_type: CredentialType::ApiKey,
            name: "  openai ".to_string(),
            username: Some("   ".to_string()),
            category: Some(" ai ".to_string()),
            description: None,
            secret: " sk-123 ".to_string(),
        };

        let value = serde_json::to_value(input.normalized()).unwrap();
        assert_eq!(value["type"], "api_key");
        assert_eq!(value["name"], "openai");
        assert_eq!(value["category"], "ai");
        assert_eq!(value["secret"], " sk-123 ");
        assert!(value.get("username").is_none());
        assert!(value.get("description").is_none());
    }

    #[test]
    fn test_list_query_params() {
        let q = ListQuery {
            credential_type: Some(CredentialType::Password),
            category: Some("  ".to_string()),
        };
        assert_eq!(q.to_params(), vec![("type", "password".to_string())]);
        assert!(ListQuery::default().to_params().is_empty());
    }

    #[test]
    fn test_shell_payloads_deserialize() {
        let query: ListQuery = serde_json::from_str(r#"{"type":"api_key"}"#).unwrap();
        assert_eq!(query.credential_type, Some(CredentialType::ApiKey));
        assert_eq!(query.category, None);

        let update: CredentialUpdate = serde_json::from_str(r#"{"secret":"rotated"}"#).unwrap();
        assert!(update.rotates_secret());
        assert_eq!(update.name, None);

        let input: NewCredential =
            serde_json::from_str(r#"{"type":"password","name":"mail","secret":"s"}"#).unwrap();
        assert_eq!(input.credential_type, CredentialType::Password);
        assert_eq!(input.username, None);
    }
}
