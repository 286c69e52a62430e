use crate::config::FirebaseConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

#[derive(Debug, Serialize)]
struct LookupRequest<'a> {
    #[serde(rename = "idToken")]
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
struct LookupUser {
    #[serde(rename = "localId")]
    local_id: String,
    #[serde(rename = "phoneNumber")]
    phone_number: Option<String>,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

/// 身份提供方返回的已验证用户
#[derive(Debug, Clone)]
pub struct FirebaseUser {
    pub uid: String,
    pub phone_number: Option<String>,
    pub name: Option<String>,
}

#[derive(Clone)]
pub struct FirebaseService {
    client: Client,
    config: FirebaseConfig,
}

impl FirebaseService {
    pub fn new(config: FirebaseConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// 通过 Identity Toolkit accounts:lookup 校验客户端提交的 ID token,
    /// 返回其对应的身份。token 无效或过期时报 AuthError。
    pub async fn verify_id_token(&self, id_token: &str) -> AppResult<FirebaseUser> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL);
        let url = format!(
            "{}/v1/accounts:lookup?key={}",
            base_url, self.config.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&LookupRequest { id_token })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            // 4xx 意味着 token 本身无效, 5xx 才是提供方故障
            if status.is_client_error() {
                log::warn!("ID token rejected by identity provider: {}", error_text);
                return Err(AppError::AuthError("Invalid or expired token".to_string()));
            }

            log::error!("Identity provider lookup failed: {}", error_text);
            return Err(AppError::ExternalApiError(format!(
                "Identity lookup failed: {}",
                error_text
            )));
        }

        let lookup: LookupResponse = response.json().await?;
        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| AppError::AuthError("Invalid or expired token".to_string()))?;

        Ok(FirebaseUser {
            uid: user.local_id,
            phone_number: user.phone_number,
            name: user.display_name,
        })
    }
}
