//! Authentication operations
//!
//! Unauthenticated calls except logout, which invalidates the bearer token
//! server-side. The register payload carries `status: true` and
//! `type: "user"`, which the backend requires on account rows.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ApiError, ApiResponse, ChatClient};

/// Registration payload
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Backend user object, also persisted locally as the `auth_user` state key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "crate::chat::flex_string")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Successful login payload: the user plus their bearer token
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub user: User,
    pub token: String,
}

impl ChatClient {
    pub async fn register(
        &self,
        req: &RegisterRequest,
    ) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!(email = %req.email, "Registering user");

        let mut body = serde_json::to_value(req).map_err(|e| ApiError::Decode(e.to_string()))?;
        if let Some(map) = body.as_object_mut() {
            map.insert("status".to_string(), Value::Bool(true));
            map.insert("type".to_string(), Value::String("user".to_string()));
        }

        let resp = self
            .http()
            .post(self.endpoints().register())
            .json(&body)
            .send()
            .await?;
        Self::envelope(resp).await
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ApiResponse<LoginData>, ApiError> {
        tracing::debug!(email = %email, "Logging in");

        let resp = self
            .http()
            .post(self.endpoints().login())
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        Self::envelope(resp).await
    }

    /// Exchange a Google OAuth access token for a backend session
    pub async fn google_login(
        &self,
        access_token: &str,
    ) -> Result<ApiResponse<LoginData>, ApiError> {
        tracing::debug!("Logging in via Google");

        let resp = self
            .http()
            .post(self.endpoints().google_login())
            .json(&serde_json::json!({ "access_token": access_token }))
            .send()
            .await?;
        Self::envelope(resp).await
    }

    pub async fn logout(&self, token: &str) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!("Logging out");

        let resp = self
            .http()
            .post(self.endpoints().logout())
            .bearer_auth(token)
            .send()
            .await?;
        Self::envelope(resp).await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!(email = %email, "Requesting password reset email");

        let resp = self
            .http()
            .post(self.endpoints().forgot_password())
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;
        Self::envelope(resp).await
    }

    pub async fn reset_password(
        &self,
        email: &str,
        reset_token: &str,
        password: &str,
        password_confirmation: &str,
    ) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!(email = %email, "Resetting password");

        let resp = self
            .http()
            .post(self.endpoints().reset_password())
            .json(&serde_json::json!({
                "email": email,
                "token": reset_token,
                "password": password,
                "password_confirmation": password_confirmation,
            }))
            .send()
            .await?;
        Self::envelope(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_skips_absent_phone() {
        let req = RegisterRequest {
            name: "Dana".to_string(),
            email: "dana@example.com".to_string(),
            password: "secret".to_string(),
            password_confirmation: "secret".to_string(),
            phone: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("phone").is_none());
    }

    #[test]
    fn test_user_accepts_numeric_id() {
        let user: User =
            serde_json::from_str(r#"{"id": 42, "name": "Dana", "email": "d@e.com"}"#).unwrap();
        assert_eq!(user.id, "42");
        assert_eq!(user.avatar, None);
    }

    #[test]
    fn test_login_data_shape() {
        let data: LoginData = serde_json::from_str(
            r#"{"user": {"id": "7", "name": "N", "email": "n@e.com"}, "token": "tok-1"}"#,
        )
        .unwrap();
        assert_eq!(data.token, "tok-1");
        assert_eq!(data.user.id, "7");
    }
}
