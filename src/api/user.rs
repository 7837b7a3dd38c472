//! User profile operations

use serde_json::Value;

use super::{ApiError, ApiResponse, ChatClient};

impl ChatClient {
    pub async fn get_profile(&self, token: &str) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!("Fetching user profile");

        let resp = self
            .http()
            .get(self.endpoints().profile())
            .bearer_auth(token)
            .send()
            .await?;
        Self::envelope(resp).await
    }

    /// Update the fields that are `Some`; the backend leaves the rest alone
    pub async fn update_profile(
        &self,
        token: &str,
        name: Option<&str>,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!("Updating user profile");

        let mut body = serde_json::Map::new();
        if let Some(name) = name {
            body.insert("name".to_string(), Value::String(name.to_string()));
        }
        if let Some(email) = email {
            body.insert("email".to_string(), Value::String(email.to_string()));
        }
        if let Some(phone) = phone {
            body.insert("phone".to_string(), Value::String(phone.to_string()));
        }

        let resp = self
            .http()
            .put(self.endpoints().profile())
            .bearer_auth(token)
            .json(&Value::Object(body))
            .send()
            .await?;
        Self::envelope(resp).await
    }

    /// Upload a new avatar image as multipart form data
    pub async fn update_avatar(
        &self,
        token: &str,
        file_name: &str,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!(file = %file_name, "Updating user avatar");

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("avatar", part);

        let resp = self
            .http()
            .post(self.endpoints().avatar())
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        Self::envelope(resp).await
    }
}
