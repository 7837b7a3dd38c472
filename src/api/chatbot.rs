//! Chatbot operations: messaging, sessions, history, search, favorites
//!
//! All calls are bearer-authenticated. Responses come back as the uniform
//! envelope around raw JSON; the orchestrator normalizes the backend's
//! mixed snake/camel field spellings into canonical shapes. Export is the
//! one exception - it returns the raw bytes of the generated document.

use serde_json::Value;

use super::{ApiError, ApiResponse, ChatClient};

/// An in-memory file queued for a multipart upload
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl FileUpload {
    /// Read a file from disk, guessing the MIME type from its extension
    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read file {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());

        let mime_type = match path.extension().and_then(|e| e.to_str()) {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("pdf") => "application/pdf",
            Some("txt") | Some("md") => "text/plain",
            Some("doc") => "application/msword",
            Some("docx") => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            _ => "application/octet-stream",
        }
        .to_string();

        Ok(Self {
            file_name,
            bytes,
            mime_type,
        })
    }
}

impl ChatClient {
    pub async fn send_message(
        &self,
        token: &str,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!(session = ?session_id, "Sending message");

        let mut body = serde_json::Map::new();
        body.insert("message".to_string(), Value::String(message.to_string()));
        if let Some(sid) = session_id {
            body.insert("sessionId".to_string(), Value::String(sid.to_string()));
        }

        let resp = self
            .http()
            .post(self.endpoints().send_message())
            .bearer_auth(token)
            .json(&Value::Object(body))
            .send()
            .await?;
        Self::envelope(resp).await
    }

    /// Multipart variant: `message`, optional `sessionId`, and `files[i]`
    /// parts, matching the backend's form field naming
    pub async fn send_message_with_files(
        &self,
        token: &str,
        message: &str,
        session_id: Option<&str>,
        files: &[FileUpload],
    ) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!(session = ?session_id, files = files.len(), "Sending message with files");

        let mut form =
            reqwest::multipart::Form::new().text("message", message.to_string());
        if let Some(sid) = session_id {
            form = form.text("sessionId", sid.to_string());
        }
        for (index, file) in files.iter().enumerate() {
            let part = reqwest::multipart::Part::bytes(file.bytes.clone())
                .file_name(file.file_name.clone())
                .mime_str(&file.mime_type)
                .map_err(|e| ApiError::Decode(e.to_string()))?;
            form = form.part(format!("files[{}]", index), part);
        }

        let resp = self
            .http()
            .post(self.endpoints().send_message_with_files())
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        Self::envelope(resp).await
    }

    pub async fn get_history(&self, token: &str) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!("Fetching chat history");

        let resp = self
            .http()
            .get(self.endpoints().history())
            .bearer_auth(token)
            .send()
            .await?;
        Self::envelope(resp).await
    }

    pub async fn get_history_page(
        &self,
        token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!(page, per_page, "Fetching paginated chat history");

        let resp = self
            .http()
            .get(self.endpoints().history())
            .query(&[("page", page), ("per_page", per_page)])
            .bearer_auth(token)
            .send()
            .await?;
        Self::envelope(resp).await
    }

    /// Server-side conversation search (distinct from the local sidebar filter)
    pub async fn search_conversations(
        &self,
        token: &str,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!(query = %query, page, "Searching conversations");

        let resp = self
            .http()
            .get(self.endpoints().search())
            .query(&[
                ("q", query),
                ("page", &page.to_string()),
                ("per_page", &per_page.to_string()),
            ])
            .bearer_auth(token)
            .send()
            .await?;
        Self::envelope(resp).await
    }

    pub async fn new_session(&self, token: &str) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!("Creating new chat session");

        let resp = self
            .http()
            .post(self.endpoints().new_session())
            .bearer_auth(token)
            .send()
            .await?;
        Self::envelope(resp).await
    }

    pub async fn get_session(
        &self,
        token: &str,
        session_id: &str,
    ) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!(session = %session_id, "Fetching chat session");

        let resp = self
            .http()
            .get(self.endpoints().session(session_id))
            .bearer_auth(token)
            .send()
            .await?;
        Self::envelope(resp).await
    }

    /// Delete just the session row; `delete_conversation` removes the
    /// conversation and its messages
    pub async fn delete_session(
        &self,
        token: &str,
        session_id: &str,
    ) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!(session = %session_id, "Deleting chat session");

        let resp = self
            .http()
            .delete(self.endpoints().session(session_id))
            .bearer_auth(token)
            .send()
            .await?;
        Self::envelope(resp).await
    }

    pub async fn delete_conversation(
        &self,
        token: &str,
        session_id: &str,
    ) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!(session = %session_id, "Deleting conversation");

        let resp = self
            .http()
            .delete(self.endpoints().conversation(session_id))
            .bearer_auth(token)
            .send()
            .await?;
        Self::envelope(resp).await
    }

    pub async fn get_favorites(&self, token: &str) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!("Fetching favorite messages");

        let resp = self
            .http()
            .get(self.endpoints().favorites())
            .bearer_auth(token)
            .send()
            .await?;
        Self::envelope(resp).await
    }

    pub async fn toggle_favorite(
        &self,
        token: &str,
        message_id: &str,
    ) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!(message = %message_id, "Toggling favorite");

        let resp = self
            .http()
            .post(self.endpoints().favorite(message_id))
            .bearer_auth(token)
            .send()
            .await?;
        Self::envelope(resp).await
    }

    pub async fn remove_favorite(
        &self,
        token: &str,
        message_id: &str,
    ) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!(message = %message_id, "Removing favorite");

        let resp = self
            .http()
            .delete(self.endpoints().favorite(message_id))
            .bearer_auth(token)
            .send()
            .await?;
        Self::envelope(resp).await
    }

    /// Export a conversation as a generated document. Returns the raw bytes;
    /// the envelope shape does not apply to this call.
    pub async fn export_conversation(
        &self,
        token: &str,
        session_id: &str,
    ) -> Result<Vec<u8>, ApiError> {
        tracing::debug!(session = %session_id, "Exporting conversation");

        let resp = self
            .http()
            .post(self.endpoints().export())
            .bearer_auth(token)
            .json(&serde_json::json!({ "sessionId": session_id }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16(), "export failed".to_string()));
        }
        let bytes = resp.bytes().await.map_err(ApiError::from)?;
        tracing::debug!(size = bytes.len(), "Export downloaded");
        Ok(bytes.to_vec())
    }

    pub async fn clear_history(&self, token: &str) -> Result<ApiResponse<Value>, ApiError> {
        tracing::debug!("Clearing chat history");

        let resp = self
            .http()
            .delete(self.endpoints().clear_history())
            .bearer_auth(token)
            .send()
            .await?;
        Self::envelope(resp).await
    }

    /// Unauthenticated chatbot availability check
    pub async fn chatbot_status(&self) -> Result<ApiResponse<Value>, ApiError> {
        let resp = self.http().get(self.endpoints().chatbot_status()).send().await?;
        Self::envelope(resp).await
    }
}
