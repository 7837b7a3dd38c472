//! REST endpoint derivation
//!
//! Every endpoint is a pure function of the resolved base URL: fixed path
//! suffixes concatenated onto it, nothing cached. Switching environments
//! therefore cannot leave a stale URL anywhere.

/// Endpoint set derived from a base URL
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Join an absolute API path onto the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    // ── auth ────────────────────────────────────────────────────────────

    pub fn register(&self) -> String {
        self.url("/api/auth/register")
    }

    pub fn login(&self) -> String {
        self.url("/api/auth/login")
    }

    pub fn google_login(&self) -> String {
        self.url("/api/auth/google")
    }

    pub fn logout(&self) -> String {
        self.url("/api/auth/logout")
    }

    pub fn forgot_password(&self) -> String {
        self.url("/api/auth/forgot-password")
    }

    pub fn reset_password(&self) -> String {
        self.url("/api/auth/reset-password")
    }

    pub fn auth_check(&self) -> String {
        self.url("/api/auth/check")
    }

    // ── user ────────────────────────────────────────────────────────────

    pub fn profile(&self) -> String {
        self.url("/api/user/profile")
    }

    pub fn avatar(&self) -> String {
        self.url("/api/user/avatar")
    }

    // ── chatbot ─────────────────────────────────────────────────────────

    pub fn send_message(&self) -> String {
        self.url("/api/chatbot/send-message")
    }

    pub fn send_message_with_files(&self) -> String {
        self.url("/api/chatbot/send-message-with-files")
    }

    pub fn history(&self) -> String {
        self.url("/api/chatbot/history")
    }

    pub fn search(&self) -> String {
        self.url("/api/chatbot/search")
    }

    pub fn new_session(&self) -> String {
        self.url("/api/chatbot/new-session")
    }

    pub fn session(&self, session_id: &str) -> String {
        self.url(&format!("/api/chatbot/session/{}", session_id))
    }

    pub fn conversation(&self, session_id: &str) -> String {
        self.url(&format!("/api/chatbot/conversation/{}", session_id))
    }

    pub fn favorites(&self) -> String {
        self.url("/api/chatbot/favorites")
    }

    pub fn favorite(&self, message_id: &str) -> String {
        self.url(&format!("/api/chatbot/favorites/{}", message_id))
    }

    pub fn export(&self) -> String {
        self.url("/api/chatbot/export")
    }

    pub fn clear_history(&self) -> String {
        self.url("/api/chatbot/clear-history")
    }

    pub fn chatbot_status(&self) -> String {
        self.url("/api/chatbot/status")
    }

    // ── health ──────────────────────────────────────────────────────────

    pub fn health(&self) -> String {
        self.url("/api/health")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_are_pure_concatenation() {
        let ep = Endpoints::new("https://test.pro-traders-group.com");
        assert_eq!(
            ep.login(),
            "https://test.pro-traders-group.com/api/auth/login"
        );
        assert_eq!(
            ep.session("abc-123"),
            "https://test.pro-traders-group.com/api/chatbot/session/abc-123"
        );
        assert_eq!(ep.health(), "https://test.pro-traders-group.com/api/health");
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let ep = Endpoints::new("http://localhost:8000/");
        assert_eq!(ep.history(), "http://localhost:8000/api/chatbot/history");
    }
}
