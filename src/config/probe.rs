//! Environment health probing
//!
//! Probes every known environment's health endpoint concurrently with a
//! bounded per-request timeout. A timeout or network failure is reported in
//! the result, never propagated to the caller.

use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;

use super::endpoints::Endpoints;
use super::environments::{known_environments, ApiEnvironment};

/// Timeout for the full connectivity test
const TEST_TIMEOUT: Duration = Duration::from_secs(5);
/// Tighter timeout for the online/offline status check
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Outcome of probing one environment
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub success: bool,
    pub response_time_ms: u64,
    pub error: Option<String>,
}

/// Probe outcome collapsed to a tri-state for status displays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvStatus {
    Online,
    Offline,
    /// The base URL cannot be probed at all (e.g. the mock:// scheme)
    Unknown,
}

impl std::fmt::Display for EnvStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Whether an environment's base URL is probeable over HTTP
fn is_probeable(env: &ApiEnvironment) -> bool {
    env.base_url.starts_with("http://") || env.base_url.starts_with("https://")
}

/// GET the health endpoint of one environment with a bounded timeout
async fn probe_one(client: &reqwest::Client, env: &ApiEnvironment, timeout: Duration) -> ProbeResult {
    let url = Endpoints::new(&env.base_url).health();
    let started = Instant::now();

    match client.get(&url).timeout(timeout).send().await {
        Ok(resp) => ProbeResult {
            success: resp.status().is_success(),
            response_time_ms: started.elapsed().as_millis() as u64,
            error: if resp.status().is_success() {
                None
            } else {
                Some(format!("HTTP {}", resp.status().as_u16()))
            },
        },
        Err(e) => ProbeResult {
            success: false,
            response_time_ms: 0,
            error: Some(e.to_string()),
        },
    }
}

/// Test connectivity to every known environment concurrently (5s each).
/// Returns results in the registry's display order.
pub async fn test_all_environments() -> Vec<(String, ProbeResult)> {
    let client = reqwest::Client::new();
    let envs = known_environments();

    let probes = envs.iter().map(|env| {
        let client = &client;
        async move {
            if !is_probeable(env) {
                return (
                    env.key.clone(),
                    ProbeResult {
                        success: false,
                        response_time_ms: 0,
                        error: Some(format!("unsupported scheme: {}", env.base_url)),
                    },
                );
            }
            (env.key.clone(), probe_one(client, env, TEST_TIMEOUT).await)
        }
    });

    join_all(probes).await
}

/// Online/offline status of every known environment, probed concurrently
/// with the tighter status timeout (3s each).
pub async fn environment_status() -> Vec<(String, EnvStatus)> {
    let client = reqwest::Client::new();
    let envs = known_environments();

    let probes = envs.iter().map(|env| {
        let client = &client;
        async move {
            if !is_probeable(env) {
                return (env.key.clone(), EnvStatus::Unknown);
            }
            let result = probe_one(client, env, STATUS_TIMEOUT).await;
            let status = if result.success {
                EnvStatus::Online
            } else {
                EnvStatus::Offline
            };
            (env.key.clone(), status)
        }
    });

    join_all(probes).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Connectivity self-test
// ─────────────────────────────────────────────────────────────────────────────

/// One step of the connectivity self-test
#[derive(Debug, Clone)]
pub struct SelfTestStep {
    pub name: &'static str,
    pub success: bool,
    pub message: String,
}

/// Self-test summary over the active environment
#[derive(Debug, Clone)]
pub struct SelfTestReport {
    pub steps: Vec<SelfTestStep>,
}

impl SelfTestReport {
    pub fn passed(&self) -> usize {
        self.steps.iter().filter(|s| s.success).count()
    }

    pub fn failed(&self) -> usize {
        self.steps.len() - self.passed()
    }
}

async fn self_test_step(
    client: &reqwest::Client,
    name: &'static str,
    url: String,
) -> SelfTestStep {
    match client.get(&url).timeout(TEST_TIMEOUT).send().await {
        Ok(resp) if resp.status().is_success() => SelfTestStep {
            name,
            success: true,
            message: format!("{} reachable", url),
        },
        Ok(resp) => SelfTestStep {
            name,
            success: false,
            message: format!("{} returned HTTP {}", url, resp.status().as_u16()),
        },
        Err(e) => SelfTestStep {
            name,
            success: false,
            message: format!("{}: {}", url, e),
        },
    }
}

/// Probe the active environment's health, auth-check, and chatbot-status
/// endpoints and report a pass/fail summary. Never fails hard.
pub async fn run_self_test(env: &ApiEnvironment) -> SelfTestReport {
    let client = reqwest::Client::new();
    let ep = Endpoints::new(&env.base_url);

    let steps = vec![
        self_test_step(&client, "health", ep.health()).await,
        self_test_step(&client, "auth", ep.auth_check()).await,
        self_test_step(&client, "chatbot", ep.chatbot_status()).await,
    ];

    SelfTestReport { steps }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::environments::find_environment;

    #[test]
    fn test_mock_environment_is_not_probeable() {
        let mock = find_environment("mock").unwrap();
        assert!(!is_probeable(&mock));
        let test = find_environment("test").unwrap();
        assert!(is_probeable(&test));
    }

    #[tokio::test]
    async fn test_unprobeable_environment_reports_unknown() {
        // Only assert on the mock entry; the others hit the network and we
        // make no claim about connectivity here
        let statuses = environment_status().await;
        let mock = statuses.iter().find(|(k, _)| k == "mock").unwrap();
        assert_eq!(mock.1, EnvStatus::Unknown);
    }

    #[tokio::test]
    async fn test_probe_failure_is_reported_not_thrown() {
        // Port 9 (discard) refuses connections on loopback
        let env = ApiEnvironment::custom("http://127.0.0.1:9");
        let client = reqwest::Client::new();
        let result = probe_one(&client, &env, Duration::from_millis(500)).await;
        assert!(!result.success);
        assert!(result.error.is_some());
    }
}
