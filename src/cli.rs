// CLI module - command-line argument parsing and handlers
//
// Subcommands cover the account lifecycle (login/register/logout/whoami),
// environment management (env --list/--switch/--reset/--test/--status),
// one-shot chat operations (history, search, export, selftest), and
// configuration inspection. No subcommand drops into the interactive chat.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::api::{ChatClient, RegisterRequest, User};
use crate::chat::{dedup_history, history_from_wire};
use crate::config::environments::{
    find_environment, known_environments, resolve_api_config, reset_to_default,
    switch_environment,
};
use crate::config::probe::{environment_status, run_self_test, test_all_environments};
use crate::config::{Config, VERSION};
use crate::store::{self, StateStore};

/// Pro Traders Group chat client
#[derive(Parser)]
#[command(name = "ptg-chat")]
#[command(version = VERSION)]
#[command(about = "Chat client for the Pro Traders Group assistant", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the session token
    Login {
        email: String,
        password: String,

        /// Log in with a Google OAuth access token instead of a password
        #[arg(long)]
        google_token: Option<String>,
    },

    /// Create an account
    Register {
        name: String,
        email: String,
        password: String,

        #[arg(long)]
        phone: Option<String>,
    },

    /// Log out and clear the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Interactive chat (default when no subcommand is given)
    Chat,

    /// Manage the API environment
    Env {
        /// List known environments and mark the active one
        #[arg(long)]
        list: bool,

        /// Switch the persisted environment preference
        #[arg(long)]
        switch: Option<String>,

        /// Clear the persisted preference, returning to the deploy default
        #[arg(long)]
        reset: bool,

        /// Probe connectivity to every known environment
        #[arg(long)]
        test: bool,

        /// Show online/offline status for every known environment
        #[arg(long)]
        status: bool,
    },

    /// Run connectivity self-tests against the active environment
    Selftest,

    /// Show or update the user profile
    Profile {
        /// Update the display name
        #[arg(long)]
        name: Option<String>,

        /// Update the email address
        #[arg(long)]
        email: Option<String>,

        /// Update the phone number
        #[arg(long)]
        phone: Option<String>,

        /// Upload a new avatar image
        #[arg(long)]
        avatar: Option<PathBuf>,
    },

    /// List stored conversations
    History {
        /// Server-side page to fetch (the chat sidebar pages locally)
        #[arg(long)]
        page: Option<u32>,

        /// Delete every stored conversation
        #[arg(long)]
        clear: bool,
    },

    /// Search stored conversations by first message
    Search { query: String },

    /// Delete a conversation (or just its session row with --session-only)
    Delete {
        session_id: String,

        /// Remove the session row but leave the conversation messages
        #[arg(long)]
        session_only: bool,
    },

    /// Export a conversation to a file
    Export {
        session_id: String,

        /// Output path (defaults to chat-<session>.pdf)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Send a password reset email
    ForgotPassword { email: String },

    /// Reset a password with the emailed token
    ResetPassword {
        email: String,
        reset_token: String,
        password: String,
    },

    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

/// Dispatch a parsed command
pub async fn run(command: Commands, config: &Config, store: &StateStore) -> Result<()> {
    match command {
        Commands::Login {
            email,
            password,
            google_token,
        } => handle_login(config, store, &email, &password, google_token.as_deref()).await,
        Commands::Register {
            name,
            email,
            password,
            phone,
        } => handle_register(config, store, name, email, password, phone).await,
        Commands::Logout => handle_logout(config, store).await,
        Commands::Whoami => handle_whoami(store),
        Commands::Chat => {
            let token = require_token(store)?;
            let client = client_for(config, store)?;
            crate::repl::run(config, client, token).await
        }
        Commands::Env {
            list,
            switch,
            reset,
            test,
            status,
        } => handle_env(store, list, switch, reset, test, status).await,
        Commands::Selftest => handle_selftest(store).await,
        Commands::Profile {
            name,
            email,
            phone,
            avatar,
        } => handle_profile(config, store, name, email, phone, avatar).await,
        Commands::History { page, clear } => handle_history(config, store, page, clear).await,
        Commands::Search { query } => handle_search(config, store, &query).await,
        Commands::Delete {
            session_id,
            session_only,
        } => handle_delete(config, store, &session_id, session_only).await,
        Commands::Export { session_id, out } => handle_export(config, store, &session_id, out).await,
        Commands::ForgotPassword { email } => {
            let client = client_for(config, store)?;
            let resp = client.forgot_password(&email).await?;
            println!(
                "{}",
                resp.message
                    .unwrap_or_else(|| "Reset email sent if the address exists.".to_string())
            );
            Ok(())
        }
        Commands::ResetPassword {
            email,
            reset_token,
            password,
        } => {
            let client = client_for(config, store)?;
            let resp = client
                .reset_password(&email, &reset_token, &password, &password)
                .await?;
            println!(
                "{}",
                resp.message.unwrap_or_else(|| "Password updated.".to_string())
            );
            Ok(())
        }
        Commands::Config { show, path } => {
            handle_config(config, store, show, path);
            Ok(())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn client_for(config: &Config, store: &StateStore) -> Result<ChatClient> {
    let mut env = resolve_api_config(store);
    // the configured request timeout beats the registry's per-env default
    env.timeout_ms = config.request_timeout_secs * 1000;
    ChatClient::new(&env)
}

pub fn require_token(store: &StateStore) -> Result<String> {
    store
        .auth_token()
        .context("Not logged in. Run `ptg-chat login <email> <password>` first.")
}

// ─────────────────────────────────────────────────────────────────────────────
// Account
// ─────────────────────────────────────────────────────────────────────────────

async fn handle_login(
    config: &Config,
    store: &StateStore,
    email: &str,
    password: &str,
    google_token: Option<&str>,
) -> Result<()> {
    let client = client_for(config, store)?;

    let resp = match google_token {
        Some(access_token) => client.google_login(access_token).await?,
        None => client.login(email, password).await?,
    };

    if !resp.success {
        bail!(
            "{}",
            resp.message.unwrap_or_else(|| "Login failed.".to_string())
        );
    }
    let data = resp.data.context("Login succeeded but returned no session")?;

    store.set(store::AUTH_TOKEN, &data.token)?;
    store.set(store::AUTH_USER, &serde_json::to_string(&data.user)?)?;
    println!("Logged in as {} <{}>", data.user.name, data.user.email);
    Ok(())
}

async fn handle_register(
    config: &Config,
    store: &StateStore,
    name: String,
    email: String,
    password: String,
    phone: Option<String>,
) -> Result<()> {
    let client = client_for(config, store)?;
    let req = RegisterRequest {
        name,
        email,
        password_confirmation: password.clone(),
        password,
        phone,
    };

    let resp = client.register(&req).await?;
    if !resp.success {
        bail!(
            "{}",
            resp.message
                .unwrap_or_else(|| "Registration failed.".to_string())
        );
    }
    println!("Account created for {}. You can log in now.", req.email);
    Ok(())
}

async fn handle_logout(config: &Config, store: &StateStore) -> Result<()> {
    // best effort against the server, local session always clears
    if let Some(token) = store.auth_token() {
        let client = client_for(config, store)?;
        if let Err(err) = client.logout(&token).await {
            tracing::warn!(error = %err, "Server logout failed, clearing local session anyway");
        }
    }
    store.clear_session()?;
    println!("Logged out.");
    Ok(())
}

fn handle_whoami(store: &StateStore) -> Result<()> {
    match store.get(store::AUTH_USER) {
        Some(raw) => {
            let user: User = serde_json::from_str(&raw)
                .context("Stored session is corrupt; log in again")?;
            println!("{} <{}> (id {})", user.name, user.email, user.id);
            Ok(())
        }
        None => bail!("Not logged in."),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Environments
// ─────────────────────────────────────────────────────────────────────────────

async fn handle_env(
    store: &StateStore,
    list: bool,
    switch: Option<String>,
    reset: bool,
    test: bool,
    status: bool,
) -> Result<()> {
    if let Some(name) = switch {
        if switch_environment(store, &name) {
            let display = find_environment(&name)
                .map(|e| e.name)
                .unwrap_or_else(|| name.clone());
            println!("Switched to {display}. Takes effect on the next run.");
        } else {
            let known: Vec<String> = known_environments().into_iter().map(|e| e.key).collect();
            bail!("Unknown environment '{}'. Known: {}", name, known.join(", "));
        }
        return Ok(());
    }

    if reset {
        reset_to_default(store);
        println!("Environment preference cleared.");
        return Ok(());
    }

    if test {
        println!("Probing environments...");
        for (key, result) in test_all_environments().await {
            match (result.success, result.error) {
                (true, _) => println!("  {key}: ok ({} ms)", result.response_time_ms),
                (false, Some(err)) => println!("  {key}: failed ({err})"),
                (false, None) => println!("  {key}: failed"),
            }
        }
        return Ok(());
    }

    if status {
        for (key, state) in environment_status().await {
            println!("  {key}: {state}");
        }
        return Ok(());
    }

    if list {
        let active = resolve_api_config(store);
        for env in known_environments() {
            let marker = if env.key == active.key { "*" } else { " " };
            println!("{marker} {:<12} {}  {}", env.key, env.base_url, env.description);
        }
        if active.key == "custom" {
            println!("* custom       {}  (from {})", active.base_url, "PTG_API_BASE_URL");
        }
        return Ok(());
    }

    println!("Usage: ptg-chat env [--list|--switch <name>|--reset|--test|--status]");
    Ok(())
}

async fn handle_selftest(store: &StateStore) -> Result<()> {
    let env = resolve_api_config(store);
    println!("Self-test against {} ({})", env.name, env.base_url);

    let report = run_self_test(&env).await;
    for step in &report.steps {
        let mark = if step.success { "ok" } else { "FAIL" };
        println!("  [{mark}] {}: {}", step.name, step.message);
    }
    println!("{} passed, {} failed", report.passed(), report.failed());
    if report.failed() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat operations
// ─────────────────────────────────────────────────────────────────────────────

async fn handle_profile(
    config: &Config,
    store: &StateStore,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    avatar: Option<PathBuf>,
) -> Result<()> {
    let token = require_token(store)?;
    let client = client_for(config, store)?;

    if let Some(path) = avatar {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "avatar.png".to_string());
        let mime = match path.extension().and_then(|e| e.to_str()) {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            _ => "image/png",
        };
        let resp = client.update_avatar(&token, &file_name, bytes, mime).await?;
        if !resp.success {
            bail!(
                "{}",
                resp.message
                    .unwrap_or_else(|| "Avatar upload failed.".to_string())
            );
        }
        println!("Avatar updated.");
        return Ok(());
    }

    if name.is_some() || email.is_some() || phone.is_some() {
        let resp = client
            .update_profile(&token, name.as_deref(), email.as_deref(), phone.as_deref())
            .await?;
        if !resp.success {
            bail!(
                "{}",
                resp.message
                    .unwrap_or_else(|| "Profile update failed.".to_string())
            );
        }
        // keep the locally cached user in sync with the server's copy
        if let Some(user_wire) = resp.data.as_ref().and_then(|d| d.get("user")) {
            if let Ok(user) = serde_json::from_value::<User>(user_wire.clone()) {
                store.set(store::AUTH_USER, &serde_json::to_string(&user)?)?;
            }
        }
        println!("Profile updated.");
        return Ok(());
    }

    let resp = client.get_profile(&token).await?;
    if !resp.success {
        bail!(
            "{}",
            resp.message
                .unwrap_or_else(|| "Could not load profile.".to_string())
        );
    }
    let data = resp.data.unwrap_or_default();
    let wire = data.get("user").unwrap_or(&data);
    let user: User = serde_json::from_value(wire.clone())
        .map_err(|e| anyhow::anyhow!("Unexpected profile payload: {e}"))?;
    println!("{} <{}> (id {})", user.name, user.email, user.id);
    Ok(())
}

async fn handle_history(
    config: &Config,
    store: &StateStore,
    page: Option<u32>,
    clear: bool,
) -> Result<()> {
    let token = require_token(store)?;
    let client = client_for(config, store)?;

    if clear {
        let resp = client.clear_history(&token).await?;
        if !resp.success {
            bail!(
                "{}",
                resp.message
                    .unwrap_or_else(|| "Could not clear history.".to_string())
            );
        }
        println!("History cleared.");
        return Ok(());
    }

    let resp = match page {
        Some(n) => {
            client
                .get_history_page(&token, n, config.page_size as u32)
                .await?
        }
        None => client.get_history(&token).await?,
    };
    if !resp.success {
        bail!(
            "{}",
            resp.message
                .unwrap_or_else(|| "Could not load history.".to_string())
        );
    }

    let items = dedup_history(history_from_wire(&resp.data.unwrap_or_default()));
    if items.is_empty() {
        println!("No conversations.");
        return Ok(());
    }
    // a server-side page prints whole; the default listing windows locally
    let shown = if page.is_some() { items.len() } else { config.page_size };
    for item in items.iter().take(shown) {
        println!(
            "  [{}] {} ({} messages)",
            item.session_id, item.first_message, item.message_count
        );
    }
    if items.len() > shown {
        println!("  ... {} more (pass --page or use the chat's /more)", items.len() - shown);
    }
    Ok(())
}

async fn handle_search(config: &Config, store: &StateStore, query: &str) -> Result<()> {
    let token = require_token(store)?;
    let client = client_for(config, store)?;

    let resp = client
        .search_conversations(&token, query, 1, config.page_size as u32)
        .await?;
    if !resp.success {
        bail!(
            "{}",
            resp.message.unwrap_or_else(|| "Search failed.".to_string())
        );
    }

    let items = dedup_history(history_from_wire(&resp.data.unwrap_or_default()));
    if items.is_empty() {
        println!("No matches for '{query}'.");
    }
    for item in items {
        println!("  [{}] {}", item.session_id, item.first_message);
    }
    Ok(())
}

async fn handle_delete(
    config: &Config,
    store: &StateStore,
    session_id: &str,
    session_only: bool,
) -> Result<()> {
    let token = require_token(store)?;
    let client = client_for(config, store)?;

    let resp = if session_only {
        client.delete_session(&token, session_id).await?
    } else {
        client.delete_conversation(&token, session_id).await?
    };
    if !resp.success {
        bail!(
            "{}",
            resp.message
                .unwrap_or_else(|| "Could not delete the conversation.".to_string())
        );
    }
    println!("Deleted {session_id}.");
    Ok(())
}

async fn handle_export(
    config: &Config,
    store: &StateStore,
    session_id: &str,
    out: Option<PathBuf>,
) -> Result<()> {
    let token = require_token(store)?;
    let client = client_for(config, store)?;

    let bytes = client.export_conversation(&token, session_id).await?;
    let path = out.unwrap_or_else(|| PathBuf::from(format!("chat-{session_id}.pdf")));
    std::fs::write(&path, &bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Exported {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

fn handle_config(config: &Config, store: &StateStore, show: bool, path: bool) {
    if path {
        match Config::config_path() {
            Some(p) => println!("{}", p.display()),
            None => {
                eprintln!("Error: Could not determine config path");
                std::process::exit(1);
            }
        }
        return;
    }

    if show {
        let env = resolve_api_config(store);

        println!("# Effective configuration (env > file > defaults)");
        println!();
        println!("request_timeout_secs = {}", config.request_timeout_secs);
        println!("page_size = {}", config.page_size);
        println!("search_debounce_ms = {}", config.search_debounce_ms);
        println!("toast_duration_secs = {}", config.toast_duration_secs);
        println!();
        println!("[logging]");
        println!("level = {:?}", config.logging.level);
        println!("file_enabled = {}", config.logging.file_enabled);
        println!("file_dir = {:?}", config.logging.file_dir);
        println!();
        println!("# Active environment: {} ({})", env.key, env.base_url);

        if let Some(p) = Config::config_path() {
            if p.exists() {
                println!("# Source: {}", p.display());
            } else {
                println!("# Source: defaults (no config file)");
            }
        }
        return;
    }

    println!("Usage: ptg-chat config [--show|--path]");
}
