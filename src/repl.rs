//! Interactive chat loop over stdin. Plain lines are sent as messages;
//! slash commands drive sessions, history, search, and favorites.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::api::{ChatClient, FileUpload};
use crate::chat::{ChatOrchestrator, Debouncer, Delivery, HistoryPager, Role, Toast};
use crate::config::Config;

const HELP: &str = "\
Commands:
  /new               start a fresh conversation
  /history           list stored conversations (first page)
  /more              reveal the next page of history
  /search <text>     filter history by first message (debounced)
  /load <session>    load a stored conversation
  /delete <session>  delete a conversation
  /attach <path> [message]   send a message with a file attached
  /fav <message-id>  toggle favorite on a message
  /unfav <message-id>  remove a message from favorites
  /favorites         list favorited messages
  /help              show this help
  /quit              exit
Anything else is sent as a chat message.";

pub async fn run(config: &Config, client: ChatClient, token: String) -> Result<()> {
    // unauthenticated status probe; a down assistant is worth a heads-up
    // but never blocks the session
    match client.chatbot_status().await {
        Ok(resp) if resp.success => {}
        Ok(resp) => println!(
            "Note: {}",
            resp.message
                .unwrap_or_else(|| "The assistant reports it is unavailable.".to_string())
        ),
        Err(err) => println!("Note: could not reach the assistant ({err})."),
    }

    let mut orch = ChatOrchestrator::new(
        client,
        token,
        Duration::from_secs(config.toast_duration_secs),
    );
    let mut pager = HistoryPager::new(config.page_size);
    let mut debouncer = Debouncer::new(Duration::from_millis(config.search_debounce_ms));
    let (search_tx, mut search_rx) = mpsc::channel::<String>(8);

    if orch.load_chat_history().await {
        pager.reset(orch.chat_history.clone());
    }

    println!("Connected. Type /help for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        // debounced searches land between keystrokes
        while let Ok(query) = search_rx.try_recv() {
            pager.set_query(&query);
            print_history(&pager);
        }

        let line = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
            Some(query) = search_rx.recv() => {
                pager.set_query(&query);
                print_history(&pager);
                continue;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(' ').unwrap_or((line, "")) {
            ("/quit", _) | ("/exit", _) => break,
            ("/help", _) => println!("{HELP}"),
            ("/new", _) => {
                if orch.new_session().await {
                    println!("Started a new conversation.");
                }
            }
            ("/history", _) => {
                if orch.load_chat_history().await {
                    pager.reset(orch.chat_history.clone());
                }
                print_history(&pager);
            }
            ("/more", _) => {
                if pager.load_more() {
                    print_history(&pager);
                } else {
                    println!("No more conversations.");
                }
            }
            ("/search", query) => {
                debouncer.submit(query.to_string(), search_tx.clone());
            }
            ("/load", session_id) if !session_id.is_empty() => {
                if orch.load_session(session_id).await {
                    print_transcript(&orch);
                }
            }
            ("/delete", session_id) if !session_id.is_empty() => {
                if orch.delete_conversation(session_id).await {
                    pager.reset(orch.chat_history.clone());
                }
            }
            ("/attach", rest) if !rest.is_empty() => {
                let (path, message) = rest.split_once(' ').unwrap_or((rest, ""));
                match FileUpload::from_path(Path::new(path)) {
                    Ok(file) => {
                        if orch.send_message_with_files(message, vec![file]).await {
                            print_last_exchange(&orch);
                        }
                    }
                    Err(err) => println!("Could not read {path}: {err}"),
                }
            }
            ("/fav", message_id) if !message_id.is_empty() => {
                orch.toggle_favorite(message_id).await;
            }
            ("/unfav", message_id) if !message_id.is_empty() => {
                if orch.remove_favorite(message_id).await {
                    println!("Removed from favorites.");
                }
            }
            ("/favorites", _) => {
                if orch.load_favorites().await {
                    if orch.favorites.is_empty() {
                        println!("No favorites yet.");
                    }
                    for fav in &orch.favorites {
                        println!("  [{}] {}", fav.id, fav.content);
                    }
                }
            }
            _ => {
                if orch.send_message(line).await {
                    print_last_exchange(&orch);
                }
            }
        }

        drain_toasts(&mut orch);
    }

    Ok(())
}

fn print_history(pager: &HistoryPager) {
    let visible = pager.visible();
    if visible.is_empty() {
        println!("No conversations.");
        return;
    }
    for item in &visible {
        println!(
            "  [{}] {} ({} messages, {})",
            item.session_id,
            item.first_message,
            item.message_count,
            item.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    if pager.has_more() {
        println!("  ... /more for the next page");
    }
}

fn print_transcript(orch: &ChatOrchestrator<ChatClient>) {
    for msg in &orch.messages {
        print_message(msg.role, &msg.content, msg.delivery, msg.is_favorite, &msg.id);
    }
}

fn print_last_exchange(orch: &ChatOrchestrator<ChatClient>) {
    for msg in orch.messages.iter().rev().take(2).collect::<Vec<_>>().iter().rev() {
        print_message(msg.role, &msg.content, msg.delivery, msg.is_favorite, &msg.id);
    }
}

fn print_message(role: Role, content: &str, delivery: Delivery, favorite: bool, id: &str) {
    let who = match role {
        Role::User => "you",
        Role::Bot => "bot",
    };
    let mark = match delivery {
        Delivery::Pending => " …",
        Delivery::Failed => " ✗",
        Delivery::Confirmed => "",
    };
    let star = if favorite { " ★" } else { "" };
    println!("{who}{mark}{star} [{id}]: {content}");
}

fn drain_toasts(orch: &mut ChatOrchestrator<ChatClient>) {
    let toasts: Vec<Toast> = orch.toasts.active().to_vec();
    for toast in &toasts {
        println!("! {}: {}", toast.kind.label(), toast.message);
        orch.toasts.remove(&toast.id);
    }
}
