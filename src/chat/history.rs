//! Sidebar history: first-occurrence dedup, page-at-a-time reveal, and a
//! cancellable debouncer for search input.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::ChatHistoryItem;

// ─────────────────────────────────────────────────────────────────────────────
// Dedup
// ─────────────────────────────────────────────────────────────────────────────

/// Collapse duplicate session ids, keeping the first occurrence of each.
/// Order of survivors is unchanged; running it twice changes nothing.
pub fn dedup_history(items: Vec<ChatHistoryItem>) -> Vec<ChatHistoryItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.session_id.clone()))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Pager
// ─────────────────────────────────────────────────────────────────────────────

/// Windowed view over the (deduped) history list. The full list lives in
/// memory; the pager only controls how much of it is revealed at once,
/// and narrows the source when a search query is set.
#[derive(Debug)]
pub struct HistoryPager {
    source: Vec<ChatHistoryItem>,
    visible_count: usize,
    page_size: usize,
    query: String,
}

impl HistoryPager {
    pub fn new(page_size: usize) -> Self {
        Self {
            source: Vec::new(),
            visible_count: 0,
            page_size,
            query: String::new(),
        }
    }

    /// Replace the backing list and show the first page. Dedup happens
    /// here so every caller gets the same guarantee.
    pub fn reset(&mut self, items: Vec<ChatHistoryItem>) {
        self.source = dedup_history(items);
        self.visible_count = self.page_size.min(self.filtered().len());
    }

    /// Reveal one more page. Returns false when everything is already shown.
    pub fn load_more(&mut self) -> bool {
        let total = self.filtered().len();
        if self.visible_count >= total {
            return false;
        }
        self.visible_count = (self.visible_count + self.page_size).min(total);
        true
    }

    /// Set or clear the search query; either way the window resets to the
    /// first page of the (re)filtered list.
    pub fn set_query(&mut self, query: &str) {
        self.query = query.trim().to_string();
        self.visible_count = self.page_size.min(self.filtered().len());
    }

    pub fn is_searching(&self) -> bool {
        !self.query.is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.visible_count < self.filtered().len()
    }

    /// The currently revealed slice, filtered then windowed
    pub fn visible(&self) -> Vec<&ChatHistoryItem> {
        self.filtered().into_iter().take(self.visible_count).collect()
    }

    fn filtered(&self) -> Vec<&ChatHistoryItem> {
        if self.query.is_empty() {
            return self.source.iter().collect();
        }
        let needle = self.query.to_lowercase();
        self.source
            .iter()
            .filter(|item| item.first_message.to_lowercase().contains(&needle))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Debouncer
// ─────────────────────────────────────────────────────────────────────────────

/// Coalesces rapid keystrokes: each submit aborts the previous pending
/// delivery, so only the last query within the window reaches the channel.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Schedule `query` for delivery after the delay, superseding any
    /// still-pending submission.
    pub fn submit(&mut self, query: String, tx: mpsc::Sender<String>) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // receiver may be gone on shutdown; nothing to do then
            let _ = tx.send(query).await;
        }));
    }

    /// Drop any pending submission without delivering it
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(session_id: &str, first_message: &str) -> ChatHistoryItem {
        ChatHistoryItem {
            session_id: session_id.to_string(),
            first_message: first_message.to_string(),
            created_at: Utc::now(),
            message_count: 1,
        }
    }

    fn numbered(n: usize) -> Vec<ChatHistoryItem> {
        (0..n).map(|i| item(&format!("s{i}"), &format!("topic {i}"))).collect()
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let items = vec![item("a", "first"), item("b", "second"), item("a", "later copy")];
        let deduped = dedup_history(items);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].first_message, "first");
        assert_eq!(deduped[1].session_id, "b");
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let once = dedup_history(vec![item("a", "x"), item("a", "y"), item("b", "z")]);
        let twice = dedup_history(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_pager_reveals_pages_of_ten() {
        let mut pager = HistoryPager::new(10);
        pager.reset(numbered(25));

        assert_eq!(pager.visible().len(), 10);
        assert!(pager.has_more());

        assert!(pager.load_more());
        assert_eq!(pager.visible().len(), 20);

        assert!(pager.load_more());
        assert_eq!(pager.visible().len(), 25);
        assert!(!pager.has_more());
        assert!(!pager.load_more());
    }

    #[test]
    fn test_pager_exact_multiple_has_no_more() {
        let mut pager = HistoryPager::new(10);
        pager.reset(numbered(10));
        assert_eq!(pager.visible().len(), 10);
        assert!(!pager.has_more());
        assert!(!pager.load_more());
    }

    #[test]
    fn test_search_is_case_insensitive_and_resets_window() {
        let mut pager = HistoryPager::new(10);
        let mut items = numbered(15);
        items.push(item("special", "How Do PIPS Work"));
        pager.reset(items);
        pager.load_more();
        assert_eq!(pager.visible().len(), 16);

        pager.set_query("pips");
        let visible = pager.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].session_id, "special");
        assert!(pager.is_searching());
    }

    #[test]
    fn test_clearing_query_restores_full_list() {
        let mut pager = HistoryPager::new(10);
        pager.reset(numbered(15));
        pager.set_query("topic 3");
        assert_eq!(pager.visible().len(), 1);

        pager.set_query("");
        assert!(!pager.is_searching());
        assert_eq!(pager.visible().len(), 10);
        assert!(pager.has_more());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_delivers_only_last_query() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut debouncer = Debouncer::new(Duration::from_millis(400));

        debouncer.submit("p".into(), tx.clone());
        tokio::time::advance(Duration::from_millis(100)).await;
        debouncer.submit("pi".into(), tx.clone());
        tokio::time::advance(Duration::from_millis(100)).await;
        debouncer.submit("pip".into(), tx.clone());

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(rx.recv().await.as_deref(), Some("pip"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_cancel_drops_pending() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut debouncer = Debouncer::new(Duration::from_millis(400));

        debouncer.submit("query".into(), tx);
        debouncer.cancel();
        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }
}
