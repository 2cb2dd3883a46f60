//! # Link Repository Access
//!
//! Reads and writes the single remote collection of links and opens the change
//! feed the list screen refetches on.
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`list`](LinkRepository::list) | Every link visible to the session, newest first. Failures are logged and returned; callers keep what they showed before. |
//! | [`insert`](LinkRepository::insert) | One new row from a validated [`NewLink`]. The backend's message is returned verbatim on failure. |
//! | [`subscribe_to_changes`](LinkRepository::subscribe_to_changes) | Calls `on_change` once per insert/update/delete anywhere in the collection. No payload, no debouncing. |
//! | [`watch_changes`](LinkRepository::watch_changes) | The same feed delivered as a channel, for callers whose state cannot leave their task. |
//!
//! [`LinkList`] is what the list screen displays: the last successful fetch, kept
//! as-is when a later fetch fails.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::backend::{Backend, ChangeFilter, ChangeSubscription, SelectQuery};
use crate::config::TablesConfig;
use crate::error::BackendError;
use crate::models::{Link, NewLink, CREATED_AT, LINK_COLUMNS};

#[derive(Clone)]
pub struct LinkRepository {
    backend: Arc<dyn Backend>,
    table: String,
}

impl LinkRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            table: TablesConfig::default().links,
        }
    }

    /// Use `table` instead of the default collection name.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub async fn list(&self) -> Result<Vec<Link>, BackendError> {
        let query = SelectQuery::new(self.table.as_str())
            .columns(LINK_COLUMNS)
            .order_desc(CREATED_AT);

        let rows = self.backend.select(query).await.inspect_err(|err| {
            tracing::error!("Error fetching links: {err}");
        })?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value::<Link>(row).map_err(|err| {
                    tracing::error!("Error decoding link row: {err}");
                    BackendError::Decode(err.to_string())
                })
            })
            .collect()
    }

    pub async fn insert(&self, link: &NewLink) -> Result<(), BackendError> {
        let record =
            serde_json::to_value(link).map_err(|err| BackendError::Decode(err.to_string()))?;
        self.backend.insert(&self.table, record).await?;
        tracing::debug!(url = %link.url, "Link saved");
        Ok(())
    }

    pub async fn subscribe_to_changes<F>(&self, on_change: F) -> Result<ChangeSubscription, BackendError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.backend
            .subscribe(&self.table, ChangeFilter::default(), Arc::new(on_change))
            .await
    }

    /// Subscribe and receive one signal per change notification.
    pub async fn watch_changes(&self) -> Result<ChangeWatch, BackendError> {
        let (tx, signals) = mpsc::unbounded_channel();
        let subscription = self
            .subscribe_to_changes(move || {
                let _ = tx.send(());
            })
            .await?;
        Ok(ChangeWatch {
            signals,
            _subscription: subscription,
        })
    }
}

/// Change notifications as a stream of unit signals. Dropping it unsubscribes.
#[derive(Debug)]
pub struct ChangeWatch {
    signals: mpsc::UnboundedReceiver<()>,
    _subscription: ChangeSubscription,
}

impl ChangeWatch {
    /// Wait for the next notification. `false` once the feed is gone.
    pub async fn changed(&mut self) -> bool {
        self.signals.recv().await.is_some()
    }

    /// A notification is already waiting.
    pub fn try_changed(&mut self) -> bool {
        self.signals.try_recv().is_ok()
    }
}

/// Contents of the list screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkList {
    pub links: Vec<Link>,
    pub refreshing: bool,
}

impl LinkList {
    /// Take a fetch result. On failure the previous contents stay.
    pub fn apply(&mut self, result: Result<Vec<Link>, BackendError>) {
        if let Ok(links) = result {
            self.links = links;
        }
        self.refreshing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ChangeEvent;
    use crate::forms::LinkForm;
    use crate::memory::{Fault, MemoryBackend};
    use crate::AuthBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn signed_in() -> (MemoryBackend, LinkRepository) {
        let backend = MemoryBackend::new();
        backend.sign_up("a@x.com", "secret1").await.unwrap();
        let repo = LinkRepository::new(Arc::new(backend.clone()));
        (backend, repo)
    }

    fn link(url: &str) -> NewLink {
        LinkForm {
            url: url.to_string(),
            ..Default::default()
        }
        .to_new_link()
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let (_backend, repo) = signed_in().await;
        repo.insert(&link("https://first.dev")).await.unwrap();
        repo.insert(&link("https://second.dev")).await.unwrap();

        let form = LinkForm {
            url: "https://third.dev".into(),
            title: "Third".into(),
            tags: "a, b ,c".into(),
            favorite: true,
            ..Default::default()
        };
        repo.insert(&form.to_new_link().unwrap()).await.unwrap();

        let links = repo.list().await.unwrap();
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://third.dev", "https://second.dev", "https://first.dev"]
        );
        assert_eq!(links[0].display_title(), "Third");
        assert_eq!(
            links[0].tags,
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert!(links[0].favorite);
        assert_eq!(links[1].title, None);
        assert_eq!(links[1].tags, None);
    }

    #[tokio::test]
    async fn test_list_failure_is_returned() {
        let (backend, repo) = signed_in().await;
        backend.inject_error(
            Fault::Select("links".into()),
            BackendError::Network("timed out".into()),
        );
        assert_eq!(
            repo.list().await.unwrap_err(),
            BackendError::Network("timed out".into())
        );
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_failure_is_verbatim() {
        let (backend, repo) = signed_in().await;
        backend.inject_error(
            Fault::Insert("links".into()),
            BackendError::api(400, "new row violates row-level security policy"),
        );
        let err = repo.insert(&link("https://x.dev")).await.unwrap_err();
        assert_eq!(err.message(), "new row violates row-level security policy");
        assert!(backend.rows("links").is_empty());
    }

    #[tokio::test]
    async fn test_every_notification_reaches_listener() {
        let (backend, repo) = signed_in().await;
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let sub = repo
            .subscribe_to_changes(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();

        for _ in 0..3 {
            backend.notify_change("links", ChangeEvent::Update);
        }
        repo.insert(&link("https://x.dev")).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 4);

        sub.unsubscribe();
        assert_eq!(backend.subscriber_count("links"), 0);
    }

    #[tokio::test]
    async fn test_each_signal_triggers_one_refetch() {
        let (backend, repo) = signed_in().await;
        let mut watch = repo.watch_changes().await.unwrap();
        let mut list = LinkList::default();

        repo.insert(&link("https://x.dev")).await.unwrap();
        backend.notify_change("links", ChangeEvent::Update);
        backend.notify_change("links", ChangeEvent::Update);

        while watch.try_changed() {
            list.refreshing = true;
            list.apply(repo.list().await);
        }
        assert_eq!(backend.request_count("select:links"), 3);
        assert_eq!(list.links.len(), 1);
        assert!(!list.refreshing);

        drop(watch);
        assert_eq!(backend.subscriber_count("links"), 0);
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_previous_links() {
        let (backend, repo) = signed_in().await;
        repo.insert(&link("https://x.dev")).await.unwrap();
        let mut list = LinkList::default();
        list.apply(repo.list().await);
        assert_eq!(list.links.len(), 1);

        backend.inject_error(
            Fault::Select("links".into()),
            BackendError::Network("offline".into()),
        );
        list.refreshing = true;
        list.apply(repo.list().await);
        assert_eq!(list.links.len(), 1);
        assert!(!list.refreshing);
    }

    #[tokio::test]
    async fn test_custom_table() {
        let (backend, repo) = signed_in().await;
        let repo = repo.with_table("bookmarks");
        repo.insert(&link("https://x.dev")).await.unwrap();
        assert_eq!(backend.rows("bookmarks").len(), 1);
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}
