/// Tag-invalidated query cache
///
/// Query results are stored under a [`CacheKey`] built from the endpoint
/// name and the serialized arguments. Each entry records the tags its result
/// provides. A mutation invalidates tags:
///
/// - `{kind}` (no id) marks every entry providing any tag of that kind stale
/// - `{kind, id}` marks only entries providing exactly that tag stale
///
/// Per key the status moves `Uninitialized → Loading → Success | Error`, and
/// to `Stale` on invalidation. Stale and errored entries are refetched on
/// the next query. An invalidation that hits an entry while it is loading
/// is remembered: the response in flight may predate the mutation, so it is
/// stored as `Stale` instead of `Success`.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

/// Entity kinds used as cache tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Projects,
    Tasks,
    Users,
    Teams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    pub kind: TagKind,
    pub id: Option<i64>,
}

impl Tag {
    /// Tag for a whole collection
    pub const fn list(kind: TagKind) -> Self {
        Self { kind, id: None }
    }

    /// Tag for one entity
    pub fn id(kind: TagKind, id: impl Into<i64>) -> Self {
        Self {
            kind,
            id: Some(id.into()),
        }
    }

    /// Whether invalidating `self` makes an entry providing `provided` stale
    pub fn invalidates(&self, provided: &Tag) -> bool {
        self.kind == provided.kind && (self.id.is_none() || self.id == provided.id)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{:?}:{id}", self.kind),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Uninitialized,
    Loading,
    Success,
    Error,
    Stale,
}

/// Endpoint name plus serialized arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub endpoint: &'static str,
    pub args: String,
}

impl CacheKey {
    pub fn new<A: Serialize>(endpoint: &'static str, args: &A) -> Result<Self, serde_json::Error> {
        Ok(Self {
            endpoint,
            args: serde_json::to_string(args)?,
        })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.endpoint, self.args)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    status: QueryStatus,
    data: Option<Value>,
    tags: Vec<Tag>,
    error: Option<String>,

    /// Tags invalidated while a fetch was in flight
    pending: Vec<Tag>,
}

impl Entry {
    fn loading() -> Self {
        Self {
            status: QueryStatus::Loading,
            data: None,
            tags: Vec::new(),
            error: None,
            pending: Vec::new(),
        }
    }
}

fn any_invalidated(invalidated: &[Tag], provided: &[Tag]) -> bool {
    provided
        .iter()
        .any(|p| invalidated.iter().any(|t| t.invalidates(p)))
}

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<CacheKey, Entry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn status(&self, key: &CacheKey) -> QueryStatus {
        self.entries
            .lock()
            .await
            .get(key)
            .map_or(QueryStatus::Uninitialized, |e| e.status)
    }

    /// Cached data if the entry is fresh
    pub async fn fresh(&self, key: &CacheKey) -> Option<Value> {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|e| e.status == QueryStatus::Success)
            .and_then(|e| e.data.clone())
    }

    /// Marks a fetch as started; previous data is kept until it completes
    pub async fn begin(&self, key: &CacheKey) {
        let mut entries = self.entries.lock().await;
        entries
            .entry(key.clone())
            .and_modify(|e| {
                e.status = QueryStatus::Loading;
                e.pending.clear();
            })
            .or_insert_with(Entry::loading);
    }

    /// Stores a fetched result and returns the status it was stored with
    ///
    /// The result is `Stale` when a tag it provides was invalidated after
    /// [`begin`].
    ///
    /// [`begin`]: QueryCache::begin
    pub async fn succeed(&self, key: &CacheKey, data: Value, tags: Vec<Tag>) -> QueryStatus {
        let mut entries = self.entries.lock().await;
        let raced = entries.get(key).is_some_and(|e| {
            e.status == QueryStatus::Loading && any_invalidated(&e.pending, &tags)
        });

        let status = if raced {
            QueryStatus::Stale
        } else {
            QueryStatus::Success
        };

        entries.insert(
            key.clone(),
            Entry {
                status,
                data: Some(data),
                tags,
                error: None,
                pending: Vec::new(),
            },
        );
        status
    }

    pub async fn fail(&self, key: &CacheKey, error: impl Into<String>) {
        let mut entries = self.entries.lock().await;
        let entry = entries.entry(key.clone()).or_insert_with(Entry::loading);
        entry.status = QueryStatus::Error;
        entry.error = Some(error.into());
    }

    /// Last error recorded for `key`
    pub async fn error(&self, key: &CacheKey) -> Option<String> {
        self.entries
            .lock()
            .await
            .get(key)
            .and_then(|e| e.error.clone())
    }

    /// Marks every successful entry matching any of `tags` stale
    ///
    /// Loading entries record `tags` so that [`succeed`] can tell whether
    /// the response in flight is already outdated.
    ///
    /// Returns the number of entries marked stale.
    ///
    /// [`succeed`]: QueryCache::succeed
    pub async fn invalidate(&self, tags: &[Tag]) -> usize {
        if tags.is_empty() {
            return 0;
        }

        let mut entries = self.entries.lock().await;
        let mut count = 0;

        for (key, entry) in entries.iter_mut() {
            match entry.status {
                QueryStatus::Success if any_invalidated(tags, &entry.tags) => {
                    entry.status = QueryStatus::Stale;
                    count += 1;
                    tracing::trace!(key = %key, "Cache entry invalidated");
                }
                QueryStatus::Loading => entry.pending.extend_from_slice(tags),
                _ => {}
            }
        }

        count
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(endpoint: &'static str, args: impl Serialize) -> CacheKey {
        CacheKey::new(endpoint, &args).unwrap()
    }

    #[test]
    fn test_kind_tag_invalidates_all_of_kind() {
        let all_tasks = Tag::list(TagKind::Tasks);

        assert!(all_tasks.invalidates(&Tag::list(TagKind::Tasks)));
        assert!(all_tasks.invalidates(&Tag::id(TagKind::Tasks, 7)));
        assert!(!all_tasks.invalidates(&Tag::id(TagKind::Projects, 7)));
    }

    #[test]
    fn test_id_tag_invalidates_exact_match_only() {
        let task_7 = Tag::id(TagKind::Tasks, 7);

        assert!(task_7.invalidates(&Tag::id(TagKind::Tasks, 7)));
        assert!(!task_7.invalidates(&Tag::id(TagKind::Tasks, 8)));
        assert!(!task_7.invalidates(&Tag::list(TagKind::Tasks)));
    }

    #[test]
    fn test_key_includes_args() {
        assert_ne!(key("getTask", 1), key("getTask", 2));
        assert_eq!(key("getTask", 1), key("getTask", 1));
        assert_eq!(key("getProjects", ()).to_string(), "getProjects(null)");
    }

    #[tokio::test]
    async fn test_status_lifecycle() {
        let cache = QueryCache::new();
        let k = key("getTask", 7);

        assert_eq!(cache.status(&k).await, QueryStatus::Uninitialized);

        cache.begin(&k).await;
        assert_eq!(cache.status(&k).await, QueryStatus::Loading);
        assert!(cache.fresh(&k).await.is_none());

        cache
            .succeed(&k, json!({ "id": 7 }), vec![Tag::id(TagKind::Tasks, 7)])
            .await;
        assert_eq!(cache.status(&k).await, QueryStatus::Success);
        assert_eq!(cache.fresh(&k).await, Some(json!({ "id": 7 })));

        assert_eq!(cache.invalidate(&[Tag::id(TagKind::Tasks, 7)]).await, 1);
        assert_eq!(cache.status(&k).await, QueryStatus::Stale);
        assert!(cache.fresh(&k).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidation_is_selective() {
        let cache = QueryCache::new();
        let task_7 = key("getTask", 7);
        let task_8 = key("getTask", 8);
        let projects = key("getProjects", ());

        cache
            .succeed(&task_7, json!({}), vec![Tag::id(TagKind::Tasks, 7)])
            .await;
        cache
            .succeed(&task_8, json!({}), vec![Tag::id(TagKind::Tasks, 8)])
            .await;
        cache
            .succeed(&projects, json!([]), vec![Tag::list(TagKind::Projects)])
            .await;

        cache.invalidate(&[Tag::id(TagKind::Tasks, 7)]).await;
        assert_eq!(cache.status(&task_7).await, QueryStatus::Stale);
        assert_eq!(cache.status(&task_8).await, QueryStatus::Success);
        assert_eq!(cache.status(&projects).await, QueryStatus::Success);

        assert_eq!(cache.invalidate(&[Tag::list(TagKind::Tasks)]).await, 1);
        assert_eq!(cache.status(&task_8).await, QueryStatus::Stale);
    }

    #[tokio::test]
    async fn test_invalidation_during_fetch_lands_stale() {
        let cache = QueryCache::new();
        let projects = key("getProjects", ());

        cache.begin(&projects).await;
        assert_eq!(cache.invalidate(&[Tag::list(TagKind::Projects)]).await, 0);

        let status = cache
            .succeed(
                &projects,
                json!([]),
                vec![Tag::id(TagKind::Projects, 1), Tag::list(TagKind::Projects)],
            )
            .await;

        assert_eq!(status, QueryStatus::Stale);
        assert!(cache.fresh(&projects).await.is_none());

        // The next fetch starts clean
        cache.begin(&projects).await;
        let status = cache
            .succeed(&projects, json!([]), vec![Tag::list(TagKind::Projects)])
            .await;
        assert_eq!(status, QueryStatus::Success);
    }

    #[tokio::test]
    async fn test_unrelated_invalidation_during_fetch_is_ignored() {
        let cache = QueryCache::new();
        let task_8 = key("getTask", 8);

        cache.begin(&task_8).await;
        cache.invalidate(&[Tag::id(TagKind::Tasks, 7)]).await;

        let status = cache
            .succeed(&task_8, json!({}), vec![Tag::id(TagKind::Tasks, 8)])
            .await;
        assert_eq!(status, QueryStatus::Success);
    }

    #[tokio::test]
    async fn test_failure_records_error() {
        let cache = QueryCache::new();
        let k = key("getProject", 3);

        cache.begin(&k).await;
        cache.fail(&k, "API error (404): Project not found").await;

        assert_eq!(cache.status(&k).await, QueryStatus::Error);
        assert_eq!(
            cache.error(&k).await.as_deref(),
            Some("API error (404): Project not found")
        );
        // Errors are not invalidation targets
        assert_eq!(cache.invalidate(&[Tag::list(TagKind::Projects)]).await, 0);
    }
}
