//! Reference in-memory [`Store`] implementation.
//!
//! Values are stored as leaves keyed by their exact segment path. Reading an
//! exact leaf returns it directly; reading a path with no leaf of its own
//! but with descendants (e.g. a tile's `groups` path, when individual groups
//! were committed at `groups/{id}`) reconstructs the nested object from
//! those descendants — the same snapshot semantics a hierarchical
//! real-time-database-style backend gives a parent-path read.
//!
//! Commits are serialized behind a single write lock, which is what makes
//! them atomic across arbitrarily many paths — the same guarantee spec §4.2
//! asks of the production backend, just achieved here with a coarse lock
//! instead of a real transaction log. `transact` layers an optimistic
//! version check on top so concurrent writers to the same root path are
//! detected and retried rather than silently lost.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Map as JsonMap;

use crate::error::StoreError;
use crate::path::Path;
use crate::store::{Store, TransactionOutcome, Update, Value, MAX_TRANSACT_RETRIES};

type Segments = Vec<String>;

#[derive(Default)]
struct Inner {
    values: HashMap<Segments, Value>,
    versions: HashMap<Segments, u64>,
}

impl Inner {
    fn read_at(&self, segments: &[String]) -> Option<Value> {
        if let Some(v) = self.values.get(segments) {
            return Some(v.clone());
        }

        let mut node = JsonMap::new();
        let mut found = false;
        for (key, value) in &self.values {
            if key.len() > segments.len() && key[..segments.len()] == *segments {
                found = true;
                insert_nested(&mut node, &key[segments.len()..], value.clone());
            }
        }
        found.then_some(Value::Object(node))
    }

    fn list_children(&self, prefix: &[String]) -> Vec<String> {
        let mut children = std::collections::BTreeSet::new();
        for key in self.values.keys() {
            if key.len() > prefix.len() && key[..prefix.len()] == *prefix {
                children.insert(key[prefix.len()].clone());
            }
        }
        children.into_iter().collect()
    }

    fn write_at(&mut self, segments: Segments, value: Option<Value>) {
        match value {
            Some(v) => {
                self.values.insert(segments.clone(), v);
            }
            None => {
                self.values.remove(&segments);
            }
        }
        *self.versions.entry(segments).or_insert(0) += 1;
    }
}

fn insert_nested(node: &mut JsonMap<String, Value>, remaining: &[String], value: Value) {
    if remaining.len() == 1 {
        node.insert(remaining[0].clone(), value);
        return;
    }
    let child = node
        .entry(remaining[0].clone())
        .or_insert_with(|| Value::Object(JsonMap::new()));
    if let Value::Object(child_map) = child {
        insert_nested(child_map, &remaining[1..], value);
    }
}

/// An in-memory store suitable for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live (non-deleted) leaf paths. Test/diagnostic only.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().values.len()
    }

    /// Returns true if the store holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for InMemoryStore {
    fn read<'a>(
        &'a self,
        path: &'a Path,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Option<Value>, StoreError>> + Send + 'a>>
    {
        Box::pin(async move { Ok(self.inner.read().read_at(path.segments())) })
    }

    fn commit<'a>(
        &'a self,
        updates: Update,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), StoreError>> + Send + 'a>>
    {
        Box::pin(async move {
            let mut inner = self.inner.write();
            for (path, value) in updates {
                inner.write_at(path.segments().to_vec(), value);
            }
            Ok(())
        })
    }

    fn transact<'a, F>(
        &'a self,
        root: &'a Path,
        mut f: F,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), StoreError>> + Send + 'a>>
    where
        F: FnMut(Option<Value>) -> TransactionOutcome + Send + 'a,
    {
        Box::pin(async move {
            let segments = root.segments().to_vec();
            for _ in 0..MAX_TRANSACT_RETRIES {
                let (current, seen_version) = {
                    let inner = self.inner.read();
                    (
                        inner.read_at(&segments),
                        inner.versions.get(&segments).copied().unwrap_or(0),
                    )
                };

                let outcome = f(current);

                let mut inner = self.inner.write();
                let now_version = inner.versions.get(&segments).copied().unwrap_or(0);
                if now_version != seen_version {
                    // Someone else committed to this path between our read and
                    // our write; retry against the fresh value.
                    continue;
                }

                match outcome {
                    TransactionOutcome::Commit(v) => inner.write_at(segments.clone(), Some(v)),
                    TransactionOutcome::Delete => inner.write_at(segments.clone(), None),
                    TransactionOutcome::Abort => {}
                }
                return Ok(());
            }

            Err(StoreError::TransactionExhausted { path: root.to_string() })
        })
    }

    fn list_children<'a>(
        &'a self,
        prefix: &'a Path,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<String>, StoreError>> + Send + 'a>> {
        Box::pin(async move { Ok(self.inner.read().list_children(prefix.segments())) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn commit_is_atomic_across_paths() {
        let store = InMemoryStore::new();
        let a = Path::new(["a"]);
        let b = Path::new(["b"]);

        let mut updates = Update::new();
        updates.insert(a.clone(), Some(json!(1)));
        updates.insert(b.clone(), Some(json!(2)));
        store.commit(updates).await.unwrap();

        assert_eq!(store.read(&a).await.unwrap(), Some(json!(1)));
        assert_eq!(store.read(&b).await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn commit_with_nil_deletes() {
        let store = InMemoryStore::new();
        let p = Path::new(["x"]);
        store
            .commit(Update::from([(p.clone(), Some(json!("hi")))]))
            .await
            .unwrap();
        assert!(store.read(&p).await.unwrap().is_some());

        store.commit(Update::from([(p.clone(), None)])).await.unwrap();
        assert!(store.read(&p).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn parent_read_aggregates_children() {
        let store = InMemoryStore::new();
        let g1 = Path::new(["tile", "groups", "g1"]);
        let g2 = Path::new(["tile", "groups", "g2"]);
        store
            .commit(Update::from([
                (g1, Some(json!({"owner": "p1"}))),
                (g2, Some(json!({"owner": "p2"}))),
            ]))
            .await
            .unwrap();

        let groups = store.read(&Path::new(["tile", "groups"])).await.unwrap().unwrap();
        assert_eq!(groups["g1"]["owner"], json!("p1"));
        assert_eq!(groups["g2"]["owner"], json!("p2"));

        let tile = store.read(&Path::new(["tile"])).await.unwrap().unwrap();
        assert_eq!(tile["groups"]["g1"]["owner"], json!("p1"));
    }

    #[tokio::test]
    async fn list_children_returns_distinct_immediate_segments() {
        let store = InMemoryStore::new();
        store
            .commit(Update::from([
                (Path::new(["worlds", "w1", "chunks", "0,0", "1", "2"]), Some(json!({}))),
                (Path::new(["worlds", "w1", "chunks", "0,0", "1", "3"]), Some(json!({}))),
                (Path::new(["worlds", "w1", "chunks", "1,0", "20", "1"]), Some(json!({}))),
            ]))
            .await
            .unwrap();

        let chunks = store
            .list_children(&Path::new(["worlds", "w1", "chunks"]))
            .await
            .unwrap();
        assert_eq!(chunks, vec!["0,0".to_string(), "1,0".to_string()]);

        let xs = store
            .list_children(&Path::new(["worlds", "w1", "chunks", "0,0"]))
            .await
            .unwrap();
        assert_eq!(xs, vec!["1".to_string()]);
    }

    #[tokio::test]
    async fn transact_sees_its_own_prior_commit() {
        let store = InMemoryStore::new();
        let counter = Path::new(["counter"]);
        store
            .commit(Update::from([(counter.clone(), Some(json!(0)))]))
            .await
            .unwrap();

        for _ in 0..5 {
            store
                .transact(&counter, |current| {
                    let n = current.and_then(|v| v.as_i64()).unwrap_or(0);
                    TransactionOutcome::Commit(json!(n + 1))
                })
                .await
                .unwrap();
        }

        assert_eq!(store.read(&counter).await.unwrap(), Some(json!(5)));
    }

    #[tokio::test]
    async fn transact_abort_leaves_value_untouched() {
        let store = InMemoryStore::new();
        let p = Path::new(["p"]);
        store
            .commit(Update::from([(p.clone(), Some(json!(42)))]))
            .await
            .unwrap();

        store.transact(&p, |_| TransactionOutcome::Abort).await.unwrap();

        assert_eq!(store.read(&p).await.unwrap(), Some(json!(42)));
    }
}
