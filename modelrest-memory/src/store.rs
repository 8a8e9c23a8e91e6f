//! In-memory backend.
//!
//! Documents are kept as BSON values in per-collection maps guarded by an async-aware
//! read-write lock. Each document records the order in which it was first stored so that
//! unsorted queries and sort ties follow insertion order.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::Bson;
use mea::rwlock::RwLock;

use modelrest_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    page::Page,
    query::{Expr, Query, SortDirection},
};

use crate::evaluator::{Comparable, DocumentEvaluator};

#[derive(Debug, Clone)]
struct StoredDocument {
    /// Insertion sequence number; kept when the document is replaced.
    position: u64,
    document: Bson,
}

#[derive(Debug, Default)]
struct CollectionData {
    documents: HashMap<String, StoredDocument>,
    next_position: u64,
}

impl CollectionData {
    /// Inserts or replaces a document, keeping the position of a replaced one.
    fn put(&mut self, id: String, document: Bson) {
        match self.documents.get_mut(&id) {
            Some(stored) => stored.document = document,
            None => {
                let position = self.next_position;
                self.next_position += 1;
                self.documents.insert(id, StoredDocument { position, document });
            }
        }
    }

    /// Documents in insertion order.
    fn ordered(&self) -> Vec<&StoredDocument> {
        let mut documents = self.documents.values().collect::<Vec<_>>();
        documents.sort_by_key(|stored| stored.position);
        documents
    }
}

type StoreMap = HashMap<String, CollectionData>;

fn sort_key<'a>(document: &'a Bson, field: &str) -> Comparable<'a> {
    document
        .as_document()
        .and_then(|doc| doc.get(field))
        .map(Comparable::from)
        .unwrap_or(Comparable::Null)
}

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state; all clones share
/// the same data. Queries scan the whole collection, there is no indexing.
///
/// # Example
///
/// ```ignore
/// use modelrest::memory::InMemoryStore;
/// use modelrest::{backend::StoreBackend, query::Query};
/// use bson::{Bson, doc};
///
/// let store = InMemoryStore::new();
/// let doc = Bson::Document(doc! { "id": "u1", "name": "Alice" });
/// store.upsert_documents(vec![("u1".into(), doc)], "users").await?;
///
/// let page = store.query_documents(Query::new(), "users").await?;
/// assert_eq!((page.items.len(), page.count), (1, 1));
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> collection data
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn upsert_documents(&self, documents: Vec<(String, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let data = store.entry(collection.to_string()).or_default();

        for (id, doc) in documents {
            data.put(id, doc);
        }

        Ok(())
    }

    async fn update_documents(&self, documents: Vec<(String, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let data = match store.get_mut(collection) {
            Some(data) => data,
            None => return Err(DocumentStoreError::CollectionNotFound(collection.to_string())),
        };

        if let Some((id, _)) = documents.iter().find(|(id, _)| !data.documents.contains_key(id)) {
            return Err(DocumentStoreError::DocumentNotFound(id.clone(), collection.to_string()));
        }

        for (id, doc) in documents {
            data.put(id, doc);
        }

        Ok(())
    }

    async fn delete_documents(&self, ids: Vec<String>, collection: &str) -> DocumentStoreResult<u64> {
        let mut store = self.store.write().await;
        let data = match store.get_mut(collection) {
            Some(data) => data,
            None => return Ok(0),
        };

        Ok(ids
            .iter()
            .filter(|id| data.documents.remove(id.as_str()).is_some())
            .count() as u64)
    }

    async fn clear_collection(&self, collection: &str) -> DocumentStoreResult<u64> {
        let mut store = self.store.write().await;

        Ok(match store.get_mut(collection) {
            Some(data) => {
                let removed = data.documents.len() as u64;
                data.documents.clear();
                removed
            }
            None => 0,
        })
    }

    async fn get_documents(&self, ids: Vec<String>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let data = match store.get(collection) {
            Some(data) => data,
            None => return Ok(vec![]),
        };

        Ok(ids
            .iter()
            .filter_map(|id| data.documents.get(id))
            .map(|stored| stored.document.clone())
            .collect())
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Page<Bson>> {
        let store = self.store.read().await;
        let data = match store.get(collection) {
            Some(data) => data,
            None => return Ok(Page::new(vec![], 0)),
        };

        // Filter in insertion order
        let mut matched = data
            .ordered()
            .into_iter()
            .map(|stored| &stored.document)
            .filter(|doc| DocumentEvaluator::matches(doc, query.filter.as_ref()))
            .collect::<Vec<_>>();

        // Stable sort keeps insertion order for ties
        if let Some(sort) = &query.sort {
            matched.sort_by(|a, b| {
                let ordering = sort_key(a, &sort.field).sort_cmp(&sort_key(b, &sort.field));

                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let count = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(Page::new(items, count))
    }

    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        let store = self.store.read().await;

        Ok(match store.get(collection) {
            Some(data) => data
                .documents
                .values()
                .filter(|stored| DocumentEvaluator::matches(&stored.document, filter.as_ref()))
                .count() as u64,
            None => 0,
        })
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Always succeeds with a freshly initialized store.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use modelrest_core::query::Filter;

    fn user(id: &str, name: &str, sequence: Option<i64>) -> (String, Bson) {
        let mut document = doc! { "id": id, "name": name };
        if let Some(sequence) = sequence {
            document.insert("sequence", sequence);
        }

        (id.to_string(), Bson::Document(document))
    }

    fn ids(documents: &[Bson]) -> Vec<&str> {
        documents
            .iter()
            .filter_map(|doc| doc.as_document()?.get_str("id").ok())
            .collect()
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::builder().build().await.unwrap();
        store
            .upsert_documents(
                vec![
                    user("c", "Carol", Some(2)),
                    user("a", "Alice", Some(1)),
                    user("d", "Dave", None),
                    user("b", "Bob", Some(2)),
                ],
                "users",
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn unsorted_queries_keep_insertion_order() {
        let store = seeded().await;

        let page = store.query_documents(Query::new(), "users").await.unwrap();

        assert_eq!(ids(&page.items), vec!["c", "a", "d", "b"]);
        assert_eq!(page.count, 4);
    }

    #[tokio::test]
    async fn sort_ties_follow_insertion_order_and_missing_sorts_first() {
        let store = seeded().await;

        let asc = store
            .query_documents(Query::builder().sort("sequence", SortDirection::Asc).build(), "users")
            .await
            .unwrap();
        let desc = store
            .query_documents(Query::builder().sort("sequence", SortDirection::Desc).build(), "users")
            .await
            .unwrap();

        assert_eq!(ids(&asc.items), vec!["d", "a", "c", "b"]);
        assert_eq!(ids(&desc.items), vec!["c", "b", "a", "d"]);
    }

    #[tokio::test]
    async fn offset_and_limit_window_the_result() {
        let store = seeded().await;

        let page = store
            .query_documents(Query::builder().offset(1).limit(2).build(), "users")
            .await
            .unwrap();
        let beyond = store
            .query_documents(Query::builder().offset(10).limit(2).build(), "users")
            .await
            .unwrap();

        assert_eq!(ids(&page.items), vec!["a", "d"]);
        assert_eq!(page.count, 4);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.count, 4);
    }

    #[tokio::test]
    async fn page_count_reflects_filter_not_window() {
        let store = seeded().await;

        let query = Query::builder()
            .filter(Filter::eq("sequence", 2_i64))
            .sort("name", SortDirection::Asc)
            .limit(1)
            .build();
        let page = store.query_documents(query, "users").await.unwrap();

        assert_eq!(ids(&page.items), vec!["b"]);
        assert_eq!(page.count, 2);

        let none = store
            .query_documents(Query::builder().filter(Filter::eq("name", "Zed")).build(), "users")
            .await
            .unwrap();
        let missing = store.query_documents(Query::new(), "groups").await.unwrap();

        assert_eq!((none.items.len(), none.count), (0, 0));
        assert_eq!((missing.items.len(), missing.count), (0, 0));
    }

    #[tokio::test]
    async fn count_honours_filter() {
        let store = seeded().await;

        assert_eq!(store.count_documents(None, "users").await.unwrap(), 4);
        assert_eq!(
            store
                .count_documents(Some(Filter::eq("sequence", 2_i64)), "users")
                .await
                .unwrap(),
            2
        );
        assert_eq!(store.count_documents(None, "nothing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn upsert_replaces_in_place() {
        let store = seeded().await;

        store
            .upsert_documents(vec![user("a", "Alicia", Some(9)), user("e", "Eve", None)], "users")
            .await
            .unwrap();
        let docs = store.query_documents(Query::new(), "users").await.unwrap().items;

        assert_eq!(ids(&docs), vec!["c", "a", "d", "b", "e"]);
        assert_eq!(docs[1].as_document().unwrap().get_str("name").unwrap(), "Alicia");
    }

    #[tokio::test]
    async fn update_requires_existing_documents() {
        let store = seeded().await;

        let missing = store
            .update_documents(vec![user("a", "A", None), user("x", "X", None)], "users")
            .await;
        let unknown = store.update_documents(vec![user("a", "A", None)], "groups").await;

        assert!(matches!(missing, Err(DocumentStoreError::DocumentNotFound(id, _)) if id == "x"));
        assert!(matches!(unknown, Err(DocumentStoreError::CollectionNotFound(..))));

        let alice = store.get_documents(vec!["a".into()], "users").await.unwrap();
        assert_eq!(ids(&alice), vec!["a"]);
        assert_eq!(alice[0].as_document().unwrap().get_str("name").unwrap(), "Alice");
    }

    #[tokio::test]
    async fn delete_reports_removed_count() {
        let store = seeded().await;

        assert_eq!(store.delete_documents(vec!["a".into()], "users").await.unwrap(), 1);
        assert_eq!(store.delete_documents(vec!["a".into()], "users").await.unwrap(), 0);
        assert_eq!(store.delete_documents(vec!["a".into()], "groups").await.unwrap(), 0);
        assert!(store.get_documents(vec!["a".into()], "users").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_empties_collection_but_keeps_it() {
        let store = seeded().await;

        assert_eq!(store.clear_collection("users").await.unwrap(), 4);
        assert_eq!(store.count_documents(None, "users").await.unwrap(), 0);
        assert_eq!(store.clear_collection("groups").await.unwrap(), 0);

        // the documents are gone but the collection remains
        store.update_documents(vec![user("a", "A", None)], "users").await.unwrap_err();
        store.upsert_documents(vec![user("a", "A", None)], "users").await.unwrap();
        store.update_documents(vec![user("a", "B", None)], "users").await.unwrap();
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = InMemoryStore::new();
        let clone = store.clone();

        store.upsert_documents(vec![user("a", "Alice", None)], "users").await.unwrap();

        assert_eq!(clone.count_documents(None, "users").await.unwrap(), 1);
    }
}
