//! In-memory storage implementation for document stores.
//!
//! Documents are kept as BSON values in insertion order behind async-safe
//! read-write locks, so distinct results come back in a deterministic order.

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Uuid, Bson, Document};

use doclens_core::{
    query::QueryFilter,
    cursor::{RawValues, raw_values},
    error::{DocumentStoreError, DocumentStoreResult},
    backend::{StoreBackend, StoreBackendBuilder},
};

use crate::evaluator::{DocumentEvaluator, Comparable, resolve_path};

/// document id -> document, in insertion order
type CollectionMap = Document;
type StoreMap = BTreeMap<String, CollectionMap>;


/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Distinct semantics
///
/// [`distinct_values`](StoreBackend::distinct_values) scans the collection in
/// insertion order, keeps the documents matching the filter, resolves the field
/// path in each and unwinds array values into their elements. The first
/// occurrence of each value is kept; numerically equal values of different
/// widths count as the same value.
///
/// Native filter documents are translated with [`QueryFilter::to_expr`], so
/// operators outside that translation are rejected as invalid filters.
///
/// # Example
///
/// ```ignore
/// use doclens_memory::InMemoryStore;
/// use doclens::backend::StoreBackend;
/// use bson::{Uuid, Bson, doc};
///
/// let store = InMemoryStore::new();
///
/// let doc = Bson::Document(doc! { "name": "Alice", "address": "22 Wall Street Avenue" });
/// store.insert_documents(vec![(Uuid::new(), doc)], "users").await?;
///
/// let values = store.distinct_values("address", None, "users").await?;
/// assert_eq!(values.count(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection_name -> (document_id -> document)
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

/// Computes the distinct values of `field` over `documents`, keeping first-seen order.
pub(crate) fn distinct_in<'a>(
    documents: impl IntoIterator<Item = &'a Bson>,
    field: &str,
) -> Vec<Bson> {
    let mut seen: HashSet<Comparable<'a>> = HashSet::new();
    let mut values = Vec::new();

    for document in documents {
        for found in resolve_path(document, field) {
            let candidates: Box<dyn Iterator<Item = &'a Bson>> = match found {
                Bson::Array(items) => Box::new(items.iter()),
                single => Box::new(std::iter::once(single)),
            };

            for candidate in candidates {
                if seen.insert(Comparable::from(candidate)) {
                    values.push(candidate.clone());
                }
            }
        }
    }

    values
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();

        for (id, doc) in documents {
            let key = id.to_string();

            if collection_map.contains_key(&key) {
                return Err(DocumentStoreError::DocumentAlreadyExists(key, collection.to_string()));
            }

            if !matches!(doc, Bson::Document(_)) {
                return Err(DocumentStoreError::InvalidDocument(format!(
                    "document {key} is a {:?}, not a document",
                    doc.element_type()
                )));
            }

            collection_map.insert(key, doc);
        }

        Ok(())
    }

    async fn distinct_values(
        &self,
        field: &str,
        filter: Option<QueryFilter>,
        collection: &str,
    ) -> DocumentStoreResult<RawValues> {
        let filter = match filter {
            Some(filter) => filter.to_expr()?,
            None => None,
        };

        let store = self.store.read().await;
        let Some(collection_map) = store.get(collection) else {
            tracing::debug!(collection, field, "distinct over missing collection");
            return Ok(raw_values(Vec::new()));
        };

        let values = match &filter {
            Some(filter) => distinct_in(
                DocumentEvaluator::filter_documents(
                    collection_map.iter().map(|(_, doc)| doc),
                    filter,
                )?,
                field,
            ),
            None => distinct_in(collection_map.iter().map(|(_, doc)| doc), field),
        };

        tracing::debug!(
            collection,
            field,
            scanned = collection_map.len(),
            count = values.len(),
            "distinct command finished"
        );

        Ok(raw_values(values))
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.store
            .write()
            .await
            .entry(name.to_string())
            .or_default();

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        if store.remove(name).is_none() {
            return Err(DocumentStoreError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        Ok(
            self.store
                .read()
                .await
                .keys()
                .cloned()
                .collect()
        )
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
///
/// ```ignore
/// use doclens_memory::InMemoryStore;
/// use doclens::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder().build().await?;
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use doclens_core::query::Filter;

    async fn seeded(documents: Vec<Document>) -> InMemoryStore {
        let store = InMemoryStore::new();
        let entries = documents
            .into_iter()
            .map(|doc| (Uuid::new(), Bson::Document(doc)))
            .collect();

        store.insert_documents(entries, "pois").await.unwrap();
        store
    }

    async fn distinct(
        store: &InMemoryStore,
        field: &str,
        filter: Option<QueryFilter>,
    ) -> Vec<Bson> {
        store
            .distinct_values(field, filter, "pois")
            .await
            .unwrap()
            .collect::<DocumentStoreResult<Vec<_>>>()
            .unwrap()
    }

    #[tokio::test]
    async fn keeps_first_seen_order_and_drops_duplicates() {
        let store = seeded(vec![
            doc! { "address": "24 Wall Street Avenue" },
            doc! { "address": "22 Wall Street Avenue" },
            doc! { "address": "24 Wall Street Avenue" },
        ])
        .await;

        assert_eq!(
            distinct(&store, "address", None).await,
            vec![
                Bson::String("24 Wall Street Avenue".into()),
                Bson::String("22 Wall Street Avenue".into()),
            ]
        );
    }

    #[tokio::test]
    async fn resolves_dotted_paths_and_skips_missing_fields() {
        let store = seeded(vec![
            doc! { "coordinate": { "lat": 1, "lon": 2 } },
            doc! { "name": "no coordinate" },
            doc! { "coordinate": { "lat": 125, "lon": 72 } },
            doc! { "coordinate": { "lat": 1_i64, "lon": 2 } },
        ])
        .await;

        assert_eq!(
            distinct(&store, "coordinate.lat", None).await,
            vec![Bson::Int32(1), Bson::Int32(125)]
        );
    }

    #[tokio::test]
    async fn unwinds_array_values() {
        let store = seeded(vec![
            doc! { "tags": ["a", "b"] },
            doc! { "tags": ["b", "c"] },
            doc! { "tags": "d" },
        ])
        .await;

        assert_eq!(
            distinct(&store, "tags", None).await,
            vec![
                Bson::String("a".into()),
                Bson::String("b".into()),
                Bson::String("c".into()),
                Bson::String("d".into()),
            ]
        );
    }

    #[tokio::test]
    async fn filter_restricts_contributing_documents() {
        let store = seeded(vec![
            doc! { "address": "22 Wall Street Avenue", "coordinate": { "lat": 1, "lon": 2 } },
            doc! { "address": "22 Wall Street Avenue", "coordinate": { "lat": 1, "lon": 2 } },
            doc! { "coordinate": { "lat": 125, "lon": 72 } },
        ])
        .await;

        let structured = QueryFilter::Expr(Filter::exists("address"));
        assert_eq!(
            distinct(&store, "coordinate", Some(structured)).await,
            vec![Bson::Document(doc! { "lat": 1, "lon": 2 })]
        );

        let native = QueryFilter::Native(doc! { "address": { "$exists": true } });
        assert_eq!(
            distinct(&store, "coordinate.lat", Some(native)).await,
            vec![Bson::Int32(1)]
        );
    }

    #[tokio::test]
    async fn unknown_native_operators_are_invalid() {
        let store = seeded(vec![doc! { "name": "John" }]).await;
        let filter = QueryFilter::Native(doc! { "name": { "$regex": "^J" } });

        assert!(matches!(
            store.distinct_values("name", Some(filter), "pois").await,
            Err(DocumentStoreError::InvalidFilter(_))
        ));
    }

    #[tokio::test]
    async fn large_integers_stay_distinct() {
        let store = seeded(vec![
            doc! { "serial": 9_007_199_254_740_992_i64 },
            doc! { "serial": 9_007_199_254_740_993_i64 },
            doc! { "serial": 9_007_199_254_740_992.0 },
        ])
        .await;

        assert_eq!(
            distinct(&store, "serial", None).await,
            vec![Bson::Int64(9_007_199_254_740_992), Bson::Int64(9_007_199_254_740_993)]
        );
    }

    #[tokio::test]
    async fn nan_is_a_single_value() {
        let store = seeded(vec![
            doc! { "reading": f64::NAN },
            doc! { "reading": f64::NAN },
            doc! { "reading": 0.5 },
        ])
        .await;

        let values = distinct(&store, "reading", None).await;

        assert_eq!(values.len(), 2);
        assert!(matches!(values[0], Bson::Double(v) if v.is_nan()));
        assert_eq!(values[1], Bson::Double(0.5));
    }

    #[tokio::test]
    async fn missing_collection_yields_nothing() {
        let store = InMemoryStore::new();

        assert!(distinct(&store, "address", None).await.is_empty());
    }

    #[tokio::test]
    async fn rejects_duplicate_ids_and_non_documents() {
        let store = InMemoryStore::new();
        let id = Uuid::new();

        store
            .insert_documents(vec![(id, Bson::Document(doc! { "a": 1 }))], "pois")
            .await
            .unwrap();

        assert!(matches!(
            store.insert_documents(vec![(id, Bson::Document(doc! { "a": 2 }))], "pois").await,
            Err(DocumentStoreError::DocumentAlreadyExists(..))
        ));
        assert!(matches!(
            store.insert_documents(vec![(Uuid::new(), Bson::Int32(3))], "pois").await,
            Err(DocumentStoreError::InvalidDocument(_))
        ));
    }

    #[tokio::test]
    async fn collection_management() {
        let store = InMemoryStore::builder().build().await.unwrap();

        store.create_collection("b").await.unwrap();
        store.create_collection("a").await.unwrap();
        assert_eq!(store.list_collections().await.unwrap(), vec!["a", "b"]);

        store.drop_collection("a").await.unwrap();
        assert!(matches!(
            store.drop_collection("a").await,
            Err(DocumentStoreError::CollectionNotFound(_))
        ));
    }
}
