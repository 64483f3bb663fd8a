//! Document store seam.
//!
//! Every entity lives as a JSON document inside a named [`Collection`]. The
//! backends only have to answer three questions: fetch one document, find
//! documents containing a JSON pattern, and apply a [`WriteBatch`]
//! all-or-nothing.

pub mod memory;
pub mod postgres;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Users,
    Products,
    Batches,
    Carts,
    CartItems,
    CartBatchItems,
    Orders,
    OrderItems,
    OrderBatchItems,
    Transactions,
    Ratings,
    Conversations,
    Messages,
    Notifications,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Products => "products",
            Self::Batches => "batches",
            Self::Carts => "carts",
            Self::CartItems => "cartItems",
            Self::CartBatchItems => "cartBatchItems",
            Self::Orders => "orders",
            Self::OrderItems => "orderItems",
            Self::OrderBatchItems => "orderBatchItems",
            Self::Transactions => "transactions",
            Self::Ratings => "ratings",
            Self::Conversations => "conversations",
            Self::Messages => "messages",
            Self::Notifications => "notifications",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed record stored in exactly one collection.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;
    /// Human readable name used in "not found" errors.
    const KIND: &'static str;

    fn id(&self) -> &str;
}

/// Containment filter: a document matches when the pattern is a subset of it.
///
/// Nested fields are addressed with dotted paths (`kind.type`). Array values
/// match when every pattern element is present in the document's array.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter(Map<String, Value>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, path: &str, value: impl Into<Value>) -> Self {
        let mut segments = path.split('.').rev();
        let last = segments.next().unwrap_or(path);
        let mut nested = Value::Object(Map::from_iter([(last.to_string(), value.into())]));
        for segment in segments {
            nested = Value::Object(Map::from_iter([(segment.to_string(), nested)]));
        }
        if let Value::Object(fields) = nested {
            for (key, value) in fields {
                merge_into(&mut self.0, key, value);
            }
        }
        self
    }

    /// Shorthand for "array field contains this element".
    pub fn contains(self, path: &str, element: impl Into<Value>) -> Self {
        self.eq(path, Value::Array(vec![element.into()]))
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn matches(&self, document: &Value) -> bool {
        contains(document, &Value::Object(self.0.clone()))
    }
}

fn merge_into(target: &mut Map<String, Value>, key: String, value: Value) {
    match (target.get_mut(&key), value) {
        (Some(Value::Object(existing)), Value::Object(incoming)) => {
            for (k, v) in incoming {
                merge_into(existing, k, v);
            }
        }
        (_, value) => {
            target.insert(key, value);
        }
    }
}

/// JSON containment with the same semantics as PostgreSQL's `@>` operator.
pub fn contains(document: &Value, pattern: &Value) -> bool {
    match (document, pattern) {
        (Value::Object(doc), Value::Object(pat)) => pat
            .iter()
            .all(|(key, p)| doc.get(key).is_some_and(|d| contains(d, p))),
        (Value::Array(doc), Value::Array(pat)) => pat
            .iter()
            .all(|p| doc.iter().any(|d| contains(d, p))),
        (doc, pat) => doc == pat,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Write {
    Set {
        collection: Collection,
        id: String,
        body: Value,
    },
    Delete {
        collection: Collection,
        id: String,
    },
}

/// An ordered set of writes committed atomically.
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<D: Document>(&mut self, doc: &D) -> Result<&mut Self, StoreError> {
        self.writes.push(Write::Set {
            collection: D::COLLECTION,
            id: doc.id().to_string(),
            body: serde_json::to_value(doc)?,
        });
        Ok(self)
    }

    pub fn delete<D: Document>(&mut self, id: &str) -> &mut Self {
        self.writes.push(Write::Delete {
            collection: D::COLLECTION,
            id: id.to_string(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError>;

    /// Documents matching `filter`, ordered by id.
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError>;

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

/// Typed access on top of a [`DocumentStore`] backend.
#[derive(Clone)]
pub struct Repository {
    backend: Arc<dyn DocumentStore>,
}

impl Repository {
    pub fn new(backend: Arc<dyn DocumentStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub async fn get<D: Document>(&self, id: &str) -> Result<Option<D>, StoreError> {
        match self.backend.get(D::COLLECTION, id).await? {
            Some(body) => Ok(Some(serde_json::from_value(body)?)),
            None => Ok(None),
        }
    }

    pub async fn find<D: Document>(&self, filter: &Filter) -> Result<Vec<D>, StoreError> {
        self.backend
            .find(D::COLLECTION, filter)
            .await?
            .into_iter()
            .map(|body| serde_json::from_value(body).map_err(StoreError::from))
            .collect()
    }

    pub async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let writes = batch.len();
        self.backend.commit(batch).await?;
        tracing::debug!(writes, "write batch committed");
        Ok(())
    }
}
