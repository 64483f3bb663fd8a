use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Collection, DocumentStore, Filter, StoreError, Write, WriteBatch};

type Documents = HashMap<Collection, BTreeMap<String, Value>>;

/// In-process backend. A single lock guards every collection, so a batch is
/// applied without any reader observing half of it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<Documents>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, collection: Collection) -> usize {
        self.documents
            .read()
            .await
            .get(&collection)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents.get(&collection).and_then(|c| c.get(id)).cloned())
    }

    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(&collection)
            .map(|c| c.values().filter(|doc| filter.matches(doc)).cloned().collect())
            .unwrap_or_default())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        for write in batch.into_writes() {
            match write {
                Write::Set {
                    collection,
                    id,
                    body,
                } => {
                    documents.entry(collection).or_default().insert(id, body);
                }
                Write::Delete { collection, id } => {
                    if let Some(c) = documents.get_mut(&collection) {
                        c.remove(&id);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(collection: Collection, id: &str, body: Value) -> Write {
        Write::Set {
            collection,
            id: id.to_string(),
            body,
        }
    }

    #[tokio::test]
    async fn test_commit_applies_sets_and_deletes_in_order() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.writes.push(set(Collection::Users, "b", json!({ "id": "b", "role": "buyer" })));
        batch.writes.push(set(Collection::Users, "a", json!({ "id": "a", "role": "seller" })));
        batch.writes.push(Write::Delete {
            collection: Collection::Users,
            id: "b".into(),
        });
        store.commit(batch).await.unwrap();

        assert_eq!(store.len(Collection::Users).await, 1);
        assert!(store.get(Collection::Users, "b").await.unwrap().is_none());
        let found = store
            .find(Collection::Users, &Filter::new().eq("role", "seller"))
            .await
            .unwrap();
        assert_eq!(found, vec![json!({ "id": "a", "role": "seller" })]);
    }

    #[tokio::test]
    async fn test_find_orders_by_id() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        for id in ["c", "a", "b"] {
            batch.writes.push(set(Collection::Batches, id, json!({ "id": id })));
        }
        store.commit(batch).await.unwrap();

        let ids: Vec<_> = store
            .find(Collection::Batches, &Filter::new())
            .await
            .unwrap()
            .into_iter()
            .map(|v| v["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
