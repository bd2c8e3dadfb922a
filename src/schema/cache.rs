//! Process-wide schema cache.
//!
//! Column sets are fetched once per table and shared read-only afterwards.
//! The cache is keyed by table name only, never by connection, and is not
//! invalidated when the database changes underneath it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::{DbField, SchemaError, SchemaObject, SchemaProvider, assign_parameter_names};

/// Thread-safe per-table cache in front of a [`SchemaProvider`].
pub struct SchemaCache<P> {
    provider: P,
    fields: DashMap<String, Arc<[DbField]>>,
    enabled: bool,
    fetches: AtomicU64,
}

impl<P: SchemaProvider> SchemaCache<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            fields: DashMap::new(),
            enabled: true,
            fetches: AtomicU64::new(0),
        }
    }

    /// A pass-through cache that fetches on every call.
    pub fn disabled(provider: P) -> Self {
        Self {
            enabled: false,
            ..Self::new(provider)
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn cache_key(table: &str) -> String {
        table.to_lowercase()
    }

    fn lookup(&self, key: &str) -> Option<Arc<[DbField]>> {
        if !self.enabled {
            return None;
        }
        self.fields.get(key).map(|entry| entry.value().clone())
    }

    /// Insert-if-absent; the first published column set wins.
    fn publish(&self, key: String, fields: Vec<DbField>) -> Arc<[DbField]> {
        let fields: Arc<[DbField]> = fields.into();
        if !self.enabled {
            return fields;
        }
        self.fields.entry(key).or_insert(fields).value().clone()
    }

    /// Column set of `table`, fetched on first use.
    pub fn get_fields(&self, table: &str) -> Result<Arc<[DbField]>, SchemaError> {
        let key = Self::cache_key(table);
        if let Some(fields) = self.lookup(&key) {
            return Ok(fields);
        }

        tracing::debug!("Fetching schema for table '{}'", table);
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let mut fields = self.provider.get_fields(table)?;
        assign_parameter_names(&mut fields);
        Ok(self.publish(key, fields))
    }

    /// Async variant of [`get_fields`](Self::get_fields). Dropping the
    /// future before the fetch completes leaves the cache untouched.
    pub async fn get_fields_async(&self, table: &str) -> Result<Arc<[DbField]>, SchemaError> {
        let key = Self::cache_key(table);
        if let Some(fields) = self.lookup(&key) {
            return Ok(fields);
        }

        tracing::debug!("Fetching schema for table '{}'", table);
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let mut fields = self.provider.get_fields_async(table).await?;
        assign_parameter_names(&mut fields);
        Ok(self.publish(key, fields))
    }

    /// Tables and views; not cached.
    pub fn get_schema_objects(&self) -> Result<Vec<SchemaObject>, SchemaError> {
        self.provider.get_schema_objects()
    }

    pub async fn get_schema_objects_async(&self) -> Result<Vec<SchemaObject>, SchemaError> {
        self.provider.get_schema_objects_async().await
    }

    /// Drop the cached column set of one table.
    pub fn invalidate(&self, table: &str) {
        if self.fields.remove(&Self::cache_key(table)).is_some() {
            tracing::debug!("Invalidated schema for table '{}'", table);
        }
    }

    pub fn clear(&self) {
        self.fields.clear();
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of times the provider was asked for a column set.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::InMemorySchema;
    use crate::value::ValueType;

    fn schema() -> InMemorySchema {
        InMemorySchema::new().table(
            "Person",
            vec![
                DbField::new("Id", ValueType::Int64).unwrap().primary().identity(),
                DbField::new("Name", ValueType::Text).unwrap(),
            ],
        )
    }

    #[test]
    fn test_fetches_once_per_table() {
        let cache = SchemaCache::new(schema());
        let first = cache.get_fields("Person").unwrap();
        let second = cache.get_fields("PERSON").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.fetch_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failure_is_not_cached() {
        let cache = SchemaCache::new(schema());
        assert!(cache.get_fields("Ghost").is_err());
        assert!(cache.get_fields("Ghost").is_err());
        assert_eq!(cache.fetch_count(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_disabled_cache_always_fetches() {
        let cache = SchemaCache::disabled(schema());
        cache.get_fields("Person").unwrap();
        cache.get_fields("Person").unwrap();
        assert_eq!(cache.fetch_count(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate() {
        let cache = SchemaCache::new(schema());
        cache.get_fields("Person").unwrap();
        cache.invalidate("person");
        cache.get_fields("Person").unwrap();
        assert_eq!(cache.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_async_fetch_shares_cache() {
        let cache = SchemaCache::new(schema());
        let a = cache.get_fields_async("Person").await.unwrap();
        let b = cache.get_fields("Person").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.fetch_count(), 1);
    }
}
