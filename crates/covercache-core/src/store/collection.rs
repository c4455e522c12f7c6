use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::{BlobStore, StoreError};
use crate::utils::format_age;

/// On-disk envelope: the data plus when it was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        format_age(self.age_minutes())
    }
}

/// Accepts the envelope and the bare array older clients wrote.
#[derive(Deserialize)]
#[serde(untagged)]
enum Stored<T> {
    Envelope(CachedData<Vec<T>>),
    Bare(Vec<T>),
}

/// A typed collection persisted as a single blob in a [`BlobStore`].
///
/// Reads never fail: a missing, unreadable or corrupt blob is an empty
/// collection. Writes report their errors.
pub struct FallbackCollection<T> {
    store: Arc<dyn BlobStore>,
    key: String,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FallbackCollection<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            write_lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the stored envelope, reporting store and parse errors.
    pub fn load_envelope(&self) -> Result<Option<CachedData<Vec<T>>>, StoreError> {
        let Some(contents) = self.store.read(&self.key)? else {
            return Ok(None);
        };
        let stored: Stored<T> =
            serde_json::from_str(&contents).map_err(|source| StoreError::Serialize {
                key: self.key.clone(),
                source,
            })?;
        Ok(Some(match stored {
            Stored::Envelope(envelope) => envelope,
            Stored::Bare(data) => CachedData {
                data,
                cached_at: DateTime::<Utc>::default(),
            },
        }))
    }

    /// The full collection; empty when nothing usable is stored.
    pub fn load(&self) -> Vec<T> {
        match self.load_envelope() {
            Ok(Some(envelope)) => {
                debug!(key = %self.key, count = envelope.data.len(), "Loaded fallback collection");
                envelope.data
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Fallback store unreadable, treating as empty");
                Vec::new()
            }
        }
    }

    /// Replace the full collection.
    pub fn save(&self, items: &[T]) -> Result<(), StoreError> {
        let contents =
            serde_json::to_string_pretty(&CachedData::new(items)).map_err(|source| {
                StoreError::Serialize {
                    key: self.key.clone(),
                    source,
                }
            })?;
        self.store.write(&self.key, &contents)
    }

    /// Read the collection, apply `change`, and write it back.
    ///
    /// The write is skipped when `change` fails. An unparseable blob is copied
    /// to `<key>.corrupt` before the new collection replaces it; a store that
    /// cannot be read at all fails the change.
    pub fn modify<R>(
        &self,
        change: impl FnOnce(&mut Vec<T>) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut items = match self.load_envelope() {
            Ok(envelope) => envelope.map(|e| e.data).unwrap_or_default(),
            Err(StoreError::Serialize { source, .. }) => {
                self.set_aside_corrupt(&source)?;
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        let result = change(&mut items)?;
        self.save(&items)?;
        Ok(result)
    }

    /// Key the unreadable blob is copied to before being replaced.
    fn corrupt_key(&self) -> String {
        format!("{}.corrupt", self.key)
    }

    fn set_aside_corrupt(&self, cause: &serde_json::Error) -> Result<(), StoreError> {
        if let Some(raw) = self.store.read(&self.key)? {
            let backup = self.corrupt_key();
            self.store.write(&backup, &raw)?;
            warn!(key = %self.key, backup = %backup, error = %cause, "Fallback store corrupt, kept a copy before rewriting");
        }
        Ok(())
    }

    /// How long ago the collection was last written, if it ever was.
    pub fn age_display(&self) -> Option<String> {
        match self.load_envelope() {
            Ok(Some(envelope)) => Some(envelope.age_display()),
            _ => None,
        }
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Duration;

    fn collection() -> (Arc<MemoryStore>, FallbackCollection<String>) {
        let store = Arc::new(MemoryStore::new());
        let collection = FallbackCollection::new(store.clone() as Arc<dyn BlobStore>, "user_assets");
        (store, collection)
    }

    #[test]
    fn test_empty_store_loads_empty() {
        let (_, collection) = collection();
        assert!(collection.load().is_empty());
        assert!(collection.age_display().is_none());
    }

    #[test]
    fn test_save_writes_envelope() {
        let (store, collection) = collection();
        collection.save(&["car".to_string()]).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&store.read("user_assets").unwrap().unwrap()).unwrap();
        assert_eq!(raw["data"], serde_json::json!(["car"]));
        assert!(raw["cached_at"].is_string());
        assert_eq!(collection.load(), vec!["car".to_string()]);
        assert_eq!(collection.age_display().as_deref(), Some("just now"));
    }

    #[test]
    fn test_bare_array_is_accepted() {
        let (store, collection) = collection();
        store.write("user_assets", r#"["house", "shop"]"#).unwrap();
        assert_eq!(collection.load(), vec!["house".to_string(), "shop".to_string()]);
    }

    #[test]
    fn test_corrupt_blob_loads_empty() {
        let (store, collection) = collection();
        store.write("user_assets", "not valid json {{{").unwrap();
        assert!(collection.load().is_empty());
        assert!(matches!(
            collection.load_envelope(),
            Err(StoreError::Serialize { .. })
        ));
    }

    #[test]
    fn test_modify_keeps_corrupt_blob_aside() {
        let (store, collection) = collection();
        store.write("user_assets", "not valid json {{{").unwrap();

        collection
            .modify(|items| {
                items.push("new".to_string());
                Ok(())
            })
            .unwrap();

        assert_eq!(
            store.read("user_assets.corrupt").unwrap().as_deref(),
            Some("not valid json {{{")
        );
        assert_eq!(collection.corrupt_key(), "user_assets.corrupt");
        assert_eq!(collection.load(), vec!["new".to_string()]);
    }

    #[test]
    fn test_modify_round_trip_and_abort() {
        let (_, collection) = collection();
        collection
            .modify(|items| {
                items.push("car".into());
                Ok(())
            })
            .unwrap();

        let err = collection
            .modify(|items| {
                items.clear();
                Err::<(), _>(StoreError::NotFound("x".into()))
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(collection.load(), vec!["car".to_string()]);
    }

    #[test]
    fn test_cached_data_age() {
        let mut old = CachedData::new(vec![1]);
        old.cached_at = Utc::now() - Duration::minutes(90);
        assert_eq!(old.age_display(), "2h ago");
        assert!(old.age_minutes() >= 90);
    }
}
