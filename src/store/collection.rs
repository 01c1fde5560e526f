//! Collection - Raw-snapshot storage for one entity kind
//!
//! Records are kept as the JSON the server sent (merged with later patches)
//! and parsed into the typed record on read. Keeping the raw snapshot lets a
//! merge patch tell an absent key from an explicit `null`.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, trace, warn};

use super::merge::merge_patch;
use crate::error::StoreError;
use crate::model::{Entity, EntityKind, Record, ID_FIELD};

/// Keyed storage for one record type
///
/// All operations lock the collection for their own read-modify-write only,
/// so collections never block each other.
pub struct Collection<T: Record> {
    entries: Mutex<BTreeMap<String, Value>>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> Collection<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            _record: PhantomData,
        }
    }

    /// Kind of the records held here
    pub fn kind(&self) -> EntityKind {
        T::KIND
    }

    /// Typed record by id, `None` if absent or unparsable
    pub fn get(&self, id: &str) -> Option<T> {
        let entries = self.entries.lock();
        entries.get(id).and_then(|raw| parse::<T>(id, raw))
    }

    /// Stored snapshot by id
    pub fn get_raw(&self, id: &str) -> Option<Value> {
        self.entries.lock().get(id).cloned()
    }

    /// All parsable records, ordered by id
    pub fn get_all(&self) -> Vec<T> {
        let entries = self.entries.lock();
        entries
            .iter()
            .filter_map(|(id, raw)| parse::<T>(id, raw))
            .collect()
    }

    /// All parsable records matching `pred`, ordered by id
    ///
    /// `pred` runs on a snapshot with the lock released, so it may read
    /// this collection again.
    pub fn filter<F>(&self, pred: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.get_all()
            .into_iter()
            .filter(|record| pred(record))
            .collect()
    }

    /// First record (lowest id) matching `pred`, evaluated like [`Collection::filter`]
    pub fn find<F>(&self, pred: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        self.get_all().into_iter().find(|record| pred(record))
    }

    /// Insert or overwrite a record from its wire payload
    ///
    /// Idempotent: creating the same payload twice leaves one record.
    pub fn create(&self, payload: Value) -> Result<T, StoreError> {
        if !payload.is_object() {
            return Err(StoreError::NotAnObject { kind: T::KIND });
        }
        let id = payload
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(StoreError::MissingId { kind: T::KIND })?;

        let record = validate::<T>(&id, &payload)?;

        let replaced = self.entries.lock().insert(id.clone(), payload).is_some();
        trace!(kind = %T::KIND, id = %id, replaced, "Record stored");

        Ok(record)
    }

    /// Merge-patch a stored record
    ///
    /// If the merged snapshot no longer parses, the stored snapshot is left
    /// untouched and [`StoreError::Invalid`] is returned.
    pub fn update(&self, id: &str, patch: &Value) -> Result<T, StoreError> {
        if !patch.is_object() {
            return Err(StoreError::NotAnObject { kind: T::KIND });
        }

        let mut entries = self.entries.lock();
        let Some(stored) = entries.get_mut(id) else {
            return Err(StoreError::NotFound {
                kind: T::KIND,
                id: id.to_string(),
            });
        };

        let mut merged = stored.clone();
        merge_patch(&mut merged, patch);
        // Identity is immutable
        if let Some(map) = merged.as_object_mut() {
            map.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        }

        match validate::<T>(id, &merged) {
            Ok(record) => {
                *stored = merged;
                Ok(record)
            }
            Err(err) => {
                warn!(kind = %T::KIND, id, error = %err, "PatchValidationFailure, patch discarded");
                Err(err)
            }
        }
    }

    /// Remove a record, returning it as it was
    pub fn remove(&self, id: &str) -> Option<T> {
        let removed = self.entries.lock().remove(id);
        match removed {
            Some(raw) => parse::<T>(id, &raw),
            None => {
                debug!(kind = %T::KIND, id, "Remove of unknown record ignored");
                None
            }
        }
    }

    /// Drop every record, returning how many were held
    pub fn remove_all(&self) -> usize {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.lock().contains_key(id)
    }
}

fn validate<T: Record>(id: &str, raw: &Value) -> Result<T, StoreError> {
    T::deserialize(raw).map_err(|err| StoreError::Invalid {
        kind: T::KIND,
        id: id.to_string(),
        reason: err.to_string(),
    })
}

fn parse<T: Record>(id: &str, raw: &Value) -> Option<T> {
    match T::deserialize(raw) {
        Ok(record) => Some(record),
        Err(err) => {
            warn!(kind = %T::KIND, id, error = %err, "Stored record does not parse");
            None
        }
    }
}

/// Kind-erased view of a collection, used by the synchronizer
pub trait AnyCollection: Send + Sync {
    fn kind(&self) -> EntityKind;
    fn get_entity(&self, id: &str) -> Option<Entity>;
    fn create_entity(&self, payload: Value) -> Result<Entity, StoreError>;
    fn update_entity(&self, id: &str, patch: &Value) -> Result<Entity, StoreError>;
    fn remove_entity(&self, id: &str) -> Option<Entity>;
    fn clear(&self) -> usize;
    fn count(&self) -> usize;
}

impl<T: Record> AnyCollection for Collection<T> {
    fn kind(&self) -> EntityKind {
        T::KIND
    }

    fn get_entity(&self, id: &str) -> Option<Entity> {
        self.get(id).map(Record::into_entity)
    }

    fn create_entity(&self, payload: Value) -> Result<Entity, StoreError> {
        self.create(payload).map(Record::into_entity)
    }

    fn update_entity(&self, id: &str, patch: &Value) -> Result<Entity, StoreError> {
        self.update(id, patch).map(Record::into_entity)
    }

    fn remove_entity(&self, id: &str) -> Option<Entity> {
        self.remove(id).map(Record::into_entity)
    }

    fn clear(&self) -> usize {
        self.remove_all()
    }

    fn count(&self) -> usize {
        self.len()
    }
}
