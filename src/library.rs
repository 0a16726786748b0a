//! The local asset library: an ordered, newest-first list of [`StoredObject`]s.
//!
//! The whole collection is serialized into one key-value slot. There is no
//! incremental update; every mutation rewrites the slot from memory.

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ObjectDescription, StoredObject};
use crate::store::Database;

/// Storage slot holding the serialized collection.
pub const LIBRARY_KEY: &str = "xenoar_spatial_v1";

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Saved library is corrupt: {source}")]
    Corrupt {
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),

    #[error("Failed to serialize library: {0}")]
    Serialize(serde_json::Error),
}

pub struct AssetLibrary {
    db: Database,
    objects: Vec<StoredObject>,
}

impl AssetLibrary {
    /// Read the persisted collection. A missing slot yields an empty library; an
    /// unparseable one is reported as [`LibraryError::Corrupt`].
    pub fn load(db: Database) -> Result<Self, LibraryError> {
        let objects = match db.get_item(LIBRARY_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| LibraryError::Corrupt { source })?,
            None => Vec::new(),
        };
        tracing::debug!(count = objects.len(), "Loaded asset library");
        Ok(Self { db, objects })
    }

    /// Like [`load`](Self::load), but a corrupt slot is moved aside to a backup key
    /// and an empty library is started. Returns the backup key when that happened.
    pub fn recover(db: Database) -> Result<(Self, Option<String>), LibraryError> {
        match Self::load(db.clone()) {
            Ok(library) => Ok((library, None)),
            Err(LibraryError::Corrupt { source }) => {
                let backup_key = format!("{}.corrupt-{}", LIBRARY_KEY, Utc::now().timestamp_millis());
                if let Some(raw) = db.get_item(LIBRARY_KEY)? {
                    db.set_item(&backup_key, &raw)?;
                }
                tracing::warn!(
                    error = %source,
                    backup = %backup_key,
                    "Saved library was corrupt, starting with an empty one"
                );
                let library = Self {
                    db,
                    objects: Vec::new(),
                };
                library.save()?;
                Ok((library, Some(backup_key)))
            }
            Err(e) => Err(e),
        }
    }

    pub fn objects(&self) -> &[StoredObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&StoredObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Serialize and persist the entire collection.
    pub fn save(&self) -> Result<(), LibraryError> {
        let raw = serde_json::to_string(&self.objects).map_err(LibraryError::Serialize)?;
        self.db.set_item(LIBRARY_KEY, &raw)?;
        Ok(())
    }

    /// Prepend a copy of `description` as a new stored object.
    pub fn add(&mut self, description: &ObjectDescription) -> Result<StoredObject, LibraryError> {
        let mut object = StoredObject::new(description);
        while self.get(object.id).is_some() {
            object.id = Uuid::new_v4();
        }
        self.objects.insert(0, object.clone());
        if let Err(e) = self.save() {
            self.objects.remove(0);
            return Err(e);
        }
        tracing::info!(id = %object.id, name = %object.name, "Saved object to library");
        Ok(object)
    }

    /// Delete the object with `id`. Returns `false` (and writes nothing) if absent.
    pub fn remove(&mut self, id: Uuid) -> Result<bool, LibraryError> {
        let Some(index) = self.objects.iter().position(|o| o.id == id) else {
            return Ok(false);
        };
        let removed = self.objects.remove(index);
        if let Err(e) = self.save() {
            self.objects.insert(index, removed);
            return Err(e);
        }
        tracing::info!(id = %id, "Removed object from library");
        Ok(true)
    }
}
