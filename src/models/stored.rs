use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ObjectDescription;

/// A saved object in the local asset library.
///
/// The embedded description is an independent copy taken at save time, so later
/// changes to whatever scene is on screen never reach the saved record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub id: Uuid,
    pub name: String,
    /// Creation time, persisted as milliseconds since the Unix epoch.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub params: ObjectDescription,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl StoredObject {
    /// Wrap a copy of `description` with a fresh id and the current time.
    pub fn new(description: &ObjectDescription) -> Self {
        let now = Utc::now();
        // Truncate to the persisted precision so a save/load round trip is exact.
        let timestamp = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);
        Self {
            id: Uuid::new_v4(),
            name: description.name.clone(),
            timestamp,
            params: description.clone(),
            thumbnail: None,
        }
    }
}
