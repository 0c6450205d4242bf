//! Generation history records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use propscribe_core::{GenerationId, PropertyDetails, UserId};

/// A stored generation: the submitted details and the text produced for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    pub id: GenerationId,
    pub user_id: UserId,
    pub input: PropertyDetails,
    /// Editable by the owner after creation.
    pub output_text: String,
    pub created_at: DateTime<Utc>,
}
