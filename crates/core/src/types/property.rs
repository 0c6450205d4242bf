//! Property details submitted with a generation request.
//!
//! The same snapshot is stored alongside generation and listing records, so
//! it is serialized in camelCase to match what clients send.

use serde::{Deserialize, Serialize};

/// Maximum length, in characters, of any free-text property field.
pub const MAX_FIELD_CHARS: usize = 2_000;

/// Maximum number of bedrooms or bathrooms accepted.
pub const MAX_ROOMS: u8 = 50;

/// Errors that can occur when validating [`PropertyDetails`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyDetailsError {
    /// A required text field is empty after trimming.
    #[error("{field} is required")]
    Missing {
        /// Wire name of the field.
        field: &'static str,
    },
    /// A text field exceeds the character cap.
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Wire name of the field.
        field: &'static str,
        /// Maximum allowed characters.
        max: usize,
    },
    /// A room count is out of range.
    #[error("{field} must be between 0 and {max}")]
    OutOfRange {
        /// Wire name of the field.
        field: &'static str,
        /// Maximum allowed value.
        max: u8,
    },
}

/// Structured description of a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDetails {
    /// Kind of property, e.g. "apartment" or "villa".
    pub property_type: String,
    /// Free-text size, e.g. "120 m²".
    pub size: String,
    pub bedrooms: u8,
    pub bathrooms: u8,
    pub location: String,
    /// Optional comma-separated amenities.
    #[serde(default)]
    pub amenities: String,
    #[serde(default)]
    pub unique_selling_points: String,
    /// Desired tone, e.g. "professional" or "luxury".
    pub style: String,
    /// Output language for the description.
    pub language: String,
}

impl PropertyDetails {
    /// Trim every text field and check required fields, caps and ranges.
    ///
    /// # Errors
    ///
    /// Returns the first field that fails validation.
    pub fn normalized(mut self) -> Result<Self, PropertyDetailsError> {
        for (field, value, required) in [
            ("propertyType", &mut self.property_type, true),
            ("size", &mut self.size, true),
            ("location", &mut self.location, true),
            ("amenities", &mut self.amenities, false),
            ("uniqueSellingPoints", &mut self.unique_selling_points, false),
            ("style", &mut self.style, true),
            ("language", &mut self.language, true),
        ] {
            let trimmed = value.trim();
            if required && trimmed.is_empty() {
                return Err(PropertyDetailsError::Missing { field });
            }
            if trimmed.chars().count() > MAX_FIELD_CHARS {
                return Err(PropertyDetailsError::TooLong {
                    field,
                    max: MAX_FIELD_CHARS,
                });
            }
            if trimmed.len() != value.len() {
                *value = trimmed.to_owned();
            }
        }

        for (field, value) in [("bedrooms", self.bedrooms), ("bathrooms", self.bathrooms)] {
            if value > MAX_ROOMS {
                return Err(PropertyDetailsError::OutOfRange {
                    field,
                    max: MAX_ROOMS,
                });
            }
        }

        Ok(self)
    }

    /// Title used when the details are saved as a listing.
    #[must_use]
    pub fn listing_title(&self) -> String {
        format!("{} in {}", self.property_type, self.location)
    }
}
