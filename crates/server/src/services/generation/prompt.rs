//! Copywriter prompt for property descriptions.

use std::fmt::Write as _;

use propscribe_core::PropertyDetails;

/// Persona and output rules sent as the system prompt.
pub const SYSTEM_PROMPT: &str = "You are an expert real-estate copywriter. \
Write compelling, accurate property listing descriptions that help agents sell. \
Never invent features that were not provided. \
Return only the description text, with no headings, preamble or markdown.";

/// Interpolate the property details into the user prompt.
#[must_use]
pub fn build_prompt(details: &PropertyDetails) -> String {
    let mut prompt = format!(
        "Write a property description in a {style} tone, in {language}.\n\n\
         Property type: {property_type}\n\
         Size: {size}\n\
         Bedrooms: {bedrooms}\n\
         Bathrooms: {bathrooms}\n\
         Location: {location}\n",
        style = details.style,
        language = details.language,
        property_type = details.property_type,
        size = details.size,
        bedrooms = details.bedrooms,
        bathrooms = details.bathrooms,
        location = details.location,
    );

    if !details.amenities.is_empty() {
        let _ = writeln!(prompt, "Amenities: {}", details.amenities);
    }
    if !details.unique_selling_points.is_empty() {
        let _ = writeln!(
            prompt,
            "Unique selling points: {}",
            details.unique_selling_points
        );
    }

    prompt.push_str(
        "\nKeep it to two or three short paragraphs and end with a gentle call to action.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> PropertyDetails {
        PropertyDetails {
            property_type: "Apartment".to_string(),
            size: "85 m²".to_string(),
            bedrooms: 2,
            bathrooms: 1,
            location: "Lisbon".to_string(),
            amenities: String::new(),
            unique_selling_points: "River view".to_string(),
            style: "luxury".to_string(),
            language: "Portuguese".to_string(),
        }
    }

    #[test]
    fn test_prompt_includes_every_given_field() {
        let prompt = build_prompt(&details());
        for needle in [
            "luxury tone",
            "in Portuguese",
            "Property type: Apartment",
            "Size: 85 m²",
            "Bedrooms: 2",
            "Bathrooms: 1",
            "Location: Lisbon",
            "Unique selling points: River view",
        ] {
            assert!(prompt.contains(needle), "missing {needle:?} in {prompt}");
        }
    }

    #[test]
    fn test_prompt_skips_empty_optional_fields() {
        assert!(!build_prompt(&details()).contains("Amenities:"));
    }
}
