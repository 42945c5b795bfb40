//! Flat validation records produced by an extraction run.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as Json;
use strum::{AsRefStr, Display, EnumString};

/// Review state of a validation record.
///
/// Statuses parse case-insensitively; anything unrecognized becomes
/// [`ValidationStatus::Unknown`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ValidationStatus {
    /// Passed automatic validation.
    Valid,
    /// Failed automatic validation.
    Invalid,
    /// Not validated yet.
    #[default]
    Pending,
    /// Confirmed by a reviewer.
    Verified,
    /// Rejected or unconfirmed by a reviewer.
    Unverified,
    /// Entered by hand.
    Manual,
    /// Unrecognized status.
    Unknown,
}

impl From<String> for ValidationStatus {
    fn from(value: String) -> Self {
        value.trim().parse().unwrap_or(Self::Unknown)
    }
}

/// Which value of a record a cell was taken from, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ValueSource {
    /// Raw source text.
    Raw,
    /// Value as extracted.
    Extracted,
    /// Value after normalization.
    Normalized,
    /// Value after validation.
    Validated,
}

/// One extracted value for one column of one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ValidationRecord {
    /// Identifier of the record this value belongs to.
    #[serde(
        default,
        alias = "identifier_id",
        deserialize_with = "deserialize_identifier",
        skip_serializing_if = "Option::is_none"
    )]
    pub identifier_id: Option<String>,
    /// Column the value belongs to.
    #[serde(alias = "column_key", alias = "fieldName", alias = "field_name")]
    pub column_key: String,
    /// Value as extracted.
    #[serde(default, alias = "extracted_value", skip_serializing_if = "Option::is_none")]
    pub extracted_value: Option<Json>,
    /// Value after validation.
    #[serde(default, alias = "validated_value", skip_serializing_if = "Option::is_none")]
    pub validated_value: Option<Json>,
    /// Value after normalization.
    #[serde(default, alias = "normalized_value", skip_serializing_if = "Option::is_none")]
    pub normalized_value: Option<Json>,
    /// Raw source text.
    #[serde(default, alias = "raw_value", skip_serializing_if = "Option::is_none")]
    pub raw_value: Option<Json>,
    /// Review state.
    #[serde(default, alias = "validation_status", alias = "validationStatus")]
    pub status: ValidationStatus,
    /// Confidence in percent.
    #[serde(
        default,
        alias = "confidence_score",
        deserialize_with = "deserialize_confidence",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence_score: Option<u8>,
}

impl ValidationRecord {
    /// Creates a record with no values.
    pub fn new(identifier_id: impl Into<String>, column_key: impl Into<String>) -> Self {
        Self {
            identifier_id: Some(identifier_id.into()),
            column_key: column_key.into(),
            ..Self::default()
        }
    }

    /// Returns the value shown for this record: validated, then normalized,
    /// then extracted, then raw, skipping nulls.
    pub fn display_value(&self) -> Option<&Json> {
        self.resolved_value().map(|(_, value)| value)
    }

    /// Returns the display value together with the slot it came from.
    pub fn resolved_value(&self) -> Option<(ValueSource, &Json)> {
        [
            (ValueSource::Validated, &self.validated_value),
            (ValueSource::Normalized, &self.normalized_value),
            (ValueSource::Extracted, &self.extracted_value),
            (ValueSource::Raw, &self.raw_value),
        ]
        .into_iter()
        .find_map(|(source, value)| {
            value
                .as_ref()
                .filter(|value| !value.is_null())
                .map(|value| (source, value))
        })
    }
}

/// Returns true for null, empty and whitespace-only strings.
pub fn is_empty_value(value: &Json) -> bool {
    match value {
        Json::Null => true,
        Json::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn deserialize_identifier<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let identifier = match Option::<Json>::deserialize(deserializer)? {
        Some(Json::String(text)) if !text.trim().is_empty() => Some(text),
        Some(Json::Number(number)) => Some(number.to_string()),
        _ => None,
    };
    Ok(identifier)
}

/// Accepts ratios in `0.0..=1.0` and percentages above that.
fn deserialize_confidence<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let score = Option::<f64>::deserialize(deserializer)?
        .filter(|score| score.is_finite() && *score >= 0.0)
        .map(|score| {
            let percent = if score <= 1.0 { score * 100.0 } else { score };
            percent.round().min(100.0) as u8
        });
    Ok(score)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_status_is_lenient() {
        let status: ValidationStatus = serde_json::from_value(json!("verified")).unwrap();
        assert_eq!(status, ValidationStatus::Verified);
        let status: ValidationStatus = serde_json::from_value(json!("needs_review")).unwrap();
        assert_eq!(status, ValidationStatus::Unknown);
        assert_eq!(serde_json::to_value(ValidationStatus::Manual).unwrap(), json!("MANUAL"));
    }

    #[test]
    fn test_record_accepts_both_casings() {
        let camel: ValidationRecord = serde_json::from_value(json!({
            "identifierId": "A",
            "columnKey": "Name",
            "extractedValue": "Jon",
            "status": "VALID",
            "confidenceScore": 85
        }))
        .unwrap();
        let snake: ValidationRecord = serde_json::from_value(json!({
            "identifier_id": "A",
            "field_name": "Name",
            "extracted_value": "Jon",
            "validation_status": "valid",
            "confidence_score": 0.85
        }))
        .unwrap();
        assert_eq!(camel, snake);
        assert_eq!(camel.confidence_score, Some(85));
    }

    #[test]
    fn test_numeric_and_blank_identifiers() {
        let numeric: ValidationRecord =
            serde_json::from_value(json!({ "identifierId": 7, "columnKey": "Name" })).unwrap();
        assert_eq!(numeric.identifier_id.as_deref(), Some("7"));

        let blank: ValidationRecord =
            serde_json::from_value(json!({ "identifierId": "  ", "columnKey": "Name" })).unwrap();
        assert_eq!(blank.identifier_id, None);
    }

    #[test]
    fn test_display_value_precedence() {
        let mut record = ValidationRecord::new("A", "Name");
        assert_eq!(record.display_value(), None);

        record.raw_value = Some(json!("jon "));
        record.extracted_value = Some(json!("Jon"));
        record.validated_value = Some(Json::Null);
        assert_eq!(record.display_value(), Some(&json!("Jon")));

        record.normalized_value = Some(json!("JON"));
        assert_eq!(record.display_value(), Some(&json!("JON")));

        record.validated_value = Some(json!("John"));
        assert_eq!(
            record.resolved_value(),
            Some((ValueSource::Validated, &json!("John")))
        );
    }

    #[test]
    fn test_empty_values() {
        assert!(is_empty_value(&Json::Null));
        assert!(is_empty_value(&json!(" \t")));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!(false)));
    }
}
