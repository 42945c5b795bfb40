//! Tool parameter classification.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

use crate::tool::ParamDescriptor;

/// Kind of input a tool parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BindingKind {
    /// A document supplied to the extraction.
    DocumentInput,
    /// A knowledge document consulted during extraction.
    KnowledgeReference,
    /// An ordered list of earlier values or fields.
    FieldReferenceList,
    /// A true/false switch.
    BooleanFlag,
    /// Multi-line instructions.
    MultilinePrompt,
    /// A single line of text.
    FreeText,
}

impl BindingKind {
    /// Maps an explicit parameter type tag to a kind.
    ///
    /// Tags match whole and ignore ASCII case; anything else is `None`.
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_ascii_lowercase();
        let kind = match tag.as_str() {
            "document" => Self::DocumentInput,
            "knowledge" => Self::KnowledgeReference,
            "data" => Self::FieldReferenceList,
            "boolean" => Self::BooleanFlag,
            "textarea" | "prompt" => Self::MultilinePrompt,
            "text" => Self::FreeText,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns true if bindings of this kind hold reference addresses.
    pub fn holds_references(self) -> bool {
        matches!(self, Self::FieldReferenceList)
    }
}

/// Decides which kind of binding a tool parameter takes.
///
/// An explicit type tag wins. Otherwise the parameter name is matched
/// against keyword groups in a fixed order, falling back to free text.
pub fn classify(param: &ParamDescriptor) -> BindingKind {
    if let Some(kind) = param
        .type_tag
        .as_deref()
        .and_then(BindingKind::from_type_tag)
    {
        return kind;
    }

    let name = param.name.to_lowercase();
    let has_any = |needles: &[&str]| needles.iter().any(|needle| name.contains(needle));

    if has_any(&["document", "file"]) && !has_any(&["reference", "knowledge"]) {
        BindingKind::DocumentInput
    } else if has_any(&["knowledge", "reference document"]) {
        BindingKind::KnowledgeReference
    } else if has_any(&["instruction", "prompt"]) {
        BindingKind::MultilinePrompt
    } else if has_any(&["boolean", "bool"]) {
        BindingKind::BooleanFlag
    } else if has_any(&["data", "info", "reference", "input data"]) {
        BindingKind::FieldReferenceList
    } else {
        BindingKind::FreeText
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, type_tag: Option<&str>) -> ParamDescriptor {
        ParamDescriptor {
            id: name.to_owned(),
            name: name.to_owned(),
            type_tag: type_tag.map(str::to_owned),
            description: String::new(),
        }
    }

    #[test]
    fn test_type_tag_wins_over_name() {
        assert_eq!(
            classify(&param("Source document", Some("boolean"))),
            BindingKind::BooleanFlag
        );
        assert_eq!(
            classify(&param("anything", Some("TextArea"))),
            BindingKind::MultilinePrompt
        );
    }

    #[test]
    fn test_unknown_tag_falls_back_to_name() {
        assert_eq!(
            classify(&param("Input file", Some("blob"))),
            BindingKind::DocumentInput
        );
    }

    #[test]
    fn test_tag_is_matched_whole() {
        assert_eq!(BindingKind::from_type_tag("documents"), None);
        assert_eq!(
            BindingKind::from_type_tag(" Data "),
            Some(BindingKind::FieldReferenceList)
        );
    }

    #[test]
    fn test_name_heuristics() {
        let cases = [
            ("Document", BindingKind::DocumentInput),
            ("Upload File", BindingKind::DocumentInput),
            ("Reference Document", BindingKind::KnowledgeReference),
            ("Knowledge file", BindingKind::KnowledgeReference),
            ("System Instructions", BindingKind::MultilinePrompt),
            ("prompt", BindingKind::MultilinePrompt),
            ("Use bool", BindingKind::BooleanFlag),
            ("Input Data", BindingKind::FieldReferenceList),
            ("Customer info", BindingKind::FieldReferenceList),
            ("Reference", BindingKind::FieldReferenceList),
            ("Language", BindingKind::FreeText),
        ];
        for (name, expected) in cases {
            assert_eq!(classify(&param(name, None)), expected, "{name}");
        }
    }

    #[test]
    fn test_classify_is_pure() {
        let params = [
            param("Reference Document", None),
            param("Input Data", None),
            param("Language", Some("text")),
        ];
        let first: Vec<_> = params.iter().map(classify).collect();
        let reversed: Vec<_> = params.iter().rev().map(classify).collect();
        assert_eq!(first, reversed.into_iter().rev().collect::<Vec<_>>());
        assert_eq!(first, params.iter().map(classify).collect::<Vec<_>>());
    }
}
