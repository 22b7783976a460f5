//! Structural checks on an assembled save document.

use std::collections::HashSet;

use serde_json::Value;

use crate::errors::{Result, TtsError};
use crate::model::{GAME_MODE, GUID, NAME, NICKNAME, OBJECT_STATES, SAVE_NAME, TRANSFORM};

/// Errors and warnings found by [`validate_document`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Logs the warnings, then turns any errors into [`TtsError::Validation`].
    pub fn into_result(self) -> Result<()> {
        for warning in &self.warnings {
            tracing::warn!("{}", warning);
        }
        if self.errors.is_empty() {
            tracing::info!("Validation passed");
            Ok(())
        } else {
            Err(TtsError::Validation(self.errors))
        }
    }
}

/// Checks required top-level fields and the top-level objects.
///
/// Missing `GUID`, `Name` or `Transform` and duplicate GUIDs are errors; a
/// missing `Nickname` is a warning.
pub fn validate_document(doc: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    let objects: &[Value] = match doc.get(OBJECT_STATES) {
        Some(Value::Array(items)) if !items.is_empty() => items.as_slice(),
        _ => {
            report
                .errors
                .push("Mod must contain a non-empty ObjectStates array".to_string());
            &[]
        }
    };

    for key in [SAVE_NAME, GAME_MODE] {
        if !matches!(doc.get(key), Some(Value::String(s)) if !s.is_empty()) {
            report.errors.push(format!("{} is missing or invalid", key));
        }
    }

    let mut seen = HashSet::new();
    for (i, obj) in objects.iter().enumerate() {
        let at = format!("ObjectStates[{}]", i);

        for key in [GUID, NAME, TRANSFORM] {
            if !is_truthy(obj.get(key)) {
                report.errors.push(format!("{} is missing {}", at, key));
            }
        }

        if !is_truthy(obj.get(NICKNAME)) {
            report.warnings.push(format!(
                "{} is missing Nickname: GUID {}, Name {} {}",
                at,
                display_or_na(obj.get(GUID)),
                display_or_na(obj.get(NAME)),
                position(obj.get(TRANSFORM))
            ));
        }

        if let Some(guid) = obj.get(GUID).filter(|v| is_truthy(Some(v))) {
            let key = display_or_na(Some(guid));
            if !seen.insert(key.clone()) {
                report.errors.push(format!("{} has duplicate GUID {}", at, key));
            }
        }
    }

    report
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(_) => true,
    }
}

fn display_or_na(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(v) if is_truthy(Some(v)) => v.to_string(),
        _ => "N/A".to_string(),
    }
}

fn position(transform: Option<&Value>) -> String {
    let Some(t) = transform.filter(|t| t.get("posX").is_some()) else {
        return "(position unknown)".to_string();
    };
    let coord = |k: &str| t.get(k).map_or_else(|| "?".to_string(), Value::to_string);
    format!("at ({}, {}, {})", coord("posX"), coord("posY"), coord("posZ"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::object_json;
    use serde_json::json;

    fn doc(objects: Vec<Value>) -> Value {
        json!({
            "SaveName": "Mod",
            "GameMode": "Mod",
            "ObjectStates": objects,
        })
    }

    #[test]
    fn test_valid_document() {
        let report = validate_document(&doc(vec![object_json("a", "Card", "A")]));
        assert!(report.is_ok());
        assert!(report.warnings.is_empty());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_duplicate_guid_is_fatal() {
        let report = validate_document(&doc(vec![
            object_json("a", "Card", "A"),
            object_json("a", "Card", "B"),
        ]));
        assert_eq!(report.errors, vec!["ObjectStates[1] has duplicate GUID a"]);
        assert!(matches!(report.into_result(), Err(TtsError::Validation(_))));
    }

    #[test]
    fn test_missing_fields() {
        let report = validate_document(&json!({
            "ObjectStates": [{"Nickname": "x", "Transform": null}]
        }));
        assert_eq!(
            report.errors,
            vec![
                "SaveName is missing or invalid",
                "GameMode is missing or invalid",
                "ObjectStates[0] is missing GUID",
                "ObjectStates[0] is missing Name",
                "ObjectStates[0] is missing Transform",
            ]
        );
    }

    #[test]
    fn test_empty_objects() {
        let report = validate_document(&doc(vec![]));
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("non-empty ObjectStates"));
    }

    #[test]
    fn test_missing_nickname_is_a_warning() {
        let mut obj = object_json("g1", "Die", "");
        obj.as_object_mut().unwrap().shift_remove("Nickname");
        let report = validate_document(&doc(vec![obj]));

        assert!(report.is_ok());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("GUID g1, Name Die at (0.0, 1.0, 0.0)"));
    }
}
