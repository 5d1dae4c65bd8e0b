use serde_json::{Map, Value, json};

use crate::{
    control::Control,
    field_group::{ArrayResourceForm, ResourceForm},
    path::Path,
    validation::{self, is_empty_input},
};

/// Edits a string mapping, such as labels or annotations, as a list of
/// `[key, value]` rows.
///
/// An empty or absent mapping shows a single empty row. Rows without a key are
/// dropped from the outward mapping. The row list reports `duplicateKey` when
/// two rows share a key, and every row reports `keyIsMissing` when only its
/// value is filled in.
#[derive(Clone, Debug, Default)]
pub struct KeyValueForm;

impl KeyValueForm {
    pub fn new() -> Self {
        Self
    }

    fn row(key: Value, value: Value) -> Control {
        Control::array([Control::leaf(key), Control::leaf(value)])
            .with_validator(validation::key_is_missing())
    }
}

impl ResourceForm for KeyValueForm {
    fn create_form(&self) -> Control {
        Control::array([]).with_validator(validation::duplicate_key())
    }

    fn default_form_model(&self) -> Value {
        json!([["", ""]])
    }

    fn resource_merge_strategy(&self) -> bool {
        false
    }

    fn adapt_resource_model(&self, resource: Value) -> Value {
        let rows: Vec<Value> = match resource {
            Value::Object(mapping) => mapping
                .into_iter()
                .map(|(key, value)| json!([key, value]))
                .collect(),
            _ => Vec::new(),
        };

        if rows.is_empty() {
            self.default_form_model()
        } else {
            Value::Array(rows)
        }
    }

    fn adapt_form_model(&self, form_model: Value) -> Value {
        let Value::Array(rows) = form_model else {
            return Value::Object(Map::new());
        };

        let mapping = rows
            .into_iter()
            .filter_map(|row| {
                let Value::Array(mut pair) = row else {
                    return None;
                };
                let value = pair.get_mut(1).map(Value::take).unwrap_or_default();
                match pair.into_iter().next()? {
                    Value::String(key) if !key.is_empty() => Some((key, value)),
                    key if !is_empty_input(&key) => Some((key.to_string(), value)),
                    _ => None,
                }
            })
            .collect();

        Value::Object(mapping)
    }

    fn on_form_array_resize(&self, _path: &Path) -> Control {
        Self::row(Value::from(""), Value::from(""))
    }
}

impl ArrayResourceForm for KeyValueForm {}
