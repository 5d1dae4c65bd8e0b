use std::fmt::Debug;

use serde_json::Value;

use crate::{control::Control, path::Path};

/// Describes one form fragment: how its control tree is built, what its
/// default model is and how resource values map onto the form model.
///
/// A [`FieldGroup`](super::FieldGroup) drives a definition through its
/// lifecycle. The three required methods are the minimal capabilities, the
/// remaining hooks have identity or neutral defaults.
pub trait ResourceForm: Debug {
    /// Builds the control tree. Called at most once per field group.
    fn create_form(&self) -> Control;

    /// The model which inbound resources are merged over before projection.
    /// Only objects and arrays take part in the merge.
    fn default_form_model(&self) -> Value;

    /// Whether outward values are merged over the last inbound resource, so
    /// fields without a control survive an edit.
    fn resource_merge_strategy(&self) -> bool;

    /// Maps an inbound resource to the form model.
    fn adapt_resource_model(&self, resource: Value) -> Value {
        resource
    }

    /// Maps the form model back to the resource shape.
    fn adapt_form_model(&self, form_model: Value) -> Value {
        form_model
    }

    /// Creates a child when an array inside the form has to grow. `path` is the
    /// path of the array during projection and `[index]` for
    /// [`FieldGroup::add`](super::FieldGroup::add).
    fn on_form_array_resize(&self, _path: &Path) -> Control {
        Control::leaf(Value::Null)
    }

    /// Key of the payload reported to a parent by
    /// [`FieldGroup::validate`](super::FieldGroup::validate).
    fn name(&self) -> &str {
        let type_name = std::any::type_name::<Self>();
        type_name.rsplit("::").next().unwrap_or(type_name)
    }
}

/// Marker for definitions whose control tree is an array. Field groups over
/// them can add and remove items.
pub trait ArrayResourceForm: ResourceForm {}

/// Shallow-assigns `model` over `default`.
///
/// Object keys and array indices of `model` win. A `null` model keeps the
/// default, any other value replaces it. Defaults which are neither objects nor
/// arrays are not merged at all.
pub(crate) fn merge_default(default: Value, model: Value) -> Value {
    match (default, model) {
        (Value::Object(mut default), Value::Object(model)) => {
            default.extend(model);
            Value::Object(default)
        }
        (Value::Array(mut default), Value::Array(model)) => {
            for (index, item) in model.into_iter().enumerate() {
                match default.get_mut(index) {
                    Some(slot) => *slot = item,
                    None => default.push(item),
                }
            }
            Value::Array(default)
        }
        (default @ (Value::Object(_) | Value::Array(_)), Value::Null) => default,
        (_, model) => model,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case(json!({ "a": 1, "b": 2 }), json!({ "b": 3, "c": 4 }), json!({ "a": 1, "b": 3, "c": 4 }))]
    #[case(json!({ "a": { "x": 1 } }), json!({ "a": { "y": 2 } }), json!({ "a": { "y": 2 } }))]
    #[case(json!([1, 2, 3]), json!([9]), json!([9, 2, 3]))]
    #[case(json!([1]), json!([7, 8]), json!([7, 8]))]
    #[case(json!({ "a": 1 }), json!(null), json!({ "a": 1 }))]
    #[case(json!([]), json!(null), json!([]))]
    #[case(json!({ "a": 1 }), json!("text"), json!("text"))]
    #[case(json!({ "a": 1 }), json!([1]), json!([1]))]
    #[case(json!(null), json!({ "a": 1 }), json!({ "a": 1 }))]
    #[case(json!("default"), json!(null), json!(null))]
    fn merge_default_cases(#[case] default: Value, #[case] model: Value, #[case] expected: Value) {
        assert_eq!(merge_default(default, model), expected);
    }

    #[derive(Debug)]
    struct PlainForm;

    impl ResourceForm for PlainForm {
        fn create_form(&self) -> Control {
            Control::group([("a", Control::leaf(Value::Null))])
        }

        fn default_form_model(&self) -> Value {
            Value::Null
        }

        fn resource_merge_strategy(&self) -> bool {
            true
        }
    }

    #[test]
    fn default_hooks() {
        let form = PlainForm;

        assert_eq!(form.name(), "PlainForm");
        assert_eq!(form.adapt_resource_model(json!({ "a": 1 })), json!({ "a": 1 }));
        assert_eq!(form.adapt_form_model(json!([1])), json!([1]));
        assert_eq!(form.on_form_array_resize(&Path::root()).value(), Value::Null);
    }
}
