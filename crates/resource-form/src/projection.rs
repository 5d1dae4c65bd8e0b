//! The two tree walks which keep a control tree and a resource value in sync,
//! plus the aggregation of validation errors over a whole tree.
//!
//! Both walks are driven by the shape of the control tree. The resource may
//! have any shape: lookups that do not resolve are treated as absent values,
//! never as errors.
use serde_json::Value;

use crate::{
    control::{Control, ControlKind},
    path::{self, Path},
    validation::ValidationErrors,
};

/// What [`set_form_by_resource`] changed in the control tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormUpdate {
    /// Leaves whose value differs from the value they held before.
    pub changed_leaves: Vec<Path>,

    /// Arrays which gained or lost children.
    pub resized_arrays: Vec<Path>,
}

impl FormUpdate {
    pub fn is_empty(&self) -> bool {
        self.changed_leaves.is_empty() && self.resized_arrays.is_empty()
    }
}

/// Projects `resource` onto the control tree `form`.
///
/// Every leaf whose path exists in the resource takes the value found there.
/// Leaves without a counterpart keep their value, so form-only data survives.
/// Arrays are resized to the length of the array at the same path (zero if
/// there is none): missing children are created by `on_resize`, which receives
/// the path of the array, surplus children are removed from the end.
///
/// The new values are staged and written in a single pass at the end, and only
/// if anything differs. A root leaf takes the whole resource.
pub fn set_form_by_resource(
    form: &mut Control,
    resource: &Value,
    mut on_resize: impl FnMut(&Path) -> Control,
) -> FormUpdate {
    let mut update = FormUpdate::default();

    if form.is_leaf() {
        if form.value() != *resource {
            form.set_value(resource.clone());
            update.changed_leaves.push(Path::root());
        }
        return update;
    }

    let mut patch = form.raw_value();
    stage(
        form,
        resource,
        &mut Path::root(),
        &mut patch,
        &mut on_resize,
        &mut update,
    );

    if patch != form.raw_value() {
        form.set_value(patch);
    }

    tracing::debug!(
        changed_leaves = update.changed_leaves.len(),
        resized_arrays = update.resized_arrays.len(),
        "projected resource onto form"
    );
    update
}

fn stage(
    control: &mut Control,
    resource: &Value,
    path: &mut Path,
    patch: &mut Value,
    on_resize: &mut impl FnMut(&Path) -> Control,
    update: &mut FormUpdate,
) {
    if control.is_leaf() {
        if let Some(staged) = path::get(resource, path) {
            if control.value() != *staged {
                tracing::trace!(%path, "staging leaf value");
                update.changed_leaves.push(path.clone());
            }
            path::set(patch, path, staged.clone());
        }
        return;
    }

    match control.kind_mut() {
        ControlKind::Group(children) => {
            for (key, child) in children.iter_mut() {
                path.push(key.as_str());
                stage(child, resource, path, patch, on_resize, update);
                path.pop();
            }
        }
        ControlKind::Array(children) => {
            let desired = path::get(resource, path)
                .and_then(Value::as_array)
                .map_or(0, Vec::len);

            if children.len() != desired {
                tracing::trace!(%path, from = children.len(), to = desired, "resizing array");
                update.resized_arrays.push(path.clone());
                while children.len() < desired {
                    children.push(on_resize(path));
                }
                children.truncate(desired);
            }

            for (index, child) in children.iter_mut().enumerate() {
                path.push(index);
                stage(child, resource, path, patch, on_resize, update);
                path.pop();
            }
        }
        ControlKind::Leaf(_) => {}
    }
}

/// Builds a new resource from `base` and the values of the control tree.
///
/// Each leaf writes its value at its path, with surrounding whitespace trimmed
/// from strings. Leaves which the form does not define, because they or one of
/// their ancestors are excluded by a disabled flag, are removed from the
/// output instead. Arrays in the output which are longer than the matching
/// control array are truncated. A root leaf returns `base` unchanged.
///
/// Values of `base` without a control are carried over untouched.
pub fn set_resource_by_form(form: &Control, base: &Value) -> Value {
    let mut output = base.clone();

    if !form.is_leaf() {
        let form_value = form.value();
        write_back(form, &form_value, &mut Path::root(), &mut output);
    }

    output
}

fn write_back(control: &Control, form_value: &Value, path: &mut Path, output: &mut Value) {
    match control.kind() {
        ControlKind::Group(children) => {
            for (key, child) in children {
                path.push(key.as_str());
                write_back(child, form_value, path, output);
                path.pop();
            }
        }
        ControlKind::Array(children) => {
            if let Some(items) = path::get_mut(output, path).and_then(Value::as_array_mut) {
                items.truncate(children.len());
            }

            for (index, child) in children.iter().enumerate() {
                path.push(index);
                write_back(child, form_value, path, output);
                path.pop();
            }
        }
        ControlKind::Leaf(_) => match path::get(form_value, path) {
            Some(value) => path::set(output, path, trimmed(value)),
            None => {
                path::unset(output, path);
            }
        },
    }
}

fn trimmed(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_owned()),
        other => other.clone(),
    }
}

/// Collects the error payloads of a whole subtree.
///
/// The result holds the node's own errors, plus one entry per child with
/// errors, keyed by the child's name or by its index rendered as a string.
/// Returns [`None`] when no node in the subtree reports errors.
pub fn control_errors(control: &Control) -> Option<ValidationErrors> {
    let nested: Vec<(String, ValidationErrors)> = match control.kind() {
        ControlKind::Leaf(_) => Vec::new(),
        ControlKind::Group(children) => children
            .iter()
            .filter_map(|(key, child)| Some((key.clone(), control_errors(child)?)))
            .collect(),
        ControlKind::Array(children) => children
            .iter()
            .enumerate()
            .filter_map(|(index, child)| Some((index.to_string(), control_errors(child)?)))
            .collect(),
    };

    let mut errors = control.errors();
    for (key, child_errors) in nested {
        errors
            .get_or_insert_with(ValidationErrors::new)
            .insert(key, Value::Object(child_errors));
    }
    errors
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;

    use super::*;
    use crate::{path, validation};

    fn container_form() -> Control {
        Control::group([
            (
                "metadata",
                Control::group([
                    ("name", Control::leaf("")),
                    ("namespace", Control::leaf("")),
                ]),
            ),
            (
                "spec",
                Control::group([
                    ("replicas", Control::leaf(1)),
                    ("containers", Control::array([])),
                ]),
            ),
            ("formOnly", Control::leaf("kept")),
        ])
    }

    fn container_item(_: &Path) -> Control {
        Control::group([("name", Control::leaf("")), ("image", Control::leaf(""))])
    }

    fn resource() -> Value {
        json!({
            "apiVersion": "apps/v1",
            "metadata": { "name": "web", "namespace": "default", "uid": "1234" },
            "spec": {
                "replicas": 3,
                "containers": [
                    { "name": "nginx", "image": "nginx:1.27", "ports": [80] },
                    { "name": "sidecar", "image": "busybox" },
                ],
            },
        })
    }

    #[test]
    fn forward_projection_preserves_form_only_fields() {
        let mut form = container_form();
        let update = set_form_by_resource(&mut form, &resource(), container_item);

        assert_eq!(
            form.value(),
            json!({
                "metadata": { "name": "web", "namespace": "default" },
                "spec": {
                    "replicas": 3,
                    "containers": [
                        { "name": "nginx", "image": "nginx:1.27" },
                        { "name": "sidecar", "image": "busybox" },
                    ],
                },
                "formOnly": "kept",
            })
        );
        assert_eq!(update.resized_arrays, vec![path!("spec", "containers")]);
        assert!(update.changed_leaves.contains(&path!("spec", "containers", 1, "image")));
        assert!(!update.changed_leaves.contains(&path!("formOnly")));
    }

    #[test]
    fn forward_projection_is_idempotent() {
        let mut form = container_form();
        set_form_by_resource(&mut form, &resource(), container_item);
        let first = form.value();

        let update = set_form_by_resource(&mut form, &resource(), container_item);
        assert!(update.is_empty(), "{update:?}");
        assert_eq!(form.value(), first);
    }

    #[test]
    fn resize_factory_receives_array_path() {
        let calls = RefCell::new(Vec::new());
        let mut form = container_form();
        form.get_mut(&path!("spec", "containers"))
            .unwrap()
            .as_array_mut()
            .unwrap()
            .push(container_item(&Path::root()));

        let resource = json!({ "spec": { "containers": [{}, {}, {}, {}] } });
        set_form_by_resource(&mut form, &resource, |path: &Path| {
            calls.borrow_mut().push(path.clone());
            container_item(path)
        });

        assert_eq!(calls.borrow().len(), 3);
        assert!(calls.borrow().iter().all(|path| *path == path!("spec", "containers")));
        assert_eq!(
            form.get(&path!("spec", "containers")).unwrap().as_array().unwrap().len(),
            4
        );
    }

    #[test]
    fn absent_and_mismatching_arrays_shrink_to_zero() {
        let mut form = container_form();
        set_form_by_resource(&mut form, &resource(), container_item);

        let update = set_form_by_resource(
            &mut form,
            &json!({ "spec": { "containers": "not an array" } }),
            container_item,
        );
        assert_eq!(update.resized_arrays, vec![path!("spec", "containers")]);
        assert_eq!(form.value()["spec"]["containers"], json!([]));
        // Leaves without a counterpart keep their value
        assert_eq!(form.value()["metadata"]["name"], json!("web"));
    }

    #[test]
    fn root_leaf_takes_whole_resource() {
        let mut form = Control::leaf(Value::Null);
        let update = set_form_by_resource(&mut form, &resource(), |_: &Path| Control::leaf(Value::Null));

        assert_eq!(update.changed_leaves, vec![Path::root()]);
        assert_eq!(form.value(), resource());
        assert_eq!(set_resource_by_form(&form, &json!({ "a": 1 })), json!({ "a": 1 }));
    }

    #[test]
    fn backward_projection_keeps_unknown_fields() {
        let mut form = container_form();
        set_form_by_resource(&mut form, &resource(), container_item);
        form.get_mut(&path!("spec", "containers", 0, "image"))
            .unwrap()
            .set_value(json!("  nginx:1.28 "));

        let output = set_resource_by_form(&form, &resource());
        assert_eq!(output["apiVersion"], json!("apps/v1"));
        assert_eq!(output["metadata"]["uid"], json!("1234"));
        assert_eq!(output["spec"]["containers"][0]["image"], json!("nginx:1.28"));
        assert_eq!(output["spec"]["containers"][0]["ports"], json!([80]));
        assert_eq!(output["formOnly"], json!("kept"));
    }

    #[test]
    fn backward_projection_without_merge_base_drops_unknown_fields() {
        let mut form = container_form();
        set_form_by_resource(&mut form, &resource(), container_item);

        let output = set_resource_by_form(&form, &json!({}));
        assert_eq!(output, form.value());
        assert!(!path::has(&output, &path!("metadata", "uid")));
    }

    #[test]
    fn backward_projection_truncates_arrays() {
        let mut form = container_form();
        set_form_by_resource(&mut form, &resource(), container_item);
        form.get_mut(&path!("spec", "containers"))
            .unwrap()
            .as_array_mut()
            .unwrap()
            .truncate(1);

        let output = set_resource_by_form(&form, &resource());
        assert_eq!(
            output["spec"]["containers"],
            json!([{ "name": "nginx", "image": "nginx:1.27", "ports": [80] }])
        );
    }

    #[test]
    fn backward_projection_unsets_disabled_leaves() {
        let mut form = container_form();
        set_form_by_resource(&mut form, &resource(), container_item);
        form.get_mut(&path!("spec", "replicas")).unwrap().set_disabled(true);
        form.get_mut(&path!("metadata")).unwrap().set_disabled(true);

        let output = set_resource_by_form(&form, &resource());
        assert!(!path::has(&output, &path!("spec", "replicas")));
        assert!(!path::has(&output, &path!("metadata", "name")));
        assert_eq!(output["metadata"], json!({ "uid": "1234" }));
    }

    #[test]
    fn round_trip_preserves_resource_with_merge() {
        let mut form = container_form();
        set_form_by_resource(&mut form, &resource(), container_item);

        let mut expected = resource();
        expected["formOnly"] = json!("kept");
        assert_eq!(set_resource_by_form(&form, &resource()), expected);
    }

    #[test]
    fn errors_are_keyed_by_path() {
        let mut form = Control::group([
            ("name", Control::leaf("").with_validator(validation::required())),
            (
                "containers",
                Control::array([
                    Control::group([("name", Control::leaf("ok"))]),
                    Control::group([(
                        "name",
                        Control::leaf("").with_validator(validation::required()),
                    )]),
                ])
                .with_validator(validation::min_length(3)),
            ),
        ]);

        assert_eq!(
            control_errors(&form),
            Some(
                json!({
                    "name": { "required": true },
                    "containers": {
                        "minlength": { "requiredLength": 3, "actualLength": 2 },
                        "1": { "name": { "required": true } },
                    },
                })
                .as_object()
                .unwrap()
                .clone()
            )
        );

        form.get_mut(&path!("name")).unwrap().set_value(json!("web"));
        form.get_mut(&path!("containers", 1, "name")).unwrap().set_value(json!("db"));
        form.get_mut(&path!("containers")).unwrap().as_array_mut().unwrap().push(Control::group([("name", Control::leaf("x"))]));
        assert_eq!(control_errors(&form), None);
    }
}
