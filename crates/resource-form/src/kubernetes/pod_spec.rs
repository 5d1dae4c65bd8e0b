use serde_json::{Value, json};

use super::ContainerForm;
use crate::{
    control::Control,
    field_group::{FieldGroup, ResourceForm},
    path::{Path, Segment},
    validation,
};

/// Form for a `core/v1` PodSpec. Each container is edited by a nested
/// [`ContainerForm`] field group.
///
/// A pod spec always keeps at least one container: inbound specs without a
/// `containers` field get an empty one.
#[derive(Clone, Debug, Default)]
pub struct PodSpecForm;

impl PodSpecForm {
    pub fn new() -> Self {
        Self
    }

    /// A container slot bound to a nested container form, named after the last
    /// index of `path`.
    fn container(path: &Path) -> Control {
        let name = match path.last() {
            Some(Segment::Index(index)) => format!("container-{index}"),
            _ => String::new(),
        };

        let mut control = Control::bound(FieldGroup::new(ContainerForm::new()));
        control.set_value(json!({ "name": name, "image": "" }));
        control
    }
}

impl ResourceForm for PodSpecForm {
    fn create_form(&self) -> Control {
        Control::group([(
            "containers",
            Control::array([]).with_validator(validation::unique_by(
                "duplicateContainerName",
                |container| container.get("name"),
            )),
        )])
    }

    fn default_form_model(&self) -> Value {
        json!({
            "containers": [{ "name": "", "image": "" }],
            "volumes": [],
        })
    }

    fn resource_merge_strategy(&self) -> bool {
        true
    }

    fn adapt_resource_model(&self, resource: Value) -> Value {
        match resource {
            Value::Object(mut spec) if !spec.contains_key("containers") => {
                spec.insert("containers".to_owned(), json!([{ "name": "", "image": "" }]));
                Value::Object(spec)
            }
            resource => resource,
        }
    }

    fn on_form_array_resize(&self, path: &Path) -> Control {
        Self::container(path)
    }
}

impl FieldGroup<PodSpecForm> {
    /// Number of containers in the form.
    pub fn container_count(&self) -> usize {
        self.form()
            .and_then(|form| form.get(&crate::path!("containers")))
            .and_then(Control::as_array)
            .map_or(0, Vec::len)
    }

    /// Appends a container named `container-<index>` and returns its index.
    pub fn add_container(&mut self) -> usize {
        let index = self.container_count();
        let container = Self::new_container(index);

        self.update(|form| {
            if let Some(containers) = form
                .get_mut(&crate::path!("containers"))
                .and_then(Control::as_array_mut)
            {
                containers.push(container);
            }
        });
        index
    }

    /// Removes the container at `index`. Returns `false` if there is none.
    pub fn remove_container(&mut self, index: usize) -> bool {
        self.update(|form| {
            form.get_mut(&crate::path!("containers"))
                .and_then(Control::as_array_mut)
                .filter(|containers| index < containers.len())
                .map(|containers| containers.remove(index))
                .is_some()
        })
    }

    /// Runs `edit` against the container form at `index`.
    pub fn edit_container<R>(
        &mut self,
        index: usize,
        edit: impl FnOnce(&mut FieldGroup<ContainerForm>) -> R,
    ) -> Option<R> {
        self.edit_nested(&crate::path!("containers", index), edit)
    }

    fn new_container(index: usize) -> Control {
        PodSpecForm::container(&Path::from(vec![Segment::Index(index)]))
    }
}
