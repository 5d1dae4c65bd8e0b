use serde_json::{Value, json};

use crate::{control::Control, field_group::ResourceForm, validation};

/// Form for a single `core/v1` Container: its name and image. Every other
/// field of the container is kept as is.
#[derive(Clone, Debug, Default)]
pub struct ContainerForm;

impl ContainerForm {
    pub fn new() -> Self {
        Self
    }
}

impl ResourceForm for ContainerForm {
    fn create_form(&self) -> Control {
        Control::group([
            (
                "name",
                Control::leaf("")
                    .with_validator(validation::required())
                    .with_validator(validation::rfc1123_label()),
            ),
            ("image", Control::leaf("")),
        ])
    }

    fn default_form_model(&self) -> Value {
        json!({ "name": "", "image": "" })
    }

    fn resource_merge_strategy(&self) -> bool {
        true
    }
}
