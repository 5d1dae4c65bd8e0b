use k8s_openapi::{Resource, api::apps::v1::Deployment};
use serde_json::{Value, json};

use super::PodSpecForm;
use crate::{
    control::Control,
    field_group::{FieldGroup, ResourceForm},
    forms::KeyValueForm,
    path::Path,
    validation,
};

/// Form for an `apps/v1` Deployment.
///
/// Labels, annotations and the selector are edited by nested
/// [`KeyValueForm`]s, the pod template spec by a nested [`PodSpecForm`].
/// Fields without a control, such as `status` or `spec.strategy`, are kept.
#[derive(Clone, Debug, Default)]
pub struct DeploymentForm;

impl DeploymentForm {
    pub fn new() -> Self {
        Self
    }

    fn key_values() -> Control {
        let mut control = Control::bound(FieldGroup::new(KeyValueForm::new()));
        control.set_value(json!({}));
        control
    }

    fn pod_spec() -> Control {
        let mut control = Control::bound(FieldGroup::new(PodSpecForm::new()));
        control.set_value(json!({}));
        control
    }
}

impl ResourceForm for DeploymentForm {
    fn create_form(&self) -> Control {
        let metadata = Control::group([
            (
                "name",
                Control::leaf("")
                    .with_validator(validation::required())
                    .with_validator(validation::rfc1123_label()),
            ),
            (
                "namespace",
                Control::leaf("").with_validator(validation::required()),
            ),
            ("labels", Self::key_values()),
            ("annotations", Self::key_values()),
        ]);

        let spec = Control::group([
            (
                "selector",
                Control::group([("matchLabels", Self::key_values())]),
            ),
            (
                "replicas",
                Control::leaf(1).with_validator(validation::min(0.0)),
            ),
            (
                "template",
                Control::group([
                    ("spec", Self::pod_spec()),
                    (
                        "metadata",
                        Control::group([("labels", Self::key_values())]),
                    ),
                ]),
            ),
            ("revisionHistoryLimit", Control::leaf(Value::Null)),
        ]);

        Control::group([("metadata", metadata), ("spec", spec)])
    }

    fn default_form_model(&self) -> Value {
        json!({
            "apiVersion": Deployment::API_VERSION,
            "kind": Deployment::KIND,
        })
    }

    fn resource_merge_strategy(&self) -> bool {
        true
    }

    /// Fills in the type meta when the outward value lacks it.
    fn adapt_form_model(&self, form_model: Value) -> Value {
        match (form_model, self.default_form_model()) {
            (Value::Object(mut deployment), Value::Object(type_meta)) => {
                for (key, value) in type_meta {
                    deployment.entry(key).or_insert(value);
                }
                Value::Object(deployment)
            }
            (form_model, _) => form_model,
        }
    }
}

impl FieldGroup<DeploymentForm> {
    /// Runs `edit` against the key-value form at `path`, for example
    /// `metadata.labels` or `spec.selector.matchLabels`.
    pub fn edit_key_values<R>(
        &mut self,
        path: &Path,
        edit: impl FnOnce(&mut FieldGroup<KeyValueForm>) -> R,
    ) -> Option<R> {
        self.edit_nested(path, edit)
    }

    /// Runs `edit` against the pod template spec form.
    pub fn edit_pod_spec<R>(
        &mut self,
        edit: impl FnOnce(&mut FieldGroup<PodSpecForm>) -> R,
    ) -> Option<R> {
        self.edit_nested(&crate::path!("spec", "template", "spec"), edit)
    }
}
