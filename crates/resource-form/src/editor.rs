//! Keeps a YAML text view and a field group in sync.
use serde_json::Value;
use snafu::{ResultExt, Snafu};

use crate::{
    control::{Control, Status},
    field_group::{FieldGroup, ResourceForm},
    path::{self, Path},
    validation::ValidationErrors,
    yaml::{self, SerializeOptions},
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to parse manifest"))]
    ParseManifest { source: yaml::Error },

    #[snafu(display("failed to render manifest"))]
    RenderManifest { source: yaml::Error },
}

/// A manifest edited both as text and through a form.
///
/// Text is loaded with [`ManifestEditor::load`] and written into the root field
/// group. Form edits re-render the text whenever the outward value of the field
/// group changes. Text which fails to parse is kept as the current text, but
/// the last valid resource stays authoritative.
#[derive(Debug)]
pub struct ManifestEditor<F: ResourceForm> {
    field_group: FieldGroup<F>,
    text: String,
    resource: Value,
    options: SerializeOptions,
}

impl<F: ResourceForm> ManifestEditor<F> {
    pub fn new(definition: F) -> Self {
        Self::with_field_group(FieldGroup::new(definition))
    }

    /// Uses a preconfigured field group, e.g. one with a context attached.
    pub fn with_field_group(mut field_group: FieldGroup<F>) -> Self {
        field_group.init();

        Self {
            field_group,
            text: String::new(),
            resource: Value::Null,
            options: SerializeOptions::default(),
        }
    }

    pub fn with_serialize_options(mut self, options: SerializeOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the text and, if it parses, writes the resource into the form.
    pub fn load(&mut self, text: impl Into<String>) -> Result<()> {
        self.text = text.into();

        let resource = match yaml::parse_resource(&self.text) {
            Ok(resource) => resource,
            Err(error) => {
                tracing::warn!(
                    error = &error as &dyn std::error::Error,
                    "failed to parse manifest, keeping previous resource"
                );
                return Err(error).context(ParseManifestSnafu);
            }
        };

        tracing::debug!("loaded manifest");
        self.resource = resource.clone();
        self.field_group.write_value(resource);
        Ok(())
    }

    /// Runs `edit` against the control tree of the root field group.
    pub fn edit<R>(&mut self, edit: impl FnOnce(&mut Control) -> R) -> Result<R> {
        self.edit_field_group(|field_group| field_group.update(edit))
    }

    /// Runs `edit` against the root field group, which gives access to nested
    /// field groups.
    pub fn edit_field_group<R>(&mut self, edit: impl FnOnce(&mut FieldGroup<F>) -> R) -> Result<R> {
        let before = self.field_group.value().clone();
        let result = edit(&mut self.field_group);

        if *self.field_group.value() != before {
            self.resource = self.field_group.value().clone();
            self.render()?;
        }
        Ok(result)
    }

    /// Sets the value of the control at `path` as user input. Returns `false`
    /// if the form has no control at `path`.
    pub fn set_value(&mut self, path: &Path, value: Value) -> Result<bool> {
        self.edit_field_group(|field_group| field_group.set_value(path, value))
    }

    /// Writes `value` at `path` of the resource as if it had been typed into
    /// the text view, for fields the form has no control for.
    pub fn patch_resource(&mut self, path: &Path, value: Value) -> Result<()> {
        let mut resource = self.resource.clone();
        path::set(&mut resource, path, value);

        let text = yaml::to_string(&resource, self.options).context(RenderManifestSnafu)?;
        self.load(text)
    }

    fn render(&mut self) -> Result<()> {
        self.text = yaml::to_string(&self.resource, self.options).context(RenderManifestSnafu)?;
        tracing::debug!("rendered manifest");
        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The last valid resource.
    pub fn resource(&self) -> &Value {
        &self.resource
    }

    pub fn field_group(&self) -> &FieldGroup<F> {
        &self.field_group
    }

    pub fn validity(&self) -> Status {
        self.field_group.validity()
    }

    pub fn errors(&self) -> Option<ValidationErrors> {
        self.field_group.errors()
    }
}
