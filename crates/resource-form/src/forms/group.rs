use educe::Educe;
use serde_json::Value;

use crate::{control::Control, field_group::ResourceForm, path::Path};

type Adapter = Box<dyn Fn(Value) -> Value>;

/// A form whose control tree is a group built by a factory.
///
/// Group forms merge their outward value over the last inbound resource, so
/// fields the form does not know about are kept.
///
/// ```
/// use resource_form::{control::Control, field_group::FieldGroup, forms::GroupForm};
/// use serde_json::json;
///
/// let definition = GroupForm::new("ServiceForm", || {
///     Control::group([("name", Control::leaf("")), ("port", Control::leaf(80))])
/// });
/// let mut field_group = FieldGroup::new(definition);
/// field_group.write_value(json!({ "name": "web", "type": "ClusterIP" }));
///
/// assert_eq!(field_group.form_model(), json!({ "name": "web", "port": 80 }));
/// ```
#[derive(Educe)]
#[educe(Debug)]
pub struct GroupForm {
    name: String,

    #[educe(Debug(ignore))]
    factory: Box<dyn Fn() -> Control>,

    default_model: Value,

    #[educe(Debug(ignore))]
    resource_adapter: Option<Adapter>,

    #[educe(Debug(ignore))]
    form_adapter: Option<Adapter>,

    #[educe(Debug(ignore))]
    array_item: Option<Box<dyn Fn(&Path) -> Control>>,
}

impl GroupForm {
    pub fn new(name: impl Into<String>, factory: impl Fn() -> Control + 'static) -> Self {
        Self {
            name: name.into(),
            factory: Box::new(factory),
            default_model: Value::Object(Default::default()),
            resource_adapter: None,
            form_adapter: None,
            array_item: None,
        }
    }

    pub fn with_default_model(mut self, default_model: Value) -> Self {
        self.default_model = default_model;
        self
    }

    /// Sets the mapping from resource to form model.
    pub fn with_resource_adapter(mut self, adapter: impl Fn(Value) -> Value + 'static) -> Self {
        self.resource_adapter = Some(Box::new(adapter));
        self
    }

    /// Sets the mapping from form model back to the resource.
    pub fn with_form_adapter(mut self, adapter: impl Fn(Value) -> Value + 'static) -> Self {
        self.form_adapter = Some(Box::new(adapter));
        self
    }

    /// Sets the factory for children of arrays inside the group.
    pub fn with_array_item(mut self, factory: impl Fn(&Path) -> Control + 'static) -> Self {
        self.array_item = Some(Box::new(factory));
        self
    }
}

impl ResourceForm for GroupForm {
    fn create_form(&self) -> Control {
        (self.factory)()
    }

    fn default_form_model(&self) -> Value {
        self.default_model.clone()
    }

    fn resource_merge_strategy(&self) -> bool {
        true
    }

    fn adapt_resource_model(&self, resource: Value) -> Value {
        match &self.resource_adapter {
            Some(adapter) => adapter(resource),
            None => resource,
        }
    }

    fn adapt_form_model(&self, form_model: Value) -> Value {
        match &self.form_adapter {
            Some(adapter) => adapter(form_model),
            None => form_model,
        }
    }

    fn on_form_array_resize(&self, path: &Path) -> Control {
        match &self.array_item {
            Some(factory) => factory(path),
            None => Control::leaf(Value::Null),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
