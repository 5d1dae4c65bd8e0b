use educe::Educe;
use serde_json::Value;

use crate::{
    control::Control,
    field_group::{ArrayResourceForm, ResourceForm},
    path::Path,
    validation::Validator,
};

/// A form whose control tree is an array of homogeneous items.
///
/// The outward value is the array as edited; array forms do not merge with
/// the inbound resource.
#[derive(Educe)]
#[educe(Debug)]
pub struct ArrayForm {
    name: String,

    #[educe(Debug(ignore))]
    item: Box<dyn Fn(&Path) -> Control>,

    #[educe(Debug(ignore))]
    validators: Vec<Box<dyn Fn() -> Validator>>,
}

impl ArrayForm {
    /// `item` creates a new child. It receives the path of the array during
    /// projection, or `[index]` when an item is added explicitly.
    pub fn new(name: impl Into<String>, item: impl Fn(&Path) -> Control + 'static) -> Self {
        Self {
            name: name.into(),
            item: Box::new(item),
            validators: Vec::new(),
        }
    }

    /// Adds a validator to the array node. The factory runs when the form is
    /// created.
    pub fn with_validator(mut self, validator: impl Fn() -> Validator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }
}

impl ResourceForm for ArrayForm {
    fn create_form(&self) -> Control {
        self.validators
            .iter()
            .fold(Control::array([]), |array, validator| {
                array.with_validator(validator())
            })
    }

    fn default_form_model(&self) -> Value {
        Value::Array(Vec::new())
    }

    fn resource_merge_strategy(&self) -> bool {
        false
    }

    fn on_form_array_resize(&self, path: &Path) -> Control {
        (self.item)(path)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl ArrayResourceForm for ArrayForm {}
