use std::{any::Any, fmt::Debug};

use futures::future::LocalBoxFuture;
use serde_json::Value;

use crate::{control::Status, validation::ValidationErrors};

/// The contract between a leaf control and a nested value editor.
///
/// A leaf created with [`Control::bound`](crate::control::Control::bound)
/// delegates its value, its touched and dirty state and part of its validity to
/// the accessor. [`FieldGroup`](crate::field_group::FieldGroup) implements this
/// trait, which is how field groups nest inside each other.
pub trait ValueAccessor: Any + Debug {
    /// Receives a value from the parent. Must not report a change back.
    fn write_value(&mut self, value: Value);

    /// The current outward value.
    fn value(&self) -> Value;

    fn set_disabled_state(&mut self, disabled: bool);

    /// Error payload reported to the parent, [`None`] when valid.
    fn validate(&self) -> Option<ValidationErrors>;

    fn validity(&self) -> Status;

    fn is_touched(&self) -> bool;

    fn is_dirty(&self) -> bool;

    /// Waits for every outstanding asynchronous validation and returns the
    /// settled status.
    fn resolve_validity(&mut self) -> LocalBoxFuture<'_, Status>;

    /// Called when the enclosing form is torn down.
    fn destroy(&mut self) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn ValueAccessor {
    pub fn downcast_ref<T: ValueAccessor>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    pub fn downcast_mut<T: ValueAccessor>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}
