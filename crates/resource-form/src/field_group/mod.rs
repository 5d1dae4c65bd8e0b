//! The field group state machine.
//!
//! A [`FieldGroup`] owns the control tree of one [`ResourceForm`] and decides
//! when each projection runs. Inbound resources arrive through
//! [`FieldGroup::write_value`] and never cause a change notification. Edits go
//! through [`FieldGroup::update`], which emits the new outward value to the
//! registered change callback.
use std::{any::Any, mem};

use educe::Educe;
use futures::{FutureExt, future::LocalBoxFuture};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use snafu::{ResultExt, Snafu};
use strum::{Display, EnumIs};

use crate::{
    accessor::ValueAccessor,
    control::{Control, Status},
    path::{Path, Segment},
    projection,
    validation::{self, ValidationErrors},
};

mod context;
mod definition;

pub use context::FormContext;
pub use definition::{ArrayResourceForm, ResourceForm};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to serialize resource into a JSON value"))]
    SerializeResource { source: serde_json::Error },

    #[snafu(display("failed to deserialize field group value into {type_name}"))]
    DeserializeResource {
        source: serde_json::Error,
        type_name: &'static str,
    },
}

/// Lifecycle of a [`FieldGroup`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIs)]
pub enum FieldGroupState {
    /// The control tree has not been created yet.
    Uninitialized,

    /// The control tree exists, but no resource has been written.
    Ready,

    /// A resource has been written. Edits are emitted.
    Bound,

    /// Terminal. Nothing is emitted and validity stays pending.
    Destroyed,
}

type ChangeCallback = Box<dyn FnMut(&Value)>;
type TouchedCallback = Box<dyn FnMut()>;

#[derive(Educe)]
#[educe(Debug)]
pub struct FieldGroup<F: ResourceForm> {
    definition: F,
    form: Option<Control>,
    state: FieldGroupState,
    merge_strategy: Option<bool>,
    context: Option<FormContext>,

    /// The last inbound resource, as written.
    resource: Option<Value>,

    /// The last inbound resource after adaptation, used as merge base.
    adapted_resource: Value,

    /// The value most recently written or emitted.
    outward: Value,

    suppress_notifications: bool,
    disabled: bool,
    submitted: bool,
    refresh_requested: bool,

    #[educe(Debug(ignore))]
    on_change: Option<ChangeCallback>,

    #[educe(Debug(ignore))]
    on_touched: Option<TouchedCallback>,
}

impl<F: ResourceForm> FieldGroup<F> {
    pub fn new(definition: F) -> Self {
        Self {
            definition,
            form: None,
            state: FieldGroupState::Uninitialized,
            merge_strategy: None,
            context: None,
            resource: None,
            adapted_resource: Value::Null,
            outward: Value::Null,
            suppress_notifications: false,
            disabled: false,
            submitted: false,
            refresh_requested: false,
            on_change: None,
            on_touched: None,
        }
    }

    /// Attaches the context of the enclosing form.
    pub fn with_context(mut self, context: FormContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Overrides [`ResourceForm::resource_merge_strategy`] for this instance.
    pub fn with_merge_strategy(mut self, merge: bool) -> Self {
        self.merge_strategy = Some(merge);
        self
    }

    pub fn definition(&self) -> &F {
        &self.definition
    }

    pub fn state(&self) -> FieldGroupState {
        self.state
    }

    pub fn merge_strategy(&self) -> bool {
        self.merge_strategy
            .unwrap_or_else(|| self.definition.resource_merge_strategy())
    }

    /// Creates the control tree if it does not exist yet.
    pub fn init(&mut self) {
        self.form_and_definition();
    }

    fn form_and_definition(&mut self) -> (&mut Control, &F) {
        if self.state.is_uninitialized() {
            self.state = FieldGroupState::Ready;
        }

        let definition = &self.definition;
        let form = self.form.get_or_insert_with(|| {
            tracing::debug!(name = definition.name(), "creating form");
            definition.create_form()
        });
        (form, definition)
    }

    /// Writes an inbound resource into the form.
    ///
    /// The resource is adapted to the form model, merged over the default
    /// model and projected onto the control tree. No change notification is
    /// emitted, and the outward value becomes `resource`. Ignored once the
    /// field group is destroyed.
    pub fn write_value(&mut self, resource: Value) {
        if self.state.is_destroyed() {
            tracing::warn!(
                name = self.definition.name(),
                "ignoring write into destroyed field group"
            );
            return;
        }

        self.resource = Some(resource.clone());
        let adapted = self.definition.adapt_resource_model(resource.clone());
        self.adapted_resource = adapted.clone();

        self.suppress_notifications = true;
        let model = definition::merge_default(self.definition.default_form_model(), adapted);
        let (form, definition) = self.form_and_definition();
        let update = projection::set_form_by_resource(form, &model, |path| {
            definition.on_form_array_resize(path)
        });
        self.suppress_notifications = false;

        tracing::debug!(
            name = self.definition.name(),
            changed_leaves = update.changed_leaves.len(),
            resized_arrays = update.resized_arrays.len(),
            "wrote resource into field group"
        );

        self.outward = resource;
        self.state = FieldGroupState::Bound;
        self.refresh_requested = true;
    }

    /// Runs `edit` against the live control tree and emits the new outward
    /// value if the form value changed.
    pub fn update<R>(&mut self, edit: impl FnOnce(&mut Control) -> R) -> R {
        let (form, _) = self.form_and_definition();
        let before = form.value();
        let result = edit(form);
        let changed = form.value() != before;

        if changed {
            self.emit();
        }
        result
    }

    /// Sets the value of the control at `path` as user input, marking it dirty.
    /// Returns `false` if there is no control at `path`.
    pub fn set_value(&mut self, path: &Path, value: Value) -> bool {
        self.update(|form| match form.get_mut(path) {
            Some(control) => {
                control.set_value(value);
                control.mark_as_dirty();
                true
            }
            None => {
                tracing::warn!(%path, "no control to set value on");
                false
            }
        })
    }

    /// Runs `edit` against the nested field group bound to the leaf at `path`.
    /// Returns [`None`] if there is no leaf at `path` bound to a
    /// `FieldGroup<N>`.
    pub fn edit_nested<N, R>(
        &mut self,
        path: &Path,
        edit: impl FnOnce(&mut FieldGroup<N>) -> R,
    ) -> Option<R>
    where
        N: ResourceForm + 'static,
    {
        self.update(|form| {
            form.get_mut(path)?
                .accessor_mut::<FieldGroup<N>>()
                .map(edit)
        })
    }

    fn emit(&mut self) {
        if self.suppress_notifications || self.disabled || !self.state.is_bound() {
            tracing::trace!(
                name = self.definition.name(),
                state = %self.state,
                disabled = self.disabled,
                "not emitting change"
            );
            return;
        }

        let Some(form) = self.form.as_ref() else {
            return;
        };

        let merge_base = self.merge_strategy()
            && (self.adapted_resource.is_object() || self.adapted_resource.is_array());
        let form_model = if merge_base {
            projection::set_resource_by_form(form, &self.adapted_resource)
        } else {
            form.value()
        };

        self.outward = self.definition.adapt_form_model(form_model);
        tracing::debug!(name = self.definition.name(), "emitting change");

        if let Some(on_change) = self.on_change.as_mut() {
            on_change(&self.outward);
        }
    }

    pub fn register_on_change(&mut self, callback: impl FnMut(&Value) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    pub fn register_on_touched(&mut self, callback: impl FnMut() + 'static) {
        self.on_touched = Some(Box::new(callback));
    }

    /// Marks the form as touched and notifies the touched callback.
    pub fn on_blur(&mut self) {
        let (form, _) = self.form_and_definition();
        form.mark_as_touched();

        if let Some(on_touched) = self.on_touched.as_mut() {
            on_touched();
        }
    }

    /// Disables or enables the whole form. No changes are emitted while
    /// disabled.
    pub fn set_disabled_state(&mut self, disabled: bool) {
        self.disabled = disabled;
        let (form, _) = self.form_and_definition();
        form.set_disabled(disabled);
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Status of the root control. A destroyed field group stays pending.
    pub fn validity(&self) -> Status {
        if self.state.is_destroyed() {
            return Status::Pending;
        }

        self.form.as_ref().map_or(Status::Valid, Control::status)
    }

    /// Payload for a parent validator: `{name: true}` when the form is invalid.
    pub fn validate(&self) -> Option<ValidationErrors> {
        self.validity()
            .is_invalid()
            .then(|| validation::error(self.definition.name(), Value::Bool(true)))
    }

    /// Errors of the whole control tree, see [`projection::control_errors`].
    pub fn errors(&self) -> Option<ValidationErrors> {
        self.form.as_ref().and_then(projection::control_errors)
    }

    /// Waits for all outstanding asynchronous validations, including those of
    /// nested field groups, and returns the settled status.
    pub async fn resolve_validity(&mut self) -> Status {
        if self.state.is_destroyed() {
            return Status::Pending;
        }

        match self.form.as_mut() {
            Some(form) => form.resolve_validity().await,
            None => Status::Valid,
        }
    }

    /// Submits the form: every control is marked as touched and the submission
    /// is recorded on the context, if any.
    pub fn submit(&mut self) {
        let (form, _) = self.form_and_definition();
        form.mark_all_as_touched();
        self.submitted = true;

        if let Some(context) = &self.context {
            context.submit();
        }
    }

    /// Whether this field group or its enclosing form has been submitted.
    pub fn is_submitted(&self) -> bool {
        self.submitted || self.context.as_ref().is_some_and(FormContext::is_submitted)
    }

    /// Detaches all callbacks and destroys the field groups nested inside the
    /// form. The field group cannot be used afterwards.
    pub fn destroy(&mut self) {
        if let Some(form) = self.form.as_mut() {
            form.destroy();
        }
        self.on_change = None;
        self.on_touched = None;
        self.state = FieldGroupState::Destroyed;
        tracing::debug!(name = self.definition.name(), "destroyed field group");
    }

    /// Returns whether the view has to be refreshed, and clears the request.
    pub fn take_refresh_request(&mut self) -> bool {
        mem::take(&mut self.refresh_requested)
    }

    pub fn form(&self) -> Option<&Control> {
        self.form.as_ref()
    }

    /// The top-level controls: the children of a group or array, or the form
    /// itself when it is a leaf.
    pub fn controls(&self) -> Vec<&Control> {
        let Some(form) = self.form.as_ref() else {
            return Vec::new();
        };

        if let Some(children) = form.as_group() {
            children.values().collect()
        } else if let Some(children) = form.as_array() {
            children.iter().collect()
        } else {
            vec![form]
        }
    }

    /// The current value of the form.
    pub fn form_model(&self) -> Value {
        self.form.as_ref().map_or(Value::Null, Control::value)
    }

    /// The last inbound resource.
    pub fn resource_model(&self) -> Option<&Value> {
        self.resource.as_ref()
    }

    /// The value most recently written or emitted.
    pub fn value(&self) -> &Value {
        &self.outward
    }

    /// Writes a typed resource, see [`FieldGroup::write_value`].
    pub fn write_resource<T: Serialize>(&mut self, resource: &T) -> Result<()> {
        let value = serde_json::to_value(resource).context(SerializeResourceSnafu)?;
        self.write_value(value);
        Ok(())
    }

    /// The outward value as a typed resource.
    pub fn resource<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.outward.clone()).context(DeserializeResourceSnafu {
            type_name: std::any::type_name::<T>(),
        })
    }
}

impl<F: ArrayResourceForm> FieldGroup<F> {
    /// Number of items of the array form.
    pub fn len(&self) -> usize {
        self.form.as_ref().and_then(Control::as_array).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts a new item at `index` (appends for [`None`]) and returns the
    /// index it ended up at. Indices past the end append.
    pub fn add(&mut self, index: Option<usize>) -> usize {
        let len = self.len();
        let index = index.map_or(len, |index| index.min(len));
        let item = self
            .definition
            .on_form_array_resize(&Path::from(vec![Segment::Index(index)]));

        self.update(|form| {
            if let Some(items) = form.as_array_mut() {
                items.insert(index, item);
            }
        });
        self.refresh_requested = true;
        index
    }

    /// Removes the item at `index`. Returns `false` if there is none.
    pub fn remove(&mut self, index: usize) -> bool {
        let removed = self.update(|form| {
            form.as_array_mut()
                .filter(|items| index < items.len())
                .map(|items| items.remove(index))
                .is_some()
        });
        self.refresh_requested |= removed;
        removed
    }
}

impl<F: ResourceForm + 'static> ValueAccessor for FieldGroup<F> {
    fn write_value(&mut self, value: Value) {
        Self::write_value(self, value);
    }

    fn value(&self) -> Value {
        self.outward.clone()
    }

    fn set_disabled_state(&mut self, disabled: bool) {
        Self::set_disabled_state(self, disabled);
    }

    fn validate(&self) -> Option<ValidationErrors> {
        Self::validate(self)
    }

    fn validity(&self) -> Status {
        Self::validity(self)
    }

    fn is_touched(&self) -> bool {
        self.form.as_ref().is_some_and(Control::is_touched)
    }

    fn is_dirty(&self) -> bool {
        self.form.as_ref().is_some_and(Control::is_dirty)
    }

    fn resolve_validity(&mut self) -> LocalBoxFuture<'_, Status> {
        Self::resolve_validity(self).boxed_local()
    }

    fn destroy(&mut self) {
        Self::destroy(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
