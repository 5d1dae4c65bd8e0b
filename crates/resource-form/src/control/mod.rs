//! The control tree consumed by the projection engine.
//!
//! A [`Control`] is either a leaf holding an arbitrary JSON value, a group of
//! named children or an array of children. Every node carries its own
//! validators, a disabled flag and dirty/touched state. Validity is computed on
//! demand from the current values, so a tree is never observed in a
//! half-validated state.
use educe::Educe;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use strum::{Display, EnumIs};

use crate::{
    accessor::ValueAccessor,
    path::{Path, Segment},
    validation::{self, AsyncValidator, ValidationErrors, Validator},
};

mod pending;

pub use pending::PendingValidation;

/// Validity of a control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIs)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Status {
    Valid,
    Invalid,
    Pending,
    Disabled,
}

#[derive(Debug)]
pub enum ControlKind {
    Leaf(Leaf),
    Group(IndexMap<String, Control>),
    Array(Vec<Control>),
}

#[derive(Debug)]
pub enum Leaf {
    Value(Value),

    /// The value lives in a nested editor, see [`Control::bound`].
    Bound(Box<dyn ValueAccessor>),
}

/// Cached result of the asynchronous validators, together with the value it
/// was computed for.
#[derive(Clone, Debug)]
struct AsyncOutcome {
    value: Value,
    errors: Option<ValidationErrors>,
}

/// A node of the control tree.
#[derive(Educe)]
#[educe(Debug)]
pub struct Control {
    kind: ControlKind,

    #[educe(Debug(ignore))]
    validators: Vec<Validator>,

    #[educe(Debug(ignore))]
    async_validators: Vec<AsyncValidator>,

    async_outcome: Option<AsyncOutcome>,
    disabled: bool,
    dirty: bool,
    touched: bool,
}

impl Control {
    fn new(kind: ControlKind) -> Self {
        Self {
            kind,
            validators: Vec::new(),
            async_validators: Vec::new(),
            async_outcome: None,
            disabled: false,
            dirty: false,
            touched: false,
        }
    }

    pub fn leaf(value: impl Into<Value>) -> Self {
        Self::new(ControlKind::Leaf(Leaf::Value(value.into())))
    }

    pub fn group<K: Into<String>>(children: impl IntoIterator<Item = (K, Self)>) -> Self {
        Self::new(ControlKind::Group(
            children
                .into_iter()
                .map(|(key, child)| (key.into(), child))
                .collect(),
        ))
    }

    pub fn array(children: impl IntoIterator<Item = Self>) -> Self {
        Self::new(ControlKind::Array(children.into_iter().collect()))
    }

    /// Creates a leaf whose value is owned by a nested editor. The accessor
    /// immediately receives the initial leaf value `null`.
    pub fn bound(accessor: impl ValueAccessor) -> Self {
        let mut accessor: Box<dyn ValueAccessor> = Box::new(accessor);
        accessor.write_value(Value::Null);
        Self::new(ControlKind::Leaf(Leaf::Bound(accessor)))
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_async_validator(mut self, validator: AsyncValidator) -> Self {
        self.async_validators.push(validator);
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.set_disabled(disabled);
        self
    }

    pub fn add_validator(&mut self, validator: Validator) {
        self.validators.push(validator);
    }

    pub fn kind(&self) -> &ControlKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut ControlKind {
        &mut self.kind
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, ControlKind::Leaf(_))
    }

    pub fn as_group(&self) -> Option<&IndexMap<String, Self>> {
        match &self.kind {
            ControlKind::Group(children) => Some(children),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut IndexMap<String, Self>> {
        match &mut self.kind {
            ControlKind::Group(children) => Some(children),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Self>> {
        match &self.kind {
            ControlKind::Array(children) => Some(children),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Self>> {
        match &mut self.kind {
            ControlKind::Array(children) => Some(children),
            _ => None,
        }
    }

    /// The nested editor of a bound leaf.
    pub fn accessor(&self) -> Option<&(dyn ValueAccessor + 'static)> {
        match &self.kind {
            ControlKind::Leaf(Leaf::Bound(accessor)) => Some(accessor.as_ref()),
            _ => None,
        }
    }

    /// The nested editor of a bound leaf, downcast to its concrete type.
    pub fn accessor_mut<T: ValueAccessor>(&mut self) -> Option<&mut T> {
        match &mut self.kind {
            ControlKind::Leaf(Leaf::Bound(accessor)) => accessor.as_mut().downcast_mut(),
            _ => None,
        }
    }

    pub fn child(&self, segment: &Segment) -> Option<&Self> {
        match (&self.kind, segment) {
            (ControlKind::Group(children), Segment::Key(key)) => children.get(key),
            (ControlKind::Array(children), Segment::Index(index)) => children.get(*index),
            _ => None,
        }
    }

    pub fn child_mut(&mut self, segment: &Segment) -> Option<&mut Self> {
        match (&mut self.kind, segment) {
            (ControlKind::Group(children), Segment::Key(key)) => children.get_mut(key),
            (ControlKind::Array(children), Segment::Index(index)) => children.get_mut(*index),
            _ => None,
        }
    }

    /// Looks up a descendant. The empty path returns `self`.
    pub fn get(&self, path: &Path) -> Option<&Self> {
        path.iter()
            .try_fold(self, |control, segment| control.child(segment))
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut Self> {
        path.iter()
            .try_fold(self, |control, segment| control.child_mut(segment))
    }

    /// The value of the subtree. Disabled children are left out, unless this
    /// control is disabled itself.
    pub fn value(&self) -> Value {
        let include = |child: &Self| child.is_enabled() || self.disabled;

        match &self.kind {
            ControlKind::Leaf(Leaf::Value(value)) => value.clone(),
            ControlKind::Leaf(Leaf::Bound(accessor)) => accessor.value(),
            ControlKind::Group(children) => Value::Object(
                children
                    .iter()
                    .filter(|(_, child)| include(*child))
                    .map(|(key, child)| (key.clone(), child.value()))
                    .collect(),
            ),
            ControlKind::Array(children) => Value::Array(
                children
                    .iter()
                    .filter(|child| include(*child))
                    .map(Self::value)
                    .collect(),
            ),
        }
    }

    /// The value of the subtree including disabled children.
    pub fn raw_value(&self) -> Value {
        match &self.kind {
            ControlKind::Leaf(_) => self.value(),
            ControlKind::Group(children) => Value::Object(
                children
                    .iter()
                    .map(|(key, child)| (key.clone(), child.raw_value()))
                    .collect::<Map<_, _>>(),
            ),
            ControlKind::Array(children) => {
                Value::Array(children.iter().map(Self::raw_value).collect())
            }
        }
    }

    /// Writes `value` into the subtree.
    ///
    /// A leaf takes the value as a whole. Groups and arrays forward the entries
    /// of an object or array value to the children with the same key or index
    /// and leave every other child untouched. A bound leaf only passes the
    /// value on to its accessor when it differs from the accessor's value.
    pub fn set_value(&mut self, value: Value) {
        match (&mut self.kind, value) {
            (ControlKind::Leaf(Leaf::Value(current)), value) => *current = value,
            (ControlKind::Leaf(Leaf::Bound(accessor)), value) => {
                if accessor.value() != value {
                    accessor.write_value(value);
                }
            }
            (ControlKind::Group(children), Value::Object(entries)) => {
                for (key, value) in entries {
                    if let Some(child) = children.get_mut(&key) {
                        child.set_value(value);
                    }
                }
            }
            (ControlKind::Array(children), Value::Array(items)) => {
                for (child, value) in children.iter_mut().zip(items) {
                    child.set_value(value);
                }
            }
            (_, value) => {
                tracing::trace!(?value, "ignoring value of mismatching shape");
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Disables or enables the whole subtree, nested editors included.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
        match &mut self.kind {
            ControlKind::Leaf(Leaf::Value(_)) => {}
            ControlKind::Leaf(Leaf::Bound(accessor)) => accessor.set_disabled_state(disabled),
            ControlKind::Group(children) => children
                .values_mut()
                .for_each(|child| child.set_disabled(disabled)),
            ControlKind::Array(children) => children
                .iter_mut()
                .for_each(|child| child.set_disabled(disabled)),
        }
    }

    /// Whether this control or any descendant has been changed by the user.
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.any_child(Self::is_dirty, ValueAccessor::is_dirty)
    }

    pub fn mark_as_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_as_pristine(&mut self) {
        self.dirty = false;
        self.for_each_child_mut(Self::mark_as_pristine);
    }

    /// Whether this control or any descendant has been blurred by the user.
    pub fn is_touched(&self) -> bool {
        self.touched || self.any_child(Self::is_touched, ValueAccessor::is_touched)
    }

    pub fn mark_as_touched(&mut self) {
        self.touched = true;
    }

    pub fn mark_all_as_touched(&mut self) {
        self.touched = true;
        self.for_each_child_mut(Self::mark_all_as_touched);
    }

    pub fn mark_as_untouched(&mut self) {
        self.touched = false;
        self.for_each_child_mut(Self::mark_as_untouched);
    }

    /// Tears down every accessor bound inside the subtree.
    pub fn destroy(&mut self) {
        if let ControlKind::Leaf(Leaf::Bound(accessor)) = &mut self.kind {
            accessor.destroy();
        }
        self.for_each_child_mut(Self::destroy);
    }

    /// The error payload of this node alone, [`None`] when the node is valid or
    /// disabled. Results of asynchronous validators are included once they have
    /// completed for the current value.
    pub fn errors(&self) -> Option<ValidationErrors> {
        if self.disabled {
            return None;
        }

        let value = self.value();
        let errors = self.sync_errors(&value);
        if errors.is_some() {
            return errors;
        }

        self.async_outcome
            .as_ref()
            .filter(|outcome| outcome.value == value)
            .and_then(|outcome| outcome.errors.clone())
    }

    /// Computes the status of the subtree.
    ///
    /// A node is invalid when its own validators fail or any enabled child is
    /// invalid. Otherwise it is pending when its own asynchronous validation has
    /// not completed for the current value, or any enabled child is pending.
    pub fn status(&self) -> Status {
        if self.disabled {
            return Status::Disabled;
        }

        let value = self.value();
        if self.sync_errors(&value).is_some() {
            return Status::Invalid;
        }

        let mut pending = false;
        if !self.async_validators.is_empty() {
            match self
                .async_outcome
                .as_ref()
                .filter(|outcome| outcome.value == value)
            {
                Some(AsyncOutcome {
                    errors: Some(_), ..
                }) => return Status::Invalid,
                Some(_) => {}
                None => pending = true,
            }
        }

        let child_statuses: Vec<Status> = match &self.kind {
            ControlKind::Leaf(Leaf::Value(_)) => Vec::new(),
            ControlKind::Leaf(Leaf::Bound(accessor)) => vec![accessor.validity()],
            ControlKind::Group(children) => children.values().map(Self::status).collect(),
            ControlKind::Array(children) => children.iter().map(Self::status).collect(),
        };

        if child_statuses.contains(&Status::Invalid) {
            Status::Invalid
        } else if pending || child_statuses.contains(&Status::Pending) {
            Status::Pending
        } else {
            Status::Valid
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status().is_valid()
    }

    pub fn is_invalid(&self) -> bool {
        self.status().is_invalid()
    }

    pub fn is_pending(&self) -> bool {
        self.status().is_pending()
    }

    fn sync_errors(&self, value: &Value) -> Option<ValidationErrors> {
        let mut errors = validation::run_all(&self.validators, value);
        if let ControlKind::Leaf(Leaf::Bound(accessor)) = &self.kind {
            validation::merge_errors(&mut errors, accessor.validate());
        }
        errors
    }

    fn any_child(
        &self,
        control: impl Fn(&Self) -> bool,
        accessor: impl Fn(&dyn ValueAccessor) -> bool,
    ) -> bool {
        match &self.kind {
            ControlKind::Leaf(Leaf::Value(_)) => false,
            ControlKind::Leaf(Leaf::Bound(bound)) => accessor(bound.as_ref()),
            ControlKind::Group(children) => children.values().any(control),
            ControlKind::Array(children) => children.iter().any(control),
        }
    }

    fn for_each_child_mut(&mut self, f: impl Fn(&mut Self)) {
        match &mut self.kind {
            ControlKind::Leaf(_) => {}
            ControlKind::Group(children) => children.values_mut().for_each(f),
            ControlKind::Array(children) => children.iter_mut().for_each(f),
        }
    }
}
