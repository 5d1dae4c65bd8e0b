//! Keeps loosely-typed Kubernetes resources and form control trees in sync.
//!
//! A [`FieldGroup`](field_group::FieldGroup) owns the control tree of one
//! [`ResourceForm`](field_group::ResourceForm) definition. Inbound resources
//! are projected onto the tree, edits are projected back onto the last inbound
//! resource, so fields the form has no control for survive a round trip.
//! Nested field groups are bound to leaves of their parent tree through the
//! [`ValueAccessor`](accessor::ValueAccessor) trait.
//!
//! The [`editor`] module pairs a root field group with a YAML text view.

pub mod accessor;
pub mod control;
pub mod editor;
pub mod field_group;
pub mod forms;
pub mod kubernetes;
pub mod logging;
pub mod path;
pub mod projection;
pub mod validation;
pub mod yaml;

// External re-exports
pub use k8s_openapi;
pub use serde_json;
