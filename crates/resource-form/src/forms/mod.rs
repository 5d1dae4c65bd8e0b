//! Ready-made [`ResourceForm`](crate::field_group::ResourceForm) definitions
//! for the common control tree shapes.
//!
//! | Definition | Control tree | Merges with resource |
//! |---|---|---|
//! | [`GroupForm`] | group built by a factory | yes |
//! | [`ArrayForm`] | array of homogeneous items | no |
//! | [`KeyValueForm`] | array of `[key, value]` rows | no |
mod array;
mod group;
mod key_value;

pub use array::ArrayForm;
pub use group::GroupForm;
pub use key_value::KeyValueForm;
