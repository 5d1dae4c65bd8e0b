//! Forms for Kubernetes workload resources, built from the generic field
//! group machinery. Nested parts (containers, label maps, the pod spec) are
//! separate field groups bound to leaves of their parent form.
mod container;
mod deployment;
mod pod_spec;

pub use container::ContainerForm;
pub use deployment::DeploymentForm;
pub use pod_spec::PodSpecForm;
