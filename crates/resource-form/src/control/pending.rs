use educe::Educe;
use futures::{
    FutureExt,
    future::{LocalBoxFuture, join_all},
};
use serde_json::Value;

use super::{AsyncOutcome, Control, ControlKind, Leaf, Status};
use crate::{
    accessor::ValueAccessor,
    path::Path,
    validation::{self, ValidationErrors},
};

/// An asynchronous validation which has been started but not completed yet.
///
/// The result only applies to the control at [`PendingValidation::path`] as
/// long as that control still holds [`PendingValidation::value`].
#[derive(Educe)]
#[educe(Debug)]
pub struct PendingValidation {
    pub path: Path,
    pub value: Value,

    #[educe(Debug(ignore))]
    future: LocalBoxFuture<'static, Option<ValidationErrors>>,
}

impl PendingValidation {
    /// Drives the validation to completion.
    pub async fn run(self) -> (Path, Value, Option<ValidationErrors>) {
        let errors = self.future.await;
        (self.path, self.value, errors)
    }
}

impl Control {
    /// Starts the asynchronous validators of every enabled node whose
    /// synchronous validators pass and which has no result for its current
    /// value yet.
    ///
    /// Nested editors are not included, see [`Control::resolve_validity`].
    pub fn pending_validations(&self) -> Vec<PendingValidation> {
        let mut pending = Vec::new();
        self.collect_pending(&mut Path::root(), &mut pending);
        pending
    }

    fn collect_pending(&self, path: &mut Path, pending: &mut Vec<PendingValidation>) {
        if self.disabled {
            return;
        }

        if !self.async_validators.is_empty() {
            let value = self.value();
            let settled = self
                .async_outcome
                .as_ref()
                .is_some_and(|outcome| outcome.value == value);

            if !settled && self.sync_errors(&value).is_none() {
                let futures: Vec<_> = self
                    .async_validators
                    .iter()
                    .map(|validator| validator(&value))
                    .collect();

                tracing::trace!(%path, validators = futures.len(), "starting async validation");
                pending.push(PendingValidation {
                    path: path.clone(),
                    value,
                    future: join_all(futures)
                        .map(|results| {
                            results.into_iter().fold(None, |mut errors, result| {
                                validation::merge_errors(&mut errors, result);
                                errors
                            })
                        })
                        .boxed_local(),
                });
            }
        }

        match &self.kind {
            ControlKind::Leaf(_) => {}
            ControlKind::Group(children) => {
                for (key, child) in children {
                    path.push(key.as_str());
                    child.collect_pending(path, pending);
                    path.pop();
                }
            }
            ControlKind::Array(children) => {
                for (index, child) in children.iter().enumerate() {
                    path.push(index);
                    child.collect_pending(path, pending);
                    path.pop();
                }
            }
        }
    }

    /// Records the result of an asynchronous validation.
    ///
    /// The result is accepted only if the control at `path` still holds
    /// `value`. Results for superseded values are discarded and `false` is
    /// returned.
    pub fn complete_validation(
        &mut self,
        path: &Path,
        value: &Value,
        errors: Option<ValidationErrors>,
    ) -> bool {
        let Some(control) = self.get_mut(path) else {
            tracing::warn!(%path, "discarding async validation result for missing control");
            return false;
        };

        if control.value() != *value {
            tracing::debug!(%path, "discarding superseded async validation result");
            return false;
        }

        control.async_outcome = Some(AsyncOutcome {
            value: value.clone(),
            errors,
        });
        true
    }

    /// Runs every outstanding asynchronous validation of the tree and of the
    /// nested editors bound to its leaves, then returns the settled status.
    pub async fn resolve_validity(&mut self) -> Status {
        let outcomes = join_all(
            self.pending_validations()
                .into_iter()
                .map(PendingValidation::run),
        )
        .await;

        for (path, value, errors) in outcomes {
            self.complete_validation(&path, &value, errors);
        }

        let mut accessors = Vec::new();
        self.collect_accessors(&mut accessors);
        for accessor in accessors {
            accessor.resolve_validity().await;
        }

        self.status()
    }

    fn collect_accessors<'a>(&'a mut self, accessors: &mut Vec<&'a mut Box<dyn ValueAccessor>>) {
        match &mut self.kind {
            ControlKind::Leaf(Leaf::Value(_)) => {}
            ControlKind::Leaf(Leaf::Bound(accessor)) => accessors.push(accessor),
            ControlKind::Group(children) => children
                .values_mut()
                .for_each(|child| child.collect_accessors(accessors)),
            ControlKind::Array(children) => children
                .iter_mut()
                .for_each(|child| child.collect_accessors(accessors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use serde_json::json;

    use super::*;
    use crate::{path, validation::AsyncValidator};

    /// Rejects the name "taken" and counts how often it was started.
    fn name_available(calls: Rc<Cell<usize>>) -> AsyncValidator {
        Box::new(move |value| {
            calls.set(calls.get() + 1);
            let taken = value == "taken";
            async move { taken.then(|| validation::error("nameTaken", json!(true))) }.boxed_local()
        })
    }

    fn form(calls: &Rc<Cell<usize>>) -> Control {
        Control::group([
            (
                "name",
                Control::leaf("free")
                    .with_validator(validation::required())
                    .with_async_validator(name_available(calls.clone())),
            ),
            ("image", Control::leaf("nginx")),
        ])
    }

    #[tokio::test]
    async fn pending_until_resolved() {
        let calls = Rc::new(Cell::new(0));
        let mut control = form(&calls);

        assert_eq!(control.status(), Status::Pending);
        assert_eq!(control.resolve_validity().await, Status::Valid);
        assert_eq!(calls.get(), 1);

        // The settled result is reused for the same value
        assert!(control.pending_validations().is_empty());

        control.get_mut(&path!("name")).unwrap().set_value(json!("taken"));
        assert_eq!(control.status(), Status::Pending);
        assert_eq!(control.resolve_validity().await, Status::Invalid);
        assert_eq!(
            control.get(&path!("name")).unwrap().errors(),
            Some(validation::error("nameTaken", json!(true)))
        );
    }

    #[tokio::test]
    async fn superseded_result_is_discarded() {
        let calls = Rc::new(Cell::new(0));
        let mut control = form(&calls);
        control.get_mut(&path!("name")).unwrap().set_value(json!("taken"));

        let mut pending = control.pending_validations();
        assert_eq!(pending.len(), 1);
        let (path, value, errors) = pending.remove(0).run().await;
        assert_eq!(path, path!("name"));
        assert_eq!(value, json!("taken"));

        control.get_mut(&path!("name")).unwrap().set_value(json!("other"));
        assert!(!control.complete_validation(&path, &value, errors));
        assert_eq!(control.status(), Status::Pending);
    }

    #[test]
    fn sync_failure_skips_async_validators() {
        let calls = Rc::new(Cell::new(0));
        let mut control = form(&calls);
        control.get_mut(&path!("name")).unwrap().set_value(json!(""));

        assert!(control.pending_validations().is_empty());
        assert_eq!(calls.get(), 0);
        assert_eq!(control.status(), Status::Invalid);
    }

    #[test]
    fn completion_for_missing_control() {
        let calls = Rc::new(Cell::new(0));
        let mut control = form(&calls);

        assert!(!control.complete_validation(&path!("missing"), &json!(null), None));
    }
}
