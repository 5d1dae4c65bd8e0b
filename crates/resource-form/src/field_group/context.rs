use std::{cell::Cell, rc::Rc};

/// Shared state of an enclosing form, handed to nested field groups at
/// construction.
///
/// Clones share the same state. Without a context a field group only knows
/// about its own submissions.
#[derive(Clone, Debug, Default)]
pub struct FormContext {
    submissions: Rc<Cell<usize>>,
}

impl FormContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a submission of the enclosing form.
    pub fn submit(&self) {
        self.submissions.set(self.submissions.get() + 1);
    }

    pub fn is_submitted(&self) -> bool {
        self.submissions.get() > 0
    }

    /// How often the enclosing form has been submitted.
    pub fn submissions(&self) -> usize {
        self.submissions.get()
    }
}
