use crate::column::{ColId, ColumnRegistry};

/// Per-optimization ownership scope.
///
/// One context exists per optimized query. It owns the column registry every
/// [`crate::column::ColId`] indexes into; property spec values built during plan
/// alternative generation are plain immutable values and carry no backing storage of
/// their own, so dropping the context releases everything at once.
#[derive(Debug, Default)]
pub struct OptContext {
    columns: ColumnRegistry,
}

impl OptContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &ColumnRegistry {
        &self.columns
    }

    pub fn register_column<S: Into<String>>(
        &mut self,
        name: S,
        distributable: bool,
    ) -> ColId {
        self.columns.register(name, distributable)
    }
}
