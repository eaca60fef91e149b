use std::sync::Arc;

use mcps_records::RecordStore;

use crate::auth::ApiKeyGate;

/// Shared request state. Cheap to clone; everything inside is immutable.
#[derive(Clone, Debug)]
pub struct AppState {
    records: RecordStore,
    gate: Option<Arc<ApiKeyGate>>,
}

impl AppState {
    pub fn new(records: RecordStore, gate: Option<ApiKeyGate>) -> Self {
        Self { records, gate: gate.map(Arc::new) }
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// `None` when authentication is disabled.
    pub fn gate(&self) -> Option<&ApiKeyGate> {
        self.gate.as_deref()
    }
}
