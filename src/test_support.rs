//! Test doubles shared by unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::config::QueryConfig;
use crate::core::Record;
use crate::entities::EntityRegistry;
use crate::permissions::PermissionMatrix;
use crate::query::GateContext;
use crate::storage::{RawOutcome, Statement, StorageClient, StorageError};

/// Storage double that records every call and replays scripted responses
///
/// With no scripted response left, `execute` returns no rows and
/// `execute_raw` returns an empty outcome.
#[derive(Default)]
pub struct RecordingStore {
    statements: Mutex<Vec<Statement>>,
    raw: Mutex<Vec<String>>,
    responses: Mutex<VecDeque<Result<Vec<Record>, StorageError>>>,
    raw_responses: Mutex<VecDeque<Result<RawOutcome, StorageError>>>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, response: Result<Vec<Record>, StorageError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn respond_rows(&self, rows: Vec<Value>) {
        self.respond(Ok(rows.into_iter().map(record).collect()));
    }

    pub fn respond_raw(&self, response: Result<RawOutcome, StorageError>) {
        self.raw_responses.lock().unwrap().push_back(response);
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }

    pub fn raw_calls(&self) -> Vec<String> {
        self.raw.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.statements.lock().unwrap().len() + self.raw.lock().unwrap().len()
    }
}

#[async_trait]
impl StorageClient for RecordingStore {
    async fn execute(&self, statement: &Statement) -> Result<Vec<Record>, StorageError> {
        self.statements.lock().unwrap().push(statement.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn execute_raw(&self, sql: &str) -> Result<RawOutcome, StorageError> {
        self.raw.lock().unwrap().push(sql.to_string());
        self.raw_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(RawOutcome::default()))
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Convert a JSON object literal into a record
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

/// Context over the standard tables and grants
pub fn context(storage: Arc<dyn StorageClient>) -> GateContext {
    GateContext::new(
        Arc::new(PermissionMatrix::standard()),
        Arc::new(EntityRegistry::standard()),
        storage,
        QueryConfig::default(),
    )
}
