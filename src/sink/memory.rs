// src/sink/memory.rs
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{Cell, TableStore};
use crate::error::{SinkError, SinkOp};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Connect,
    Lookup(String),
    Create(String),
    Clear(String),
    Header(String),
    Append(String, usize),
}

/// In-process table store. Backs dry runs and tests; can be told to fail
/// a specific operation for a specific table.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<String, MemTable>>,
    calls: Mutex<Vec<StoreCall>>,
    fail_on: Mutex<Option<(String, SinkOp)>>,
    reject_auth: bool,
    hang_connect: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_auth() -> Self {
        Self {
            reject_auth: true,
            ..Self::default()
        }
    }

    pub fn with_table(self, name: &str, table: MemTable) -> Self {
        self.lock_tables().insert(name.to_string(), table);
        self
    }

    /// Make `op` on `table` fail until [`clear_failure`](Self::clear_failure).
    pub fn fail_on(&self, table: &str, op: SinkOp) {
        *self.fail_on.lock().expect("memory store mutex poisoned") = Some((table.to_string(), op));
    }

    pub fn clear_failure(&self) {
        *self.fail_on.lock().expect("memory store mutex poisoned") = None;
    }

    pub fn table(&self, name: &str) -> Option<MemTable> {
        self.lock_tables().get(name).cloned()
    }

    /// `connect` never completes; callers must bound it themselves.
    pub fn hang_on_connect(&self) {
        self.hang_connect.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().expect("memory store mutex poisoned").clone()
    }

    /// Batch sizes of every append made to `name`, in order.
    pub fn append_sizes(&self, name: &str) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Append(t, n) if t == name => Some(n),
                _ => None,
            })
            .collect()
    }

    fn lock_tables(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, MemTable>> {
        self.tables.lock().expect("memory store mutex poisoned")
    }

    fn record(&self, call: StoreCall) {
        self.calls
            .lock()
            .expect("memory store mutex poisoned")
            .push(call);
    }

    fn check(&self, name: &str, op: SinkOp) -> Result<(), SinkError> {
        let guard = self.fail_on.lock().expect("memory store mutex poisoned");
        match guard.as_ref() {
            Some((t, o)) if t == name && *o == op => Err(SinkError::Write {
                league: name.to_string(),
                op,
                message: "injected failure".to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn missing(name: &str, op: SinkOp) -> SinkError {
        SinkError::Write {
            league: name.to_string(),
            op,
            message: "no such sheet".to_string(),
        }
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn connect(&self) -> Result<(), SinkError> {
        self.record(StoreCall::Connect);
        if self.hang_connect.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.reject_auth {
            return Err(SinkError::Auth("credentials rejected".to_string()));
        }
        Ok(())
    }

    async fn has_table(&self, name: &str) -> Result<bool, SinkError> {
        self.record(StoreCall::Lookup(name.to_string()));
        self.check(name, SinkOp::Lookup)?;
        Ok(self.lock_tables().contains_key(name))
    }

    async fn create_table(&self, name: &str) -> Result<(), SinkError> {
        self.record(StoreCall::Create(name.to_string()));
        self.check(name, SinkOp::Create)?;
        self.lock_tables()
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    async fn clear_table(&self, name: &str) -> Result<(), SinkError> {
        self.record(StoreCall::Clear(name.to_string()));
        self.check(name, SinkOp::Clear)?;
        let mut tables = self.lock_tables();
        let t = tables
            .get_mut(name)
            .ok_or_else(|| Self::missing(name, SinkOp::Clear))?;
        t.header.clear();
        t.rows.clear();
        Ok(())
    }

    async fn set_header_row(&self, name: &str, headers: &[&str]) -> Result<(), SinkError> {
        self.record(StoreCall::Header(name.to_string()));
        self.check(name, SinkOp::Header)?;
        let mut tables = self.lock_tables();
        let t = tables
            .get_mut(name)
            .ok_or_else(|| Self::missing(name, SinkOp::Header))?;
        t.header = headers.iter().map(|h| h.to_string()).collect();
        Ok(())
    }

    async fn append_rows(&self, name: &str, rows: &[Vec<Cell>]) -> Result<(), SinkError> {
        self.record(StoreCall::Append(name.to_string(), rows.len()));
        self.check(name, SinkOp::Append)?;
        let mut tables = self.lock_tables();
        let t = tables
            .get_mut(name)
            .ok_or_else(|| Self::missing(name, SinkOp::Append))?;
        t.rows.extend_from_slice(rows);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
