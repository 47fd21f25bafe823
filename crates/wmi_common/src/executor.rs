//! Query executor seam.
//!
//! The dispatcher talks to WMI only through this trait, so tests can run
//! against stub executors and the core never depends on Windows.

use crate::error::ExecutorError;
use crate::record::ResultRecord;

/// Executes a rendered WQL query against the external WMI binding.
///
/// Implementations are synchronous; the dispatcher wraps calls in
/// `spawn_blocking` with a bounded timeout.
pub trait QueryExecutor: Send + Sync + 'static {
    fn execute(&self, wql: &str, columns: &[&str]) -> Result<Vec<ResultRecord>, ExecutorError>;
}

/// Stub executor returning canned records. Used by tests and by the
/// dispatcher's own unit tests to assert invocation counts.
#[derive(Default)]
pub struct StubExecutor {
    records: Vec<ResultRecord>,
    error: Option<ExecutorError>,
    calls: std::sync::atomic::AtomicUsize,
}

impl StubExecutor {
    pub fn returning(records: Vec<ResultRecord>) -> Self {
        Self {
            records,
            error: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn failing(error: ExecutorError) -> Self {
        Self {
            records: Vec::new(),
            error: Some(error),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl QueryExecutor for StubExecutor {
    fn execute(&self, _wql: &str, _columns: &[&str]) -> Result<Vec<ResultRecord>, ExecutorError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(self.records.clone()),
        }
    }
}
