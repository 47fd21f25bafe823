//! wmi_common - Shared core for wmictl and wmi-agent.
//!
//! One dispatch contract serves both entry points: a static command
//! catalog, parameter validation, an advisory privilege gate, a single
//! bounded executor call, in-memory filtering, and table/JSON rendering.
//! WMI access itself stays behind the `QueryExecutor` seam.

pub mod catalog;
pub mod cim;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod filter;
pub mod format;
pub mod platform;
pub mod privilege;
pub mod record;
pub mod registry;
pub mod spec;

pub use catalog::{builtin_registry, builtin_specs};
pub use config::QueryConfig;
pub use dispatch::{Dispatcher, InvocationRequest};
pub use error::{DispatchError, ExecutorError, FormatError, RegistryError};
pub use executor::{QueryExecutor, StubExecutor};
pub use format::{format_records, OutputFormat};
pub use privilege::PrivilegeLevel;
pub use record::{ResultRecord, Value};
pub use registry::{CommandRegistry, InMemoryRegistry};
pub use spec::CommandSpec;
