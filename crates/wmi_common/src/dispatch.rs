//! The dispatcher: resolve, validate, guard, execute, filter.
//!
//! Both invocation sources (CLI subcommands and agent tool calls) go
//! through this one pipeline. The executor is called exactly once per
//! dispatch, under a bounded timeout, with no retry.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::{DispatchError, ExecutorError};
use crate::executor::QueryExecutor;
use crate::filter::{apply_filters, FieldFilter};
use crate::format::{format_records, OutputFormat};
use crate::privilege::{require_elevated, PrivilegeLevel};
use crate::record::ResultRecord;
use crate::registry::CommandRegistry;
use crate::spec::{BoundValue, CommandSpec, ParamBinding, ParamSpec};

/// A single invocation: command name plus raw argument strings.
#[derive(Debug, Clone, Default)]
pub struct InvocationRequest {
    pub command: String,
    pub args: Vec<(String, String)>,
}

impl InvocationRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.push((name.into(), value.into()));
        self
    }

    fn raw(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

pub struct Dispatcher {
    registry: Box<dyn CommandRegistry>,
    executor: Arc<dyn QueryExecutor>,
    level: PrivilegeLevel,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        registry: Box<dyn CommandRegistry>,
        executor: Arc<dyn QueryExecutor>,
        level: PrivilegeLevel,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            executor,
            level,
            timeout,
        }
    }

    pub fn privilege_level(&self) -> PrivilegeLevel {
        self.level
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.registry.names()
    }

    pub fn spec(&self, name: &str) -> Option<&CommandSpec> {
        self.registry.lookup(name)
    }

    /// Run the full pipeline and return the (filtered) raw records.
    pub async fn dispatch(
        &self,
        request: &InvocationRequest,
    ) -> Result<Vec<ResultRecord>, DispatchError> {
        let spec = self
            .registry
            .lookup(&request.command)
            .ok_or_else(|| DispatchError::UnknownCommand(request.command.clone()))?;

        let bound = validate(spec, request)?;
        require_elevated(spec, self.level)?;

        let wql = spec.query.render(&bound);
        debug!(command = spec.name, %wql, "dispatching query");

        let records = self.execute_once(&wql, &spec.columns).await?;

        let filters: Vec<FieldFilter> = bound
            .iter()
            .filter_map(|(p, v)| match &p.binding {
                ParamBinding::Filter { field, mode } => {
                    Some(FieldFilter::new(*field, v.as_text(), *mode))
                }
                _ => None,
            })
            .collect();
        let mut records = apply_filters(records, &filters);

        if let Some(limit) = bound.iter().find_map(|(p, v)| match (&p.binding, v) {
            (ParamBinding::Limit, BoundValue::Int(n)) => Some(*n),
            _ => None,
        }) {
            records.truncate(limit.max(0) as usize);
        }

        Ok(records)
    }

    /// Dispatch and render in one step.
    pub async fn dispatch_formatted(
        &self,
        request: &InvocationRequest,
        format: OutputFormat,
    ) -> Result<String, DispatchError> {
        let spec_columns: Vec<&'static str> = self
            .registry
            .lookup(&request.command)
            .map(|s| s.columns.clone())
            .unwrap_or_default();
        let records = self.dispatch(request).await?;
        Ok(format_records(&records, format, &spec_columns)?)
    }

    async fn execute_once(
        &self,
        wql: &str,
        columns: &[&'static str],
    ) -> Result<Vec<ResultRecord>, DispatchError> {
        let executor = Arc::clone(&self.executor);
        let wql = wql.to_string();
        let columns = columns.to_vec();
        let timeout_secs = self.timeout.as_secs();

        let handle =
            tokio::task::spawn_blocking(move || executor.execute(&wql, &columns));

        match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(result)) => result.map_err(DispatchError::QueryExecutionFailed),
            Ok(Err(join_err)) => Err(DispatchError::QueryExecutionFailed(
                ExecutorError::Backend(format!("query worker failed: {}", join_err)),
            )),
            Err(_) => Err(DispatchError::QueryExecutionFailed(ExecutorError::Timeout(
                timeout_secs,
            ))),
        }
    }
}

/// Validate request arguments against the parameter schema. Fail-fast on
/// the first violation, in schema order; unknown arguments are rejected.
fn validate<'s>(
    spec: &'s CommandSpec,
    request: &InvocationRequest,
) -> Result<Vec<(&'s ParamSpec, BoundValue)>, DispatchError> {
    for (name, _) in &request.args {
        if spec.param(name).is_none() {
            return Err(DispatchError::invalid_parameter(
                name.clone(),
                "unknown parameter",
            ));
        }
    }

    let mut bound = Vec::new();
    for param in &spec.params {
        let raw = request.raw(param.name).or(param.default);
        match raw {
            Some(raw) => bound.push((param, CommandSpec::coerce(param, raw)?)),
            None if param.required => {
                return Err(DispatchError::invalid_parameter(
                    param.name,
                    "missing required parameter",
                ));
            }
            None => {}
        }
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;
    use crate::executor::StubExecutor;
    use crate::filter::MatchMode;
    use crate::record::Value;
    use crate::registry::InMemoryRegistry;
    use crate::spec::{ParamKind, QueryTemplate};

    fn services_spec() -> CommandSpec {
        CommandSpec {
            name: "services",
            about: "List Windows services",
            params: vec![
                ParamSpec::new(
                    "name",
                    ParamKind::Str,
                    ParamBinding::Filter {
                        field: "Name",
                        mode: MatchMode::Contains,
                    },
                ),
                ParamSpec::new(
                    "state",
                    ParamKind::Str,
                    ParamBinding::Filter {
                        field: "State",
                        mode: MatchMode::Equals,
                    },
                ),
                ParamSpec::new(
                    "start-mode",
                    ParamKind::Str,
                    ParamBinding::Filter {
                        field: "StartMode",
                        mode: MatchMode::Equals,
                    },
                ),
            ],
            query: QueryTemplate::new(
                "SELECT Name, DisplayName, State, StartMode, Status FROM Win32_Service",
            ),
            columns: vec!["Name", "DisplayName", "State", "StartMode", "Status"],
            privileged: false,
        }
    }

    fn class_info_spec() -> CommandSpec {
        CommandSpec {
            name: "class-info",
            about: "Inspect a WMI class",
            params: vec![
                ParamSpec::new("class_name", ParamKind::Identifier, ParamBinding::Template)
                    .required(),
            ],
            query: QueryTemplate::new("SELECT * FROM {class_name}"),
            columns: Vec::new(),
            privileged: false,
        }
    }

    fn service(name: &str, state: &str, start_mode: &str) -> ResultRecord {
        ResultRecord::from_pairs(vec![
            ("Name".into(), Value::Str(name.into())),
            ("DisplayName".into(), Value::Str(name.into())),
            ("State".into(), Value::Str(state.into())),
            ("StartMode".into(), Value::Str(start_mode.into())),
            ("Status".into(), Value::Str("OK".into())),
        ])
    }

    fn dispatcher_with(
        specs: Vec<CommandSpec>,
        executor: Arc<StubExecutor>,
        level: PrivilegeLevel,
    ) -> Dispatcher {
        let mut registry = InMemoryRegistry::new();
        for spec in specs {
            registry.register(spec).unwrap();
        }
        Dispatcher::new(
            Box::new(registry),
            executor,
            level,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn unknown_command_is_reported() {
        let executor = Arc::new(StubExecutor::returning(Vec::new()));
        let dispatcher = dispatcher_with(vec![], executor.clone(), PrivilegeLevel::Standard);
        let err = dispatcher
            .dispatch(&InvocationRequest::new("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnknownCommand(c) if c == "nope"));
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_required_param_never_reaches_executor() {
        let executor = Arc::new(StubExecutor::returning(Vec::new()));
        let dispatcher = dispatcher_with(
            vec![class_info_spec()],
            executor.clone(),
            PrivilegeLevel::Standard,
        );
        let err = dispatcher
            .dispatch(&InvocationRequest::new("class-info"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, DispatchError::InvalidParameter { ref name, .. } if name == "class_name")
        );
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn unknown_argument_is_rejected() {
        let executor = Arc::new(StubExecutor::returning(Vec::new()));
        let dispatcher = dispatcher_with(
            vec![services_spec()],
            executor.clone(),
            PrivilegeLevel::Standard,
        );
        let request = InvocationRequest::new("services").arg("bogus", "x");
        let err = dispatcher.dispatch(&request).await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidParameter { ref name, .. } if name == "bogus"));
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn conjunctive_filters_keep_matching_records_in_order() {
        let records = vec![
            service("Spooler", "Running", "Auto"),
            service("BITS", "Stopped", "Auto"),
            service("W32Time", "Running", "Manual"),
            service("Dnscache", "Running", "Auto"),
            service("Fax", "Stopped", "Manual"),
        ];
        let executor = Arc::new(StubExecutor::returning(records));
        let dispatcher = dispatcher_with(
            vec![services_spec()],
            executor.clone(),
            PrivilegeLevel::Standard,
        );
        let request = InvocationRequest::new("services")
            .arg("state", "Running")
            .arg("start-mode", "Auto");
        let out = dispatcher.dispatch(&request).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].get("Name").unwrap().display(), "Spooler");
        assert_eq!(out[1].get("Name").unwrap().display(), "Dnscache");
        assert_eq!(executor.call_count(), 1);
    }

    #[tokio::test]
    async fn executor_failure_is_wrapped() {
        let executor = Arc::new(StubExecutor::failing(ExecutorError::Timeout(30)));
        let dispatcher = dispatcher_with(
            vec![services_spec()],
            executor,
            PrivilegeLevel::Standard,
        );
        let err = dispatcher
            .dispatch(&InvocationRequest::new("services"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::QueryExecutionFailed(ExecutorError::Timeout(30))
        ));
    }

    #[tokio::test]
    async fn slow_executor_hits_the_dispatch_timeout() {
        struct SlowExecutor;
        impl QueryExecutor for SlowExecutor {
            fn execute(
                &self,
                _wql: &str,
                _columns: &[&str],
            ) -> Result<Vec<ResultRecord>, ExecutorError> {
                std::thread::sleep(Duration::from_millis(200));
                Ok(Vec::new())
            }
        }

        let mut registry = InMemoryRegistry::new();
        registry.register(services_spec()).unwrap();
        let dispatcher = Dispatcher::new(
            Box::new(registry),
            Arc::new(SlowExecutor),
            PrivilegeLevel::Standard,
            Duration::from_millis(20),
        );
        let err = dispatcher
            .dispatch(&InvocationRequest::new("services"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::QueryExecutionFailed(ExecutorError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn privileged_spec_is_gated_before_the_executor() {
        let mut spec = services_spec();
        spec.privileged = true;
        let executor = Arc::new(StubExecutor::returning(Vec::new()));
        let dispatcher =
            dispatcher_with(vec![spec], executor.clone(), PrivilegeLevel::Standard);
        let err = dispatcher
            .dispatch(&InvocationRequest::new("services"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InsufficientPrivilege(_)));
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn template_binding_renders_the_class_name() {
        let executor = Arc::new(StubExecutor::returning(Vec::new()));
        let dispatcher = dispatcher_with(
            vec![class_info_spec()],
            executor.clone(),
            PrivilegeLevel::Standard,
        );
        let request = InvocationRequest::new("class-info").arg("class_name", "Win32_BIOS");
        dispatcher.dispatch(&request).await.unwrap();
        assert_eq!(executor.call_count(), 1);
    }

    #[tokio::test]
    async fn dispatch_formatted_renders_json() {
        let executor = Arc::new(StubExecutor::returning(vec![service(
            "Spooler", "Running", "Auto",
        )]));
        let dispatcher =
            dispatcher_with(vec![services_spec()], executor, PrivilegeLevel::Standard);
        let out = dispatcher
            .dispatch_formatted(&InvocationRequest::new("services"), OutputFormat::Json)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["Name"], "Spooler");
    }

    #[tokio::test]
    async fn heterogeneous_records_fail_formatting() {
        let records = vec![
            ResultRecord::from_pairs(vec![("A".into(), Value::Int(1))]),
            ResultRecord::from_pairs(vec![("B".into(), Value::Int(2))]),
        ];
        let executor = Arc::new(StubExecutor::returning(records));
        let dispatcher =
            dispatcher_with(vec![services_spec()], executor, PrivilegeLevel::Standard);
        let err = dispatcher
            .dispatch_formatted(&InvocationRequest::new("services"), OutputFormat::Table)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Format(FormatError::Heterogeneous { .. })
        ));
    }
}
