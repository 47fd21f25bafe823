//! End-to-end dispatch scenarios against stub executors, using the real
//! builtin catalog.

use std::sync::Arc;
use std::time::Duration;

use wmi_common::{
    builtin_registry, format_records, DispatchError, Dispatcher, ExecutorError,
    InvocationRequest, OutputFormat, PrivilegeLevel, ResultRecord, StubExecutor, Value,
};

fn service(name: &str, state: &str, start_mode: &str) -> ResultRecord {
    ResultRecord::from_pairs(vec![
        ("Name".into(), Value::Str(name.into())),
        ("DisplayName".into(), Value::Str(format!("{} Service", name))),
        ("State".into(), Value::Str(state.into())),
        ("StartMode".into(), Value::Str(start_mode.into())),
        ("Status".into(), Value::Str("OK".into())),
    ])
}

fn dispatcher(executor: Arc<StubExecutor>, level: PrivilegeLevel) -> Dispatcher {
    let registry = builtin_registry().expect("builtin catalog must register cleanly");
    Dispatcher::new(Box::new(registry), executor, level, Duration::from_secs(5))
}

#[tokio::test]
async fn services_filtering_scenario() {
    // Five services, two of which are running with automatic start.
    let executor = Arc::new(StubExecutor::returning(vec![
        service("Spooler", "Running", "Auto"),
        service("BITS", "Stopped", "Auto"),
        service("W32Time", "Running", "Manual"),
        service("Dnscache", "Running", "Auto"),
        service("Fax", "Stopped", "Manual"),
    ]));
    let dispatcher = dispatcher(executor.clone(), PrivilegeLevel::Standard);

    let request = InvocationRequest::new("services")
        .arg("state", "Running")
        .arg("start-mode", "Auto");
    let records = dispatcher.dispatch(&request).await.unwrap();
    assert_eq!(executor.call_count(), 1);

    let table = format_records(&records, OutputFormat::Table, &[]).unwrap();
    assert_eq!(table.lines().count(), 3); // header + 2 matches

    let json = format_records(&records, OutputFormat::Json, &[]).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let array = parsed.as_array().unwrap();
    assert_eq!(array.len(), 2);
    assert_eq!(array[0]["Name"], "Spooler");
    assert_eq!(array[0]["DisplayName"], "Spooler Service");
    assert_eq!(array[1]["Name"], "Dnscache");
}

#[tokio::test]
async fn raw_query_timeout_scenario() {
    let executor = Arc::new(StubExecutor::failing(ExecutorError::Timeout(30)));
    let dispatcher = dispatcher(executor, PrivilegeLevel::Standard);

    let request =
        InvocationRequest::new("query").arg("wql", "SELECT * FROM Win32_OperatingSystem");
    let err = dispatcher.dispatch(&request).await.unwrap_err();
    assert!(matches!(
        err,
        DispatchError::QueryExecutionFailed(ExecutorError::Timeout(30))
    ));
}

#[tokio::test]
async fn events_requires_elevation() {
    let executor = Arc::new(StubExecutor::returning(Vec::new()));
    let standard = dispatcher(executor.clone(), PrivilegeLevel::Standard);
    let err = standard
        .dispatch(&InvocationRequest::new("events"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::InsufficientPrivilege(_)));
    assert_eq!(executor.call_count(), 0);

    let elevated = dispatcher(executor.clone(), PrivilegeLevel::Elevated);
    elevated
        .dispatch(&InvocationRequest::new("events"))
        .await
        .unwrap();
    assert_eq!(executor.call_count(), 1);
}

#[tokio::test]
async fn events_limit_truncates_after_filtering() {
    let records: Vec<ResultRecord> = (0..10)
        .map(|i| {
            ResultRecord::from_pairs(vec![
                ("RecordNumber".into(), Value::Int(i)),
                ("Logfile".into(), Value::Str("System".into())),
                ("Type".into(), Value::Int(if i % 2 == 0 { 1 } else { 2 })),
            ])
        })
        .collect();
    let executor = Arc::new(StubExecutor::returning(records));
    let dispatcher = dispatcher(executor, PrivilegeLevel::Elevated);

    let request = InvocationRequest::new("events")
        .arg("event-type", "1")
        .arg("limit", "3");
    let out = dispatcher.dispatch(&request).await.unwrap();
    assert_eq!(out.len(), 3);
    assert!(out
        .iter()
        .all(|r| r.get("Type") == Some(&Value::Int(1))));
}

#[tokio::test]
async fn malformed_wql_is_rejected_before_the_executor() {
    let executor = Arc::new(StubExecutor::returning(Vec::new()));
    let dispatcher = dispatcher(executor.clone(), PrivilegeLevel::Standard);

    let request = InvocationRequest::new("query").arg("wql", "DROP TABLE Win32_Service");
    let err = dispatcher.dispatch(&request).await.unwrap_err();
    assert!(matches!(err, DispatchError::InvalidParameter { .. }));
    assert_eq!(executor.call_count(), 0);
}

#[tokio::test]
async fn empty_services_render_header_only_table() {
    let executor = Arc::new(StubExecutor::returning(Vec::new()));
    let dispatcher = dispatcher(executor, PrivilegeLevel::Standard);

    let request = InvocationRequest::new("services").arg("name", "nonexistent");
    let out = dispatcher
        .dispatch_formatted(&request, OutputFormat::Table)
        .await
        .unwrap();
    let lines: Vec<_> = out.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("Name"));
    assert!(lines[0].contains("StartMode"));
}
