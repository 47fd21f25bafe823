//! Agent tools.
//!
//! Each tool is a thin adapter from a model-issued tool call onto the
//! shared dispatcher. Tool failures are returned to the model as plain
//! strings so it can relay them conversationally; they never crash the
//! agent.

use serde_json::{json, Value};
use tracing::{debug, warn};
use wmi_common::cim::{format_bytes, parse_cim_datetime};
use wmi_common::{
    format_records, DispatchError, Dispatcher, InvocationRequest, OutputFormat, ResultRecord,
};

/// Routes tool calls onto the dispatcher.
pub struct ToolRouter {
    dispatcher: Dispatcher,
}

/// OpenAI-style function schemas for every tool.
pub fn tool_schemas() -> Vec<Value> {
    fn tool(name: &str, description: &str, parameters: Value) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": name,
                "description": description,
                "parameters": parameters,
            }
        })
    }
    let no_args = json!({"type": "object", "properties": {}});

    vec![
        tool(
            "get_system_info",
            "Get detailed system information including OS, hardware, and BIOS details",
            no_args.clone(),
        ),
        tool(
            "get_memory_info",
            "Get memory usage including total, used, and available memory",
            no_args.clone(),
        ),
        tool(
            "get_cpu_info",
            "Get CPU and processor information",
            no_args.clone(),
        ),
        tool(
            "get_disk_info",
            "Get local disk drives with size, free space, and usage",
            no_args.clone(),
        ),
        tool(
            "get_network_info",
            "Get network adapter configuration and IP addresses",
            no_args.clone(),
        ),
        tool(
            "get_uptime",
            "Get system uptime since last boot",
            no_args.clone(),
        ),
        tool(
            "check_admin_privileges",
            "Check if running with administrator privileges",
            no_args.clone(),
        ),
        tool(
            "list_services",
            "List Windows services with optional state filtering",
            json!({
                "type": "object",
                "properties": {
                    "state": {
                        "type": "string",
                        "description": "Filter by state: 'Running' or 'Stopped'"
                    }
                }
            }),
        ),
        tool(
            "get_service_status",
            "Get status of a specific Windows service",
            json!({
                "type": "object",
                "properties": {
                    "service_name": {
                        "type": "string",
                        "description": "Name of the service to query"
                    }
                },
                "required": ["service_name"]
            }),
        ),
        tool(
            "list_processes",
            "List running processes, top consumers of memory first",
            no_args.clone(),
        ),
        tool(
            "get_process_performance",
            "Get per-process CPU and memory usage from performance counters",
            no_args,
        ),
        tool(
            "execute_wql_query",
            "Execute a custom WQL query (e.g. 'SELECT * FROM Win32_Service')",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "WQL query to execute"
                    }
                },
                "required": ["query"]
            }),
        ),
    ]
}

impl ToolRouter {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Execute one tool call. Errors come back as text for the model.
    pub async fn call(&self, name: &str, arguments: &str) -> String {
        let args: Value = if arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(arguments).unwrap_or_else(|e| {
                warn!(tool = name, "unparseable tool arguments: {}", e);
                json!({})
            })
        };
        debug!(tool = name, "executing tool call");

        let result = match name {
            "get_system_info" => self.system_info().await,
            "get_memory_info" => self.memory_info().await,
            "get_cpu_info" => self.cpu_info().await,
            "get_disk_info" => self.disk_info().await,
            "get_network_info" => self.network_info().await,
            "get_uptime" => self.uptime().await,
            "check_admin_privileges" => Ok(self.admin_privileges()),
            "list_services" => self.list_services(arg_str(&args, "state")).await,
            "get_service_status" => match arg_str(&args, "service_name") {
                Some(service) => self.service_status(&service).await,
                None => Ok("Error: service_name is required".to_string()),
            },
            "list_processes" => self.list_processes().await,
            "get_process_performance" => self.process_performance().await,
            "execute_wql_query" => match arg_str(&args, "query") {
                Some(query) => self.wql_query(&query).await,
                None => Ok("Error: query is required".to_string()),
            },
            other => Ok(format!("Error: unknown tool '{}'", other)),
        };

        result.unwrap_or_else(|e| format!("Error: {}", e))
    }

    async fn first(&self, command: &str) -> Result<Option<ResultRecord>, DispatchError> {
        let mut records = self
            .dispatcher
            .dispatch(&InvocationRequest::new(command))
            .await?;
        Ok(if records.is_empty() {
            None
        } else {
            Some(records.swap_remove(0))
        })
    }

    async fn system_info(&self) -> Result<String, DispatchError> {
        let os = self.first("operating-system").await?;
        let cs = self.first("computer-system").await?;
        let bios = self.first("bios").await?;

        let memory = get_u64(&cs, "TotalPhysicalMemory")
            .map(format_bytes)
            .unwrap_or_else(|| "N/A".to_string());
        Ok(format!(
            "System Information:\n  OS: {} {}\n  Computer: {}\n  Manufacturer: {}\n  \
             Model: {}\n  Architecture: {}\n  Memory: {}\n  BIOS: {}\n  Serial Number: {}",
            get(&os, "Caption"),
            get(&os, "Version"),
            get(&cs, "Name"),
            get(&cs, "Manufacturer"),
            get(&cs, "Model"),
            get(&os, "OSArchitecture"),
            memory,
            get(&bios, "Version"),
            get(&bios, "SerialNumber"),
        ))
    }

    async fn memory_info(&self) -> Result<String, DispatchError> {
        let cs = self.first("computer-system").await?;
        let os = self.first("operating-system").await?;
        let total = get_u64(&cs, "TotalPhysicalMemory").unwrap_or(0);
        // FreePhysicalMemory is reported in kilobytes.
        let free = get_u64(&os, "FreePhysicalMemory").unwrap_or(0) * 1024;
        let used = total.saturating_sub(free);
        let pct = if total > 0 {
            used as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Ok(format!(
            "Memory Information:\n  Total: {}\n  Used: {}\n  Free: {}\n  Usage: {:.1}%",
            format_bytes(total),
            format_bytes(used),
            format_bytes(free),
            pct
        ))
    }

    async fn cpu_info(&self) -> Result<String, DispatchError> {
        let Some(cpu) = self.first("processors").await? else {
            return Ok("No CPU information available".to_string());
        };
        let one = Some(cpu);
        let mut text = format!(
            "CPU Information:\n  Processor: {}\n  Manufacturer: {}\n  Cores: {}\n  \
             Logical Processors: {}\n  Max Speed: {} MHz",
            get(&one, "Name"),
            get(&one, "Manufacturer"),
            get(&one, "NumberOfCores"),
            get(&one, "NumberOfLogicalProcessors"),
            get(&one, "MaxClockSpeed"),
        );
        if let Some(load) = get_u64(&one, "LoadPercentage") {
            text.push_str(&format!("\n  Load: {}%", load));
        }
        Ok(text)
    }

    async fn disk_info(&self) -> Result<String, DispatchError> {
        // DriveType 3 = local disk.
        let request = InvocationRequest::new("disks").arg("drive-type", "3");
        let records = self.dispatcher.dispatch(&request).await?;
        if records.is_empty() {
            return Ok("No disk information available".to_string());
        }
        let mut text = "Disk Drives:".to_string();
        for disk in &records {
            let one = Some(disk.clone());
            let size = get_u64(&one, "Size").unwrap_or(0);
            let free = get_u64(&one, "FreeSpace").unwrap_or(0);
            let used_pct = if size > 0 {
                (size - free) as f64 / size as f64 * 100.0
            } else {
                0.0
            };
            text.push_str(&format!(
                "\n  {}:\n    Size: {}\n    Free: {}\n    Used: {:.1}%\n    File System: {}",
                get(&one, "DeviceID"),
                format_bytes(size),
                format_bytes(free),
                used_pct,
                get(&one, "FileSystem"),
            ));
        }
        Ok(text)
    }

    async fn network_info(&self) -> Result<String, DispatchError> {
        let records = self
            .dispatcher
            .dispatch(&InvocationRequest::new("network"))
            .await?;
        if records.is_empty() {
            return Ok("No active network adapters found".to_string());
        }
        Ok(format!(
            "Network Adapters:\n{}",
            format_records(&records, OutputFormat::Json, &[])?
        ))
    }

    async fn uptime(&self) -> Result<String, DispatchError> {
        let os = self.first("operating-system").await?;
        let boot_raw = get(&os, "LastBootUpTime");
        let Some(boot) = parse_cim_datetime(&boot_raw) else {
            return Ok(format!("Error: unparseable boot time '{}'", boot_raw));
        };
        let now = chrono_now();
        let secs = now.signed_duration_since(boot).num_seconds().max(0);
        Ok(format!(
            "System Uptime:\n  Last Boot: {}\n  Uptime: {} days, {} hours, {} minutes",
            boot.format("%Y-%m-%dT%H:%M:%S"),
            secs / 86_400,
            (secs % 86_400) / 3_600,
            (secs % 3_600) / 60,
        ))
    }

    fn admin_privileges(&self) -> String {
        if self.dispatcher.privilege_level().is_elevated() {
            "Running with administrator privileges".to_string()
        } else {
            "NOT running with administrator privileges. Some operations may be restricted."
                .to_string()
        }
    }

    async fn list_services(&self, state: Option<String>) -> Result<String, DispatchError> {
        let mut request = InvocationRequest::new("services");
        if let Some(state) = state {
            request = request.arg("state", state);
        }
        let records = self.dispatcher.dispatch(&request).await?;
        let total = records.len();
        let shown: Vec<ResultRecord> = records.into_iter().take(20).collect();
        let mut text = format!(
            "Windows Services ({}):\n{}",
            total,
            format_records(&shown, OutputFormat::Json, &[])?
        );
        if total > shown.len() {
            text.push_str(&format!("\n... and {} more services", total - shown.len()));
        }
        Ok(text)
    }

    async fn service_status(&self, service_name: &str) -> Result<String, DispatchError> {
        let request = InvocationRequest::new("services").arg("name", service_name);
        let records = self.dispatcher.dispatch(&request).await?;
        let exact = records.iter().find(|r| {
            r.get("Name")
                .map(|v| v.display().eq_ignore_ascii_case(service_name))
                .unwrap_or(false)
        });
        match exact.or_else(|| records.first()) {
            Some(service) => {
                let one = Some(service.clone());
                Ok(format!(
                    "Service: {}\n  Display Name: {}\n  State: {}\n  Start Mode: {}\n  Status: {}",
                    get(&one, "Name"),
                    get(&one, "DisplayName"),
                    get(&one, "State"),
                    get(&one, "StartMode"),
                    get(&one, "Status"),
                ))
            }
            None => Ok(format!("Service '{}' not found", service_name)),
        }
    }

    async fn list_processes(&self) -> Result<String, DispatchError> {
        let mut records = self
            .dispatcher
            .dispatch(&InvocationRequest::new("processes"))
            .await?;
        if records.is_empty() {
            return Ok("No processes found".to_string());
        }
        records.sort_by_key(|r| {
            std::cmp::Reverse(r.get("WorkingSetSize").and_then(|v| v.as_u64()).unwrap_or(0))
        });
        let mut text = "Running Processes (Top 15 by Memory):".to_string();
        for (i, proc) in records.iter().take(15).enumerate() {
            let one = Some(proc.clone());
            let mem = get_u64(&one, "WorkingSetSize").unwrap_or(0);
            text.push_str(&format!(
                "\n  {}. {} (PID: {}) - {}",
                i + 1,
                get(&one, "Name"),
                get(&one, "ProcessId"),
                format_bytes(mem),
            ));
        }
        Ok(text)
    }

    async fn process_performance(&self) -> Result<String, DispatchError> {
        let records = self
            .dispatcher
            .dispatch(&InvocationRequest::new("process-performance"))
            .await?;
        let mut usable: Vec<&ResultRecord> = records
            .iter()
            .filter(|r| {
                let name = r.get("Name").map(|v| v.display()).unwrap_or_default();
                let pid = r.get("IDProcess").and_then(|v| v.as_u64()).unwrap_or(0);
                pid != 0 && name != "_Total" && name != "Idle"
            })
            .collect();
        if usable.is_empty() {
            return Ok(
                "No performance data available. Performance counters may be disabled."
                    .to_string(),
            );
        }
        usable.sort_by_key(|r| {
            std::cmp::Reverse(
                r.get("PercentProcessorTime")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0),
            )
        });
        let mut text = "Process Performance (Top 15 by CPU Usage):".to_string();
        for (i, proc) in usable.iter().take(15).enumerate() {
            let one = Some((*proc).clone());
            let mem = get_u64(&one, "WorkingSet").unwrap_or(0);
            text.push_str(&format!(
                "\n  {}. {} (PID: {}) - CPU: {}%, Memory: {}",
                i + 1,
                get(&one, "Name"),
                get(&one, "IDProcess"),
                get(&one, "PercentProcessorTime"),
                format_bytes(mem),
            ));
        }
        Ok(text)
    }

    async fn wql_query(&self, query: &str) -> Result<String, DispatchError> {
        let request = InvocationRequest::new("query").arg("wql", query);
        let records = self.dispatcher.dispatch(&request).await?;
        if records.is_empty() {
            return Ok("Query returned no results".to_string());
        }
        let total = records.len();
        let shown: Vec<ResultRecord> = records.into_iter().take(5).collect();
        Ok(format!(
            "Query Results ({} total, showing first {}):\n{}",
            total,
            shown.len(),
            format_records(&shown, OutputFormat::Json, &[])?
        ))
    }
}

fn arg_str(args: &Value, name: &str) -> Option<String> {
    args.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn get(record: &Option<ResultRecord>, name: &str) -> String {
    record
        .as_ref()
        .and_then(|r| r.get(name))
        .map(|v| v.display())
        .unwrap_or_else(|| "N/A".to_string())
}

fn get_u64(record: &Option<ResultRecord>, name: &str) -> Option<u64> {
    record.as_ref().and_then(|r| r.get(name)).and_then(|v| v.as_u64())
}

fn chrono_now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use wmi_common::{
        builtin_registry, ExecutorError, PrivilegeLevel, StubExecutor, Value as RecordValue,
    };

    fn service(name: &str, state: &str) -> ResultRecord {
        ResultRecord::from_pairs(vec![
            ("Name".into(), RecordValue::Str(name.into())),
            ("DisplayName".into(), RecordValue::Str(format!("{} Service", name))),
            ("State".into(), RecordValue::Str(state.into())),
            ("StartMode".into(), RecordValue::Str("Auto".into())),
            ("Status".into(), RecordValue::Str("OK".into())),
        ])
    }

    fn router(executor: StubExecutor, level: PrivilegeLevel) -> ToolRouter {
        let registry = builtin_registry().unwrap();
        ToolRouter::new(Dispatcher::new(
            Box::new(registry),
            Arc::new(executor),
            level,
            Duration::from_secs(5),
        ))
    }

    #[test]
    fn every_schema_is_a_function_declaration() {
        let schemas = tool_schemas();
        assert_eq!(schemas.len(), 12);
        for schema in &schemas {
            assert_eq!(schema["type"], "function");
            assert!(schema["function"]["name"].is_string());
            assert!(schema["function"]["parameters"].is_object());
        }
    }

    #[tokio::test]
    async fn service_status_prefers_the_exact_name_match() {
        let executor = StubExecutor::returning(vec![
            service("SpoolerHelper", "Stopped"),
            service("Spooler", "Running"),
        ]);
        let router = router(executor, PrivilegeLevel::Standard);
        let text = router
            .call("get_service_status", r#"{"service_name": "spooler"}"#)
            .await;
        assert!(text.contains("Service: Spooler\n"), "got: {}", text);
        assert!(text.contains("State: Running"));
    }

    #[tokio::test]
    async fn list_services_reports_totals_and_truncates() {
        let records: Vec<ResultRecord> =
            (0..25).map(|i| service(&format!("svc{}", i), "Running")).collect();
        let router = router(StubExecutor::returning(records), PrivilegeLevel::Standard);
        let text = router.call("list_services", "{}").await;
        assert!(text.starts_with("Windows Services (25):"));
        assert!(text.contains("... and 5 more services"));
    }

    #[tokio::test]
    async fn tool_errors_are_returned_as_text() {
        let router = router(
            StubExecutor::failing(ExecutorError::Timeout(30)),
            PrivilegeLevel::Standard,
        );
        let text = router
            .call("execute_wql_query", r#"{"query": "SELECT * FROM Win32_BIOS"}"#)
            .await;
        assert!(text.starts_with("Error:"), "got: {}", text);
        assert!(text.contains("timed out"));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_not_panicked() {
        let router = router(StubExecutor::returning(Vec::new()), PrivilegeLevel::Standard);
        let text = router.call("reboot_server", "{}").await;
        assert!(text.contains("unknown tool"));
    }

    #[tokio::test]
    async fn admin_privilege_tool_reflects_the_threaded_level() {
        let router = router(StubExecutor::returning(Vec::new()), PrivilegeLevel::Elevated);
        let text = router.call("check_admin_privileges", "").await;
        assert_eq!(text, "Running with administrator privileges");
    }
}
