//! Command execution: builds invocation requests, runs them through the
//! shared dispatcher and renders results.

use std::sync::Arc;

use owo_colors::OwoColorize;
use tracing::debug;
use wmi_common::cim::{format_bytes, parse_cim_datetime};
use wmi_common::platform::PowershellCimExecutor;
use wmi_common::{
    builtin_registry, format_records, DispatchError, Dispatcher, InvocationRequest,
    OutputFormat, PrivilegeLevel, QueryConfig, ResultRecord,
};

use crate::cli::{Cli, Commands};
use crate::errors::EXIT_SUCCESS;
use crate::output::{print_kv, print_total, report_error, report_general_error};

const KEY_WIDTH: usize = 22;

pub async fn run(cli: Cli) -> i32 {
    let level = PrivilegeLevel::detect();
    debug!(?level, "privilege level detected");

    // admin-check never touches the executor.
    if let Commands::AdminCheck { output_format } = &cli.command {
        return admin_check(level, *output_format);
    }

    let dispatcher = match build_dispatcher(level) {
        Ok(d) => d,
        Err(message) => return report_general_error(&message),
    };

    match cli.command {
        Commands::SystemInfo { output_format } => system_info(&dispatcher, output_format).await,
        Commands::Services {
            name,
            state,
            start_mode,
            output_format,
        } => {
            let mut request = InvocationRequest::new("services");
            if let Some(name) = name {
                request = request.arg("name", name);
            }
            if let Some(state) = state {
                request = request.arg("state", state);
            }
            if let Some(start_mode) = start_mode {
                request = request.arg("start-mode", start_mode);
            }
            run_list(&dispatcher, request, output_format, "services").await
        }
        Commands::Processes {
            name,
            output_format,
        } => {
            let mut request = InvocationRequest::new("processes");
            if let Some(name) = name {
                request = request.arg("name", name);
            }
            run_list(&dispatcher, request, output_format, "processes").await
        }
        Commands::Disks {
            drive_type,
            output_format,
        } => {
            let mut request = InvocationRequest::new("disks");
            if let Some(drive_type) = drive_type {
                request = request.arg("drive-type", drive_type.to_string());
            }
            run_list(&dispatcher, request, output_format, "disks").await
        }
        Commands::Network { output_format } => {
            run_list(
                &dispatcher,
                InvocationRequest::new("network"),
                output_format,
                "adapters",
            )
            .await
        }
        Commands::ListClasses {
            filter_text,
            output_format,
        } => {
            let mut request = InvocationRequest::new("classes");
            if let Some(filter_text) = filter_text {
                request = request.arg("filter-text", filter_text);
            }
            run_list(&dispatcher, request, output_format, "classes").await
        }
        Commands::ClassInfo {
            class_name,
            output_format,
        } => {
            let request = InvocationRequest::new("class-info").arg("class_name", class_name);
            run_list(&dispatcher, request, output_format, "instances").await
        }
        Commands::Query { wql, output_format } => {
            let request = InvocationRequest::new("query").arg("wql", wql);
            run_list(&dispatcher, request, output_format, "objects").await
        }
        Commands::Events {
            log_name,
            event_type,
            limit,
            output_format,
        } => {
            let mut request = InvocationRequest::new("events")
                .arg("log_name", log_name)
                .arg("limit", limit.to_string());
            if let Some(event_type) = event_type {
                request = request.arg("event-type", event_type.to_string());
            }
            run_list(&dispatcher, request, output_format, "events").await
        }
        Commands::MemoryInfo { output_format } => memory_info(&dispatcher, output_format).await,
        Commands::Uptime { output_format } => uptime(&dispatcher, output_format).await,
        Commands::AdminCheck { .. } => unreachable!("handled above"),
    }
}

fn build_dispatcher(level: PrivilegeLevel) -> Result<Dispatcher, String> {
    let config = QueryConfig::from_env();
    // Duplicate registration is a programming error: fail startup.
    let registry =
        builtin_registry().map_err(|e| format!("command catalog is broken: {}", e))?;
    let executor =
        PowershellCimExecutor::new(&config).map_err(|e| format!("cannot query WMI: {}", e))?;
    Ok(Dispatcher::new(
        Box::new(registry),
        Arc::new(executor),
        level,
        config.timeout(),
    ))
}

/// Dispatch a list-shaped command and print the records.
async fn run_list(
    dispatcher: &Dispatcher,
    request: InvocationRequest,
    format: OutputFormat,
    noun: &str,
) -> i32 {
    let columns: Vec<&'static str> = dispatcher
        .spec(&request.command)
        .map(|s| s.columns.clone())
        .unwrap_or_default();

    match dispatcher.dispatch(&request).await {
        Ok(records) => match format_records(&records, format, &columns) {
            Ok(text) => {
                if !text.is_empty() {
                    println!("{}", text);
                }
                if format == OutputFormat::Table {
                    print_total(records.len(), noun);
                }
                EXIT_SUCCESS
            }
            Err(e) => report_error(&DispatchError::Format(e), format),
        },
        Err(e) => report_error(&e, format),
    }
}

/// First record of a single-instance command (OS, computer system, BIOS).
async fn fetch_first(
    dispatcher: &Dispatcher,
    command: &str,
) -> Result<Option<ResultRecord>, DispatchError> {
    let mut records = dispatcher.dispatch(&InvocationRequest::new(command)).await?;
    if records.is_empty() {
        Ok(None)
    } else {
        Ok(Some(records.swap_remove(0)))
    }
}

fn field(record: &Option<ResultRecord>, name: &str) -> String {
    record
        .as_ref()
        .and_then(|r| r.get(name))
        .map(|v| v.display())
        .unwrap_or_else(|| "N/A".to_string())
}

fn field_u64(record: &Option<ResultRecord>, name: &str) -> Option<u64> {
    record.as_ref().and_then(|r| r.get(name)).and_then(|v| v.as_u64())
}

async fn system_info(dispatcher: &Dispatcher, format: OutputFormat) -> i32 {
    let parts = async {
        let os = fetch_first(dispatcher, "operating-system").await?;
        let cs = fetch_first(dispatcher, "computer-system").await?;
        let bios = fetch_first(dispatcher, "bios").await?;
        Ok::<_, DispatchError>((os, cs, bios))
    };
    let (os, cs, bios) = match parts.await {
        Ok(parts) => parts,
        Err(e) => return report_error(&e, format),
    };

    if format == OutputFormat::Json {
        let object = serde_json::json!({
            "operating_system": os,
            "computer_system": cs,
            "bios": bios,
        });
        match serde_json::to_string_pretty(&object) {
            Ok(text) => {
                println!("{}", text);
                EXIT_SUCCESS
            }
            Err(e) => report_general_error(&e.to_string()),
        }
    } else {
        let memory = field_u64(&cs, "TotalPhysicalMemory")
            .map(format_bytes)
            .unwrap_or_else(|| "N/A".to_string());
        println!("{}", "System Information".bold());
        print_kv("Computer Name", &field(&cs, "Name"), KEY_WIDTH);
        print_kv("Manufacturer", &field(&cs, "Manufacturer"), KEY_WIDTH);
        print_kv("Model", &field(&cs, "Model"), KEY_WIDTH);
        print_kv("OS Name", &field(&os, "Caption"), KEY_WIDTH);
        print_kv("OS Version", &field(&os, "Version"), KEY_WIDTH);
        print_kv("OS Architecture", &field(&os, "OSArchitecture"), KEY_WIDTH);
        print_kv("System Type", &field(&cs, "SystemType"), KEY_WIDTH);
        print_kv("Total Physical Memory", &memory, KEY_WIDTH);
        print_kv("BIOS Version", &field(&bios, "Version"), KEY_WIDTH);
        print_kv("Serial Number", &field(&bios, "SerialNumber"), KEY_WIDTH);
        EXIT_SUCCESS
    }
}

async fn memory_info(dispatcher: &Dispatcher, format: OutputFormat) -> i32 {
    let parts = async {
        let cs = fetch_first(dispatcher, "computer-system").await?;
        let os = fetch_first(dispatcher, "operating-system").await?;
        Ok::<_, DispatchError>((cs, os))
    };
    let (cs, os) = match parts.await {
        Ok(parts) => parts,
        Err(e) => return report_error(&e, format),
    };

    let total = field_u64(&cs, "TotalPhysicalMemory").unwrap_or(0);
    // FreePhysicalMemory is reported in kilobytes.
    let free = field_u64(&os, "FreePhysicalMemory").unwrap_or(0) * 1024;
    let used = total.saturating_sub(free);
    let used_pct = if total > 0 {
        used as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    if format == OutputFormat::Json {
        let object = serde_json::json!({
            "total_bytes": total,
            "used_bytes": used,
            "free_bytes": free,
            "used_percentage": used_pct,
        });
        println!("{}", object);
    } else {
        println!("{}", "Memory".bold());
        print_kv("Total", &format_bytes(total), KEY_WIDTH);
        print_kv("Used", &format_bytes(used), KEY_WIDTH);
        print_kv("Free", &format_bytes(free), KEY_WIDTH);
        print_kv("Usage", &format!("{:.1}%", used_pct), KEY_WIDTH);
    }
    EXIT_SUCCESS
}

async fn uptime(dispatcher: &Dispatcher, format: OutputFormat) -> i32 {
    let os = match fetch_first(dispatcher, "operating-system").await {
        Ok(os) => os,
        Err(e) => return report_error(&e, format),
    };

    let boot_raw = field(&os, "LastBootUpTime");
    let Some(boot) = parse_cim_datetime(&boot_raw) else {
        return report_general_error(&format!("unparseable boot time: {}", boot_raw));
    };
    let now = chrono::Local::now().naive_local();
    let elapsed = now.signed_duration_since(boot);
    let secs = elapsed.num_seconds().max(0);
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;

    if format == OutputFormat::Json {
        let object = serde_json::json!({
            "last_boot_time": boot.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "uptime_seconds": secs,
            "uptime_days": days,
            "uptime_hours": hours,
            "uptime_minutes": minutes,
        });
        println!("{}", object);
    } else {
        println!("{}", "Uptime".bold());
        print_kv(
            "Last Boot",
            &boot.format("%Y-%m-%d %H:%M:%S").to_string(),
            KEY_WIDTH,
        );
        print_kv(
            "Uptime",
            &format!("{} days, {} hours, {} minutes", days, hours, minutes),
            KEY_WIDTH,
        );
    }
    EXIT_SUCCESS
}

fn admin_check(level: PrivilegeLevel, format: OutputFormat) -> i32 {
    if format == OutputFormat::Json {
        let object = serde_json::json!({
            "privilege_level": level,
            "elevated": level.is_elevated(),
        });
        println!("{}", object);
    } else if level.is_elevated() {
        println!("{} Running with administrator privileges", "[OK]".green());
    } else {
        println!(
            "{} Not running with administrator privileges. Some operations may require admin rights.",
            "[WARNING]".yellow()
        );
    }
    EXIT_SUCCESS
}
