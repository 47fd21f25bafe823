//! Builtin command catalog.
//!
//! The static table behind both the CLI subcommands and the agent tools.
//! Registered once at process start; duplicate names here are a
//! programming error and abort startup.

use crate::error::RegistryError;
use crate::filter::MatchMode;
use crate::registry::InMemoryRegistry;
use crate::spec::{CommandSpec, ParamBinding, ParamKind, ParamSpec, QueryTemplate};

fn filter(name: &'static str, field: &'static str, mode: MatchMode) -> ParamSpec {
    ParamSpec::new(name, ParamKind::Str, ParamBinding::Filter { field, mode })
}

pub fn builtin_specs() -> Vec<CommandSpec> {
    vec![
        CommandSpec {
            name: "operating-system",
            about: "Operating system details",
            params: Vec::new(),
            query: QueryTemplate::new("SELECT * FROM Win32_OperatingSystem"),
            columns: Vec::new(),
            privileged: false,
        },
        CommandSpec {
            name: "computer-system",
            about: "Computer system details",
            params: Vec::new(),
            query: QueryTemplate::new("SELECT * FROM Win32_ComputerSystem"),
            columns: Vec::new(),
            privileged: false,
        },
        CommandSpec {
            name: "bios",
            about: "BIOS details",
            params: Vec::new(),
            query: QueryTemplate::new("SELECT * FROM Win32_BIOS"),
            columns: Vec::new(),
            privileged: false,
        },
        CommandSpec {
            name: "processors",
            about: "Processor details",
            params: Vec::new(),
            query: QueryTemplate::new("SELECT * FROM Win32_Processor"),
            columns: Vec::new(),
            privileged: false,
        },
        CommandSpec {
            name: "services",
            about: "Windows services",
            params: vec![
                filter("name", "Name", MatchMode::Contains),
                filter("state", "State", MatchMode::Equals),
                filter("start-mode", "StartMode", MatchMode::Equals),
            ],
            query: QueryTemplate::new(
                "SELECT Name, DisplayName, State, StartMode, Status FROM Win32_Service",
            ),
            columns: vec!["Name", "DisplayName", "State", "StartMode", "Status"],
            privileged: false,
        },
        CommandSpec {
            name: "processes",
            about: "Running processes",
            params: vec![filter("name", "Name", MatchMode::Contains)],
            query: QueryTemplate::new(
                "SELECT ProcessId, Name, ThreadCount, WorkingSetSize, CommandLine \
                 FROM Win32_Process",
            ),
            columns: vec![
                "ProcessId",
                "Name",
                "ThreadCount",
                "WorkingSetSize",
                "CommandLine",
            ],
            privileged: false,
        },
        CommandSpec {
            name: "disks",
            about: "Logical disk drives",
            params: vec![ParamSpec::new(
                "drive-type",
                ParamKind::Integer,
                ParamBinding::Filter {
                    field: "DriveType",
                    mode: MatchMode::Equals,
                },
            )],
            query: QueryTemplate::new(
                "SELECT DeviceID, VolumeName, DriveType, FileSystem, Size, FreeSpace \
                 FROM Win32_LogicalDisk",
            ),
            columns: vec![
                "DeviceID",
                "VolumeName",
                "DriveType",
                "FileSystem",
                "Size",
                "FreeSpace",
            ],
            privileged: false,
        },
        CommandSpec {
            name: "network",
            about: "IP-enabled network adapters",
            params: Vec::new(),
            query: QueryTemplate::new(
                "SELECT * FROM Win32_NetworkAdapterConfiguration WHERE IPEnabled = TRUE",
            ),
            columns: Vec::new(),
            privileged: false,
        },
        CommandSpec {
            name: "classes",
            about: "Available WMI classes",
            params: vec![filter("filter-text", "ClassName", MatchMode::Contains)],
            query: QueryTemplate::new("SELECT * FROM meta_class"),
            columns: vec!["ClassName"],
            privileged: false,
        },
        CommandSpec {
            name: "class-info",
            about: "Instances of a WMI class",
            params: vec![
                ParamSpec::new("class_name", ParamKind::Identifier, ParamBinding::Template)
                    .required(),
            ],
            query: QueryTemplate::new("SELECT * FROM {class_name}"),
            columns: Vec::new(),
            privileged: false,
        },
        CommandSpec {
            name: "query",
            about: "Raw WQL query",
            params: vec![
                ParamSpec::new("wql", ParamKind::Wql, ParamBinding::Template).required(),
            ],
            query: QueryTemplate::new("{wql}"),
            columns: Vec::new(),
            privileged: false,
        },
        CommandSpec {
            name: "process-performance",
            about: "Per-process CPU and memory counters",
            params: vec![filter("name", "Name", MatchMode::Contains)],
            query: QueryTemplate::new(
                "SELECT Name, IDProcess, PercentProcessorTime, WorkingSet \
                 FROM Win32_PerfFormattedData_PerfProc_Process",
            ),
            columns: vec!["Name", "IDProcess", "PercentProcessorTime", "WorkingSet"],
            privileged: false,
        },
        // Security log reads fail without elevation, so gate up front.
        CommandSpec {
            name: "events",
            about: "Windows event log entries",
            params: vec![
                ParamSpec::new("log_name", ParamKind::Str, ParamBinding::Template)
                    .with_default("System"),
                ParamSpec::new(
                    "event-type",
                    ParamKind::Integer,
                    ParamBinding::Filter {
                        field: "Type",
                        mode: MatchMode::Equals,
                    },
                ),
                ParamSpec::new("limit", ParamKind::Integer, ParamBinding::Limit)
                    .with_default("100"),
            ],
            query: QueryTemplate::new(
                "SELECT RecordNumber, Logfile, EventCode, Type, SourceName, TimeGenerated, \
                 Message FROM Win32_NTLogEvent WHERE Logfile = '{log_name}'",
            ),
            columns: vec![
                "RecordNumber",
                "Logfile",
                "EventCode",
                "Type",
                "SourceName",
                "TimeGenerated",
                "Message",
            ],
            privileged: true,
        },
    ]
}

/// Build the default registry from the builtin table.
pub fn builtin_registry() -> Result<InMemoryRegistry, RegistryError> {
    let mut registry = InMemoryRegistry::new();
    for spec in builtin_specs() {
        registry.register(spec)?;
    }
    Ok(registry)
}
