//! Platform query executor.
//!
//! On Windows, queries run through PowerShell's CIM cmdlets
//! (`Get-CimInstance -Query … | ConvertTo-Json`) and the JSON output is
//! parsed into records. Elsewhere the constructor fails with a clear
//! diagnostic; the rest of the crate stays fully usable through stub
//! executors.

use crate::config::QueryConfig;
use crate::error::ExecutorError;
use crate::executor::QueryExecutor;
use crate::record::{ResultRecord, Value};

#[derive(Debug)]
pub struct PowershellCimExecutor {
    #[cfg_attr(not(windows), allow(dead_code))]
    namespace: String,
}

impl PowershellCimExecutor {
    #[cfg(windows)]
    pub fn new(config: &QueryConfig) -> Result<Self, ExecutorError> {
        Ok(Self {
            namespace: config.namespace.clone(),
        })
    }

    #[cfg(not(windows))]
    pub fn new(_config: &QueryConfig) -> Result<Self, ExecutorError> {
        Err(ExecutorError::Backend(
            "WMI queries are only supported on Windows".to_string(),
        ))
    }
}

impl QueryExecutor for PowershellCimExecutor {
    #[cfg(windows)]
    fn execute(&self, wql: &str, columns: &[&str]) -> Result<Vec<ResultRecord>, ExecutorError> {
        let script = if is_meta_class_query(wql) {
            format!(
                "Get-CimClass -Namespace '{}' | Select-Object -ExpandProperty CimClassName \
                 | ConvertTo-Json -Compress",
                ps_quote(&self.namespace)
            )
        } else {
            let select = if columns.is_empty() {
                String::new()
            } else {
                format!(" | Select-Object -Property {}", columns.join(", "))
            };
            format!(
                "Get-CimInstance -Namespace '{}' -Query '{}'{} | ConvertTo-Json -Compress -Depth 3",
                ps_quote(&self.namespace),
                ps_quote(wql),
                select
            )
        };

        let output = std::process::Command::new("powershell")
            .args(["-NoProfile", "-NonInteractive", "-Command", &script])
            .output()
            .map_err(|e| ExecutorError::Backend(format!("failed to run powershell: {}", e)))?;

        if !output.status.success() {
            return Err(classify_stderr(&String::from_utf8_lossy(&output.stderr)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if is_meta_class_query(wql) {
            parse_class_names(stdout.trim())
        } else {
            parse_records(stdout.trim(), columns)
        }
    }

    #[cfg(not(windows))]
    fn execute(&self, _wql: &str, _columns: &[&str]) -> Result<Vec<ResultRecord>, ExecutorError> {
        Err(ExecutorError::Backend(
            "WMI queries are only supported on Windows".to_string(),
        ))
    }
}

fn is_meta_class_query(wql: &str) -> bool {
    wql.to_ascii_lowercase().contains("from meta_class")
}

/// PowerShell single-quote escaping: double the quote.
fn ps_quote(raw: &str) -> String {
    raw.replace('\'', "''")
}

/// Map a PowerShell/CIM error message onto the executor taxonomy.
fn classify_stderr(stderr: &str) -> ExecutorError {
    let lowered = stderr.to_ascii_lowercase();
    if lowered.contains("access") && lowered.contains("denied")
        || lowered.contains("permissiondenied")
        || lowered.contains("unauthorized")
    {
        ExecutorError::AccessDenied
    } else if lowered.contains("invalid query")
        || lowered.contains("invalid class")
        || lowered.contains("invalid namespace")
    {
        ExecutorError::MalformedQuery(first_line(stderr))
    } else {
        ExecutorError::Backend(first_line(stderr))
    }
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("unknown error")
        .to_string()
}

/// Parse `ConvertTo-Json` output into records. A single object (one
/// instance) comes back bare rather than as a one-element array.
fn parse_records(stdout: &str, columns: &[&str]) -> Result<Vec<ResultRecord>, ExecutorError> {
    if stdout.is_empty() {
        return Ok(Vec::new());
    }
    let parsed: serde_json::Value = serde_json::from_str(stdout)
        .map_err(|e| ExecutorError::Backend(format!("unparseable CIM output: {}", e)))?;
    let objects = match parsed {
        serde_json::Value::Array(items) => items,
        single @ serde_json::Value::Object(_) => vec![single],
        other => {
            return Err(ExecutorError::Backend(format!(
                "unexpected CIM output shape: {}",
                other
            )))
        }
    };

    let mut records = Vec::with_capacity(objects.len());
    for object in objects {
        let serde_json::Value::Object(map) = object else {
            return Err(ExecutorError::Backend(
                "unexpected non-object CIM instance".to_string(),
            ));
        };
        records.push(order_record(&map, columns));
    }
    Ok(records)
}

/// Build a record with a deterministic field order: the command's column
/// projection when known, otherwise sorted property names with CIM/PS
/// metadata properties dropped.
fn order_record(map: &serde_json::Map<String, serde_json::Value>, columns: &[&str]) -> ResultRecord {
    let mut record = ResultRecord::new();
    if columns.is_empty() {
        let mut names: Vec<&String> = map
            .keys()
            .filter(|k| !k.starts_with("Cim") && !k.starts_with("PS"))
            .collect();
        names.sort_unstable();
        for name in names {
            record.push(name.clone(), map[name].clone().into());
        }
    } else {
        for column in columns {
            let value = map
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(column))
                .map(|(_, v)| Value::from(v.clone()))
                .unwrap_or(Value::Null);
            record.push(*column, value);
        }
    }
    record
}

/// Class listing output: a JSON array of class-name strings.
fn parse_class_names(stdout: &str) -> Result<Vec<ResultRecord>, ExecutorError> {
    if stdout.is_empty() {
        return Ok(Vec::new());
    }
    let parsed: serde_json::Value = serde_json::from_str(stdout)
        .map_err(|e| ExecutorError::Backend(format!("unparseable class listing: {}", e)))?;
    let names = match parsed {
        serde_json::Value::Array(items) => items,
        single @ serde_json::Value::String(_) => vec![single],
        other => {
            return Err(ExecutorError::Backend(format!(
                "unexpected class listing shape: {}",
                other
            )))
        }
    };
    let mut sorted: Vec<String> = names
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    sorted.sort_unstable();
    Ok(sorted
        .into_iter()
        .map(|name| {
            ResultRecord::from_pairs(vec![("ClassName".to_string(), Value::Str(name))])
        })
        .collect())
}
