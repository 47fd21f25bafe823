//! Command specifications.
//!
//! A `CommandSpec` describes one dispatchable operation: its parameter
//! schema, the WQL template it renders, and how each bound parameter is
//! consumed (template substitution, in-memory filter, or result limit).
//! Specs are built once at startup and never mutated.

use crate::error::DispatchError;
use crate::filter::MatchMode;

/// Declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Free-form string. Quote-escaped if substituted into a template.
    Str,
    /// WMI class or property name: `[A-Za-z0-9_]+` only.
    Identifier,
    Integer,
    Bool,
    /// A complete WQL statement replacing the whole template.
    Wql,
}

/// How the dispatcher consumes a bound parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamBinding {
    /// Substituted into the query template at `{name}`.
    Template,
    /// Applied as a pure in-memory filter over the returned records.
    Filter { field: &'static str, mode: MatchMode },
    /// Truncates the record sequence after filtering.
    Limit,
}

/// One entry in a command's parameter schema.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<&'static str>,
    pub binding: ParamBinding,
}

impl ParamSpec {
    pub fn new(name: &'static str, kind: ParamKind, binding: ParamBinding) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            binding,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }
}

/// A validated, typed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl BoundValue {
    pub fn as_text(&self) -> String {
        match self {
            BoundValue::Str(s) => s.clone(),
            BoundValue::Int(i) => i.to_string(),
            BoundValue::Bool(b) => b.to_string(),
        }
    }
}

/// WQL text with `{name}` placeholders for template-bound parameters.
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    pub text: &'static str,
}

impl QueryTemplate {
    pub const fn new(text: &'static str) -> Self {
        Self { text }
    }

    /// Render the template with the given bound parameters. String values
    /// are single-quote escaped; identifiers and WQL text were already
    /// validated during parameter binding and substitute verbatim.
    pub fn render(&self, params: &[(&ParamSpec, BoundValue)]) -> String {
        let mut query = self.text.to_string();
        for (spec, value) in params {
            if spec.binding != ParamBinding::Template {
                continue;
            }
            let placeholder = format!("{{{}}}", spec.name);
            let substitution = match (spec.kind, value) {
                (ParamKind::Str, BoundValue::Str(s)) => escape_wql_string(s),
                (_, v) => v.as_text(),
            };
            query = query.replace(&placeholder, &substitution);
        }
        query
    }
}

/// Escape a string for inclusion inside WQL single quotes.
pub fn escape_wql_string(raw: &str) -> String {
    raw.replace('\'', "''")
}

/// A single dispatchable command or agent tool.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub name: &'static str,
    pub about: &'static str,
    pub params: Vec<ParamSpec>,
    pub query: QueryTemplate,
    /// SELECT projection, used to order fields and render empty-table
    /// headers. Empty for `SELECT *` shapes.
    pub columns: Vec<&'static str>,
    pub privileged: bool,
}

impl CommandSpec {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Coerce a raw argument string to the declared kind.
    pub fn coerce(spec: &ParamSpec, raw: &str) -> Result<BoundValue, DispatchError> {
        match spec.kind {
            ParamKind::Str => Ok(BoundValue::Str(raw.to_string())),
            ParamKind::Identifier => {
                if !raw.is_empty()
                    && raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    Ok(BoundValue::Str(raw.to_string()))
                } else {
                    Err(DispatchError::invalid_parameter(
                        spec.name,
                        format!("'{}' is not a valid WMI identifier", raw),
                    ))
                }
            }
            ParamKind::Integer => raw.parse::<i64>().map(BoundValue::Int).map_err(|_| {
                DispatchError::invalid_parameter(
                    spec.name,
                    format!("'{}' is not an integer", raw),
                )
            }),
            ParamKind::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(BoundValue::Bool(true)),
                "false" | "no" | "0" => Ok(BoundValue::Bool(false)),
                _ => Err(DispatchError::invalid_parameter(
                    spec.name,
                    format!("'{}' is not a boolean", raw),
                )),
            },
            ParamKind::Wql => {
                let trimmed = raw.trim();
                if trimmed.to_ascii_lowercase().starts_with("select") {
                    Ok(BoundValue::Str(trimmed.to_string()))
                } else {
                    Err(DispatchError::invalid_parameter(
                        spec.name,
                        "only SELECT queries are supported",
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template_param(name: &'static str, kind: ParamKind) -> ParamSpec {
        ParamSpec::new(name, kind, ParamBinding::Template)
    }

    #[test]
    fn template_substitutes_and_escapes_strings() {
        let spec = template_param("log_name", ParamKind::Str);
        let template =
            QueryTemplate::new("SELECT * FROM Win32_NTLogEvent WHERE Logfile = '{log_name}'");
        let bound = BoundValue::Str("Sys'tem".to_string());
        let rendered = template.render(&[(&spec, bound)]);
        assert_eq!(
            rendered,
            "SELECT * FROM Win32_NTLogEvent WHERE Logfile = 'Sys''tem'"
        );
    }

    #[test]
    fn identifier_kind_rejects_punctuation() {
        let spec = template_param("class_name", ParamKind::Identifier);
        assert!(CommandSpec::coerce(&spec, "Win32_Service").is_ok());
        let err = CommandSpec::coerce(&spec, "Win32_Service; DROP").unwrap_err();
        assert!(matches!(err, DispatchError::InvalidParameter { .. }));
    }

    #[test]
    fn integer_kind_rejects_text() {
        let spec = template_param("drive-type", ParamKind::Integer);
        assert_eq!(
            CommandSpec::coerce(&spec, "3").unwrap(),
            BoundValue::Int(3)
        );
        assert!(CommandSpec::coerce(&spec, "local").is_err());
    }

    #[test]
    fn wql_kind_requires_select() {
        let spec = template_param("wql", ParamKind::Wql);
        assert!(CommandSpec::coerce(&spec, "SELECT * FROM Win32_BIOS").is_ok());
        assert!(CommandSpec::coerce(&spec, "DELETE FROM Win32_BIOS").is_err());
    }
}
