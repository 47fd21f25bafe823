//! Exit codes for the different failure modes.

use wmi_common::DispatchError;

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// Exit code for unknown commands and invalid parameters
pub const EXIT_USAGE: i32 = 64;

/// Exit code when the formatter rejects the result set
pub const EXIT_FORMAT_ERROR: i32 = 65;

/// Exit code when administrator privileges are missing
pub const EXIT_INSUFFICIENT_PRIVILEGE: i32 = 66;

/// Exit code when the WMI query itself fails (access denied, timeout, ...)
pub const EXIT_QUERY_FAILED: i32 = 70;

pub fn exit_code_for(error: &DispatchError) -> i32 {
    match error {
        DispatchError::UnknownCommand(_) | DispatchError::InvalidParameter { .. } => EXIT_USAGE,
        DispatchError::InsufficientPrivilege(_) => EXIT_INSUFFICIENT_PRIVILEGE,
        DispatchError::QueryExecutionFailed(_) => EXIT_QUERY_FAILED,
        DispatchError::Format(_) => EXIT_FORMAT_ERROR,
    }
}
