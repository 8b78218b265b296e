//! Helpers for running Poppler binaries.

use std::process::Command;

use super::DocumentError;

/// Check if a binary is available in PATH.
pub fn check_binary(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Handle command output, extracting stdout on success or returning appropriate error.
pub(super) fn handle_cmd_output(
    result: std::io::Result<std::process::Output>,
    tool_name: &str,
    document: &str,
) -> Result<String, DocumentError> {
    match result {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                Err(DocumentError::Unreadable {
                    path: document.to_string(),
                    reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                })
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(DocumentError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(DocumentError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_maps_to_tool_not_found() {
        let result = Command::new("mzatlas-no-such-binary").output();
        let err = handle_cmd_output(result, "mzatlas-no-such-binary", "x.pdf").unwrap_err();
        assert!(matches!(err, DocumentError::ToolNotFound(_)));
    }

    #[test]
    fn test_check_binary_missing() {
        assert!(!check_binary("mzatlas-no-such-binary"));
    }
}
