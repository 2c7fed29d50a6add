//! Typed view of the error channel's status payload.
//!
//! At the end of an exec the server reports the command's outcome as a
//! JSON status object on the error channel. A `Success` status means exit
//! code zero; a `Failure` with reason `NonZeroExitCode` carries the code
//! in its cause list.

use serde::{Deserialize, Serialize};

use crate::error::Result;

const STATUS_SUCCESS: &str = "Success";
const REASON_NON_ZERO_EXIT: &str = "NonZeroExitCode";
const CAUSE_EXIT_CODE: &str = "ExitCode";

/// Outcome of the remote command, as reported on the error channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStatus {
    /// `"Success"` or `"Failure"`.
    #[serde(default)]
    pub status: String,
    /// Human-readable description of the outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Machine-readable failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Structured failure details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<StatusDetails>,
}

/// Structured details attached to a failure status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDetails {
    /// Individual causes contributing to the failure.
    #[serde(default)]
    pub causes: Vec<StatusCause>,
}

/// One cause within a failure status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCause {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandStatus {
    /// Parse a status payload read from the error channel.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Whether the command completed with exit code zero.
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// The command's exit code, when the status carries one.
    ///
    /// Returns `Some(0)` for a success status, the parsed code for a
    /// `NonZeroExitCode` failure, and `None` when the failure was not
    /// about the command's exit (e.g. the container does not exist).
    pub fn exit_code(&self) -> Option<i32> {
        if self.is_success() {
            return Some(0);
        }
        if self.reason.as_deref() != Some(REASON_NON_ZERO_EXIT) {
            return None;
        }
        self.details
            .as_ref()?
            .causes
            .iter()
            .find(|cause| cause.reason.as_deref() == Some(CAUSE_EXIT_CODE))
            .and_then(|cause| cause.message.as_deref())
            .and_then(|code| code.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_status() {
        let status = CommandStatus::from_payload(br#"{"status":"Success"}"#).unwrap();
        assert!(status.is_success());
        assert_eq!(status.exit_code(), Some(0));
    }

    #[test]
    fn non_zero_exit_code_extracted() {
        let payload = br#"{
            "status": "Failure",
            "message": "command terminated with non-zero exit code",
            "reason": "NonZeroExitCode",
            "details": {"causes": [{"reason": "ExitCode", "message": "42"}]}
        }"#;
        let status = CommandStatus::from_payload(payload).unwrap();
        assert!(!status.is_success());
        assert_eq!(status.exit_code(), Some(42));
    }

    #[test]
    fn unrelated_failure_has_no_exit_code() {
        let payload = br#"{"status":"Failure","reason":"InternalError","message":"boom"}"#;
        let status = CommandStatus::from_payload(payload).unwrap();
        assert_eq!(status.exit_code(), None);
    }

    #[test]
    fn unparsable_exit_code_is_none() {
        let payload = br#"{
            "status": "Failure",
            "reason": "NonZeroExitCode",
            "details": {"causes": [{"reason": "ExitCode", "message": "not-a-number"}]}
        }"#;
        let status = CommandStatus::from_payload(payload).unwrap();
        assert_eq!(status.exit_code(), None);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let result = CommandStatus::from_payload(b"{not-json");
        assert!(result.is_err());
    }

    #[test]
    fn missing_fields_default() {
        let status = CommandStatus::from_payload(b"{}").unwrap();
        assert!(!status.is_success());
        assert_eq!(status.exit_code(), None);
        assert!(status.message.is_none());
    }
}
