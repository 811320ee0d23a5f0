//! Defines the messages exchanged with the host over the `open_file` channel.

use serde::{Deserialize, Serialize};

use crate::core::{DispatchOutcome, OpenError, OpenRequest};

/// Name of the channel the host registers the bridge under.
pub const CHANNEL_NAME: &str = "open_file";
/// The only method the bridge implements.
pub const OPEN_FILE_METHOD: &str = "open_file";
/// Value of a successful `open_file` reply.
pub const SUCCESS_MESSAGE: &str = "File opened successfully";

/// A call received from the host.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// The name of the method to execute.
    pub method: String,
    /// The arguments of the call, as a JSON value.
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl MethodCall {
    /// Builds an `open_file` call. Absent arguments are sent as JSON `null`.
    pub fn open_file(file_path: Option<&str>, mime_type: Option<&str>) -> Self {
        Self {
            method: OPEN_FILE_METHOD.to_string(),
            arguments: serde_json::json!({
                "file_path": file_path,
                "type": mime_type,
            }),
        }
    }
}

/// Arguments of an `open_file` call. Both may be missing or `null`.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct OpenFileArgs {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default, rename = "type")]
    pub mime_type: Option<String>,
}

impl From<OpenFileArgs> for OpenRequest {
    fn from(args: OpenFileArgs) -> Self {
        OpenRequest::from_parts(args.file_path, args.mime_type)
    }
}

/// The single reply a call receives.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodReply {
    Success { value: String },
    Error { code: String, message: String },
    NotImplemented,
}

impl MethodReply {
    pub fn error(err: &OpenError) -> Self {
        MethodReply::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }

    pub fn from_outcome(outcome: &DispatchOutcome) -> Self {
        match outcome {
            Ok(_) => MethodReply::Success {
                value: SUCCESS_MESSAGE.to_string(),
            },
            Err(e) => Self::error(e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MethodReply::Success { .. })
    }

    /// The error code, for error replies.
    pub fn code(&self) -> Option<&str> {
        match self {
            MethodReply::Error { code, .. } => Some(code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PermissionKind;

    #[test]
    fn test_reply_wire_format() {
        let reply = MethodReply::from_outcome(&Err(OpenError::PermissionDenied(
            PermissionKind::ReadExternalStorage,
        )));
        insta::assert_snapshot!(
            serde_json::to_string(&reply).unwrap(),
            @r#"{"status":"error","code":"PERMISSION_DENIED","message":"Permission denied"}"#
        );

        insta::assert_snapshot!(
            serde_json::to_string(&MethodReply::NotImplemented).unwrap(),
            @r#"{"status":"not_implemented"}"#
        );
    }

    #[test]
    fn test_args_accept_missing_and_null_fields() {
        let args: OpenFileArgs =
            serde_json::from_value(serde_json::json!({ "file_path": "/tmp/a.png" })).unwrap();
        assert_eq!(args.mime_type, None);

        let args: OpenFileArgs =
            serde_json::from_value(serde_json::json!({ "file_path": null, "type": null })).unwrap();
        assert_eq!(args, OpenFileArgs::default());
    }

    #[test]
    fn test_empty_type_argument_is_treated_as_absent() {
        let args = OpenFileArgs {
            file_path: Some("/tmp/a.png".into()),
            mime_type: Some(String::new()),
        };
        let request = OpenRequest::from(args);
        assert_eq!(request.explicit_type(), None);
    }
}
