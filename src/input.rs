//! Decoding of the JSON task argument.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::pipeline::Failure;
use crate::{tasks, Error};

/// One task, decoded from the command-line argument.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskRequest {
    /// Natural-language task. Always set once [`parse_request`] returns.
    pub task: Option<String>,
    pub platform: Option<String>,

    // Composition fields, read only with `--compose`.
    pub action: Option<String>,
    pub credentials: Option<Credentials>,
    pub url: Option<String>,
    #[serde(alias = "dataType")]
    pub data_type: Option<String>,
    pub filters: Option<Value>,
    pub data: Option<Value>,
}

impl TaskRequest {
    pub fn task(&self) -> &str {
        self.task.as_deref().unwrap_or_default()
    }

    /// Platform label, empty when the input did not name one.
    pub fn platform(&self) -> &str {
        self.platform.as_deref().unwrap_or_default()
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Decode `raw` into a request with a non-empty task.
///
/// The failure carries the platform whenever `raw` was a JSON object with a
/// string `platform`, so the error envelope can still name it.
pub fn parse_request(raw: &str, compose: bool) -> Result<TaskRequest, Failure> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| Failure::new(Error::MalformedInput(format!("invalid JSON: {}", e)), None))?;

    let Some(object) = value.as_object() else {
        return Err(Failure::new(
            Error::MalformedInput("task data must be a JSON object".into()),
            None,
        ));
    };
    let platform = object
        .get("platform")
        .and_then(Value::as_str)
        .map(str::to_string);
    let fail = |e: Error| Failure::new(e, platform.clone());

    let mut request: TaskRequest = serde_json::from_value(value)
        .map_err(|e| fail(Error::MalformedInput(e.to_string())))?;

    if request.task.is_none() {
        if !compose {
            return Err(fail(Error::MalformedInput("missing \"task\" field".into())));
        }
        request.task = Some(tasks::compose(&request).map_err(fail)?);
    }
    if request.task().trim().is_empty() {
        return Err(fail(Error::MalformedInput("\"task\" is empty".into())));
    }

    Ok(request)
}
