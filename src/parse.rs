/*! Interpreting tool output

`hdiutil` and `diskutil` either emit property lists (when passed `-plist`) or `key: value` text.
*/
use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use crate::command::CommandLine;

/// `key: value` pairs from plain text output, in the order they were printed
pub type ParsedInfo = IndexMap<String, String>;

#[non_exhaustive]
#[derive(thiserror::Error, Debug, strum::IntoStaticStr)]
pub enum FormatError {
    #[error("Human-readable size `{0}` is not in a recognized format, format the size like `100m` or `100 MB`")]
    Size(String),
    #[error("Unknown byte unit `{unit}` in `{input}`, must be one of: b, k, m, g, t")]
    Unit { input: String, unit: String },
    #[error("Parsing plist output of `{command}`")]
    Plist {
        command: String,
        #[source]
        source: plist::Error,
    },
    #[error("Output of `{command}` is missing `{key}`")]
    MissingKey { command: String, key: String },
    #[error("Unrecognized value `{value}` for `{key}` in output of `{command}`")]
    Value {
        command: String,
        key: String,
        value: String,
    },
}

/// Parse `key: value` lines, splitting on the first colon
///
/// Blank lines and lines without a colon are skipped. Keys and values are trimmed. A repeated key
/// keeps its first position and its last value.
pub fn colon_text(text: &str) -> ParsedInfo {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Decode binary or XML plist output of `command`
pub fn plist<T: DeserializeOwned>(command: &CommandLine, bytes: &[u8]) -> Result<T, FormatError> {
    plist::from_bytes(bytes).map_err(|source| FormatError::Plist {
        command: command.to_string(),
        source,
    })
}

/// Look up `key` in text output of `command`
pub fn required<'a>(
    info: &'a ParsedInfo,
    command: &CommandLine,
    key: &str,
) -> Result<&'a str, FormatError> {
    info.get(key)
        .map(String::as_str)
        .ok_or_else(|| FormatError::MissingKey {
            command: command.to_string(),
            key: key.to_string(),
        })
}
