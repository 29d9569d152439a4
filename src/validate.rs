/*! Allowed option values for `hdiutil` commands
*/
use std::path::PathBuf;

use strum::VariantNames;

use crate::image::{Encryption, FileSystem, ImageType};

struct OptionRule {
    name: &'static str,
    allowed: Option<&'static [&'static str]>,
}

const fn any(name: &'static str) -> OptionRule {
    OptionRule {
        name,
        allowed: None,
    }
}

const fn one_of(name: &'static str, allowed: &'static [&'static str]) -> OptionRule {
    OptionRule {
        name,
        allowed: Some(allowed),
    }
}

const CREATE: &[OptionRule] = &[
    any("uid"),
    any("gid"),
    any("size"),
    any("volname"),
    one_of("encryption", Encryption::VARIANTS),
    one_of("type", ImageType::NAMES),
    one_of("fs", FileSystem::VARIANTS),
];

const PLIST_ONLY: &[OptionRule] = &[any("plist")];

const COMMANDS: &[(&str, &[OptionRule])] = &[
    ("create", CREATE),
    ("imageinfo", PLIST_ONLY),
    ("info", PLIST_ONLY),
];

#[non_exhaustive]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, strum::IntoStaticStr)]
pub enum ValidationError {
    #[error("Invalid value `{value}` for `-{option}` of `{command}`, must be one of: {}", allowed.join(", "))]
    InvalidValue {
        command: String,
        option: String,
        value: String,
        allowed: Vec<String>,
    },
    #[error("Invalid option `-{option}` for `{command}`, must be one of: {}", known.join(", "))]
    UnknownOption {
        command: String,
        option: String,
        known: Vec<String>,
    },
    #[error("No options are known for command `{0}`")]
    UnknownCommand(String),
    #[error("Cannot reassign encryption from `{current}` to `{requested}`")]
    EncryptionAlreadySet {
        current: Encryption,
        requested: Encryption,
    },
    #[error("Size of {requested} bytes is too large, only {available} bytes are available at `{}`", path.display())]
    InsufficientSpace {
        path: PathBuf,
        requested: u64,
        available: u64,
    },
    #[error("Size must be greater than zero")]
    ZeroSize,
    #[error("Sparse bundle band size of {0} sectors is outside the valid range of 2048 to 16777216 sectors")]
    BandSize(u64),
    #[error("Cannot infer the image type of `{}`, the extension must be one of: {}", path.display(), allowed.join(", "))]
    UnknownExtension { path: PathBuf, allowed: Vec<String> },
}

impl ValidationError {
    pub fn invalid_value(
        command: &str,
        option: &str,
        value: &str,
        allowed: &[&str],
    ) -> Self {
        Self::InvalidValue {
            command: command.to_string(),
            option: option.to_string(),
            value: value.to_string(),
            allowed: allowed.iter().map(ToString::to_string).collect(),
        }
    }

    /// The permitted values, when the error is about an option value
    pub fn allowed(&self) -> Option<&[String]> {
        match self {
            Self::InvalidValue { allowed, .. } => Some(allowed),
            Self::UnknownOption { known, .. } => Some(known),
            Self::UnknownExtension { allowed, .. } => Some(allowed),
            _ => None,
        }
    }
}

/// The values `option` may take for `command`, `None` when any value is accepted
pub fn allowed_values(
    command: &str,
    option: &str,
) -> Result<Option<&'static [&'static str]>, ValidationError> {
    let rules = COMMANDS
        .iter()
        .find(|(name, _)| *name == command)
        .map(|(_, rules)| *rules)
        .ok_or_else(|| ValidationError::UnknownCommand(command.to_string()))?;

    rules
        .iter()
        .find(|rule| rule.name == option)
        .map(|rule| rule.allowed)
        .ok_or_else(|| ValidationError::UnknownOption {
            command: command.to_string(),
            option: option.to_string(),
            known: rules.iter().map(|rule| rule.name.to_string()).collect(),
        })
}

pub fn validate(command: &str, option: &str, value: &str) -> Result<(), ValidationError> {
    match allowed_values(command, option)? {
        Some(allowed) if !allowed.contains(&value) => Err(ValidationError::invalid_value(
            command, option, value, allowed,
        )),
        _ => Ok(()),
    }
}
