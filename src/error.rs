use std::path::PathBuf;

use crate::{
    interaction::PasswordError, parse::FormatError, runner::CommandError,
    validate::ValidationError,
};

/// An error occurring during a call defined in this crate
#[non_exhaustive]
#[derive(thiserror::Error, Debug, strum::IntoStaticStr)]
pub enum HdiKitError {
    /// A rejected option, option value or size
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Unparseable size string or tool output
    #[error(transparent)]
    Format(#[from] FormatError),
    /// `hdiutil` or `diskutil` failed
    #[error(transparent)]
    Command(#[from] CommandError),
    /// A path, tool or attachment that should exist does not
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    /// Reading a disk image password
    #[error("Reading disk image password")]
    Password(
        #[from]
        #[source]
        PasswordError,
    ),
    /// Querying the free space under a path
    #[error("Querying free space of `{}`", .0.display())]
    FreeSpace(PathBuf, #[source] nix::errno::Errno),
}

impl HdiKitError {
    /// If the error came from a tool reporting `Resource temporarily unavailable`
    pub fn is_resource_unavailable(&self) -> bool {
        match self {
            Self::Command(err) => err.is_resource_unavailable(),
            _ => false,
        }
    }
}

#[non_exhaustive]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, strum::IntoStaticStr)]
pub enum NotFoundError {
    #[error("Disk image `{}` not found", .0.display())]
    Image(PathBuf),
    #[error("Directory `{}` does not exist", .0.display())]
    Directory(PathBuf),
    #[error("Disk image `{}` is not attached, attach it and try again", .0.display())]
    NotAttached(PathBuf),
    #[error("Could not find `{0}` on `PATH`")]
    Tool(String),
}
