// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains exception and Result definitions
use thiserror::Error;

/// Represents all kinds of errors which can occur while setting up or running a
/// [`Servo`](`crate::Servo`).
#[derive(Error, Debug)]
pub enum ServoException {
    /// ConfigException is thrown when a configuration value violates one of the
    /// documented rules. The message names the rule that failed.
    #[error("{message:?}")]
    ConfigException { message: String },

    /// ModelException is thrown when the kinematic model cannot be used, for example
    /// when the configured move group has no active joints.
    #[error("{message:?}")]
    ModelException { message: String },

    /// CommandException is thrown if an error occurs during command execution,
    /// for example starting the servo before any joint state has been received.
    #[error("{message:?}")]
    CommandException { message: String },

    /// RealTimeException is thrown if the real-time priority cannot be set
    #[error("{message:?}")]
    RealTimeException { message: String },
}

/// creates a CommandException from a static string slice
pub(crate) fn create_command_exception(message: &'static str) -> ServoException {
    ServoException::CommandException {
        message: message.to_string(),
    }
}

/// Result type which can have ServoException as Error
pub type ServoResult<T> = Result<T, ServoException>;
