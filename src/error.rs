// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Error types for zigcheck operations.
//!
//! All errors convert to `masterror::AppError` for consistent error
//! handling. Covers IO failures, resource limits, and configuration
//! validation. Malformed Zig source is never an error: the scope
//! tracker degrades to best-effort and analysis completes.

use std::io;

use masterror::AppError;

/// IO operation failed.
///
/// Wraps standard IO errors that occur during file operations.
#[derive(Debug)]
pub struct IoError {
    source: io::Error
}

impl From<io::Error> for IoError {
    fn from(source: io::Error) -> Self {
        Self {
            source
        }
    }
}

impl From<IoError> for AppError {
    fn from(err: IoError) -> Self {
        AppError::internal(format!("IO error: {}", err.source))
    }
}

/// File not found.
///
/// Indicates a requested source file does not exist.
#[derive(Debug)]
pub struct FileNotFoundError {
    path: String
}

impl FileNotFoundError {
    /// Create new file not found error with path.
    ///
    /// # Arguments
    ///
    /// * `path` - File path that was not found
    pub fn new(path: String) -> Self {
        Self {
            path
        }
    }
}

impl From<FileNotFoundError> for AppError {
    fn from(err: FileNotFoundError) -> Self {
        AppError::not_found(format!("File not found: {}", err.path))
    }
}

/// Read access to a file was denied.
#[derive(Debug)]
pub struct PermissionDeniedError {
    path: String
}

impl PermissionDeniedError {
    /// Create new permission error with path.
    ///
    /// # Arguments
    ///
    /// * `path` - File path that could not be read
    pub fn new(path: String) -> Self {
        Self {
            path
        }
    }
}

impl From<PermissionDeniedError> for AppError {
    fn from(err: PermissionDeniedError) -> Self {
        AppError::internal(format!("Permission denied: {}", err.path))
    }
}

/// Allocator pattern with an empty name.
///
/// Pattern names identify allocators in reports and in the
/// allowed-allocator policy; an empty name is a hard error.
#[derive(Debug)]
pub struct EmptyPatternNameError;

impl From<EmptyPatternNameError> for AppError {
    fn from(_err: EmptyPatternNameError) -> Self {
        AppError::bad_request("Allocator pattern has an empty name".to_string())
    }
}

/// Allocator pattern with an empty match string.
#[derive(Debug)]
pub struct EmptyPatternError {
    name: String
}

impl EmptyPatternError {
    /// Create new empty pattern error for the named rule.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the offending pattern
    pub fn new(name: String) -> Self {
        Self {
            name
        }
    }
}

impl From<EmptyPatternError> for AppError {
    fn from(err: EmptyPatternError) -> Self {
        AppError::bad_request(format!("Allocator pattern '{}' is empty", err.name))
    }
}

/// Two enabled allocator patterns share a name.
#[derive(Debug)]
pub struct DuplicatePatternNameError {
    name: String
}

impl DuplicatePatternNameError {
    /// Create new duplicate name error.
    ///
    /// # Arguments
    ///
    /// * `name` - Name declared more than once
    pub fn new(name: String) -> Self {
        Self {
            name
        }
    }
}

impl From<DuplicatePatternNameError> for AppError {
    fn from(err: DuplicatePatternNameError) -> Self {
        AppError::bad_request(format!(
            "Duplicate allocator pattern name: '{}'",
            err.name
        ))
    }
}

/// Scope nesting exceeded the configured limit.
#[derive(Debug)]
pub struct MaxDepthExceededError {
    depth: usize
}

impl MaxDepthExceededError {
    /// Create new depth error at the depth that was rejected.
    ///
    /// # Arguments
    ///
    /// * `depth` - Depth the source tried to open
    pub fn new(depth: usize) -> Self {
        Self {
            depth
        }
    }
}

impl From<MaxDepthExceededError> for AppError {
    fn from(err: MaxDepthExceededError) -> Self {
        AppError::bad_request(format!("Maximum scope depth exceeded: {}", err.depth))
    }
}

/// Configuration names an unknown severity.
#[derive(Debug)]
pub struct InvalidSeverityError {
    value: String
}

impl InvalidSeverityError {
    /// Create new invalid severity error.
    ///
    /// # Arguments
    ///
    /// * `value` - Value that did not parse
    pub fn new(value: String) -> Self {
        Self {
            value
        }
    }
}

impl From<InvalidSeverityError> for AppError {
    fn from(err: InvalidSeverityError) -> Self {
        AppError::bad_request(format!(
            "Invalid severity level: '{}' (expected error, warning or info)",
            err.value
        ))
    }
}

/// Configuration names an unknown log level.
#[derive(Debug)]
pub struct InvalidLogLevelError {
    value: String
}

impl InvalidLogLevelError {
    /// Create new invalid log level error.
    ///
    /// # Arguments
    ///
    /// * `value` - Value that did not parse
    pub fn new(value: String) -> Self {
        Self {
            value
        }
    }
}

impl From<InvalidLogLevelError> for AppError {
    fn from(err: InvalidLogLevelError) -> Self {
        AppError::bad_request(format!(
            "Invalid log level: '{}' (expected error, warn, info, debug or trace)",
            err.value
        ))
    }
}

/// Severe lexical derailment of the analyzed source.
///
/// Reserved for strict modes; the default pipeline never raises it and
/// instead completes best-effort.
#[derive(Debug)]
pub struct ParseError {
    message: String
}

impl ParseError {
    /// Create new parse error with message.
    ///
    /// # Arguments
    ///
    /// * `message` - Error description
    pub fn new(message: String) -> Self {
        Self {
            message
        }
    }
}

impl From<ParseError> for AppError {
    fn from(err: ParseError) -> Self {
        AppError::bad_request(format!("Parse error: {}", err.message))
    }
}
