//! Constructor methods and classification helpers for HostshiftError

use super::types::HostshiftError;

impl HostshiftError {
    /// Create a configuration error with component and message
    ///
    /// # Examples
    /// ```rust
    /// use hostshift_core::error::HostshiftError;
    ///
    /// let err = HostshiftError::configuration("migration.max_retries", "must be at least 1");
    /// assert!(err.is_fatal());
    /// ```
    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        HostshiftError::ConfigurationError {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error with the offending value
    pub fn invalid_config<T: std::fmt::Display>(field: &str, value: T, reason: &str) -> Self {
        HostshiftError::ConfigurationError {
            component: field.to_string(),
            message: format!("Invalid value '{}': {}", value, reason),
        }
    }

    /// Create a control plane error for a failed query or call
    pub fn control_plane(operation: impl Into<String>, details: impl Into<String>) -> Self {
        HostshiftError::ControlPlane {
            operation: operation.into(),
            details: details.into(),
        }
    }

    /// Create an output parsing error for a control plane response
    pub fn control_plane_output(operation: impl Into<String>, source: serde_json::Error) -> Self {
        HostshiftError::ControlPlaneOutput {
            operation: operation.into(),
            source,
        }
    }

    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        HostshiftError::Authentication {
            message: message.into(),
        }
    }

    /// Create a dependency missing error
    pub fn dependency_missing(tool: impl Into<String>, details: impl Into<String>) -> Self {
        HostshiftError::DependencyMissing {
            tool: tool.into(),
            details: details.into(),
        }
    }

    /// Create a command failure error
    pub fn command_failed(program: impl Into<String>, details: impl Into<String>) -> Self {
        HostshiftError::CommandFailed {
            program: program.into(),
            details: details.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        HostshiftError::Internal {
            message: message.into(),
        }
    }

    /// Whether the migration step should be attempted again after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HostshiftError::MigrationInitiation { .. }
                | HostshiftError::MigrationTimeout { .. }
                | HostshiftError::MigrationPlatform { .. }
        )
    }

    /// Whether this error aborts the whole run before any migration starts
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HostshiftError::FileNotFound { .. }
                | HostshiftError::EmptyInput { .. }
                | HostshiftError::InputRead { .. }
                | HostshiftError::Authentication { .. }
                | HostshiftError::DependencyMissing { .. }
                | HostshiftError::ConfigurationError { .. }
        )
    }
}
