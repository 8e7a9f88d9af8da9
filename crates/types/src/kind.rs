//! Closed failure taxonomy.
//!
//! Every failure raised by a tool handler is classified as exactly one
//! [`ErrorKind`]. The kind alone determines the transport status and the
//! recovery suggestion shown to the calling agent, so both lookups are total
//! functions over the enum rather than string-keyed tables.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Suggestion used when a caller supplies a blank custom suggestion.
pub const GENERIC_SUGGESTION: &str = "Check the request parameters and try again. If the problem persists, inspect the error context for details.";

/// Broad family an [`ErrorKind`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Parameter validation failures.
    Validation,
    /// A referenced resource does not exist.
    NotFound,
    /// Conflicting or invalid resource state.
    Conflict,
    /// Failures inside the server or its storage.
    Server,
    /// An upstream dependency is unavailable.
    Dependency,
    /// The operation is not allowed.
    Permission,
    /// Search failures.
    Search,
    /// Batch operation failures.
    Batch,
    /// Caller exceeded a rate limit.
    RateLimit,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Server => "server",
            Self::Dependency => "dependency",
            Self::Permission => "permission",
            Self::Search => "search",
            Self::Batch => "batch",
            Self::RateLimit => "rate_limit",
        };
        f.write_str(label)
    }
}

/// Machine-readable failure kind.
///
/// Serializes to a stable `SCREAMING_SNAKE_CASE` code (see [`ErrorKind::as_str`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    // -- Validation --
    /// A required parameter was not supplied.
    MissingRequiredParam,
    /// A parameter has the wrong shape or value.
    InvalidParamValue,
    /// A numeric parameter is outside its allowed range.
    ParamOutOfRange,

    // -- Not found --
    /// Project id does not resolve.
    ProjectNotFound,
    /// File path does not resolve inside the project.
    FileNotFound,
    /// Ticket id does not resolve.
    TicketNotFound,
    /// Prompt id does not resolve.
    PromptNotFound,
    /// Agent id does not resolve.
    AgentNotFound,

    // -- Conflict / state --
    /// The resource being created already exists.
    AlreadyExists,
    /// The resource changed underneath the operation.
    ConcurrentModification,
    /// The resource is in a state that forbids the operation.
    InvalidState,

    // -- Server --
    /// Generic failure inside a domain service.
    ServiceError,
    /// Storage engine query failure.
    DatabaseError,
    /// A multi-step transaction failed.
    TransactionFailed,
    /// Persistence layer failure.
    StorageError,
    /// An operation failed for an unspecified reason.
    OperationFailed,
    /// Project synchronization failed.
    SyncFailed,

    // -- Dependency --
    /// An upstream dependency failed or is unavailable.
    DependencyFailed,

    // -- Permission --
    /// The caller is not permitted to perform the operation.
    PermissionDenied,
    /// A path escapes the project root.
    PathTraversalDenied,

    // -- Search --
    /// The search backend failed.
    SearchFailed,
    /// The search query could not be parsed.
    InvalidSearchQuery,
    /// The search returned nothing.
    NoSearchResults,

    // -- Batch --
    /// Every item of a batch failed.
    BatchFailed,
    /// Some items of a batch failed.
    PartialFailure,
    /// The batch exceeds the allowed size.
    BatchSizeExceeded,

    // -- Rate limit --
    /// Too many requests.
    RateLimitExceeded,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [ErrorKind; 27] = [
        Self::MissingRequiredParam,
        Self::InvalidParamValue,
        Self::ParamOutOfRange,
        Self::ProjectNotFound,
        Self::FileNotFound,
        Self::TicketNotFound,
        Self::PromptNotFound,
        Self::AgentNotFound,
        Self::AlreadyExists,
        Self::ConcurrentModification,
        Self::InvalidState,
        Self::ServiceError,
        Self::DatabaseError,
        Self::TransactionFailed,
        Self::StorageError,
        Self::OperationFailed,
        Self::SyncFailed,
        Self::DependencyFailed,
        Self::PermissionDenied,
        Self::PathTraversalDenied,
        Self::SearchFailed,
        Self::InvalidSearchQuery,
        Self::NoSearchResults,
        Self::BatchFailed,
        Self::PartialFailure,
        Self::BatchSizeExceeded,
        Self::RateLimitExceeded,
    ];

    /// Returns the [`ErrorCategory`] this kind belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingRequiredParam | Self::InvalidParamValue | Self::ParamOutOfRange => ErrorCategory::Validation,
            Self::ProjectNotFound | Self::FileNotFound | Self::TicketNotFound | Self::PromptNotFound | Self::AgentNotFound => {
                ErrorCategory::NotFound
            }
            Self::AlreadyExists | Self::ConcurrentModification | Self::InvalidState => ErrorCategory::Conflict,
            Self::ServiceError
            | Self::DatabaseError
            | Self::TransactionFailed
            | Self::StorageError
            | Self::OperationFailed
            | Self::SyncFailed => ErrorCategory::Server,
            Self::DependencyFailed => ErrorCategory::Dependency,
            Self::PermissionDenied | Self::PathTraversalDenied => ErrorCategory::Permission,
            Self::SearchFailed | Self::InvalidSearchQuery | Self::NoSearchResults => ErrorCategory::Search,
            Self::BatchFailed | Self::PartialFailure | Self::BatchSizeExceeded => ErrorCategory::Batch,
            Self::RateLimitExceeded => ErrorCategory::RateLimit,
        }
    }

    /// Transport status for this kind.
    ///
    /// Kinds without a dedicated status (search backend failures, batch
    /// failures, rate limiting) report 500.
    pub fn status(&self) -> u16 {
        match self {
            Self::MissingRequiredParam | Self::InvalidParamValue | Self::ParamOutOfRange | Self::InvalidSearchQuery => 400,
            Self::PermissionDenied | Self::PathTraversalDenied => 403,
            Self::ProjectNotFound | Self::FileNotFound | Self::TicketNotFound | Self::PromptNotFound | Self::AgentNotFound => 404,
            Self::AlreadyExists | Self::ConcurrentModification | Self::InvalidState => 409,
            Self::ServiceError
            | Self::DatabaseError
            | Self::TransactionFailed
            | Self::StorageError
            | Self::OperationFailed
            | Self::SyncFailed => 500,
            Self::DependencyFailed => 503,
            Self::SearchFailed
            | Self::NoSearchResults
            | Self::BatchFailed
            | Self::PartialFailure
            | Self::BatchSizeExceeded
            | Self::RateLimitExceeded => 500,
        }
    }

    /// Recovery suggestion shown to the calling agent.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::MissingRequiredParam => "Provide all required parameters. Check the tool's input schema for the list of required fields.",
            Self::InvalidParamValue => "Check the parameter value against the expected type and format described in the tool's input schema.",
            Self::ParamOutOfRange => "Use a value within the documented range for this parameter.",
            Self::ProjectNotFound => "Use project_manager with action 'list' to see available projects and their IDs.",
            Self::FileNotFound => {
                "Check the file path. Use project_manager with action 'browse_files' to browse the project directory and find the correct path."
            }
            Self::TicketNotFound => "Use ticket_manager with action 'list' to see the tickets that exist in this project.",
            Self::PromptNotFound => "Use prompt_manager with action 'list' to see available prompts and their IDs.",
            Self::AgentNotFound => "Use agent_manager with action 'list' to see the agents available for this project.",
            Self::AlreadyExists => "Use a different name or identifier, or update the existing resource instead of creating a new one.",
            Self::ConcurrentModification => "The resource was modified by another operation. Fetch the latest version and retry.",
            Self::InvalidState => "Check the current state of the resource. The requested operation is not allowed in its current state.",
            Self::ServiceError => "An internal service error occurred. Retry the operation; if it keeps failing, check the server logs.",
            Self::DatabaseError => "A database error occurred. Retry the operation; if it keeps failing, check the storage configuration.",
            Self::TransactionFailed => {
                "The multi-step operation failed and completed steps were rolled back where possible. Review the failed steps and retry."
            }
            Self::StorageError => "A storage error occurred. Check available disk space and file permissions, then retry.",
            Self::OperationFailed => "The operation failed. Review the error context and retry with corrected parameters.",
            Self::SyncFailed => "Project synchronization failed. Verify the project path exists and is readable, then retry the sync.",
            Self::DependencyFailed => "A required upstream service is unavailable. Wait a moment and retry.",
            Self::PermissionDenied => "You do not have permission for this operation. Check file permissions or project access settings.",
            Self::PathTraversalDenied => "Paths must stay inside the project directory. Use a path relative to the project root.",
            Self::SearchFailed => "The search could not be completed. Retry, or simplify the query.",
            Self::InvalidSearchQuery => "Check the search query syntax. Remove unsupported operators and retry.",
            Self::NoSearchResults => "Try broader search terms, different keywords, or remove filters.",
            Self::BatchFailed => "All items in the batch failed. Review the per-item errors in the context and retry.",
            Self::PartialFailure => "Some items in the batch failed. Retry only the failed items listed in the context.",
            Self::BatchSizeExceeded => "Split the request into smaller batches and submit them separately.",
            Self::RateLimitExceeded => "Too many requests. Wait before retrying.",
        }
    }

    /// Whether a caller may reasonably retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ServiceError
                | Self::DatabaseError
                | Self::StorageError
                | Self::SyncFailed
                | Self::DependencyFailed
                | Self::SearchFailed
                | Self::ConcurrentModification
                | Self::RateLimitExceeded
        )
    }

    /// Stable code string (e.g. `"PROJECT_NOT_FOUND"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingRequiredParam => "MISSING_REQUIRED_PARAM",
            Self::InvalidParamValue => "INVALID_PARAM_VALUE",
            Self::ParamOutOfRange => "PARAM_OUT_OF_RANGE",
            Self::ProjectNotFound => "PROJECT_NOT_FOUND",
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::TicketNotFound => "TICKET_NOT_FOUND",
            Self::PromptNotFound => "PROMPT_NOT_FOUND",
            Self::AgentNotFound => "AGENT_NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::InvalidState => "INVALID_STATE",
            Self::ServiceError => "SERVICE_ERROR",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::TransactionFailed => "TRANSACTION_FAILED",
            Self::StorageError => "STORAGE_ERROR",
            Self::OperationFailed => "OPERATION_FAILED",
            Self::SyncFailed => "SYNC_FAILED",
            Self::DependencyFailed => "DEPENDENCY_FAILED",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::PathTraversalDenied => "PATH_TRAVERSAL_DENIED",
            Self::SearchFailed => "SEARCH_FAILED",
            Self::InvalidSearchQuery => "INVALID_SEARCH_QUERY",
            Self::NoSearchResults => "NO_SEARCH_RESULTS",
            Self::BatchFailed => "BATCH_FAILED",
            Self::PartialFailure => "PARTIAL_FAILURE",
            Self::BatchSizeExceeded => "BATCH_SIZE_EXCEEDED",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = ();

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == code).ok_or(())
    }
}
