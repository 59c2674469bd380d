use thiserror::Error;

/// Error taxonomy for the OData query pipeline, ordered the way the pipeline
/// itself runs: lexing, parsing, semantic validation, type checking, SQL
/// building, execution, then a handful of cross-cutting failures.
#[derive(Debug, Error)]
pub enum Error {
    #[error("lex error at position {position}: {message}")]
    Lex { message: String, position: usize },

    #[error("parse error: {message}")]
    Parse { message: String },

    #[error("semantic error: {message}")]
    Semantic { message: String },

    #[error("type error: {message}")]
    Type { message: String },

    #[error("query build error: {message}")]
    Build { message: String },

    #[error("execution error: {0}")]
    Execution(String),

    #[error("{entity_set} not found: {key}")]
    NotFound { entity_set: String, key: String },

    #[error("request cancelled")]
    Cancelled,

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn lex(message: impl Into<String>, position: usize) -> Self {
        Self::Lex { message: message.into(), position }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into() }
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        Self::Semantic { message: message.into() }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type { message: message.into() }
    }

    pub fn build(message: impl Into<String>) -> Self {
        Self::Build { message: message.into() }
    }

    pub fn not_found(entity_set: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound { entity_set: entity_set.into(), key: key.into() }
    }

    /// Stable machine-readable code, used in the `@odata.error.code` field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Lex { .. } => "LexError",
            Self::Parse { .. } => "ParseError",
            Self::Semantic { .. } => "SemanticError",
            Self::Type { .. } => "TypeError",
            Self::Build { .. } => "BuildError",
            Self::Execution(_) => "ExecutionError",
            Self::NotFound { .. } => "NotFound",
            Self::Cancelled => "Cancelled",
            Self::LimitExceeded(_) => "LimitExceeded",
            Self::Json(_) => "SerializationError",
        }
    }

    /// HTTP status this error maps to (§7 of the design notes).
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Lex { .. }
            | Self::Parse { .. }
            | Self::Semantic { .. }
            | Self::Type { .. }
            | Self::Build { .. }
            | Self::LimitExceeded(_) => 400,
            Self::NotFound { .. } => 404,
            Self::Cancelled => 499,
            Self::Execution(_) | Self::Json(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.http_status() < 500
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Lex { .. } => ErrorCategory::Lexical,
            Self::Parse { .. } => ErrorCategory::Syntax,
            Self::Semantic { .. } | Self::Type { .. } => ErrorCategory::Semantic,
            Self::Build { .. } => ErrorCategory::Build,
            Self::Execution(_) => ErrorCategory::Execution,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::LimitExceeded(_) => ErrorCategory::Limit,
            Self::Json(_) => ErrorCategory::Serialization,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Lexical,
    Syntax,
    Semantic,
    Build,
    Execution,
    NotFound,
    Cancelled,
    Limit,
    Serialization,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Lexical => "lexical",
            Self::Syntax => "syntax",
            Self::Semantic => "semantic",
            Self::Build => "build",
            Self::Execution => "execution",
            Self::NotFound => "not_found",
            Self::Cancelled => "cancelled",
            Self::Limit => "limit",
            Self::Serialization => "serialization",
        };
        write!(f, "{s}")
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_vs_server_classification() {
        assert!(Error::parse("bad token").is_client_error());
        assert!(Error::semantic("unknown property").is_client_error());
        assert!(!Error::Execution("pool exhausted".into()).is_client_error());
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = Error::not_found("Products", "1");
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.code(), "NotFound");
    }

    #[test]
    fn cancelled_has_stable_code() {
        assert_eq!(Error::Cancelled.code(), "Cancelled");
        assert_eq!(Error::Cancelled.http_status(), 499);
    }

    #[test]
    fn category_display() {
        assert_eq!(ErrorCategory::Lexical.to_string(), "lexical");
        assert_eq!(ErrorCategory::NotFound.to_string(), "not_found");
    }
}
