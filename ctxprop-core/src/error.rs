/// Errors raised while a request is being processed.
///
/// Only [`ContextError::MissingRequiredFields`] is surfaced to the caller
/// (the host maps it to a 400 listing the missing field names). Every other
/// kind is logged and swallowed according to the per-field error policy.
pub enum ContextError {
    /// A source handler failed while reading its surface.
    ExtractionFailed { field: String, reason: String },
    /// A transformation received input it could not process.
    TransformFailed { field: String, reason: String },
    /// The extracted value did not match the configured validation pattern.
    ValidationFailed { field: String },
    /// One or more required fields were absent after fallback, generation
    /// and defaulting. Carries every missing name so the host can report
    /// them all at once.
    MissingRequiredFields(Vec<String>),
    /// The capture filter could not buffer a downstream response body.
    BodyBufferFailed(String),
    /// A single field failed to propagate onto an outbound request.
    PropagationFailed { field: String, reason: String },
}

impl ContextError {
    /// The field name this error is about, when it concerns a single field.
    pub fn field(&self) -> Option<&str> {
        match self {
            ContextError::ExtractionFailed { field, .. }
            | ContextError::TransformFailed { field, .. }
            | ContextError::ValidationFailed { field }
            | ContextError::PropagationFailed { field, .. } => Some(field),
            _ => None,
        }
    }

    /// The missing field names, when this is a required-field violation.
    pub fn missing_fields(&self) -> Option<&[String]> {
        match self {
            ContextError::MissingRequiredFields(names) => Some(names),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextError::ExtractionFailed { field, reason } => {
                write!(f, "extraction failed for '{field}': {reason}")
            }
            ContextError::TransformFailed { field, reason } => {
                write!(f, "transformation failed for '{field}': {reason}")
            }
            ContextError::ValidationFailed { field } => {
                write!(f, "validation failed for '{field}'")
            }
            ContextError::MissingRequiredFields(names) => {
                write!(f, "missing required fields: {}", names.join(", "))
            }
            ContextError::BodyBufferFailed(reason) => {
                write!(f, "response body buffering failed: {reason}")
            }
            ContextError::PropagationFailed { field, reason } => {
                write!(f, "propagation failed for '{field}': {reason}")
            }
        }
    }
}

impl std::fmt::Debug for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl std::error::Error for ContextError {}

/// Errors detected while validating the field configuration at startup.
///
/// The field index refuses to build from an inconsistent configuration, so
/// every request served afterwards can assume the invariants hold.
pub enum ConfigError {
    /// A fallback chain exceeds the maximum depth.
    FallbackTooDeep { field: String, depth: usize },
    /// A validation pattern failed to compile.
    InvalidValidationPattern { field: String, reason: String },
    /// A PATH source key is not a usable URL pattern.
    InvalidPathPattern { field: String, reason: String },
    /// `transformation = CUSTOM` without a `transform-expression`.
    MissingTransformExpression(String),
    /// A field is marked required but has no upstream inbound extraction.
    RequiredWithoutInbound(String),
    /// A PATH/CLAIM source is missing the key it needs.
    MissingKey { field: String, source: &'static str },
    /// The document could not be deserialized.
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FallbackTooDeep { field, depth } => {
                write!(f, "fallback chain for '{field}' exceeds depth {depth}")
            }
            ConfigError::InvalidValidationPattern { field, reason } => {
                write!(f, "invalid validation pattern for '{field}': {reason}")
            }
            ConfigError::InvalidPathPattern { field, reason } => {
                write!(f, "invalid path pattern for '{field}': {reason}")
            }
            ConfigError::MissingTransformExpression(field) => {
                write!(f, "field '{field}' uses CUSTOM transformation without transform-expression")
            }
            ConfigError::RequiredWithoutInbound(field) => {
                write!(f, "field '{field}' is required but has no upstream inbound extraction")
            }
            ConfigError::MissingKey { field, source } => {
                write!(f, "field '{field}' with source {source} is missing its key")
            }
            ConfigError::Parse(msg) => write!(f, "configuration parse error: {msg}"),
        }
    }
}

impl std::fmt::Debug for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl std::error::Error for ConfigError {}
