//! Error taxonomy of the forge.

use thiserror::Error;

/// Result type for forge operations.
pub type ForgeResult<T> = Result<T, ForgeError>;

/// Forge error.
///
/// Signatures and type names are rendered to text when the error is raised,
/// so an error stays meaningful after its definition is dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForgeError {
    // Configuration errors: fatal, retrying with the same input cannot help.
    #[error("circular module dependency through `{module}`: {}", .cycle.join(" -> "))]
    CircularDependency { module: String, cycle: Vec<String> },

    #[error(
        "type `{type_name}` is not abstract but leaves {} abstract member(s) without an override: {}",
        .missing.len(),
        .missing.join(", ")
    )]
    IncompleteAbstractOverride {
        type_name: String,
        missing: Vec<String>,
    },

    #[error("base chain of `{type_name}` is cyclic or deeper than {limit} levels")]
    CyclicHierarchy { type_name: String, limit: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    // Usage errors: the caller can correct the call.
    #[error("`{signature}` is already overridden on `{type_name}`")]
    DuplicateOverride { type_name: String, signature: String },

    #[error("`{signature}` is not an overridable inherited member of `{type_name}`")]
    UnknownMember { type_name: String, signature: String },

    #[error("`{signature}` is already declared on `{type_name}`")]
    DuplicateMember { type_name: String, signature: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("type `{type_name}` was finalized and can no longer change")]
    DefinitionSealed { type_name: String },

    #[error("`{signature}` on `{type_name}` has no body")]
    MissingBody { type_name: String, signature: String },

    #[error("abstract member `{signature}` declared on non-abstract type `{type_name}`")]
    AbstractMemberInConcreteType { type_name: String, signature: String },

    // Collaborator failures.
    #[error("instruction emitter failed: {0}")]
    Emitter(String),

    #[error("member builder failed: {0}")]
    Backend(String),
}

impl ForgeError {
    /// Fatal configuration error, as opposed to a correctable usage error.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ForgeError::CircularDependency { .. }
                | ForgeError::IncompleteAbstractOverride { .. }
                | ForgeError::CyclicHierarchy { .. }
                | ForgeError::Config(_)
        )
    }
}

impl From<serde_json::Error> for ForgeError {
    fn from(e: serde_json::Error) -> Self {
        ForgeError::Config(e.to_string())
    }
}
