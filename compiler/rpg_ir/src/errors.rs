//! Errors raised while building or querying types.

/// Failure constructing or interrogating a [`Type`](crate::Type).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// A type was declared with out-of-range parameters.
    #[error("invalid type definition: {message}")]
    InvalidTypeDefinition { message: String },

    /// The size of a variable-size sentinel (`*HIVAL`, `*LOVAL`) was requested.
    #[error("{type_name} has variable size")]
    VariableSize { type_name: String },

    /// An array-only operation was applied to a non-array type.
    #[error("{type_name} is not an array type")]
    NotAnArray { type_name: String },

    /// The static type of an expression cannot be determined.
    #[error("cannot infer the type of {expression}")]
    NotInferable { expression: String },
}

/// Shorthand for an out-of-range type declaration.
#[cold]
pub fn invalid_type_definition(message: impl Into<String>) -> TypeError {
    TypeError::InvalidTypeDefinition {
        message: message.into(),
    }
}
