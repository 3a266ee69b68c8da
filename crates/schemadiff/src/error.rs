use std::fmt;

use thiserror::Error;

use crate::introspect::IntrospectError;

/// Which side of a comparison an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Target => write!(f, "target"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// A required catalog handle was not supplied.
    #[error("{side} catalog handle is required")]
    Precondition { side: Side },

    /// A catalog handle was supplied but is already closed.
    #[error("{side} catalog handle is closed")]
    State { side: Side },

    /// Reading catalog metadata failed; the whole comparison is abandoned.
    #[error("schema comparison failed while {context}")]
    Comparison {
        context: String,
        #[source]
        source: IntrospectError,
    },
}

impl Error {
    pub(crate) fn comparison(context: impl Into<String>, source: IntrospectError) -> Self {
        Error::Comparison {
            context: context.into(),
            source,
        }
    }

    /// Format the error followed by its full cause chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}
