//! Identifier wrappers and quoting rules.
//!
//! Names are values, not strings: wrapping them keeps qualified-vs-bare and
//! column-vs-source confusion at the type boundary. Equality is always
//! case-sensitive; only [`FunctionName`] has a canonical (upper-case) form,
//! applied at the registry boundary.

use std::fmt;

/// Name of the implicit per-record timestamp column.
pub const ROWTIME_NAME: &str = "ROWTIME";

/// Name of the implicit record key column.
pub const ROWKEY_NAME: &str = "ROWKEY";

macro_rules! name_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw name. The name must be non-empty.
            pub fn of(name: impl Into<String>) -> Self {
                let name = name.into();
                assert!(!name.is_empty(), "names must be non-empty");
                Self(name)
            }

            /// The raw name text.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper, yielding the raw text.
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

name_type!(
    /// The name of a column.
    ColumnName
);
name_type!(
    /// The name of a stream or table.
    SourceName
);
name_type!(
    /// The name of a scalar or aggregate function.
    FunctionName
);

impl ColumnName {
    /// Whether this is the implicit row-time column name.
    pub fn is_rowtime(&self) -> bool {
        self.0 == ROWTIME_NAME
    }

    /// Whether this is the implicit row-key column name.
    pub fn is_rowkey(&self) -> bool {
        self.0 == ROWKEY_NAME
    }

    /// The implicit row-time column name.
    pub fn rowtime() -> Self {
        Self::of(ROWTIME_NAME)
    }

    /// The implicit row-key column name.
    pub fn rowkey() -> Self {
        Self::of(ROWKEY_NAME)
    }
}

impl FunctionName {
    /// The canonical (upper-cased) form used for registry lookups.
    pub fn canonical(&self) -> FunctionName {
        FunctionName(self.0.to_uppercase())
    }
}

/// Words that always force quoting when used as identifiers.
const RESERVED_WORDS: &[&str] = &[
    "AND", "AS", "BETWEEN", "BY", "CASE", "CAST", "CREATE", "ELSE", "EMIT", "END", "FALSE", "FROM",
    "FULL", "GROUP", "HAVING", "INNER", "INSERT", "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE",
    "NOT", "NULL", "ON", "OR", "OUTER", "PARTITION", "RIGHT", "SELECT", "STREAM", "TABLE", "THEN",
    "TRUE", "VALUES", "WHEN", "WHERE", "WINDOW", "WITH", "WITHIN",
];

/// Whether an identifier fails to round-trip unquoted.
///
/// Unquoted identifiers are upper-cased on the way in, so anything that is
/// not already `[A-Z_][A-Z0-9_]*` needs quoting, as does any reserved word.
pub fn needs_quotes(name: &str) -> bool {
    let bare = name
        .chars()
        .enumerate()
        .all(|(i, c)| c == '_' || c.is_ascii_uppercase() || (i > 0 && c.is_ascii_digit()));

    !bare || RESERVED_WORDS.contains(&name)
}

/// Options controlling how identifiers are rendered.
///
/// The quoting predicate is pluggable so callers can render for different
/// dialect strictness levels.
#[derive(Clone, Copy)]
pub struct FormatOptions {
    should_quote: fn(&str) -> bool,
}

impl FormatOptions {
    /// Quote according to the given predicate.
    pub fn of(should_quote: fn(&str) -> bool) -> Self {
        Self { should_quote }
    }

    /// Never quote.
    pub fn none() -> Self {
        Self {
            should_quote: |_| false,
        }
    }

    /// Render a single identifier, quoting it if the predicate demands.
    pub fn escape(&self, name: &str) -> String {
        if (self.should_quote)(name) {
            format!("`{}`", name)
        } else {
            name.to_string()
        }
    }
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            should_quote: needs_quotes,
        }
    }
}

impl fmt::Debug for FormatOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatOptions").finish_non_exhaustive()
    }
}
