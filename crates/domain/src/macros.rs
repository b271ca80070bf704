//! Macro for implementing Display and FromStr for label enums
//!
//! Several domain enums travel as fixed string labels: persisted status
//! values, config switches read from the environment. This macro keeps the
//! label table in one place and derives both directions from it.
//!
//! # Example
//!
//! ```rust
//! use dealsync_domain::impl_label_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Backend {
//!     Postgres,
//!     Sqlite,
//! }
//!
//! impl_label_conversions!(Backend {
//!     Postgres => "postgres",
//!     Sqlite => "sqlite",
//! });
//!
//! assert_eq!(Backend::Postgres.to_string(), "postgres");
//! assert_eq!("SQLITE".parse::<Backend>().unwrap(), Backend::Sqlite);
//! ```

/// Implements `Display`, `FromStr` and a `label()` accessor for label enums.
///
/// - `Display` writes the label exactly as declared
/// - `FromStr` matches ASCII case-insensitively after trimming
/// - Unknown input yields a descriptive `String` error naming the enum
#[macro_export]
macro_rules! impl_label_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Stable label for this variant.
            pub const fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let trimmed = s.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}
