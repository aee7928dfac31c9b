//! Domain macros
//!
//! - [`impl_domain_status_conversions!`]: `Display` and `FromStr` for status
//!   enums, case-insensitive on parse.
//! - [`query_key!`]: build a [`QueryKey`](crate::QueryKey) from literal parts.
//!
//! # Example
//!
//! ```rust
//! use afasa_domain::{impl_domain_status_conversions, query_key};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum DeviceState {
//!     Online,
//!     Offline,
//! }
//!
//! impl_domain_status_conversions!(DeviceState {
//!     Online => "online",
//!     Offline => "offline",
//! });
//!
//! assert_eq!(DeviceState::Online.to_string(), "online");
//! assert_eq!(query_key!["tasks", "open"].to_string(), r#"["tasks","open"]"#);
//! ```

/// Implements Display and FromStr traits for status enums
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their string
///   representations
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

/// Builds a [`QueryKey`](crate::QueryKey) from parts convertible into
/// [`KeyPart`](crate::KeyPart).
#[macro_export]
macro_rules! query_key {
    ($($part:expr),* $(,)?) => {
        $crate::types::QueryKey::from(vec![$($crate::types::KeyPart::from($part)),*])
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::{KeyPart, QueryKey};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestStatus {
        Pending,
        RolledBack,
    }

    impl_domain_status_conversions!(TestStatus {
        Pending => "pending",
        RolledBack => "rolled_back",
    });

    #[test]
    fn test_display_conversion() {
        assert_eq!(TestStatus::Pending.to_string(), "pending");
        assert_eq!(TestStatus::RolledBack.to_string(), "rolled_back");
    }

    #[test]
    fn test_fromstr_is_case_insensitive() {
        assert_eq!(TestStatus::from_str("PENDING").unwrap(), TestStatus::Pending);
        assert_eq!(TestStatus::from_str("Rolled_Back").unwrap(), TestStatus::RolledBack);
    }

    #[test]
    fn test_fromstr_invalid() {
        let result = TestStatus::from_str("settled");
        assert!(result.unwrap_err().contains("Invalid TestStatus: settled"));
        assert!(TestStatus::from_str("").is_err());
    }

    #[test]
    fn test_query_key_macro_mixes_part_types() {
        let key = query_key!["audit", 50_i64, true];
        assert_eq!(
            key,
            QueryKey::from(vec![KeyPart::from("audit"), KeyPart::Int(50), KeyPart::Bool(true)])
        );
        assert!(QueryKey::default().is_empty());
    }
}
