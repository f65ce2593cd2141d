//! Newtype IDs for type-safe entity references.
//!
//! The backend hands out integer primary keys for some entities and UUIDs for
//! others, sometimes as JSON numbers and sometimes as strings. Every ID is
//! stored as text and written back in the shape it arrived in, so a numeric
//! key is serialized as a number again.

use serde::{Deserialize, Deserializer, Serializer};

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Deserialize` accepting JSON numbers or strings
/// - `Serialize` emitting a number when the ID is a canonical integer
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`
/// - `From<&str>`, `From<String>` and `From<i64>` implementations
///
/// # Example
///
/// ```rust
/// # use officine_core::define_id;
/// define_id!(WidgetId);
/// define_id!(GadgetId);
///
/// let widget = WidgetId::from(7);
/// let gadget = GadgetId::new("0b6f7a8e-2c1d-4e5f-9a0b-1c2d3e4f5a6b");
///
/// assert_eq!(widget.as_str(), "7");
/// // These are different types, so this won't compile:
/// // let _: WidgetId = gadget;
/// # let _ = gadget;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from its textual form.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the ID as text, as used in URL paths.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id.to_string())
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                $crate::types::id::serialize_id(&self.0, serializer)
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                $crate::types::id::deserialize_id(deserializer).map(Self)
            }
        }
    };
}

define_id!(SupplierId);
define_id!(InvoiceId);
define_id!(CreditNoteId);
define_id!(UserId);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

/// Deserialize an ID given as a JSON number or string.
///
/// # Errors
///
/// Returns an error for any other JSON type.
#[doc(hidden)]
pub fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Int(id) => id.to_string(),
        RawId::Text(id) => id,
    })
}

/// Serialize an ID, restoring numeric keys as JSON numbers.
///
/// Only canonical integers qualify: `"007"` stays a string.
///
/// # Errors
///
/// Propagates serializer errors.
#[doc(hidden)]
pub fn serialize_id<S: Serializer>(id: &str, serializer: S) -> Result<S::Ok, S::Error> {
    match id.parse::<i64>() {
        Ok(n) if n.to_string() == id => serializer.serialize_i64(n),
        _ => serializer.serialize_str(id),
    }
}
