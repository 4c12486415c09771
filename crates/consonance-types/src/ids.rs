//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Connections and emergent events each get a strongly-typed ID so a
//! connection handle can never be confused with a crystal or sigil. All IDs
//! use UUID v7, which is time-ordered and monotonic within one process, so
//! sorting by ID yields creation order.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a live client connection.
    ///
    /// Never reused: a closed connection's ID is retired with it.
    ConnectionId
}

define_id! {
    /// Unique identifier for a crystal formation event.
    CrystalId
}

define_id! {
    /// Unique identifier for a sigil creation event.
    SigilId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let connection = ConnectionId::new();
        let crystal = CrystalId::new();
        // These are different types -- the compiler enforces no mixing.
        assert_ne!(connection.into_inner(), Uuid::nil());
        assert_ne!(crystal.into_inner(), Uuid::nil());
    }

    #[test]
    fn ids_are_monotonic() {
        let first = CrystalId::new();
        let second = CrystalId::new();
        let third = CrystalId::new();
        assert!(first < second);
        assert!(second < third);
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = SigilId::new();
        let json = serde_json::to_string(&original).ok();
        assert!(json.is_some());
        let restored: Result<SigilId, _> = serde_json::from_str(json.as_deref().unwrap_or(""));
        assert_eq!(restored.ok(), Some(original));
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = ConnectionId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
