//! Identifier newtypes for the Gatehouse domain.
//!
//! Every ledger operation takes the acting identity (buyer, terminal)
//! explicitly; identity is never inferred from ambient state.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing `Uuid`
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an event
    EventId
);
uuid_id!(
    /// Unique identifier for a ticket tier
    TierId
);
uuid_id!(
    /// Unique identifier for a reservation session
    SessionId
);
uuid_id!(
    /// Unique identifier for an order
    OrderId
);
uuid_id!(
    /// Unique identifier for a minted ticket
    TicketId
);
uuid_id!(
    /// Unique identifier for a buyer
    BuyerId
);

/// Identifier for a scanning terminal (e.g., `"gate-a"`).
///
/// Terminal ids are operator-assigned names, not UUIDs: they appear on scan
/// history screens and in reconciliation tie-breaking, so they stay legible.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TerminalId(String);

impl TerminalId {
    /// Creates a terminal id from an operator-assigned name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the terminal name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TerminalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique scan code printed on a ticket (QR payload).
///
/// Codes are minted once per ticket and look like
/// `TKT-9f2c4e61d0a94b7f8a1a2b3c4d5e6f70`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScanCode(String);

impl ScanCode {
    /// Mints a new unique scan code
    #[must_use]
    pub fn mint() -> Self {
        Self(format!("TKT-{}", Uuid::new_v4().simple()))
    }

    /// Wraps a code captured by a scanner (camera or manual entry)
    #[must_use]
    pub fn from_captured(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScanCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
