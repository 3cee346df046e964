//! Strongly typed identifiers
//!
//! Catalog identifiers are opaque integers; wrapping each kind in its own
//! newtype keeps an item id from being passed where a user id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw integer value
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Catalog item (product) identifier
    ItemId
);
define_id!(
    /// User identifier
    UserId
);
define_id!(
    /// Merchant identifier
    MerchantId
);
define_id!(
    /// Category identifier
    CategoryId
);
define_id!(
    /// Brand identifier
    BrandId
);
