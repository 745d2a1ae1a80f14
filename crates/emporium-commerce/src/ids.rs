//! Newtype ids.
//!
//! Every aggregate gets its own id type so a `CartId` can never be passed
//! where an `OrderId` is expected. All ids are random v4 UUIDs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wrap an existing UUID.
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Generate a fresh random id.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// The underlying UUID.
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
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

define_id!(
    /// Identifies a shopper or staff member, issued by the identity collaborator.
    UserId
);
define_id!(
    /// Identifies a catalog product.
    ProductId
);
define_id!(
    /// Identifies a product category.
    CategoryId
);
define_id!(
    /// Identifies a user's cart.
    CartId
);
define_id!(
    /// Identifies one line of a cart.
    CartItemId
);
define_id!(
    /// Identifies a coupon.
    CouponId
);
define_id!(
    /// Identifies an order.
    OrderId
);
define_id!(
    /// Identifies one frozen line of an order.
    OrderItemId
);
define_id!(
    /// Identifies a shipping address held by the address book.
    AddressId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_generation() {
        assert_ne!(ProductId::generate(), ProductId::generate());
    }

    #[test]
    fn test_id_parse_and_display() {
        let raw = "5f0c3a8e-9d1b-4c6f-8a2e-1b7d9e3f4a60";
        let id: OrderId = raw.parse().unwrap();
        assert_eq!(id.to_string(), raw);
        assert!("not-a-uuid".parse::<OrderId>().is_err());
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = CartId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }
}
