use serde::{Deserialize, Serialize};

/// Declares a row identifier newtype over the backend's `BIGINT` key.
///
/// Each table gets its own type so an order id can never be passed where a
/// cookie id is expected.
macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from a raw key value.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw key value.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

row_id!(
    /// Primary key of a `users` row.
    UserId
);

row_id!(
    /// Primary key of a `cookies` row (one SKU).
    CookieId
);

row_id!(
    /// Primary key of an `orders` row.
    OrderId
);

row_id!(
    /// Primary key of a `line_items` row.
    LineItemId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_preserve_raw_value() {
        let id = OrderId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(OrderId::from(42), id);
    }

    #[test]
    fn ids_parse_from_path_segments() {
        let id: CookieId = "7".parse().unwrap();
        assert_eq!(id, CookieId::new(7));
        assert!("seven".parse::<CookieId>().is_err());
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&UserId::new(3)).unwrap();
        assert_eq!(json, "3");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, UserId::new(3));
    }

    #[test]
    fn ids_display_as_numbers() {
        assert_eq!(LineItemId::new(11).to_string(), "11");
    }
}
