use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

// Ids are opaque: never parse them as numbers or assume they are sequential.
string_id_newtype!(EntityId);
string_id_newtype!(UserId);
string_id_newtype!(CollectionKey);

impl CollectionKey {
    pub const CAROUSEL: &'static str = "carousel";
    pub const FEATURED: &'static str = "featured";

    pub fn carousel() -> Self {
        Self::new(Self::CAROUSEL)
    }

    pub fn featured() -> Self {
        Self::new(Self::FEATURED)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Artist,
    Member,
}

impl Role {
    pub fn can_curate(self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Artist => "artist",
            Role::Member => "member",
        };
        f.write_str(name)
    }
}

/// Opaque reference understood by the image CDN (a public id or an absolute URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl ImageRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Membership of an entity in a curated collection, as last known from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Membership {
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

impl Membership {
    pub fn none() -> Self {
        Self {
            selected: false,
            order: None,
        }
    }

    pub fn at(order: u32) -> Self {
        Self {
            selected: true,
            order: Some(order),
        }
    }
}
