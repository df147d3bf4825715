use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn from_raw(s: impl Into<String>) -> Self {
                Self(s.into())
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

        impl FromStr for $name {
            type Err = std::convert::Infallible;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
    ($name:ident, $prefix:expr) => {
        string_id!($name);

        impl $name {
            pub fn new() -> Self {
                Self(format!("{}_{}", $prefix, Uuid::now_v7()))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

// Subscription channel name, e.g. "cases". Opaque to the client.
string_id!(Topic);

// Server event ids are reused verbatim; locally minted ids only fill gaps.
string_id!(NotificationId, "ntf");

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn topic_from_str_and_display() {
        let topic = Topic::from("cases");
        assert_eq!(topic.as_str(), "cases");
        assert_eq!(topic.to_string(), "cases");
    }

    #[test]
    fn topic_set_membership_dedupes() {
        let mut set = HashSet::new();
        assert!(set.insert(Topic::from("alerts")));
        assert!(!set.insert(Topic::from_raw(String::from("alerts"))));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn topic_serializes_as_plain_string() {
        let json = serde_json::to_string(&Topic::from("workflows")).unwrap();
        assert_eq!(json, "\"workflows\"");
    }

    #[test]
    fn notification_id_unique_and_prefixed() {
        let a = NotificationId::new();
        let b = NotificationId::new();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("ntf_"));
    }
}
