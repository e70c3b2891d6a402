use serde::{Deserialize, Serialize};
use std::fmt;

/// A local account. Root of every per-user row in the store.
///
/// `password` holds the stored credential string, not necessarily the
/// password itself: accounts created through `UserRepository::register`
/// carry a salted hash (see `crate::credentials`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl User {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: None,
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{} (#{})", self.email, id),
            None => write!(f, "{}", self.email),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new_has_no_id() {
        let user = User::new("a@x.com", "p");
        assert_eq!(user.id, None);
        assert_eq!(user.email, "a@x.com");
    }

    #[test]
    fn test_user_display() {
        assert_eq!(User::new("a@x.com", "p").to_string(), "a@x.com");
        assert_eq!(User::new("a@x.com", "p").with_id(7).to_string(), "a@x.com (#7)");
    }

    #[test]
    fn test_user_json_omits_credential() {
        let json = serde_json::to_string(&User::new("a@x.com", "secret")).unwrap();
        assert!(json.contains("a@x.com"));
        assert!(!json.contains("secret"));
    }
}
