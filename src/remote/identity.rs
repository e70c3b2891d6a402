use serde::{Deserialize, Serialize};

/// An identity asserted by an external sign-in provider (e.g. Google).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    /// Provider name, e.g. "google".
    pub provider: String,
    /// Provider-scoped stable user identifier.
    pub subject: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl ExternalIdentity {
    pub fn new(
        provider: impl Into<String>,
        subject: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            subject: subject.into(),
            email: email.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// True when the provider supplied a usable email address.
    pub fn has_email(&self) -> bool {
        let email = self.email.trim();
        !email.is_empty() && email.contains('@')
    }
}
