use serde::{Deserialize, Serialize};

use crate::{AppResult, NonEmptyString};

/// Actor recorded in audit stamps for grant and assignment mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorIdentity {
    subject: String,
    display_name: String,
}

impl ActorIdentity {
    /// Creates an actor identity, rejecting a blank subject.
    pub fn new(subject: impl Into<String>, display_name: impl Into<String>) -> AppResult<Self> {
        let subject = NonEmptyString::new(subject)?;

        Ok(Self {
            subject: subject.as_str().trim().to_owned(),
            display_name: display_name.into(),
        })
    }

    /// Actor used for startup tasks such as catalog seeding.
    #[must_use]
    pub fn system() -> Self {
        Self {
            subject: "system".to_owned(),
            display_name: "System".to_owned(),
        }
    }

    /// Returns the stable subject of the actor.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the display name of the actor.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }
}
