//! Signed-in user

use serde::{Deserialize, Serialize};

use crate::persistence::Persisted;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

/// Who is signed in on this device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStore {
    user: Option<User>,
    is_authenticated: bool,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_user(&mut self, user: User) {
        self.user = Some(user);
        self.is_authenticated = true;
    }

    pub fn logout(&mut self) {
        self.user = None;
        self.is_authenticated = false;
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }
}

impl Persisted for UserStore {
    const STORAGE_KEY: &'static str = "atom-user-storage";
}
