//! Who may do what to which resource.
//!
//! Each [`Action`] carries the ownership fields of its target, fetched by the
//! caller beforehand. Deciding is pure: no I/O and no state.

use crate::identity::CallerIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    /// Read a user's full profile.
    ViewProfile { username: &'a str },
    /// List the messages a user sent or received.
    ListMessages { username: &'a str },
    /// List every user's public profile.
    ListUsers,
    ReadMessage {
        from_username: &'a str,
        to_username: &'a str,
    },
    /// The sender is always the caller, so there is nothing to check.
    SendMessage,
    MarkRead { to_username: &'a str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

impl From<bool> for Decision {
    fn from(allowed: bool) -> Self {
        if allowed { Decision::Allow } else { Decision::Deny }
    }
}

pub fn decide(caller: &CallerIdentity, action: Action<'_>) -> Decision {
    match action {
        Action::ViewProfile { username } | Action::ListMessages { username } => {
            caller.is(username).into()
        }
        Action::ListUsers | Action::SendMessage => Decision::Allow,
        Action::ReadMessage {
            from_username,
            to_username,
        } => (caller.is(from_username) || caller.is(to_username)).into(),
        Action::MarkRead { to_username } => caller.is(to_username).into(),
    }
}
