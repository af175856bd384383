/// The user a request is acting as.
///
/// Only produced by [`TokenSigner::verify`](crate::TokenSigner::verify), so
/// holding one means a valid token was presented for this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    username: String,
}

impl CallerIdentity {
    pub(crate) fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is(&self, username: &str) -> bool {
        self.username == username
    }
}
