/// Database row types — these map directly to SQLite rows.
/// Distinct from messagely-types API models to keep the DB layer independent.
/// Timestamps stay as the stored RFC 3339 text; the API layer parses them.

/// Profile fields supplied at registration.
pub struct NewUser<'a> {
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: &'a str,
}

/// A user record without its password hash.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub join_at: String,
    pub last_login_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRow {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub from_username: String,
    pub to_username: String,
    pub body: String,
    pub sent_at: String,
    pub read_at: Option<String>,
}

/// A message joined with the profile of the other party: the sender for an
/// inbox listing, the recipient for an outbox listing.
#[derive(Debug, Clone)]
pub struct CorrespondenceRow {
    pub id: i64,
    pub body: String,
    pub sent_at: String,
    pub read_at: Option<String>,
    pub counterpart: ProfileRow,
}

#[derive(Debug, Clone)]
pub struct MessageDetailRow {
    pub id: i64,
    pub body: String,
    pub sent_at: String,
    pub read_at: Option<String>,
    pub from_user: ProfileRow,
    pub to_user: ProfileRow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadReceiptRow {
    pub id: i64,
    pub read_at: String,
}
