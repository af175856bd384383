use serde::{Deserialize, Serialize};

use crate::models::{
    InboxMessage, MessageDetail, OutboxMessage, ReadReceipt, SentMessage, UserDetail, UserSummary,
};

// -- JWT Claims --

/// JWT claims carried by every identity token. The subject is the username;
/// nothing else about the user is embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --
//
// Fields are optional on the wire so a missing field surfaces as our own
// validation error instead of a body-parsing rejection.

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

// -- Users --

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: UserDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InboxResponse {
    pub messages: Vec<InboxMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OutboxResponse {
    pub messages: Vec<OutboxMessage>,
}

// -- Messages --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub to_username: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: MessageDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SentMessageResponse {
    pub message: SentMessage,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadReceiptResponse {
    pub message: ReadReceipt,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
