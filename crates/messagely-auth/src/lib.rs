//! Identity primitives shared by the HTTP layer: password hashing, signed
//! identity tokens, and the access policy that checks a caller against the
//! ownership fields of a resource.

pub mod identity;
pub mod password;
pub mod policy;
pub mod token;

pub use identity::CallerIdentity;
pub use policy::{Action, Decision, decide};
pub use token::{TokenError, TokenSigner};
