use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload used for member sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid,          // user ID
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub iat: usize,         // issued at (unix timestamp)
    pub exp: usize,         // expires at (unix timestamp)
    pub iss: String,        // issuer
    pub aud: String,        // audience
    pub jti: Uuid,          // unique per issuance
}
