use serde::{Deserialize, Serialize};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response returned after register or login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub name: String,
    pub email: String,
}

/// Logout carries the token as a query parameter; it is optional.
#[derive(Debug, Deserialize)]
pub struct LogoutQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Logout always succeeds.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}
