use serde::{Deserialize, Serialize};

/// The authenticated account, as returned by the user endpoint and embedded
/// in login/registration responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub pk: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub profile_id: i64,
    #[serde(default)]
    pub profile_image: Option<String>,
}

/// Successful login/registration payload. The refresh token is a JWT whose
/// expiry claim is the only part the client inspects; the tokens themselves
/// also travel as cookies set by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub user: CurrentUser,
    #[serde(default)]
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Registration form body. The API validates that both passwords match.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub password1: String,
    pub password2: String,
}
