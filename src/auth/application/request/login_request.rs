use serde::Serialize;

#[derive(Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub realm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}
