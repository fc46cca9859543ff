use serde::Deserialize;

#[derive(Deserialize)]
pub struct LoginResponse {
    pub data: LoginResponseData,
}

#[derive(Deserialize)]
pub struct LoginResponseData {
    pub ticket: String,
    #[serde(rename = "CSRFPreventionToken")]
    pub csrf_token: String,
    /// Set when the account requires a second factor that was not supplied.
    #[serde(rename = "NeedTFA", default)]
    pub need_tfa: Option<u8>,
}
