use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub full_name: String,
    pub mobile_number: Option<String>,
    pub country_code: String,
    pub country_name: String,
    pub avatar_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// An authenticated user together with the profile row keyed by the same id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    pub email_confirmed: bool,
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpPayload {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(length(min = 1))]
    pub full_name: String,
    pub mobile_number: String,
    pub country_code: String,
    pub country_name: String,
}

impl SignUpPayload {
    pub fn new(email: String, password: String, full_name: String, mobile_number: String) -> Self {
        Self {
            email,
            password,
            full_name,
            mobile_number,
            country_code: "IN".to_string(),
            country_name: "India".to_string(),
        }
    }
}
