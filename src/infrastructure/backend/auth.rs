use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;
use validator::Validate;

use super::{error_detail, error_from_response, send_checked, AuthSession, AuthUser, BackendClient};
use crate::domain::error::{AppError, Result};
use crate::domain::user::{SignUpPayload, UserAccount, UserProfile};

#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: String,
    #[serde(default)]
    full_name: String,
    mobile_number: Option<String>,
    #[serde(default)]
    country_code: String,
    #[serde(default)]
    country_name: String,
    avatar_url: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            full_name: row.full_name,
            mobile_number: row.mobile_number,
            country_code: row.country_code,
            country_name: row.country_name,
            avatar_url: row.avatar_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl BackendClient {
    /// Registers a new account and asks the `send-verification` edge function
    /// to create the profile row and mail the confirmation link. The account
    /// stays unusable until the email is confirmed.
    pub async fn sign_up(&self, payload: &SignUpPayload) -> Result<UserAccount> {
        payload
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let body = json!({
            "email": payload.email,
            "password": payload.password,
            "data": {
                "full_name": payload.full_name,
                "mobile_number": payload.mobile_number,
                "country_code": payload.country_code,
                "country_name": payload.country_name,
            },
        });

        let response = self
            .apply_auth(self.http().post(self.auth_url("signup")))
            .await
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::TransportError(format!("Sign up failed: {}", e)))?;

        if !response.status().is_success() {
            let err = error_from_response("Sign up failed", response).await;
            if err.to_string().contains("already registered") {
                return Err(AppError::ValidationError(
                    "This email address is already registered. Please sign in instead.".to_string(),
                ));
            }
            return Err(err);
        }

        let value: serde_json::Value = response.json().await.map_err(|e| {
            AppError::InvalidResponseError(format!("Malformed sign up response: {}", e))
        })?;
        // Depending on confirmation settings the user object is either the
        // whole body or nested under "user".
        let user_value = value.get("user").cloned().unwrap_or(value);
        let user_id = user_value
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AppError::InvalidResponseError("Sign up response carried no user id".to_string())
            })?
            .to_string();

        let profile_body = json!({
            "userId": user_id,
            "email": payload.email,
            "name": payload.full_name,
            "mobileNumber": payload.mobile_number,
            "countryCode": payload.country_code,
            "countryName": payload.country_name,
        });
        let profile_response = self
            .apply_auth(self.http().post(self.functions_url("send-verification")))
            .await
            .json(&profile_body)
            .send()
            .await
            .map_err(|e| AppError::TransportError(format!("Profile creation failed: {}", e)))?;
        if !profile_response.status().is_success() {
            return Err(AppError::BackendError(
                "Failed to create user profile".to_string(),
            ));
        }

        Ok(UserAccount {
            id: user_id.clone(),
            email: payload.email.clone(),
            email_confirmed: false,
            profile: UserProfile {
                id: user_id,
                full_name: payload.full_name.clone(),
                mobile_number: Some(payload.mobile_number.clone()),
                country_code: payload.country_code.clone(),
                country_name: payload.country_name.clone(),
                avatar_url: None,
                created_at: None,
                updated_at: None,
            },
        })
    }

    /// Password sign-in. Unconfirmed accounts are rejected before any session
    /// is stored, so a failed gate leaves the client signed out.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let response = self
            .apply_auth(self.http().post(self.auth_url("token")))
            .await
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AppError::TransportError(format!("Sign in failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 400 || status.as_u16() == 401 {
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::CredentialError(error_detail(&body)));
            }
            return Err(error_from_response("Sign in failed", response).await);
        }

        let session: AuthSession = response.json().await.map_err(|e| {
            AppError::InvalidResponseError(format!("Malformed sign in response: {}", e))
        })?;

        if session.user.email_confirmed_at.is_none() {
            return Err(AppError::ValidationError(
                "Please verify your email before signing in".to_string(),
            ));
        }

        self.set_session(session.clone()).await;
        Ok(session)
    }

    /// Fetches the authenticated user together with the profile row keyed by
    /// the same id.
    pub async fn current_user(&self) -> Result<UserAccount> {
        let token = self.access_token().await.ok_or_else(|| {
            AppError::CredentialError("Auth session missing".to_string())
        })?;

        let response = send_checked(
            "Fetching user failed",
            self.http()
                .get(self.auth_url("user"))
                .header("apikey", self.anon_key())
                .bearer_auth(token),
        )
        .await?;
        let user: AuthUser = response.json().await.map_err(|e| {
            AppError::InvalidResponseError(format!("Malformed user response: {}", e))
        })?;

        let rows: Vec<ProfileRow> = send_checked(
            "Fetching profile failed",
            self.apply_auth(self.http().get(self.rest_url("profiles")))
                .await
                .query(&[("select", "*"), ("id", &format!("eq.{}", user.id))]),
        )
        .await?
        .json()
        .await
        .map_err(|e| AppError::InvalidResponseError(format!("Malformed profile rows: {}", e)))?;

        let profile = rows
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("User profile not found".to_string()))?;

        Ok(UserAccount {
            id: user.id.clone(),
            email: user.email.clone().unwrap_or_default(),
            email_confirmed: user.email_confirmed_at.is_some(),
            profile: profile.into(),
        })
    }

    /// Drops the local session and revokes the token server-side. Revocation
    /// is best effort: the local session is gone either way.
    pub async fn sign_out(&self) -> Result<()> {
        let Some(session) = self.clear_session().await else {
            return Ok(());
        };

        let result = self
            .http()
            .post(self.auth_url("logout"))
            .header("apikey", self.anon_key())
            .bearer_auth(&session.access_token)
            .send()
            .await;
        match result {
            Ok(response) if !response.status().is_success() => {
                warn!(status = %response.status(), "token revocation failed");
            }
            Err(e) => warn!(error = %e, "token revocation failed"),
            _ => {}
        }
        Ok(())
    }

    pub async fn reset_password(&self, email: &str) -> Result<()> {
        send_checked(
            "Password reset failed",
            self.apply_auth(self.http().post(self.auth_url("recover")))
                .await
                .json(&json!({ "email": email })),
        )
        .await?;
        Ok(())
    }

    pub async fn resend_verification_email(&self, email: &str) -> Result<()> {
        send_checked(
            "Resending verification failed",
            self.apply_auth(self.http().post(self.auth_url("resend")))
                .await
                .json(&json!({ "type": "signup", "email": email })),
        )
        .await?;
        Ok(())
    }

    pub async fn update_password(&self, new_password: &str) -> Result<()> {
        let token = self.access_token().await.ok_or_else(|| {
            AppError::CredentialError("Auth session missing".to_string())
        })?;

        send_checked(
            "Password update failed",
            self.http()
                .put(self.auth_url("user"))
                .header("apikey", self.anon_key())
                .bearer_auth(token)
                .json(&json!({ "password": new_password })),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_row_maps_onto_domain_profile() {
        let row: ProfileRow = serde_json::from_str(
            r#"{
                "id": "user-1",
                "full_name": "Asha Rao",
                "mobile_number": "9876543210",
                "country_code": "IN",
                "country_name": "India",
                "avatar_url": null,
                "created_at": "2024-03-01T10:00:00Z",
                "updated_at": null
            }"#,
        )
        .unwrap();

        let profile: UserProfile = row.into();
        assert_eq!(profile.id, "user-1");
        assert_eq!(profile.full_name, "Asha Rao");
        assert_eq!(profile.country_code, "IN");
        assert!(profile.created_at.is_some());
        assert!(profile.updated_at.is_none());
    }

    #[test]
    fn test_profile_row_tolerates_sparse_rows() {
        let row: ProfileRow = serde_json::from_str(r#"{"id": "user-2"}"#).unwrap();
        let profile: UserProfile = row.into();
        assert_eq!(profile.full_name, "");
        assert!(profile.mobile_number.is_none());
    }
}
