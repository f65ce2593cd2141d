//! Authentication, profile and access checks.

use officine_core::{
    Access, AuthResponse, Envelope, LoginRequest, Operation, Payload, RegisterRequest, User,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::instrument;

use crate::api::ApiClient;
use crate::error::ApiError;

/// Outcome of a backend connection test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Failed(String),
}

impl ConnectionStatus {
    /// French status line.
    #[must_use]
    pub const fn label_fr(&self) -> &'static str {
        match self {
            Self::Connected => "Connecté avec succès",
            Self::Failed(_) => "Erreur de connexion",
        }
    }
}

fn auth_response(body: Value) -> Result<AuthResponse, ApiError> {
    let value = Envelope::normalize(body).into_single()?;
    Ok(serde_json::from_value(value)?)
}

impl ApiClient {
    /// Sign in and persist the session.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for rejected credentials, or
    /// `Session` if the answer carries no token.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<User, ApiError> {
        let request = LoginRequest {
            username: username.to_owned(),
            password: password.expose_secret().to_owned(),
        };
        let body: Value = self.post("/api/auth/login/", &request).await?;
        let user = self.session().establish(&auth_response(body)?).await?;
        tracing::info!(user_id = %user.id, "Signed in");
        Ok(user)
    }

    /// Create an account and sign in with it.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the backend rejects the form.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        let body: Value = self.post("/api/auth/register/", request).await?;
        Ok(self.session().establish(&auth_response(body)?).await?)
    }

    /// Exchange the current token for a fresh one.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` when signed out.
    #[instrument(skip(self))]
    pub async fn refresh_token(&self) -> Result<User, ApiError> {
        self.require_token().await?;
        let body: Value = self.post("/api/auth/refresh/", &json!({})).await?;
        Ok(self.session().establish(&auth_response(body)?).await?)
    }

    /// Reload the signed-in user's profile from the backend.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` when signed out.
    #[instrument(skip(self))]
    pub async fn fetch_current_user(&self) -> Result<User, ApiError> {
        self.require_token().await?;
        let body: Value = self.get("/api/auth/user/").await?;
        let user: User = Envelope::normalize(body).decode_single()?;
        self.session().update_user(user.clone()).await?;
        Ok(user)
    }

    /// Apply `changes` to the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` when signed out, `Validation` when the
    /// backend rejects a field.
    #[instrument(skip(self, changes))]
    pub async fn update_profile(&self, changes: &Value) -> Result<User, ApiError> {
        let current = self
            .session()
            .current_user()
            .await
            .ok_or(ApiError::NotAuthenticated)?;
        let path = format!("/api/auth/user/{}/", current.id);
        let body: Value = self.patch(&path, changes).await?;
        let user = match Envelope::normalize(body).into_single()? {
            Value::Null => current,
            value => User::from_payload(value)?,
        };
        self.session().update_user(user.clone()).await?;
        Ok(user)
    }

    /// Change the signed-in user's password.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the old password is wrong or the new one is
    /// refused.
    #[instrument(skip(self, old_password, new_password))]
    pub async fn change_password(
        &self,
        old_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<(), ApiError> {
        self.require_token().await?;
        let body = json!({
            "old_password": old_password.expose_secret(),
            "new_password": new_password.expose_secret(),
        });
        let _: Value = self.post("/api/auth/change-password/", &body).await?;
        Ok(())
    }

    /// Sign out locally. The backend keeps no session to end.
    pub async fn logout(&self) {
        self.session().clear().await;
        tracing::info!("Signed out");
    }

    /// Ping `/api/health/`.
    pub async fn check_connection(&self) -> ConnectionStatus {
        match self.get::<Value>("/api/health/").await {
            Ok(_) => ConnectionStatus::Connected,
            Err(e) => ConnectionStatus::Failed(e.to_string()),
        }
    }

    /// Check the signed-in user may perform `operation`.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` when signed out and `Forbidden` when the
    /// role does not allow it.
    pub async fn guard(&self, operation: Operation) -> Result<(), ApiError> {
        match self.session().check(operation).await {
            Access::Allowed => Ok(()),
            Access::LoginRequired => Err(ApiError::NotAuthenticated),
            Access::Denied => {
                tracing::warn!(?operation, "Operation denied for current role");
                Err(ApiError::Forbidden(format!("{operation:?}")))
            }
        }
    }

    async fn require_token(&self) -> Result<(), ApiError> {
        if self.session().token().await.is_some() {
            Ok(())
        } else {
            Err(ApiError::NotAuthenticated)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_accepts_both_shapes() {
        let wrapped = auth_response(json!({
            "data": {"token": "t1", "user": {"id": 1, "username": "amel"}},
            "message": "ok"
        }))
        .unwrap();
        assert_eq!(wrapped.token, "t1");

        let bare = auth_response(json!({"token": "t2", "user": {"id": 2}})).unwrap();
        assert_eq!(bare.token, "t2");
        assert_eq!(bare.user().unwrap().id.as_str(), "2");
    }

    #[test]
    fn test_connection_labels() {
        assert_eq!(ConnectionStatus::Connected.label_fr(), "Connecté avec succès");
        assert_eq!(
            ConnectionStatus::Failed("refused".to_owned()).label_fr(),
            "Erreur de connexion"
        );
    }
}
