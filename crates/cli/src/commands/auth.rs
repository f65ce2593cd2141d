//! Session and account commands.

use officine_client::ConnectionStatus;
use officine_core::{RegisterRequest, User, UserRole};
use secrecy::{ExposeSecret, SecretString};

use super::{CommandError, Context};
use crate::output;

/// Account fields collected from the command line.
pub struct Registration {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

fn print_user(user: &User) {
    output::field("Utilisateur", &user.display_name());
    output::field("Identifiant", &user.username);
    output::field("Email", &user.email);
    let role = user
        .role_display
        .clone()
        .or_else(|| user.role.map(|r| r.label_fr().to_owned()))
        .unwrap_or_default();
    output::field("Rôle", &role);
    output::field("Pharmacie", user.pharmacy_name.as_deref().unwrap_or_default());
}

/// Sign in and persist the session.
///
/// # Errors
///
/// Returns error if the credentials are rejected.
pub async fn login(
    ctx: &Context,
    username: &str,
    password: &SecretString,
) -> Result<(), CommandError> {
    let user = ctx.client.login(username, password).await?;
    output::message(&format!("Bienvenue, {}", user.display_name()));
    Ok(())
}

/// Clear the stored session.
pub async fn logout(ctx: &Context) {
    ctx.client.logout().await;
    output::message("Déconnecté");
}

/// Show the signed-in user, refreshed from the backend.
///
/// # Errors
///
/// Returns error if no session is stored or the token was rejected.
pub async fn whoami(ctx: &Context) -> Result<(), CommandError> {
    let user = ctx.client.fetch_current_user().await?;
    print_user(&user);
    Ok(())
}

/// Create an account and sign in with it.
///
/// # Errors
///
/// Returns error if the backend rejects the form.
pub async fn register(
    ctx: &Context,
    form: Registration,
    password: SecretString,
) -> Result<(), CommandError> {
    if form.username.trim().is_empty() || form.email.trim().is_empty() {
        return Err(CommandError::InvalidArgument(
            "username and email are required".to_owned(),
        ));
    }
    let request = RegisterRequest {
        username: form.username,
        email: form.email,
        first_name: form.first_name,
        last_name: form.last_name,
        password: password.expose_secret().to_owned(),
        role: form.role,
    };
    let user = ctx.client.register(&request).await?;
    output::message("Compte créé");
    print_user(&user);
    Ok(())
}

/// Change the password of the signed-in user.
///
/// # Errors
///
/// Returns error if the old password is wrong or the new one is refused.
pub async fn change_password(
    ctx: &Context,
    old_password: &SecretString,
    new_password: &SecretString,
) -> Result<(), CommandError> {
    ctx.client
        .change_password(old_password, new_password)
        .await?;
    output::message("Mot de passe modifié");
    Ok(())
}

/// Test the backend connection.
///
/// # Errors
///
/// Returns error if the backend cannot be reached.
pub async fn health(ctx: &Context) -> Result<(), CommandError> {
    let status = ctx.client.check_connection().await;
    output::field("Serveur", &ctx.client.base_url());
    output::field("Statut", status.label_fr());
    match status {
        ConnectionStatus::Connected => Ok(()),
        ConnectionStatus::Failed(reason) => Err(CommandError::Unreachable(reason)),
    }
}
