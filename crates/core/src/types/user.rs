//! Users, roles and the per-operation access table.

use core::fmt;
use core::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::id::UserId;
use super::lenient;
use crate::mapping::{self, FieldMap, Payload};

/// Error returned when a role string is not recognized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role: {0} (expected ADMIN, PHARMACIEN or COMPTABLE)")]
pub struct RoleParseError(String);

/// Back-office role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Full access, including supplier and credit note management.
    Admin,
    /// Pharmacist: same access as an administrator for day-to-day work.
    Pharmacien,
    /// Accountant: reads everything, manages invoices only.
    Comptable,
}

impl UserRole {
    /// Roles allowed to manage suppliers and credit notes.
    pub const ADMIN_FEATURES: &'static [Self] = &[Self::Admin, Self::Pharmacien];

    /// Roles allowed to see financial data.
    pub const FINANCIAL_FEATURES: &'static [Self] =
        &[Self::Admin, Self::Pharmacien, Self::Comptable];

    /// French label.
    #[must_use]
    pub const fn label_fr(self) -> &'static str {
        match self {
            Self::Admin => "Administrateur",
            Self::Pharmacien => "Pharmacien",
            Self::Comptable => "Comptable",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "ADMIN"),
            Self::Pharmacien => write!(f, "PHARMACIEN"),
            Self::Comptable => write!(f, "COMPTABLE"),
        }
    }
}

impl FromStr for UserRole {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "PHARMACIEN" => Ok(Self::Pharmacien),
            "COMPTABLE" => Ok(Self::Comptable),
            _ => Err(RoleParseError(s.to_owned())),
        }
    }
}

/// A signed-in back-office user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub username: String,
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub first_name: String,
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub last_name: String,
    /// Unknown roles are kept as `None`: such a user can sign in but passes
    /// no role check.
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Option<UserRole>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub role_display: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub pharmacy_name: Option<String>,
    #[serde(default = "active_by_default", deserialize_with = "active_flag")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient::opt_datetime")]
    pub date_joined: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "lenient::opt_datetime")]
    pub last_login: Option<NaiveDateTime>,
}

const fn active_by_default() -> bool {
    true
}

fn active_flag<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(lenient::opt_flag(deserializer)?.unwrap_or(true))
}

fn lenient_role<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<UserRole>, D::Error> {
    Ok(lenient::opt_text(deserializer)?.and_then(|raw| raw.parse().ok()))
}

impl Payload for User {
    const FIELDS: FieldMap = mapping::USER;
}

impl User {
    /// `First Last`, falling back to the username.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_owned()
        }
    }

    /// Whether the user has exactly `role`.
    #[must_use]
    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == Some(role)
    }

    /// Whether the user has any of `roles`.
    #[must_use]
    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        self.role.is_some_and(|r| roles.contains(&r))
    }
}

/// Successful login/register/refresh response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub token: String,
    pub user: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub message: Option<String>,
    #[serde(default, alias = "expiresAt", deserialize_with = "lenient::opt_text")]
    pub expires_at: Option<String>,
}

impl AuthResponse {
    /// Decode the embedded user profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile is missing or malformed.
    pub fn user(&self) -> Result<User, serde_json::Error> {
        let raw = self.user.clone().unwrap_or(serde_json::Value::Null);
        User::from_payload(raw)
    }
}

/// Credentials for `/api/auth/login/`.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Account creation payload for `/api/auth/register/`.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub role: UserRole,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Access table
// ============================================================================

/// Every guarded back-office operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ViewDashboard,
    ListSuppliers,
    ViewSupplier,
    CreateSupplier,
    EditSupplier,
    DeleteSupplier,
    ListInvoices,
    ViewInvoice,
    CreateInvoice,
    EditInvoice,
    DeleteInvoice,
    ListCreditNotes,
    ViewCreditNote,
    CreateCreditNote,
    EditCreditNote,
    DeleteCreditNote,
    ViewReports,
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    /// No session: sign in first.
    LoginRequired,
    /// Signed in without a suitable role.
    Denied,
}

impl Operation {
    /// Roles allowed to perform the operation. An empty slice means any
    /// signed-in user.
    #[must_use]
    pub const fn allowed_roles(self) -> &'static [UserRole] {
        match self {
            Self::ViewDashboard => &[],
            Self::ViewSupplier
            | Self::CreateSupplier
            | Self::EditSupplier
            | Self::DeleteSupplier
            | Self::CreateCreditNote
            | Self::EditCreditNote
            | Self::DeleteCreditNote => UserRole::ADMIN_FEATURES,
            Self::ListSuppliers
            | Self::ListInvoices
            | Self::ViewInvoice
            | Self::CreateInvoice
            | Self::EditInvoice
            | Self::DeleteInvoice
            | Self::ListCreditNotes
            | Self::ViewCreditNote
            | Self::ViewReports => UserRole::FINANCIAL_FEATURES,
        }
    }

    /// Check `user` (if signed in) against the table.
    #[must_use]
    pub fn check(self, user: Option<&User>) -> Access {
        let Some(user) = user else {
            return Access::LoginRequired;
        };
        let roles = self.allowed_roles();
        if roles.is_empty() || user.has_any_role(roles) {
            Access::Allowed
        } else {
            Access::Denied
        }
    }
}
