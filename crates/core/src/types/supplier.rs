//! Suppliers (wholesalers and laboratories).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::id::SupplierId;
use super::lenient;
use crate::mapping::{self, FieldMap, Payload};

/// A supplier as listed and edited in the back-office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub postal_code: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub siret: Option<String>,
    /// Suppliers are active unless the backend says otherwise.
    #[serde(default = "active_by_default", deserialize_with = "active_flag")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient::opt_datetime")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "lenient::opt_datetime")]
    pub updated_at: Option<NaiveDateTime>,
}

const fn active_by_default() -> bool {
    true
}

fn active_flag<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(lenient::opt_flag(deserializer)?.unwrap_or(true))
}

impl Payload for Supplier {
    const FIELDS: FieldMap = mapping::SUPPLIER;
}

impl Supplier {
    /// Local search: case-insensitive substring over name, city, email,
    /// SIRET and phone. A blank query matches everything.
    #[must_use]
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        std::iter::once(self.name.as_str())
            .chain(
                [&self.city, &self.email, &self.siret, &self.phone]
                    .into_iter()
                    .filter_map(Option::as_deref),
            )
            .any(|field| field.to_lowercase().contains(&query))
    }

    /// `Actif` / `Inactif`.
    #[must_use]
    pub const fn activity_label(&self) -> &'static str {
        if self.is_active { "Actif" } else { "Inactif" }
    }
}

/// Create/update payload for a supplier.
///
/// Serialized with snake_case keys and the legacy camelCase duplicates the
/// older endpoints still read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct SupplierInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub siret: String,
    pub address: String,
    pub postal_code: String,
    #[serde(rename = "postalCode")]
    pub postal_code_legacy: String,
    pub city: String,
    pub phone: String,
    pub email: String,
    pub is_active: bool,
    #[serde(rename = "isActive")]
    pub is_active_legacy: bool,
}

impl SupplierInput {
    /// An empty, active supplier form.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_active: true,
            is_active_legacy: true,
            ..Self::default()
        }
    }

    /// Prefill a form from an existing supplier.
    #[must_use]
    pub fn from_supplier(supplier: &Supplier) -> Self {
        let postal_code = supplier.postal_code.clone().unwrap_or_default();
        Self {
            name: supplier.name.clone(),
            code: supplier.code.clone(),
            siret: supplier.siret.clone().unwrap_or_default(),
            address: supplier.address.clone().unwrap_or_default(),
            postal_code_legacy: postal_code.clone(),
            postal_code,
            city: supplier.city.clone().unwrap_or_default(),
            phone: supplier.phone.clone().unwrap_or_default(),
            email: supplier.email.clone().unwrap_or_default(),
            is_active: supplier.is_active,
            is_active_legacy: supplier.is_active,
        }
    }

    /// Set the postal code, keeping the legacy key in sync.
    pub fn set_postal_code(&mut self, postal_code: impl Into<String>) {
        self.postal_code = postal_code.into();
        self.postal_code_legacy.clone_from(&self.postal_code);
    }

    /// Set the active flag, keeping the legacy key in sync.
    pub const fn set_active(&mut self, active: bool) {
        self.is_active = active;
        self.is_active_legacy = active;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Supplier {
        Supplier::from_payload(json!({
            "id": 4,
            "name": "Biopharm Alger",
            "postalCode": "16000",
            "city": "Alger",
            "email": "commandes@biopharm.dz",
            "siret": 123_456_789,
            "isActive": false,
            "created_at": "2024-01-02T08:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_from_payload_maps_aliases() {
        let supplier = sample();
        assert_eq!(supplier.id.as_str(), "4");
        assert_eq!(supplier.postal_code.as_deref(), Some("16000"));
        assert_eq!(supplier.siret.as_deref(), Some("123456789"));
        assert!(!supplier.is_active);
        assert!(supplier.created_at.is_some());
    }

    #[test]
    fn test_defaults_active() {
        let supplier = Supplier::from_payload(json!({"id": "s-1", "name": "X"})).unwrap();
        assert!(supplier.is_active);
        assert_eq!(supplier.activity_label(), "Actif");
    }

    #[test]
    fn test_search() {
        let supplier = sample();
        assert!(supplier.matches_search("  BIOPHARM "));
        assert!(supplier.matches_search("alger"));
        assert!(supplier.matches_search("12345"));
        assert!(!supplier.matches_search("oran"));
        assert!(supplier.matches_search(""));
    }

    #[test]
    fn test_input_serializes_legacy_keys() {
        let mut input = SupplierInput::new("Laboratoire Sud");
        input.set_postal_code("31000");
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["postal_code"], "31000");
        assert_eq!(value["postalCode"], "31000");
        assert_eq!(value["is_active"], true);
        assert_eq!(value["isActive"], true);
        assert!(value.get("code").is_none());
    }
}
