//! Response envelope normalization.
//!
//! The backend wraps responses three ways: `{"data": ...}`, a paginated
//! `{"results": [...], "next": ..., "count": ...}`, or no wrapper at all.
//! [`Envelope::normalize`] turns any of them into one tagged value so callers
//! never probe for keys themselves.

use serde_json::Value;
use url::Url;

use crate::mapping::Payload;
use crate::types::lenient;

/// Errors that can occur when unwrapping an envelope.
#[derive(thiserror::Error, Debug)]
pub enum EnvelopeError {
    /// A list was expected but a single value arrived.
    #[error("expected a list response")]
    NotAList,
    /// A single value was expected but a page arrived.
    #[error("expected a single object response")]
    NotAnObject,
    /// An item did not decode.
    #[error("malformed item: {0}")]
    Item(#[from] serde_json::Error),
}

/// A normalized response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// One object (or scalar).
    Single(Value),
    /// A list, possibly one page of a longer one.
    Page {
        items: Vec<Value>,
        /// Continuation URL, absolute or relative, as sent.
        next: Option<String>,
        /// Total item count across pages, when the backend reports it.
        count: Option<u64>,
    },
}

impl Envelope {
    /// Normalize a response body.
    ///
    /// Checked in order: a `data` key (its content, a list becoming a page),
    /// then a `results` key (a page with its `next`/`count`), then a bare
    /// array, else the value itself.
    #[must_use]
    pub fn normalize(body: Value) -> Self {
        match body {
            Value::Object(mut object) if object.contains_key("data") => {
                match object.remove("data").unwrap_or(Value::Null) {
                    Value::Array(items) => Self::Page {
                        items,
                        next: None,
                        count: None,
                    },
                    other => Self::Single(other),
                }
            }
            Value::Object(mut object) if object.contains_key("results") => {
                let items = match object.remove("results") {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                Self::Page {
                    items,
                    next: object.get("next").and_then(lenient::text),
                    count: object.get("count").map(lenient::count),
                }
            }
            Value::Array(items) => Self::Page {
                items,
                next: None,
                count: None,
            },
            other => Self::Single(other),
        }
    }

    /// The continuation URL, if this is a page with more to follow.
    #[must_use]
    pub fn next(&self) -> Option<&str> {
        match self {
            Self::Page { next, .. } => next.as_deref(),
            Self::Single(_) => None,
        }
    }

    /// Raw list items.
    ///
    /// A `null` single value counts as an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::NotAList`] for any other single value.
    pub fn into_items(self) -> Result<Vec<Value>, EnvelopeError> {
        match self {
            Self::Page { items, .. } => Ok(items),
            Self::Single(Value::Null) => Ok(Vec::new()),
            Self::Single(_) => Err(EnvelopeError::NotAList),
        }
    }

    /// The single value.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::NotAnObject`] for a page.
    pub fn into_single(self) -> Result<Value, EnvelopeError> {
        match self {
            Self::Single(value) => Ok(value),
            Self::Page { .. } => Err(EnvelopeError::NotAnObject),
        }
    }

    /// Decode every list item through its field map.
    ///
    /// # Errors
    ///
    /// Fails on a non-list body or on the first malformed item.
    pub fn decode_items<T: Payload>(self) -> Result<Vec<T>, EnvelopeError> {
        decode_all(self.into_items()?)
    }

    /// Decode the single value through its field map.
    ///
    /// # Errors
    ///
    /// Fails on a page body or a malformed object.
    pub fn decode_single<T: Payload>(self) -> Result<T, EnvelopeError> {
        Ok(T::from_payload(self.into_single()?)?)
    }
}

/// Decode raw items through their field map.
///
/// # Errors
///
/// Fails on the first malformed item.
pub fn decode_all<T: Payload>(items: Vec<Value>) -> Result<Vec<T>, EnvelopeError> {
    items
        .into_iter()
        .map(|item| T::from_payload(item).map_err(EnvelopeError::from))
        .collect()
}

/// Turn a continuation URL into a request path.
///
/// Absolute URLs are reduced to path and query so the request goes through
/// the configured base URL. Relative ones are used unchanged.
///
/// ```
/// use officine_core::continuation_path;
///
/// assert_eq!(
///     continuation_path("http://host/api/invoices/?page=2"),
///     "/api/invoices/?page=2"
/// );
/// assert_eq!(continuation_path("/api/invoices/?page=3"), "/api/invoices/?page=3");
/// ```
#[must_use]
pub fn continuation_path(next: &str) -> String {
    match Url::parse(next) {
        Ok(url) if url.has_host() => match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_owned(),
        },
        _ => next.to_owned(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Supplier;
    use serde_json::json;

    #[test]
    fn test_data_wrapper_list_becomes_page() {
        let envelope = Envelope::normalize(json!({"data": [{"id": 1}]}));
        assert_eq!(
            envelope,
            Envelope::Page {
                items: vec![json!({"id": 1})],
                next: None,
                count: None
            }
        );
    }

    #[test]
    fn test_data_wrapper_object_is_single() {
        let envelope = Envelope::normalize(json!({"data": {"id": 1}, "message": "ok"}));
        assert_eq!(envelope, Envelope::Single(json!({"id": 1})));
    }

    #[test]
    fn test_data_takes_priority_over_results() {
        let envelope = Envelope::normalize(json!({"data": [], "results": [{"id": 1}]}));
        assert_eq!(envelope.into_items().unwrap(), Vec::<Value>::new());
    }

    #[test]
    fn test_results_page() {
        let envelope = Envelope::normalize(json!({
            "count": 25,
            "next": "http://host/api/invoices/?page=2",
            "results": [{"id": 1}, {"id": 2}]
        }));
        assert_eq!(envelope.next(), Some("http://host/api/invoices/?page=2"));
        match envelope {
            Envelope::Page { items, count, .. } => {
                assert_eq!(items.len(), 2);
                assert_eq!(count, Some(25));
            }
            Envelope::Single(_) => panic!("expected a page"),
        }
    }

    #[test]
    fn test_results_null_next() {
        let envelope = Envelope::normalize(json!({"results": [], "next": null}));
        assert_eq!(envelope.next(), None);
    }

    #[test]
    fn test_bare_array_and_object() {
        assert!(matches!(
            Envelope::normalize(json!([1, 2])),
            Envelope::Page { ref items, .. } if items.len() == 2
        ));
        assert_eq!(
            Envelope::normalize(json!({"id": 4})),
            Envelope::Single(json!({"id": 4}))
        );
    }

    #[test]
    fn test_single_is_not_a_list() {
        let envelope = Envelope::normalize(json!({"id": 4}));
        assert!(matches!(envelope.into_items(), Err(EnvelopeError::NotAList)));
        assert!(Envelope::normalize(json!({"data": null})).into_items().unwrap().is_empty());
    }

    #[test]
    fn test_decode_items_applies_field_map() {
        let suppliers: Vec<Supplier> = Envelope::normalize(json!({
            "results": [{"id": 1, "name": "A", "postalCode": "16000"}]
        }))
        .decode_items()
        .unwrap();
        assert_eq!(suppliers[0].postal_code.as_deref(), Some("16000"));
    }

    #[test]
    fn test_continuation_path() {
        assert_eq!(
            continuation_path("https://api.example.dz:8443/api/suppliers/?page=2&page_size=20"),
            "/api/suppliers/?page=2&page_size=20"
        );
        assert_eq!(continuation_path("http://host/api/invoices/"), "/api/invoices/");
        assert_eq!(continuation_path("?page=2"), "?page=2");
    }
}
