use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Exchange status: request created, owner has not answered yet
pub const STATUS_PENDING: &str = "pending";
/// Exchange status: owner accepted, requester must confirm the delivery address
pub const STATUS_AWAITING_ADDRESS: &str = "Aguardando confirmação do endereço";
/// Exchange status: address defined, both sides waiting for the books
pub const STATUS_AWAITING_RECEIPT: &str = "Aguardando recebimento";
/// Exchange status: closed with a divergence report
pub const STATUS_FINISHED_WITH_DIVERGENCE: &str = "Finalizado com divergência";

/// Every terminal status starts with this word ("Finalizado", "Finalizado com divergência", ...)
pub const STATUS_FINISHED_PREFIX: &str = "Finalizado";

/// Per-party confirmation value for a cancelled exchange
pub const CONFIRMATION_CANCELLED: &str = "cancelado";
/// Per-party confirmation value for a confirmed receipt
pub const CONFIRMATION_CONFIRMED: &str = "confirmado";

/// Title used when the requested book has no title on file
pub const DEFAULT_BOOK_TITLE: &str = "Livro";

/// Reads a string field, treating any other JSON type as absent
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Reads `requestedBook`, treating anything but an object as absent
fn lenient_book<'de, D>(deserializer: D) -> Result<Option<RequestedBook>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

/// Snapshot of a document in the `messages` collection.
///
/// Fields of an unexpected type read as absent, so a message always decodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, deserialize_with = "lenient_string")]
    pub sender_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub receiver_id: Option<String>,
    /// Message payload: plain text or a structured attachment
    #[serde(default)]
    pub text: Option<Value>,
}

/// Book referenced by an exchange request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestedBook {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
}

/// Snapshot of a document in the `requests` collection.
///
/// Every field is optional on the wire and a field of the wrong type reads as
/// absent; the accessors below apply the fallbacks the rule table relies on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub requester_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub owner_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_book")]
    pub requested_book: Option<RequestedBook>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub requester_confirmation_status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub owner_confirmation_status: Option<String>,
    /// Kept as raw JSON: anything that is not an array counts as empty
    #[serde(default)]
    pub delivery_address: Option<Value>,
    /// Field name used by older clients for the same list
    #[serde(default, rename = "address", skip_serializing_if = "Option::is_none")]
    pub legacy_address: Option<Value>,
}

impl ExchangeRequest {
    /// Title of the requested book, or [`DEFAULT_BOOK_TITLE`] when absent or blank
    pub fn book_title(&self) -> &str {
        self.requested_book
            .as_ref()
            .and_then(|book| book.title.as_deref())
            .filter(|title| !title.trim().is_empty())
            .unwrap_or(DEFAULT_BOOK_TITLE)
    }

    pub fn status_is(&self, status: &str) -> bool {
        self.status.as_deref() == Some(status)
    }

    /// Whether the exchange reached a terminal status
    pub fn is_finished(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| status.starts_with(STATUS_FINISHED_PREFIX))
    }

    pub fn requester_confirmation_is(&self, value: &str) -> bool {
        self.requester_confirmation_status.as_deref() == Some(value)
    }

    pub fn owner_confirmation_is(&self, value: &str) -> bool {
        self.owner_confirmation_status.as_deref() == Some(value)
    }

    /// Number of delivery address entries.
    ///
    /// `deliveryAddress` wins over the legacy `address` field when both are present.
    pub fn address_count(&self) -> usize {
        self.delivery_address
            .as_ref()
            .or(self.legacy_address.as_ref())
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }
}
