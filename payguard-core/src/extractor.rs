//! Scanned payload extraction
//!
//! A QR code or typed string is tried, in order, as:
//! 1. a JSON object carrying `upi_id` / `name` / `amount` / `currency`
//! 2. a `upi://pay?pa=..&pn=..&am=..&cu=..` deep link
//! 3. a bare `localpart@bank` handle, taken verbatim

use crate::{Error, PaymentDescriptor, Result, UpiHandle};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

const UPI_SCHEME: &str = "upi";
const UPI_PAY_ACTION: &str = "pay";

/// Parse a raw scanned string into a payment descriptor
pub fn extract_payment(raw: &str) -> Result<PaymentDescriptor> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(Error::InvalidPayload("empty payload".to_string()));
    }

    if let Some(result) = from_json(text, raw) {
        debug!("Payload parsed as JSON");
        return result;
    }

    if let Some(result) = from_upi_link(text, raw) {
        debug!("Payload parsed as UPI deep link");
        return result;
    }

    if text.contains('@') {
        if let Some(scheme) = foreign_scheme(text) {
            return Err(Error::InvalidPayload(format!(
                "unsupported link scheme '{}'",
                scheme
            )));
        }
        debug!("Payload treated as bare UPI handle");
        let handle = UpiHandle::parse(raw).map_err(invalid)?;
        return PaymentDescriptor::new(handle, None, None, None, raw).map_err(invalid);
    }

    Err(Error::InvalidPayload(
        "no JSON object, UPI link or handle found".to_string(),
    ))
}

/// `None` when the text is not a JSON object at all
fn from_json(text: &str, raw: &str) -> Option<Result<PaymentDescriptor>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(fields)) => Some(descriptor_from_json(&fields, raw)),
        _ => None,
    }
}

fn descriptor_from_json(fields: &Map<String, Value>, raw: &str) -> Result<PaymentDescriptor> {
    let upi_id = json_text(fields, "upi_id")
        .ok_or_else(|| Error::InvalidPayload("JSON payload has no upi_id".to_string()))?;
    let handle = UpiHandle::parse(upi_id).map_err(invalid)?;

    PaymentDescriptor::new(
        handle,
        json_text(fields, "name"),
        json_text(fields, "amount"),
        json_text(fields, "currency"),
        raw,
    )
    .map_err(invalid)
}

/// Strings are taken as-is, numbers in their JSON spelling
fn json_text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `None` when the text is not a `upi:` URI
fn from_upi_link(text: &str, raw: &str) -> Option<Result<PaymentDescriptor>> {
    let scheme_end = text.find(':')?;
    if !text[..scheme_end].eq_ignore_ascii_case(UPI_SCHEME) {
        return None;
    }
    Some(descriptor_from_link(text, raw))
}

fn descriptor_from_link(text: &str, raw: &str) -> Result<PaymentDescriptor> {
    let link = Url::parse(text).map_err(|e| Error::InvalidPayload(format!("bad UPI link: {}", e)))?;

    let action = link.host_str().unwrap_or_default();
    if !action.eq_ignore_ascii_case(UPI_PAY_ACTION) {
        return Err(Error::InvalidPayload(format!(
            "unsupported UPI action '{}'",
            action
        )));
    }

    let mut payee = None;
    let mut name = None;
    let mut amount = None;
    let mut currency = None;

    // First occurrence of each parameter wins
    for (key, value) in link.query_pairs() {
        let slot = match key.as_ref() {
            "pa" => &mut payee,
            "pn" => &mut name,
            "am" => &mut amount,
            "cu" => &mut currency,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }

    let payee = payee
        .filter(|p| !p.is_empty())
        .ok_or_else(|| Error::InvalidPayload("UPI link has no payee address (pa)".to_string()))?;
    let handle = UpiHandle::parse(payee).map_err(invalid)?;

    PaymentDescriptor::new(handle, name, amount, currency, raw).map_err(invalid)
}

/// Scheme of a `scheme://..` link that is not a UPI link
fn foreign_scheme(text: &str) -> Option<String> {
    let link = Url::parse(text).ok()?;
    if link.cannot_be_a_base() {
        return None;
    }
    Some(link.scheme().to_string())
}

fn invalid(err: Error) -> Error {
    match err {
        Error::InvalidPayload(_) => err,
        other => Error::InvalidPayload(other.to_string()),
    }
}
