//! Structural interchange form for records, messages and tags.
//!
//! ```text
//! record  = { "tnf": 1, "type": [84], "id": [], "payload": [2, 101, 110, ...] }
//! message = [ record, ... ]            (null when there is no message)
//! tag     = { "id": [...], "techTypes": ["android.nfc.tech.Ndef", ...] }
//! ndef    = tag + { "type", "maxSize", "isWritable", "ndefMessage", "canMakeReadOnly" }
//! ```
//!
//! Byte arrays are emitted as unsigned integers.  On input both signed
//! (-128..=-1) and unsigned (0..=255) byte values are accepted, since web
//! code often round-trips values that were produced as signed bytes.

use anyhow::{Context, bail};
use serde_json::{Map, Value, json};

use super::{NdefMessage, NdefRecord, Tnf};
use crate::app::ports::{NdefTech, Tag};

// ── Records and messages ─────────────────────────────────────

pub fn record_to_json(record: &NdefRecord) -> Value {
    json!({
        "tnf": record.tnf() as u8,
        "type": record.record_type(),
        "id": record.id(),
        "payload": record.payload(),
    })
}

/// JSON array of records, or `null` for no message.
pub fn message_to_json(message: Option<&NdefMessage>) -> Value {
    match message {
        Some(m) => Value::Array(m.records().iter().map(record_to_json).collect()),
        None => Value::Null,
    }
}

/// Decode a record array.  The argument may be the array itself or a
/// string holding its JSON text.
pub fn records_from_json(value: &Value) -> anyhow::Result<Vec<NdefRecord>> {
    let parsed;
    let value = match value {
        Value::String(text) => {
            parsed = serde_json::from_str::<Value>(text).context("records are not valid JSON")?;
            &parsed
        }
        other => other,
    };

    let Value::Array(items) = value else {
        bail!("expected an array of NDEF records");
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| record_from_json(item).with_context(|| format!("record {i}")))
        .collect()
}

/// Decode a record array into a (non-empty) message.
pub fn message_from_json(value: &Value) -> anyhow::Result<NdefMessage> {
    let records = records_from_json(value)?;
    Ok(NdefMessage::new(records)?)
}

fn record_from_json(value: &Value) -> anyhow::Result<NdefRecord> {
    let Value::Object(fields) = value else {
        bail!("expected an object");
    };

    let tnf_raw = fields
        .get("tnf")
        .and_then(Value::as_u64)
        .context("missing or non-numeric tnf")?;
    let tnf = u8::try_from(tnf_raw)
        .ok()
        .map(Tnf::from_u8)
        .context("tnf out of range")??;

    let record_type = bytes_field(fields, "type")?;
    let id = bytes_field(fields, "id")?;
    let payload = bytes_field(fields, "payload")?;

    Ok(NdefRecord::new(tnf, record_type, id, payload)?)
}

fn bytes_field(fields: &Map<String, Value>, name: &str) -> anyhow::Result<Vec<u8>> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| -> anyhow::Result<u8> {
                let n = v
                    .as_i64()
                    .with_context(|| format!("{name}: byte values must be integers"))?;
                if !(-128..=255).contains(&n) {
                    bail!("{name}: byte value {n} out of range");
                }
                Ok((n & 0xFF) as u8)
            })
            .collect(),
        Some(_) => bail!("{name}: expected an array of bytes"),
    }
}

// ── Tags ─────────────────────────────────────────────────────

/// `{id, techTypes}` for a discovered tag.
pub fn tag_to_json(tag: &dyn Tag) -> Value {
    let mut obj = Map::new();
    insert_tag_fields(&mut obj, tag);
    Value::Object(obj)
}

/// Full NDEF description; an empty object when the tag has no NDEF access.
pub fn ndef_to_json(tag: Option<&dyn Tag>, ndef: Option<&dyn NdefTech>) -> Map<String, Value> {
    let mut obj = Map::new();
    let Some(ndef) = ndef else {
        return obj;
    };
    if let Some(tag) = tag {
        insert_tag_fields(&mut obj, tag);
    }
    obj.insert("type".into(), Value::String(translate_type(&ndef.tag_type())));
    obj.insert("maxSize".into(), json!(ndef.max_size()));
    obj.insert("isWritable".into(), Value::Bool(ndef.is_writable()));
    obj.insert(
        "ndefMessage".into(),
        message_to_json(ndef.cached_message().as_ref()),
    );
    obj.insert(
        "canMakeReadOnly".into(),
        ndef.can_make_read_only().map_or(Value::Null, Value::Bool),
    );
    obj
}

fn insert_tag_fields(obj: &mut Map<String, Value>, tag: &dyn Tag) {
    obj.insert("id".into(), json!(tag.id()));
    obj.insert("techTypes".into(), json!(tag.tech_list()));
}

/// Human-readable name for a platform NDEF tag type.
pub fn translate_type(raw: &str) -> String {
    match raw {
        "org.nfcforum.ndef.type1" => "NFC Forum Type 1".into(),
        "org.nfcforum.ndef.type2" => "NFC Forum Type 2".into(),
        "org.nfcforum.ndef.type3" => "NFC Forum Type 3".into(),
        "org.nfcforum.ndef.type4" => "NFC Forum Type 4".into(),
        "com.nxp.ndef.mifareclassic" => "MIFARE Classic".into(),
        other => other.to_owned(),
    }
}
