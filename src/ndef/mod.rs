//! NDEF records and messages, with the binary wire codec.
//!
//! Wire format of one record:
//! ```text
//! ┌──────────────────────────────┬──────────┬───────────────┬─────────┬──────┬────┬─────────┐
//! │ MB ME CF SR IL │ TNF (3 bit) │ type len │ payload len   │ id len  │ type │ id │ payload │
//! │ flags byte                   │ 1 B      │ 1 B (SR) / 4 B│ 1 B (IL)│      │    │         │
//! └──────────────────────────────┴──────────┴───────────────┴─────────┴──────┴────┴─────────┘
//! ```
//!
//! Encoding mirrors the platform exactly (short record whenever the payload
//! is under 256 bytes, IL always set for `Empty`), because the capacity
//! check compares this encoded length against the tag's maximum size.

pub mod json;

use core::fmt;

const FLAG_MB: u8 = 0x80;
const FLAG_ME: u8 = 0x40;
const FLAG_CF: u8 = 0x20;
const FLAG_SR: u8 = 0x10;
const FLAG_IL: u8 = 0x08;
const TNF_MASK: u8 = 0x07;

/// Refuse to allocate payloads beyond this while parsing.
const MAX_PAYLOAD_SIZE: usize = 10 * (1 << 20);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NdefError {
    /// A message must carry at least one record.
    EmptyMessage,
    /// TNF value outside 0..=7.
    InvalidTnf(u8),
    /// Record fields are inconsistent with the TNF or the chunk sequence.
    Malformed(&'static str),
    /// Input ended inside a record.
    Truncated,
    /// Bytes remain after the record flagged ME.
    TrailingData,
    /// A payload length beyond what the parser will allocate.
    PayloadTooLarge(usize),
}

impl fmt::Display for NdefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "NDEF message must contain at least one record"),
            Self::InvalidTnf(t) => write!(f, "invalid TNF {t}"),
            Self::Malformed(msg) => write!(f, "malformed NDEF record: {msg}"),
            Self::Truncated => write!(f, "NDEF data truncated"),
            Self::TrailingData => write!(f, "trailing data after NDEF message"),
            Self::PayloadTooLarge(n) => write!(f, "NDEF payload of {n} bytes exceeds limit"),
        }
    }
}

impl std::error::Error for NdefError {}

// ---------------------------------------------------------------------------
// Type Name Format
// ---------------------------------------------------------------------------

/// 3-bit Type Name Format field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tnf {
    Empty = 0,
    WellKnown = 1,
    MimeMedia = 2,
    AbsoluteUri = 3,
    External = 4,
    Unknown = 5,
    Unchanged = 6,
    Reserved = 7,
}

impl Tnf {
    pub fn from_u8(raw: u8) -> Result<Self, NdefError> {
        match raw {
            0 => Ok(Self::Empty),
            1 => Ok(Self::WellKnown),
            2 => Ok(Self::MimeMedia),
            3 => Ok(Self::AbsoluteUri),
            4 => Ok(Self::External),
            5 => Ok(Self::Unknown),
            6 => Ok(Self::Unchanged),
            7 => Ok(Self::Reserved),
            other => Err(NdefError::InvalidTnf(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One typed NDEF record.  Always valid once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NdefRecord {
    tnf: Tnf,
    record_type: Vec<u8>,
    id: Vec<u8>,
    payload: Vec<u8>,
}

impl NdefRecord {
    /// Build a record, enforcing the per-TNF field rules.
    pub fn new(
        tnf: Tnf,
        record_type: Vec<u8>,
        id: Vec<u8>,
        payload: Vec<u8>,
    ) -> Result<Self, NdefError> {
        validate_fields(tnf, &record_type, &id, &payload)?;
        Ok(Self {
            tnf,
            record_type,
            id,
            payload,
        })
    }

    /// An empty record (TNF_EMPTY).
    pub fn empty() -> Self {
        Self {
            tnf: Tnf::Empty,
            record_type: Vec::new(),
            id: Vec::new(),
            payload: Vec::new(),
        }
    }

    /// Well-known text record ("T"), UTF-8 encoded.
    pub fn text(text: &str, language: &str) -> Self {
        let lang = language.as_bytes();
        let lang_len = lang.len().min(0x3F);
        let mut payload = Vec::with_capacity(1 + lang_len + text.len());
        payload.push(lang_len as u8);
        payload.extend_from_slice(&lang[..lang_len]);
        payload.extend_from_slice(text.as_bytes());
        Self {
            tnf: Tnf::WellKnown,
            record_type: b"T".to_vec(),
            id: Vec::new(),
            payload,
        }
    }

    /// MIME media record.
    pub fn mime(mime_type: &str, payload: Vec<u8>) -> Self {
        Self {
            tnf: Tnf::MimeMedia,
            record_type: mime_type.to_ascii_lowercase().into_bytes(),
            id: Vec::new(),
            payload,
        }
    }

    pub fn tnf(&self) -> Tnf {
        self.tnf
    }

    pub fn record_type(&self) -> &[u8] {
        &self.record_type
    }

    pub fn id(&self) -> &[u8] {
        &self.id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn is_short(&self) -> bool {
        self.payload.len() < 256
    }

    fn has_id_length(&self) -> bool {
        self.tnf == Tnf::Empty || !self.id.is_empty()
    }

    /// Exact encoded length of this record.
    pub fn byte_len(&self) -> usize {
        let mut len = 3 + self.record_type.len() + self.id.len() + self.payload.len();
        if !self.is_short() {
            len += 3;
        }
        if self.has_id_length() {
            len += 1;
        }
        len
    }

    fn encode_into(&self, out: &mut Vec<u8>, first: bool, last: bool) {
        let short = self.is_short();
        let il = self.has_id_length();

        let mut flags = self.tnf as u8;
        if first {
            flags |= FLAG_MB;
        }
        if last {
            flags |= FLAG_ME;
        }
        if short {
            flags |= FLAG_SR;
        }
        if il {
            flags |= FLAG_IL;
        }

        out.push(flags);
        out.push(self.record_type.len() as u8);
        if short {
            out.push(self.payload.len() as u8);
        } else {
            out.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        }
        if il {
            out.push(self.id.len() as u8);
        }
        out.extend_from_slice(&self.record_type);
        out.extend_from_slice(&self.id);
        out.extend_from_slice(&self.payload);
    }
}

fn validate_fields(tnf: Tnf, record_type: &[u8], id: &[u8], payload: &[u8]) -> Result<(), NdefError> {
    if record_type.len() > 255 {
        return Err(NdefError::Malformed("type longer than 255 bytes"));
    }
    if id.len() > 255 {
        return Err(NdefError::Malformed("id longer than 255 bytes"));
    }
    match tnf {
        Tnf::Empty => {
            if !record_type.is_empty() || !id.is_empty() || !payload.is_empty() {
                return Err(NdefError::Malformed("unexpected data in TNF_EMPTY record"));
            }
        }
        Tnf::WellKnown | Tnf::MimeMedia | Tnf::AbsoluteUri | Tnf::External => {}
        Tnf::Unknown | Tnf::Reserved => {
            if !record_type.is_empty() {
                return Err(NdefError::Malformed(
                    "unexpected type field in TNF_UNKNOWN or TNF_RESERVED record",
                ));
            }
        }
        Tnf::Unchanged => {
            return Err(NdefError::Malformed(
                "unexpected TNF_UNCHANGED in first chunk or unchunked record",
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A non-empty ordered list of records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NdefMessage {
    records: Vec<NdefRecord>,
}

impl NdefMessage {
    pub fn new(records: Vec<NdefRecord>) -> Result<Self, NdefError> {
        if records.is_empty() {
            return Err(NdefError::EmptyMessage);
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[NdefRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<NdefRecord> {
        self.records
    }

    /// Exact length of [`to_bytes`](Self::to_bytes), computed without
    /// encoding.
    pub fn byte_len(&self) -> usize {
        self.records.iter().map(NdefRecord::byte_len).sum()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());
        let last = self.records.len() - 1;
        for (i, record) in self.records.iter().enumerate() {
            record.encode_into(&mut out, i == 0, i == last);
        }
        out
    }

    /// Parse a complete message; chunked records are reassembled.
    pub fn from_bytes(data: &[u8]) -> Result<Self, NdefError> {
        let mut reader = Reader { data, pos: 0 };
        let mut records = Vec::new();

        let mut in_chunk = false;
        let mut chunk_tnf = Tnf::Empty;
        let mut chunk_type = Vec::new();
        let mut chunk_id = Vec::new();
        let mut chunks: Vec<u8> = Vec::new();

        loop {
            let flags = reader.u8()?;
            let mb = flags & FLAG_MB != 0;
            let me = flags & FLAG_ME != 0;
            let cf = flags & FLAG_CF != 0;
            let sr = flags & FLAG_SR != 0;
            let il = flags & FLAG_IL != 0;
            let tnf = Tnf::from_u8(flags & TNF_MASK)?;

            if !mb && records.is_empty() && !in_chunk {
                return Err(NdefError::Malformed("expected MB flag"));
            } else if mb && (!records.is_empty() || in_chunk) {
                return Err(NdefError::Malformed("unexpected MB flag"));
            } else if in_chunk && il {
                return Err(NdefError::Malformed("unexpected IL flag in non-leading chunk"));
            } else if cf && me {
                return Err(NdefError::Malformed("unexpected ME flag in non-trailing chunk"));
            } else if in_chunk && tnf != Tnf::Unchanged {
                return Err(NdefError::Malformed("expected TNF_UNCHANGED in non-leading chunk"));
            }

            let type_len = reader.u8()? as usize;
            let payload_len = if sr {
                reader.u8()? as usize
            } else {
                reader.u32_be()? as usize
            };
            let id_len = if il { reader.u8()? as usize } else { 0 };

            if in_chunk && type_len != 0 {
                return Err(NdefError::Malformed("expected zero-length type in non-leading chunk"));
            }
            if payload_len > MAX_PAYLOAD_SIZE {
                return Err(NdefError::PayloadTooLarge(payload_len));
            }

            let record_type = reader.take(type_len)?.to_vec();
            let id = reader.take(id_len)?.to_vec();
            let payload = reader.take(payload_len)?;

            if cf && !in_chunk {
                if tnf == Tnf::Unchanged {
                    return Err(NdefError::Malformed(
                        "unexpected TNF_UNCHANGED in first chunk or unchunked record",
                    ));
                }
                chunk_tnf = tnf;
                chunk_type = record_type;
                chunk_id = id;
                chunks.clear();
                chunks.extend_from_slice(payload);
                in_chunk = true;
                continue;
            }
            if in_chunk {
                if chunks.len() + payload.len() > MAX_PAYLOAD_SIZE {
                    return Err(NdefError::PayloadTooLarge(chunks.len() + payload.len()));
                }
                chunks.extend_from_slice(payload);
                if cf {
                    continue;
                }
                in_chunk = false;
                let record = NdefRecord::new(
                    chunk_tnf,
                    core::mem::take(&mut chunk_type),
                    core::mem::take(&mut chunk_id),
                    core::mem::take(&mut chunks),
                )?;
                records.push(record);
            } else {
                records.push(NdefRecord::new(tnf, record_type, id, payload.to_vec())?);
            }

            if me {
                break;
            }
        }

        if reader.pos < data.len() {
            return Err(NdefError::TrailingData);
        }
        Self::new(records)
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], NdefError> {
        let end = self.pos.checked_add(n).ok_or(NdefError::Truncated)?;
        let slice = self.data.get(self.pos..end).ok_or(NdefError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, NdefError> {
        Ok(self.take(1)?[0])
    }

    fn u32_be(&mut self) -> Result<u32, NdefError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}
