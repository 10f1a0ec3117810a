//! Per-message text codecs.
//!
//! A submit job carries text; the wire carries octets in the alphabet named
//! by the PDU's data_coding field. The default alphabet is GSM 03.38 in its
//! unpacked form (one septet value per octet), which is what SMSCs expect
//! for data_coding 0. The error policy decides what happens to characters
//! the chosen alphabet cannot represent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The text encodings a job may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    /// GSM 03.38 default alphabet, unpacked septets. data_coding 0x00.
    #[serde(rename = "gsm0338")]
    Gsm0338,
    /// IA5/ASCII. data_coding 0x01.
    #[serde(rename = "ascii")]
    Ascii,
    /// ISO-8859-1. data_coding 0x03.
    #[serde(rename = "latin1")]
    Latin1,
    /// UTF-8 carried as 8-bit data. data_coding 0x04 (octet, unspecified).
    #[serde(rename = "utf-8")]
    Utf8,
    /// UCS-2 / UTF-16 big-endian. data_coding 0x08.
    #[serde(rename = "ucs2")]
    Ucs2,
}

impl Default for TextEncoding {
    fn default() -> Self {
        TextEncoding::Gsm0338
    }
}

impl TextEncoding {
    /// The data_coding value advertised for this encoding.
    pub fn data_coding(self) -> u8 {
        match self {
            TextEncoding::Gsm0338 => 0x00,
            TextEncoding::Ascii => 0x01,
            TextEncoding::Latin1 => 0x03,
            TextEncoding::Utf8 => 0x04,
            TextEncoding::Ucs2 => 0x08,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Gsm0338 => "gsm0338",
            TextEncoding::Ascii => "ascii",
            TextEncoding::Latin1 => "latin1",
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Ucs2 => "ucs2",
        }
    }
}

impl std::str::FromStr for TextEncoding {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gsm0338" => Ok(TextEncoding::Gsm0338),
            "ascii" => Ok(TextEncoding::Ascii),
            "latin1" | "latin_1" => Ok(TextEncoding::Latin1),
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "ucs2" => Ok(TextEncoding::Ucs2),
            other => Err(EncodingError::UnknownEncoding(other.to_string())),
        }
    }
}

/// What to do with text the selected alphabet cannot represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Fail the message.
    Strict,
    /// Drop the offending character.
    Ignore,
    /// Substitute '?' on encode, U+FFFD on decode.
    Replace,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        ErrorPolicy::Strict
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("unknown encoding '{0}'")]
    UnknownEncoding(String),

    #[error("character {character:?} cannot be encoded as {encoding}")]
    Unencodable {
        encoding: &'static str,
        character: char,
    },

    #[error("octet sequence cannot be decoded as {encoding}")]
    Undecodable { encoding: &'static str },
}

/// Encode `text` into the octet form `encoding` puts on the wire.
pub fn encode_text(
    text: &str,
    encoding: TextEncoding,
    policy: ErrorPolicy,
) -> Result<Vec<u8>, EncodingError> {
    match encoding {
        TextEncoding::Gsm0338 => gsm0338_encode(text, policy),
        TextEncoding::Ascii => ascii_encode(text, policy),
        TextEncoding::Latin1 => latin1_encode(text, policy),
        TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
        TextEncoding::Ucs2 => Ok(ucs2_encode(text)),
    }
}

/// Decode wire octets back into text, for delivery receipts and logs.
pub fn decode_text(
    octets: &[u8],
    encoding: TextEncoding,
    policy: ErrorPolicy,
) -> Result<String, EncodingError> {
    match encoding {
        TextEncoding::Gsm0338 => gsm0338_decode(octets, policy),
        TextEncoding::Ascii => ascii_decode(octets, policy),
        TextEncoding::Latin1 => Ok(octets.iter().map(|&b| char::from(b)).collect()),
        TextEncoding::Utf8 => utf8_decode(octets, policy),
        TextEncoding::Ucs2 => ucs2_decode(octets, policy),
    }
}

// GSM 03.38 default alphabet. Index is the septet value; 0x1B is the
// escape to the extension table and never decodes on its own.
const GSM_BASE: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å', //
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', '\u{1b}', 'Æ', 'æ', 'ß', 'É', //
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/', //
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?', //
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', //
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§', //
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', //
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à', //
];

const GSM_ESCAPE: u8 = 0x1B;

// Extension table, reached through the 0x1B escape septet.
const GSM_EXTENSION: [(u8, char); 10] = [
    (0x0A, '\u{0C}'), // form feed
    (0x14, '^'),
    (0x28, '{'),
    (0x29, '}'),
    (0x2F, '\\'),
    (0x3C, '['),
    (0x3D, '~'),
    (0x3E, ']'),
    (0x40, '|'),
    (0x65, '€'),
];

fn gsm_encode_char(c: char) -> Option<(u8, Option<u8>)> {
    if c != '\u{1b}' {
        if let Some(septet) = GSM_BASE.iter().position(|&g| g == c) {
            return Some((septet as u8, None));
        }
    }
    GSM_EXTENSION
        .iter()
        .find(|&&(_, g)| g == c)
        .map(|&(septet, _)| (GSM_ESCAPE, Some(septet)))
}

fn gsm0338_encode(text: &str, policy: ErrorPolicy) -> Result<Vec<u8>, EncodingError> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match gsm_encode_char(c) {
            Some((first, second)) => {
                out.push(first);
                if let Some(second) = second {
                    out.push(second);
                }
            }
            None => match policy {
                ErrorPolicy::Strict => {
                    return Err(EncodingError::Unencodable {
                        encoding: "gsm0338",
                        character: c,
                    });
                }
                ErrorPolicy::Ignore => {}
                ErrorPolicy::Replace => out.push(0x3F), // '?'
            },
        }
    }
    Ok(out)
}

fn gsm0338_decode(octets: &[u8], policy: ErrorPolicy) -> Result<String, EncodingError> {
    let mut out = String::with_capacity(octets.len());
    let mut iter = octets.iter().copied();
    while let Some(septet) = iter.next() {
        let decoded = if septet == GSM_ESCAPE {
            iter.next()
                .and_then(|e| GSM_EXTENSION.iter().find(|&&(s, _)| s == e).map(|&(_, c)| c))
        } else {
            GSM_BASE.get(septet as usize).copied()
        };
        match decoded {
            Some(c) => out.push(c),
            None => match policy {
                ErrorPolicy::Strict => {
                    return Err(EncodingError::Undecodable { encoding: "gsm0338" });
                }
                ErrorPolicy::Ignore => {}
                ErrorPolicy::Replace => out.push('\u{FFFD}'),
            },
        }
    }
    Ok(out)
}

fn ascii_encode(text: &str, policy: ErrorPolicy) -> Result<Vec<u8>, EncodingError> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c as u8);
        } else {
            match policy {
                ErrorPolicy::Strict => {
                    return Err(EncodingError::Unencodable {
                        encoding: "ascii",
                        character: c,
                    });
                }
                ErrorPolicy::Ignore => {}
                ErrorPolicy::Replace => out.push(b'?'),
            }
        }
    }
    Ok(out)
}

fn ascii_decode(octets: &[u8], policy: ErrorPolicy) -> Result<String, EncodingError> {
    let mut out = String::with_capacity(octets.len());
    for &b in octets {
        if b.is_ascii() {
            out.push(char::from(b));
        } else {
            match policy {
                ErrorPolicy::Strict => {
                    return Err(EncodingError::Undecodable { encoding: "ascii" });
                }
                ErrorPolicy::Ignore => {}
                ErrorPolicy::Replace => out.push('\u{FFFD}'),
            }
        }
    }
    Ok(out)
}

fn latin1_encode(text: &str, policy: ErrorPolicy) -> Result<Vec<u8>, EncodingError> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        if (c as u32) <= 0xFF {
            out.push(c as u8);
        } else {
            match policy {
                ErrorPolicy::Strict => {
                    return Err(EncodingError::Unencodable {
                        encoding: "latin1",
                        character: c,
                    });
                }
                ErrorPolicy::Ignore => {}
                ErrorPolicy::Replace => out.push(b'?'),
            }
        }
    }
    Ok(out)
}

fn utf8_decode(octets: &[u8], policy: ErrorPolicy) -> Result<String, EncodingError> {
    match std::str::from_utf8(octets) {
        Ok(s) => Ok(s.to_string()),
        Err(_) => match policy {
            ErrorPolicy::Strict => Err(EncodingError::Undecodable { encoding: "utf-8" }),
            ErrorPolicy::Replace => Ok(String::from_utf8_lossy(octets).into_owned()),
            ErrorPolicy::Ignore => Ok(String::from_utf8_lossy(octets)
                .chars()
                .filter(|&c| c != '\u{FFFD}')
                .collect()),
        },
    }
}

fn ucs2_encode(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

fn ucs2_decode(octets: &[u8], policy: ErrorPolicy) -> Result<String, EncodingError> {
    if octets.len() % 2 != 0 && policy == ErrorPolicy::Strict {
        return Err(EncodingError::Undecodable { encoding: "ucs2" });
    }

    let units: Vec<u16> = octets
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    match String::from_utf16(&units) {
        Ok(s) => Ok(s),
        Err(_) => match policy {
            ErrorPolicy::Strict => Err(EncodingError::Undecodable { encoding: "ucs2" }),
            ErrorPolicy::Replace => Ok(String::from_utf16_lossy(&units)),
            ErrorPolicy::Ignore => Ok(char::decode_utf16(units.iter().copied())
                .filter_map(Result::ok)
                .collect()),
        },
    }
}
