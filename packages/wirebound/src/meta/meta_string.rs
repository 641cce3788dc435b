//! Compact encoding of identifier strings (namespaces, type names, field
//! names).
//!
//! The encoder picks, per string, the smallest of the encodings permitted
//! for the identifier's role; the bit layouts are fixed and must match
//! every peer implementation. Two compact alphabets exist: a 5-bit one for
//! lowercase identifiers (with `|` escaping an uppercase char) and a 6-bit
//! one covering both cases plus digits.

use crate::error::{bail, ensure, Result};
use num_enum::{IntoPrimitive, TryFromPrimitive};


#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MetaStringEncoding {
    Utf8 = 0,
    /// 5-bit alphabet `a-z . _ $ |`; uppercase escaped as `|` + lower.
    AllToLowerSpecial = 1,
    /// 6-bit alphabet `a-z A-Z 0-9 . _`.
    LowerUpperDigitSpecial = 2,
    /// 5-bit alphabet with only the first char uppercase, lowered on the
    /// wire and restored on decode.
    FirstToLowerSpecial = 3,
}

/// An identifier plus the packed form chosen for it. Equal originals
/// always produce equal `(encoding, bytes)` pairs because the chooser is
/// deterministic.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MetaString {
    original: String,
    encoding: MetaStringEncoding,
    bytes: Vec<u8>,
}

impl MetaString {
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn encoding(&self) -> MetaStringEncoding {
        self.encoding
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Chooses among a role's permitted encodings.
pub struct MetaStringEncoder {
    allowed: &'static [MetaStringEncoding],
}

/// Namespaces never start uppercase, so the first-to-lower form is not
/// offered for them.
pub const NAMESPACE_ENCODER: MetaStringEncoder = MetaStringEncoder {
    allowed: &[
        MetaStringEncoding::Utf8,
        MetaStringEncoding::AllToLowerSpecial,
        MetaStringEncoding::LowerUpperDigitSpecial,
    ],
};

pub const TYPE_NAME_ENCODER: MetaStringEncoder = MetaStringEncoder {
    allowed: &[
        MetaStringEncoding::Utf8,
        MetaStringEncoding::AllToLowerSpecial,
        MetaStringEncoding::LowerUpperDigitSpecial,
        MetaStringEncoding::FirstToLowerSpecial,
    ],
};

/// The FieldInfo header byte reserves selector 3 for tag-id fields, so
/// field names get the remaining three encodings.
pub const FIELD_NAME_ENCODER: MetaStringEncoder = MetaStringEncoder {
    allowed: &[
        MetaStringEncoding::Utf8,
        MetaStringEncoding::AllToLowerSpecial,
        MetaStringEncoding::LowerUpperDigitSpecial,
    ],
};

impl MetaStringEncoder {
    /// Encode with the smallest permitted encoding; byte-count ties go to
    /// the lowest encoding number, so UTF-8 wins any tie.
    pub fn encode(&self, s: &str) -> Result<MetaString> {
        let mut best: Option<(usize, MetaStringEncoding)> = None;
        for &encoding in self.allowed {
            let Some(len) = encoded_len(s, encoding) else {
                continue;
            };
            if best.map(|(best_len, _)| len < best_len).unwrap_or(true) {
                best = Some((len, encoding));
            }
        }
        let Some((_, encoding)) = best else {
            bail!(EncodingError, "no permitted encoding applies to {:?}", s);
        };
        Ok(MetaString {
            original: s.to_string(),
            encoding,
            bytes: encode_with(s, encoding),
        })
    }
}

/// Decode packed bytes produced by a peer.
pub fn decode(bytes: &[u8], encoding: MetaStringEncoding) -> Result<String> {
    match encoding {
        MetaStringEncoding::Utf8 => String::from_utf8(bytes.to_vec())
            .map_err(|e| crate::error::error!(EncodingError, "meta string not utf8: {}", e)),
        MetaStringEncoding::AllToLowerSpecial => {
            let symbols = unpack_bits(bytes, 5);
            let mut out = String::with_capacity(symbols.len());
            let mut escape = false;
            for sym in symbols {
                let c = lower_special_char(sym)?;
                if escape {
                    ensure!(
                        c.is_ascii_lowercase(),
                        EncodingError,
                        "escape before non-letter {:?}",
                        c,
                    );
                    out.push(c.to_ascii_uppercase());
                    escape = false;
                } else if c == '|' {
                    escape = true;
                } else {
                    out.push(c);
                }
            }
            ensure!(!escape, EncodingError, "dangling uppercase escape");
            Ok(out)
        }
        MetaStringEncoding::FirstToLowerSpecial => {
            let symbols = unpack_bits(bytes, 5);
            let mut out = String::with_capacity(symbols.len());
            for (i, sym) in symbols.into_iter().enumerate() {
                let c = lower_special_char(sym)?;
                if i == 0 {
                    out.push(c.to_ascii_uppercase());
                } else {
                    out.push(c);
                }
            }
            Ok(out)
        }
        MetaStringEncoding::LowerUpperDigitSpecial => {
            let symbols = unpack_bits(bytes, 6);
            let mut out = String::with_capacity(symbols.len());
            for sym in symbols {
                out.push(match sym {
                    0..=25 => (b'a' + sym) as char,
                    26..=51 => (b'A' + sym - 26) as char,
                    52..=61 => (b'0' + sym - 52) as char,
                    62 => '.',
                    63 => '_',
                    _ => unreachable!(),
                });
            }
            Ok(out)
        }
    }
}

/// Packed size in bytes, or None when the encoding cannot represent `s`.
fn encoded_len(s: &str, encoding: MetaStringEncoding) -> Option<usize> {
    match encoding {
        MetaStringEncoding::Utf8 => Some(s.len()),
        MetaStringEncoding::AllToLowerSpecial => {
            let mut symbols = 0;
            for c in s.chars() {
                match c {
                    'a'..='z' | '.' | '_' | '$' => symbols += 1,
                    // uppercase costs the escape symbol too
                    'A'..='Z' => symbols += 2,
                    _ => return None,
                }
            }
            Some(packed_len(symbols, 5))
        }
        MetaStringEncoding::FirstToLowerSpecial => {
            let mut chars = s.chars();
            if !chars.next()?.is_ascii_uppercase() {
                return None;
            }
            if !chars.all(|c| matches!(c, 'a'..='z' | '.' | '_' | '$')) {
                return None;
            }
            Some(packed_len(s.len(), 5))
        }
        MetaStringEncoding::LowerUpperDigitSpecial => {
            if !s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
            {
                return None;
            }
            Some(packed_len(s.len(), 6))
        }
    }
}

fn encode_with(s: &str, encoding: MetaStringEncoding) -> Vec<u8> {
    match encoding {
        MetaStringEncoding::Utf8 => s.as_bytes().to_vec(),
        MetaStringEncoding::AllToLowerSpecial => {
            let mut symbols = Vec::with_capacity(s.len());
            for c in s.chars() {
                if c.is_ascii_uppercase() {
                    symbols.push(lower_special_symbol('|'));
                    symbols.push(lower_special_symbol(c.to_ascii_lowercase()));
                } else {
                    symbols.push(lower_special_symbol(c));
                }
            }
            pack_bits(&symbols, 5)
        }
        MetaStringEncoding::FirstToLowerSpecial => {
            let symbols: Vec<u8> = s
                .chars()
                .enumerate()
                .map(|(i, c)| {
                    lower_special_symbol(if i == 0 { c.to_ascii_lowercase() } else { c })
                })
                .collect();
            pack_bits(&symbols, 5)
        }
        MetaStringEncoding::LowerUpperDigitSpecial => {
            let symbols: Vec<u8> = s
                .chars()
                .map(|c| match c {
                    'a'..='z' => c as u8 - b'a',
                    'A'..='Z' => c as u8 - b'A' + 26,
                    '0'..='9' => c as u8 - b'0' + 52,
                    '.' => 62,
                    '_' => 63,
                    _ => unreachable!(),
                })
                .collect();
            pack_bits(&symbols, 6)
        }
    }
}

fn lower_special_symbol(c: char) -> u8 {
    match c {
        'a'..='z' => c as u8 - b'a',
        '.' => 26,
        '_' => 27,
        '$' => 28,
        '|' => 29,
        _ => unreachable!(),
    }
}

fn lower_special_char(sym: u8) -> Result<char> {
    Ok(match sym {
        0..=25 => (b'a' + sym) as char,
        26 => '.',
        27 => '_',
        28 => '$',
        29 => '|',
        _ => bail!(EncodingError, "symbol {} outside 5-bit alphabet", sym),
    })
}

fn packed_len(symbols: usize, bits: usize) -> usize {
    (1 + symbols * bits + 7) / 8
}

/// MSB-first packing. Bit 0 of byte 0 is the strip-last-symbol flag, set
/// when the zero padding is wide enough to be misread as one more symbol.
fn pack_bits(symbols: &[u8], bits: usize) -> Vec<u8> {
    let byte_len = packed_len(symbols.len(), bits);
    let mut out = vec![0u8; byte_len];
    let mut pos = 1;
    for &sym in symbols {
        for j in (0..bits).rev() {
            if sym >> j & 1 == 1 {
                out[pos / 8] |= 0x80 >> (pos % 8);
            }
            pos += 1;
        }
    }
    if byte_len > 0 && (byte_len * 8 - 1) / bits > symbols.len() {
        out[0] |= 0x80;
    }
    out
}

fn unpack_bits(bytes: &[u8], bits: usize) -> Vec<u8> {
    if bytes.is_empty() {
        return Vec::new();
    }
    let strip = bytes[0] & 0x80 != 0;
    let mut slots = (bytes.len() * 8 - 1) / bits;
    if strip {
        slots -= 1;
    }
    let mut out = Vec::with_capacity(slots);
    let mut pos = 1;
    for _ in 0..slots {
        let mut sym = 0u8;
        for _ in 0..bits {
            sym = (sym << 1) | (bytes[pos / 8] >> (7 - pos % 8)) & 1;
            pos += 1;
        }
        out.push(sym);
    }
    out
}


#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(encoder: &MetaStringEncoder, s: &str) -> MetaString {
        let ms = encoder.encode(s).unwrap();
        assert_eq!(decode(ms.bytes(), ms.encoding()).unwrap(), s, "{:?}", s);
        ms
    }

    #[test]
    fn lowercase_identifiers_pack_five_bits() {
        let ms = round_trip(&FIELD_NAME_ENCODER, "field_name");
        assert_eq!(ms.encoding(), MetaStringEncoding::AllToLowerSpecial);
        // 10 symbols * 5 bits + flag = 51 bits -> 7 bytes, under utf8's 10
        assert_eq!(ms.bytes().len(), 7);
    }

    #[test]
    fn type_names_prefer_first_to_lower() {
        let ms = round_trip(&TYPE_NAME_ENCODER, "Person");
        assert_eq!(ms.encoding(), MetaStringEncoding::FirstToLowerSpecial);
    }

    #[test]
    fn mixed_case_uses_six_bit_alphabet() {
        let ms = round_trip(&TYPE_NAME_ENCODER, "TcpConn2");
        assert_eq!(ms.encoding(), MetaStringEncoding::LowerUpperDigitSpecial);
    }

    #[test]
    fn uppercase_escape_round_trips() {
        // Under ALL_TO_LOWER the escapes double these symbols, so the
        // 6-bit alphabet wins; force the 5-bit path via an applicable
        // encoder anyway by checking decode of a hand-packed escape.
        let encoder = MetaStringEncoder {
            allowed: &[MetaStringEncoding::AllToLowerSpecial],
        };
        for s in ["aB", "Xy", "mixedCase", "has.Dots_and$Cash"] {
            let ms = encoder.encode(s).unwrap();
            assert_eq!(ms.encoding(), MetaStringEncoding::AllToLowerSpecial);
            assert_eq!(decode(ms.bytes(), ms.encoding()).unwrap(), s);
        }
    }

    #[test]
    fn non_ascii_falls_back_to_utf8() {
        let ms = round_trip(&TYPE_NAME_ENCODER, "tip°");
        assert_eq!(ms.encoding(), MetaStringEncoding::Utf8);
        let pipe = round_trip(&FIELD_NAME_ENCODER, "a|b");
        assert_eq!(pipe.encoding(), MetaStringEncoding::Utf8);
    }

    #[test]
    fn empty_string_is_utf8_and_empty() {
        let ms = round_trip(&NAMESPACE_ENCODER, "");
        assert_eq!(ms.encoding(), MetaStringEncoding::Utf8);
        assert!(ms.bytes().is_empty());
    }

    #[test]
    fn strip_flag_over_a_length_sweep() {
        // Lengths around the byte boundaries exercise both flag states.
        for len in 1..=24 {
            let s: String = (0..len)
                .map(|i| (b'a' + (i % 26) as u8) as char)
                .collect();
            round_trip(&FIELD_NAME_ENCODER, &s);
        }
    }

    #[test]
    fn same_original_same_packed_form() {
        let a = TYPE_NAME_ENCODER.encode("OrderLine").unwrap();
        let b = TYPE_NAME_ENCODER.encode("OrderLine").unwrap();
        assert_eq!(a, b);
    }
}
