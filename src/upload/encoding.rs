//! Text encodings accepted by [`UploadOptions`](super::UploadOptions).
//!
//! Bytes handed to `put` are always written verbatim. An encoding only
//! decides how text given to [`UploadSource::text`](super::UploadSource::text)
//! becomes bytes.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::error::{Result, UploadError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Utf8,
    /// Same byte mapping as latin1
    Ascii,
    /// One byte per UTF-16 code unit, high bits dropped
    Latin1,
    Utf16Le,
    /// Pairs of hexadecimal digits
    Hex,
}

impl Encoding {
    /// Canonical name of the encoding
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf8",
            Encoding::Ascii => "ascii",
            Encoding::Latin1 => "latin1",
            Encoding::Utf16Le => "utf16le",
            Encoding::Hex => "hex",
        }
    }

    /// Turn `text` into the bytes this encoding describes.
    pub fn encode(&self, text: &str) -> Result<Bytes> {
        let bytes = match self {
            Encoding::Utf8 => text.as_bytes().to_vec(),
            Encoding::Ascii | Encoding::Latin1 => text.encode_utf16().map(|unit| unit as u8).collect(),
            Encoding::Utf16Le => text.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect(),
            Encoding::Hex => decode_hex(text)?,
        };
        Ok(Bytes::from(bytes))
    }
}

fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let digits = text.as_bytes();
    if digits.len() % 2 != 0 {
        return Err(UploadError::invalid_options(
            "hex text must contain an even number of digits",
        ));
    }

    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| {
                    UploadError::invalid_options(format!(
                        "invalid hex digits '{}'",
                        String::from_utf8_lossy(pair)
                    ))
                })
        })
        .collect()
}

impl FromStr for Encoding {
    type Err = UploadError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "ascii" => Ok(Encoding::Ascii),
            "latin1" | "binary" => Ok(Encoding::Latin1),
            "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Ok(Encoding::Utf16Le),
            "hex" => Ok(Encoding::Hex),
            other => Err(UploadError::invalid_options(format!(
                "unknown encoding '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("UTF-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("binary".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert_eq!("ucs2".parse::<Encoding>().unwrap(), Encoding::Utf16Le);
        assert!(matches!(
            "klingon".parse::<Encoding>(),
            Err(UploadError::InvalidOptions { .. })
        ));
    }

    #[test]
    fn test_encode_text() {
        assert_eq!(Encoding::Utf8.encode("héllo").unwrap().len(), 6);
        assert_eq!(Encoding::Latin1.encode("héllo").unwrap().as_ref(), b"h\xe9llo");
        assert_eq!(Encoding::Utf16Le.encode("hi").unwrap().as_ref(), b"h\0i\0");
        assert_eq!(Encoding::Hex.encode("48656c6C6f").unwrap().as_ref(), b"Hello");
    }

    #[test]
    fn test_bad_hex_is_rejected() {
        assert!(Encoding::Hex.encode("abc").is_err());
        assert!(Encoding::Hex.encode("zz").is_err());
    }
}
