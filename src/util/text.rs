use crate::error::{ErrorKind, ProbeError, Result};

use std::io::Read;

use byteorder::ReadBytesExt;

/// The text encoding identifiers used in ID3v2 frames
#[derive(Debug, Clone, Eq, PartialEq, Copy, Hash)]
#[repr(u8)]
pub enum TextEncoding {
	/// ISO-8859-1
	Latin1 = 0,
	/// UTF-16 with a byte order mark
	UTF16 = 1,
	/// UTF-16 big endian
	UTF16BE = 2,
	/// UTF-8
	UTF8 = 3,
}

impl TextEncoding {
	/// Get a `TextEncoding` from a u8, must be 0-3 inclusive
	pub fn from_u8(byte: u8) -> Option<Self> {
		match byte {
			0 => Some(Self::Latin1),
			1 => Some(Self::UTF16),
			2 => Some(Self::UTF16BE),
			3 => Some(Self::UTF8),
			_ => None,
		}
	}
}

/// Decode a byte slice under the given encoding
///
/// The first NUL and everything following it are stripped.
pub(crate) fn decode_text(encoding: TextEncoding, bytes: &[u8]) -> Result<String> {
	if bytes.is_empty() {
		return Ok(String::new());
	}

	let decoded = match encoding {
		TextEncoding::Latin1 => latin1_decode(bytes),
		TextEncoding::UTF16 => match bytes {
			[0xFE, 0xFF, rest @ ..] => utf16_decode_bytes(rest, u16::from_be_bytes)?,
			[0xFF, 0xFE, rest @ ..] => utf16_decode_bytes(rest, u16::from_le_bytes)?,
			// Some writers omit the BOM entirely, in which case little-endian
			// is the safer assumption
			_ => utf16_decode_bytes(bytes, u16::from_le_bytes)?,
		},
		TextEncoding::UTF16BE => utf16_decode_bytes(bytes, u16::from_be_bytes)?,
		TextEncoding::UTF8 => utf8_decode(bytes)?,
	};

	Ok(decoded)
}

pub(crate) fn latin1_decode(bytes: &[u8]) -> String {
	let mut text = bytes.iter().map(|c| *c as char).collect::<String>();
	truncate_at_nul(&mut text);
	text
}

pub(crate) fn utf8_decode(bytes: &[u8]) -> Result<String> {
	std::str::from_utf8(bytes)
		.map(|text| {
			let mut text = text.to_owned();
			truncate_at_nul(&mut text);
			text
		})
		.map_err(|_| ProbeError::new(ErrorKind::FormatInvalid("Expected a UTF-8 string")))
}

pub(crate) fn utf16_decode_bytes(bytes: &[u8], endianness: fn([u8; 2]) -> u16) -> Result<String> {
	if bytes.is_empty() {
		return Ok(String::new());
	}

	let units: Vec<u16> = bytes
		.chunks_exact(2)
		// It is possible to have multiple NUL-separated UTF-16 strings in a
		// single field, each with its own BOM. Strip them all.
		.filter_map(|c| match c {
			[0xFF, 0xFE] | [0xFE, 0xFF] => None,
			_ => Some(endianness(c.try_into().unwrap())), // Infallible
		})
		.collect();

	String::from_utf16(&units)
		.map(|mut text| {
			truncate_at_nul(&mut text);
			text
		})
		.map_err(|_| ProbeError::new(ErrorKind::FormatInvalid("Expected a UTF-16 string")))
}

/// Read up to (and through) the encoding's NUL terminator, returning the bytes before it
///
/// Latin-1 and UTF-8 terminate on a single zero byte, UTF-16 variants on an
/// aligned zero pair.
pub(crate) fn read_to_terminator<R>(reader: &mut R, encoding: TextEncoding) -> Vec<u8>
where
	R: Read,
{
	let mut text_bytes = Vec::new();

	match encoding {
		TextEncoding::Latin1 | TextEncoding::UTF8 => {
			while let Ok(byte) = reader.read_u8() {
				if byte == 0 {
					break;
				}

				text_bytes.push(byte)
			}
		},
		TextEncoding::UTF16 | TextEncoding::UTF16BE => {
			while let (Ok(b1), Ok(b2)) = (reader.read_u8(), reader.read_u8()) {
				if b1 == 0 && b2 == 0 {
					break;
				}

				text_bytes.push(b1);
				text_bytes.push(b2)
			}
		},
	}

	text_bytes
}

fn truncate_at_nul(text: &mut String) {
	if let Some(nul_pos) = text.find('\0') {
		text.truncate(nul_pos);
	}
}
