use crate::error::Result;
use crate::macros::err;
use crate::util::bytes::SynchsafeInteger;

use std::io::Read;

use byteorder::{BigEndian, ByteOrder};

/// The ID3v2 version
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub(crate) enum Id3v2Version {
	/// ID3v2.2
	V2,
	/// ID3v2.3
	V3,
	/// ID3v2.4
	V4,
}

impl Id3v2Version {
	pub(crate) fn major(self) -> u8 {
		match self {
			Self::V2 => 2,
			Self::V3 => 3,
			Self::V4 => 4,
		}
	}
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct Id3v2Header {
	pub(crate) version: Id3v2Version,
	/// Tag-level unsynchronisation flag
	pub(crate) unsynchronisation: bool,
	/// An extended header follows the tag header (v2.3/v2.4 only)
	pub(crate) extended_header: bool,
	/// The size of the tag contents, excluding the header and footer
	pub(crate) size: u32,
}

impl Id3v2Header {
	pub(crate) fn parse<R>(bytes: &mut R) -> Result<Self>
	where
		R: Read,
	{
		log::debug!("Parsing ID3v2 header");

		let mut header = [0; 10];
		bytes.read_exact(&mut header)?;

		if &header[..3] != b"ID3" {
			err!(FormatInvalid("Expected an \"ID3\" tag identifier"));
		}

		// Version is stored as [major, minor]; minor revisions don't matter here
		let version = match header[3] {
			2 => Id3v2Version::V2,
			3 => Id3v2Version::V3,
			4 => Id3v2Version::V4,
			_ => {
				err!(UnsupportedVersion(
					"Found an invalid ID3v2 version, expected a major revision in: (2, 3, 4)"
				));
			},
		};

		let flags = header[5];

		// Compression was a flag only used in ID3v2.2 (bit 6). A compression
		// scheme was never decided, so the spec recommends ignoring the tag.
		if version == Id3v2Version::V2 && flags & 0x40 == 0x40 {
			err!(UnsupportedVersion("Encountered a compressed ID3v2.2 tag"));
		}

		let size = BigEndian::read_u32(&header[6..]).unsynch();

		Ok(Id3v2Header {
			version,
			unsynchronisation: flags & 0x80 == 0x80,
			extended_header: (version == Id3v2Version::V3 || version == Id3v2Version::V4)
				&& flags & 0x40 == 0x40,
			size,
		})
	}

	/// The byte count of the extended header, given its leading 4 size bytes
	///
	/// In v2.4 the size is synchsafe and includes the size field itself; in
	/// v2.3 it is a plain big-endian integer that excludes it.
	pub(crate) fn extended_header_remainder(&self, size_bytes: [u8; 4]) -> Result<usize> {
		match self.version {
			Id3v2Version::V4 => {
				let total = u32::from_be_bytes(size_bytes).unsynch() as usize;
				if total < 4 {
					err!(FormatInvalid("Found an extended header with an invalid size"));
				}

				Ok(total - 4)
			},
			_ => Ok(u32::from_be_bytes(size_bytes) as usize),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ErrorKind;

	use std::io::Cursor;

	fn header(version: u8, flags: u8, size: [u8; 4]) -> [u8; 10] {
		[
			b'I', b'D', b'3', version, 0, flags, size[0], size[1], size[2], size[3],
		]
	}

	#[test_log::test]
	fn parses_synchsafe_size() {
		let parsed = Id3v2Header::parse(&mut Cursor::new(header(4, 0, [0, 0, 0x02, 0x01]))).unwrap();

		assert_eq!(parsed.version, Id3v2Version::V4);
		assert_eq!(parsed.size, 257);
		assert!(!parsed.unsynchronisation);
		assert!(!parsed.extended_header);
	}

	#[test_log::test]
	fn rejects_bad_magic() {
		let mut bytes = header(3, 0, [0, 0, 0, 0]);
		bytes[0] = b'X';

		let err = Id3v2Header::parse(&mut Cursor::new(bytes)).unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::FormatInvalid(_)));
	}

	#[test_log::test]
	fn rejects_unknown_major() {
		let err = Id3v2Header::parse(&mut Cursor::new(header(5, 0, [0, 0, 0, 0]))).unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::UnsupportedVersion(_)));
	}

	#[test_log::test]
	fn rejects_compressed_v2_2() {
		let err = Id3v2Header::parse(&mut Cursor::new(header(2, 0x40, [0, 0, 0, 0]))).unwrap_err();
		assert!(matches!(err.kind(), ErrorKind::UnsupportedVersion(_)));
	}

	#[test_log::test]
	fn flag_bits() {
		let parsed = Id3v2Header::parse(&mut Cursor::new(header(4, 0xC0, [0, 0, 0, 10]))).unwrap();
		assert!(parsed.unsynchronisation);
		assert!(parsed.extended_header);

		let parsed = Id3v2Header::parse(&mut Cursor::new(header(3, 0x80, [0, 0, 0, 10]))).unwrap();
		assert!(parsed.unsynchronisation);
		assert!(!parsed.extended_header);
	}
}
