use crate::error::Result;
use crate::macros::err;
use crate::provider::FileProvider;
use crate::reader::WindowReader;

use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt};

pub(super) const ATOM_HEADER_LEN: u64 = 8;

/// The header of one ISO Base Media atom
#[derive(Debug, Clone, Copy)]
pub(super) struct AtomHead {
	pub(super) start: u64,
	/// The full atom length, header included
	pub(super) len: u64,
	pub(super) header_len: u64,
	pub(super) ident: [u8; 4],
	/// A zero-sized atom extends to the end of the file and terminates the walk
	pub(super) terminal: bool,
}

impl AtomHead {
	pub(super) fn content_start(&self) -> u64 {
		self.start + self.header_len
	}

	pub(super) fn content_len(&self) -> u64 {
		self.len - self.header_len
	}
}

/// Read the atom header at `offset`, bounded by `end`
///
/// Returns `None` when no full header fits before `end`.
pub(super) fn read_atom_head<P: FileProvider>(
	reader: &mut WindowReader<'_, P>,
	offset: u64,
	end: u64,
) -> Result<Option<AtomHead>> {
	if offset + ATOM_HEADER_LEN > end {
		return Ok(None);
	}

	reader.load(offset, ATOM_HEADER_LEN as usize)?;

	let len_raw = u64::from(reader.read_u32::<BigEndian>()?);

	let mut ident = [0; 4];
	reader.read_exact(&mut ident)?;

	let (len, header_len, terminal) = match len_raw {
		// The atom extends to the end of the file
		0 => (end - offset, ATOM_HEADER_LEN, true),
		// There's an extended length
		1 => {
			if offset + ATOM_HEADER_LEN + 8 > end {
				err!(FormatInvalid("Found an incomplete extended atom length"));
			}

			reader.load(offset + ATOM_HEADER_LEN, 8)?;
			let len = reader.read_u64::<BigEndian>()?;

			if len < ATOM_HEADER_LEN + 8 {
				err!(FormatInvalid("Found an invalid extended atom length (< 16)"));
			}

			(len, ATOM_HEADER_LEN + 8, false)
		},
		_ => {
			if len_raw < ATOM_HEADER_LEN {
				err!(FormatInvalid("Found an invalid atom length (< 8)"));
			}

			(len_raw, ATOM_HEADER_LEN, false)
		},
	};

	if offset + len > end {
		err!(FormatInvalid("Atom length exceeds its container"));
	}

	log::trace!(
		"Reading MP4 atom \"{}\", length: {len}",
		ident.iter().map(|b| *b as char).collect::<String>()
	);

	Ok(Some(AtomHead {
		start: offset,
		len,
		header_len,
		ident,
		terminal,
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::provider::MemoryProvider;

	fn read(bytes: Vec<u8>) -> Result<Option<AtomHead>> {
		let end = bytes.len() as u64;

		let mut provider = MemoryProvider::new();
		provider.insert("a.m4a", bytes);

		let mut reader = WindowReader::open(&provider, "a.m4a").unwrap();
		read_atom_head(&mut reader, 0, end)
	}

	#[test_log::test]
	fn plain_header() {
		let mut bytes = 16u32.to_be_bytes().to_vec();
		bytes.extend_from_slice(b"moov");
		bytes.extend_from_slice(&[0; 8]);

		let atom = read(bytes).unwrap().unwrap();
		assert_eq!(&atom.ident, b"moov");
		assert_eq!(atom.len, 16);
		assert_eq!(atom.content_start(), 8);
		assert_eq!(atom.content_len(), 8);
		assert!(!atom.terminal);
	}

	#[test_log::test]
	fn extended_header() {
		let mut bytes = 1u32.to_be_bytes().to_vec();
		bytes.extend_from_slice(b"mdat");
		bytes.extend_from_slice(&20u64.to_be_bytes());
		bytes.extend_from_slice(&[0; 4]);

		let atom = read(bytes).unwrap().unwrap();
		assert_eq!(atom.len, 20);
		assert_eq!(atom.header_len, 16);
		assert_eq!(atom.content_len(), 4);
	}

	#[test_log::test]
	fn zero_size_extends_to_eof() {
		let mut bytes = 0u32.to_be_bytes().to_vec();
		bytes.extend_from_slice(b"free");
		bytes.extend_from_slice(&[0; 24]);

		let atom = read(bytes).unwrap().unwrap();
		assert!(atom.terminal);
		assert_eq!(atom.len, 32);
	}

	#[test_log::test]
	fn undersized_atom_fails() {
		let mut bytes = 4u32.to_be_bytes().to_vec();
		bytes.extend_from_slice(b"ftyp");
		bytes.extend_from_slice(&[0; 8]);

		assert!(read(bytes).is_err());
	}

	#[test_log::test]
	fn oversized_atom_fails() {
		let mut bytes = 64u32.to_be_bytes().to_vec();
		bytes.extend_from_slice(b"moov");
		bytes.extend_from_slice(&[0; 8]);

		assert!(read(bytes).is_err());
	}
}
