use crate::error::Result;
use crate::provider::FileProvider;
use crate::reader::WindowReader;
use crate::util::bytes::{bit_string, read_bits};

use byteorder::{BigEndian, ReadBytesExt};

pub(super) const BLOCK_ID_VORBIS_COMMENTS: u8 = 4;
pub(super) const BLOCK_ID_PICTURE: u8 = 6;

pub(super) const BLOCK_HEADER_SIZE: u64 = 4;

/// A FLAC metadata block header
///
/// The MSB of the first byte flags the final block of the stream, the
/// remaining 7 bits are the block type, and a 24-bit big-endian length
/// follows.
#[derive(Copy, Clone, Debug)]
pub(super) struct BlockHeader {
	pub(super) ty: u8,
	pub(super) last: bool,
	pub(super) len: u32,
}

impl BlockHeader {
	pub(super) fn read<P: FileProvider>(
		reader: &mut WindowReader<'_, P>,
		offset: u64,
	) -> Result<Self> {
		reader.load(offset, BLOCK_HEADER_SIZE as usize)?;

		let byte = reader.read_u8()?;
		let last = read_bits(byte, 0, 1) != 0;
		let ty = read_bits(byte, 1, 7);

		let len = reader.read_u24::<BigEndian>()?;
		log::trace!(
			"Reading FLAC block, type: {ty}, size: {len}, flags: {}",
			bit_string(byte)
		);

		Ok(Self { ty, last, len })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::provider::MemoryProvider;

	#[test_log::test]
	fn header_fields() {
		let mut provider = MemoryProvider::new();
		provider.insert("a.flac", vec![0x84, 0x00, 0x01, 0x02]);

		let mut reader = WindowReader::open(&provider, "a.flac").unwrap();
		let header = BlockHeader::read(&mut reader, 0).unwrap();

		assert_eq!(header.ty, BLOCK_ID_VORBIS_COMMENTS);
		assert!(header.last);
		assert_eq!(header.len, 0x0102);
	}
}
