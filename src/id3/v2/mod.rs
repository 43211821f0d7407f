//! ID3v2.2 / ID3v2.3 / ID3v2.4 parsing
//!
//! The tag is loaded in two steps: the fixed 10-byte header first (to learn
//! the payload size), then the payload region in a single window bounded by
//! the header's synchsafe size. Tag-level unsynchronisation is reversed in
//! place over that window before anything inside it is interpreted.

mod frames;
mod header;

use header::Id3v2Header;

use crate::error::Result;
use crate::macros::err;
use crate::provider::FileProvider;
use crate::reader::WindowReader;
use crate::tag::TagSink;

use std::io::Read;

/// Parse the ID3v2 tag whose header starts at `header_offset`
///
/// Returns the format string (`"ID3v2.2"`, `"ID3v2.3"`, or `"ID3v2.4"`).
pub(crate) fn read_from<P: FileProvider>(
	reader: &mut WindowReader<'_, P>,
	sink: &mut TagSink,
	header_offset: u64,
) -> Result<String> {
	reader.load(header_offset, 10)?;
	let header = Id3v2Header::parse(reader)?;

	log::debug!(
		"Parsing ID3v2 tag, size: {}, version: {:?}",
		header.size,
		header.version
	);

	let format = format!("ID3v2.{}", header.version.major());

	let mut region_len = header.size as usize;
	if region_len == 0 {
		return Ok(format);
	}

	reader.load(header_offset + 10, region_len)?;

	if header.unsynchronisation {
		// The reversal covers everything after the tag header, the extended
		// header included
		region_len = reader.unsynchronise(0, region_len);
	}

	if header.extended_header {
		let mut size_bytes = [0u8; 4];
		reader.read_exact(&mut size_bytes)?;

		// The contents (CRC, restrictions, ...) are never interpreted
		let remainder = header.extended_header_remainder(size_bytes)?;
		if remainder > region_len - reader.position() {
			err!(FormatInvalid("Found an extended header with an invalid size"));
		}

		reader.skip(remainder);
	}

	frames::parse_frames(reader, sink, &header, region_len)?;

	Ok(format)
}
