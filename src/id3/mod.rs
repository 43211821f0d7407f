//! ID3 specific items
//!
//! ID3 does things differently than other tags: the ID3v1 trailer lives at
//! the end of the file, and an ID3v2.4 tag may sit at the start of the file,
//! at the very end of it, or wedged in front of an ID3v1 trailer. The
//! location probing lives here; the tag parsing lives in [`v1`] and [`v2`].

pub(crate) mod v1;
pub(crate) mod v2;

use crate::error::Result;
use crate::macros::err;
use crate::provider::FileProvider;
use crate::reader::WindowReader;
use crate::util::bytes::synchsafe_uint;

pub(crate) const ID3V1_TAG_MARKER: [u8; 3] = *b"TAG";

const ID3V2_HEADER_SIZE: u64 = 10;
const ID3V2_FOOTER_SIZE: u64 = 10;
const ID3V1_TAG_SIZE: u64 = 128;

// The ID3v2 footer mirrors the header with a reversed identifier
const ID3V2_FOOTER_MARKER: [u8; 3] = *b"3DI";

/// Locate an ID3v2 tag, returning the offset of its 10-byte header
///
/// Checks, in order: the start of the file, a tag ending at the very end of
/// the file (v2.4 footer), and a tag sitting immediately before an ID3v1
/// trailer. `None` means the file carries no ID3v2 tag at all.
pub(crate) fn find_id3v2<P: FileProvider>(reader: &mut WindowReader<'_, P>) -> Result<Option<u64>> {
	log::debug!("Searching for an ID3v2 tag");

	let file_size = reader.file_size();

	if file_size >= ID3V2_HEADER_SIZE {
		reader.load(0, 3)?;
		if reader.take(3) == b"ID3" {
			log::debug!("Found an ID3v2 tag at the start of the file");
			return Ok(Some(0));
		}
	}

	// An ID3v2.4 tag at the back of the file announces itself through its
	// footer, which sits either at the very end or just before an ID3v1
	// trailer. Both footers fit in the trailing 138 bytes.
	let tail_len = ID3V1_TAG_SIZE + ID3V2_FOOTER_SIZE;
	if file_size < tail_len {
		return Ok(None);
	}

	reader.load(file_size - tail_len, tail_len as usize)?;
	let tail = reader.take(tail_len as usize);

	if tail[128..131] == ID3V2_FOOTER_MARKER {
		log::debug!("Found an ID3v2 tag ending at the end of the file");

		let payload_size = synchsafe_uint(&tail[134..138]);
		return tag_start(file_size, payload_size, 0).map(Some);
	}

	if tail[..3] == ID3V2_FOOTER_MARKER {
		log::debug!("Found an ID3v2 tag preceding an ID3v1 tag");

		let payload_size = synchsafe_uint(&tail[6..10]);
		return tag_start(file_size, payload_size, ID3V1_TAG_SIZE).map(Some);
	}

	Ok(None)
}

fn tag_start(file_size: u64, payload_size: u64, trailing: u64) -> Result<u64> {
	let tag_size = ID3V2_HEADER_SIZE + payload_size + ID3V2_FOOTER_SIZE;

	match file_size.checked_sub(tag_size + trailing) {
		Some(start) => Ok(start),
		None => err!(FormatInvalid("ID3v2 footer declares an invalid tag size")),
	}
}
