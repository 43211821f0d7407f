//! ID3v1 / ID3v1.1 parsing
//!
//! The tag is a fixed 128-byte trailer: `"TAG"`, then 30-byte title, artist
//! and album fields, 4 year digits, a 30-byte comment, and a genre byte. In
//! ID3v1.1 the comment sacrifices its last two bytes to carry a track number.

use super::{ID3V1_TAG_MARKER, ID3V1_TAG_SIZE};
use crate::error::Result;
use crate::macros::err;
use crate::provider::FileProvider;
use crate::reader::WindowReader;
use crate::tag::{TagKey, TagSink};
use crate::util::text::latin1_decode;

/// Parse the ID3v1 trailer at the end of the file
///
/// Returns the format string (`"ID3v1"` or `"ID3v1.1"`).
pub(crate) fn read_from<P: FileProvider>(
	reader: &mut WindowReader<'_, P>,
	sink: &mut TagSink,
) -> Result<String> {
	let file_size = reader.file_size();

	if file_size < ID3V1_TAG_SIZE {
		err!(FormatInvalid("Not an ID3v1 tag"));
	}

	log::debug!("Parsing ID3v1 tag");

	reader.load(file_size - ID3V1_TAG_SIZE, ID3V1_TAG_SIZE as usize)?;
	let tag = reader.take(ID3V1_TAG_SIZE as usize);

	if tag[..3] != ID3V1_TAG_MARKER {
		err!(FormatInvalid("Not an ID3v1 tag"));
	}

	if let Some(title) = decode_field(&tag[3..33]) {
		sink.store_text(TagKey::Name, title);
	}

	if let Some(artist) = decode_field(&tag[33..63]) {
		sink.store_text(TagKey::Artist, artist);
	}

	if let Some(album) = decode_field(&tag[63..93]) {
		sink.store_text(TagKey::Album, album);
	}

	if let Some(year) = decode_field(&tag[93..97]) {
		sink.store_text(TagKey::Year, year);
	}

	// ID3v1.1 track detection: a NUL 28 bytes into the comment followed by a
	// non-zero byte. A track number of 0 is invalid.
	let version;
	if tag[125] == 0 && tag[126] != 0 {
		version = "ID3v1.1";
		sink.store_number(TagKey::Track, u32::from(tag[126]));
	} else {
		version = "ID3v1";
	}

	// The genre byte (offset 127) is intentionally ignored

	Ok(String::from(version))
}

fn decode_field(data: &[u8]) -> Option<String> {
	let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
	if end == 0 {
		return None;
	}

	Some(latin1_decode(&data[..end]))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::provider::MemoryProvider;
	use crate::tag::{TagKey, TagValue};

	fn fixture(comment_tail: [u8; 2]) -> Vec<u8> {
		let mut tag = vec![0u8; 128];
		tag[..3].copy_from_slice(b"TAG");
		tag[3..10].copy_from_slice(b"Silence");
		tag[33..40].copy_from_slice(b"Nothing");
		tag[63..67].copy_from_slice(b"Void");
		tag[93..97].copy_from_slice(b"2024");
		tag[125] = comment_tail[0];
		tag[126] = comment_tail[1];
		tag
	}

	fn parse(bytes: Vec<u8>, requested: &[TagKey]) -> (String, TagSink) {
		let mut provider = MemoryProvider::new();
		provider.insert("a.mp3", bytes);

		let mut reader = WindowReader::open(&provider, "a.mp3").unwrap();
		let mut sink = TagSink::new(requested);
		let format = read_from(&mut reader, &mut sink).unwrap();

		(format, sink)
	}

	#[test_log::test]
	fn v1_1_track_detection() {
		let (format, sink) = parse(fixture([0, 7]), &[TagKey::Track, TagKey::Name]);

		assert_eq!(format, "ID3v1.1");

		let map = sink.finish();
		assert_eq!(map[&TagKey::Track], Some(TagValue::Number(7)));
		assert_eq!(
			map[&TagKey::Name],
			Some(TagValue::Text(String::from("Silence")))
		);
	}

	#[test_log::test]
	fn plain_v1_has_no_track() {
		let (format, sink) = parse(fixture([b'x', b'y']), &[TagKey::Track, TagKey::Year]);

		assert_eq!(format, "ID3v1");

		let map = sink.finish();
		assert_eq!(map[&TagKey::Track], None);
		assert_eq!(map[&TagKey::Year], Some(TagValue::Number(2024)));
	}

	#[test_log::test]
	fn missing_marker_fails() {
		let mut provider = MemoryProvider::new();
		provider.insert("a.mp3", vec![0u8; 256]);

		let mut reader = WindowReader::open(&provider, "a.mp3").unwrap();
		let mut sink = TagSink::new(&[TagKey::Name]);

		assert!(read_from(&mut reader, &mut sink).is_err());
	}
}
