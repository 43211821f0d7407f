//! FLAC metadata block parsing
//!
//! The stream opens with the `fLaC` marker, followed by a chain of metadata
//! blocks. Only VORBIS_COMMENT and PICTURE block bodies are ever loaded;
//! every other block is stepped over by its declared length.

mod block;

use block::{BlockHeader, BLOCK_HEADER_SIZE, BLOCK_ID_PICTURE, BLOCK_ID_VORBIS_COMMENTS};

use crate::error::Result;
use crate::macros::err;
use crate::provider::FileProvider;
use crate::reader::WindowReader;
use crate::tag::{TagKey, TagSink};
use crate::util::bytes::le_uint;
use crate::util::text::{latin1_decode, utf8_decode};

use byteorder::{BigEndian, ReadBytesExt};

/// Parse the FLAC metadata blocks at the start of the file
///
/// Returns the format string (`"FLAC"`).
pub(crate) fn read_from<P: FileProvider>(
	reader: &mut WindowReader<'_, P>,
	sink: &mut TagSink,
) -> Result<String> {
	let file_size = reader.file_size();

	if file_size < 4 {
		err!(FormatInvalid("File missing \"fLaC\" stream marker"));
	}

	reader.load(0, 4)?;
	if reader.take(4) != b"fLaC" {
		err!(FormatInvalid("File missing \"fLaC\" stream marker"));
	}

	log::debug!("File verified to be FLAC");

	let mut offset = 4u64;

	loop {
		if offset + BLOCK_HEADER_SIZE > file_size {
			break;
		}

		let header = BlockHeader::read(reader, offset)?;
		offset += BLOCK_HEADER_SIZE;

		let interesting = match header.ty {
			BLOCK_ID_VORBIS_COMMENTS => true,
			BLOCK_ID_PICTURE => sink.wants(TagKey::Artwork),
			_ => false,
		};

		if interesting && header.len > 0 {
			reader.load(offset, header.len as usize)?;

			match header.ty {
				BLOCK_ID_VORBIS_COMMENTS => {
					log::debug!("Encountered a Vorbis Comments block, parsing");
					parse_vorbis_comments(reader, sink)?;
				},
				_ => {
					log::debug!("Encountered a FLAC picture block, parsing");
					if parse_picture_block(reader, sink).is_err() {
						log::warn!("Unable to read FLAC picture block, discarding");
					}
				},
			}
		}

		offset += u64::from(header.len);

		if header.last || sink.satisfied() {
			break;
		}
	}

	Ok(String::from("FLAC"))
}

/// Parse a VORBIS_COMMENT block loaded into the current window
///
/// All length fields are little-endian, all text is UTF-8. Entries are
/// `FIELD=value`; field names match case-insensitively, and for repeated
/// fields the first occurrence wins.
fn parse_vorbis_comments<P: FileProvider>(
	reader: &mut WindowReader<'_, P>,
	sink: &mut TagSink,
) -> Result<()> {
	if reader.remaining() < 8 {
		err!(FormatInvalid("Vorbis comment block is too short"));
	}

	let vendor_len = le_uint(reader.take(4)) as usize;
	if vendor_len > reader.remaining() {
		err!(FormatInvalid("Vorbis comment vendor length exceeds the block"));
	}

	// The vendor string is not retained
	reader.skip(vendor_len);

	if reader.remaining() < 4 {
		err!(FormatInvalid("Vorbis comment block is too short"));
	}
	let item_count = le_uint(reader.take(4));

	for _ in 0..item_count {
		if sink.satisfied() {
			break;
		}

		if reader.is_finished() || reader.remaining() < 4 {
			break;
		}

		let comment_len = le_uint(reader.take(4)) as usize;
		if comment_len > reader.remaining() {
			err!(FormatInvalid("Vorbis comment length exceeds the block"));
		}

		let comment = reader.take(comment_len);

		// FIELD=value
		let mut comment_split = comment.splitn(2, |b| *b == b'=');

		let Some(field) = comment_split.next() else {
			continue;
		};

		let Some(value) = comment_split.next() else {
			log::warn!("No separator found in field, discarding");
			continue;
		};

		let Some(key) = map_field(field) else {
			continue;
		};

		let value = value.to_vec();
		match utf8_decode(&value) {
			Ok(value) => sink.store_text(key, value),
			Err(_) => log::warn!("Non UTF-8 value found, discarding field"),
		}
	}

	Ok(())
}

fn map_field(field: &[u8]) -> Option<TagKey> {
	match field {
		f if f.eq_ignore_ascii_case(b"ALBUM") => Some(TagKey::Album),
		f if f.eq_ignore_ascii_case(b"ALBUMARTIST") => Some(TagKey::AlbumArtist),
		f if f.eq_ignore_ascii_case(b"ARTIST") => Some(TagKey::Artist),
		f if f.eq_ignore_ascii_case(b"TITLE") => Some(TagKey::Name),
		f if f.eq_ignore_ascii_case(b"TRACKNUMBER") => Some(TagKey::Track),
		f if f.eq_ignore_ascii_case(b"DATE")
			|| f.eq_ignore_ascii_case(b"ORIGINALDATE")
			|| f.eq_ignore_ascii_case(b"ORIGINALYEAR") =>
		{
			Some(TagKey::Year)
		},
		_ => None,
	}
}

/// Parse a PICTURE block loaded into the current window
///
/// All numeric fields are 32-bit big-endian. Only picture types 0 ("Other")
/// and 3 ("Cover (front)") are retained.
fn parse_picture_block<P: FileProvider>(
	reader: &mut WindowReader<'_, P>,
	sink: &mut TagSink,
) -> Result<()> {
	let picture_type = reader.read_u32::<BigEndian>()?;
	if picture_type != 0 && picture_type != 3 {
		log::debug!("Skipping picture of type {picture_type}");
		return Ok(());
	}

	let mime_len = reader.read_u32::<BigEndian>()? as usize;
	if mime_len > reader.remaining() {
		err!(FormatInvalid("Picture MIME length exceeds the block"));
	}
	let mime = latin1_decode(reader.take(mime_len));

	let description_len = reader.read_u32::<BigEndian>()? as usize;
	reader.skip(description_len);

	// Width, height, colour depth, indexed colour count
	reader.skip(16);

	let data_len = reader.read_u32::<BigEndian>()? as usize;
	if data_len > reader.remaining() {
		err!(FormatInvalid("Picture data length exceeds the block"));
	}

	let data = reader.take(data_len).to_vec();
	if data.is_empty() {
		return Ok(());
	}

	sink.store_artwork(&mime, &data);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::provider::MemoryProvider;
	use crate::tag::TagValue;

	use std::collections::BTreeMap;

	fn comment_entry(field: &str, value: &str) -> Vec<u8> {
		let entry = format!("{field}={value}");
		let mut bytes = (entry.len() as u32).to_le_bytes().to_vec();
		bytes.extend_from_slice(entry.as_bytes());
		bytes
	}

	fn vorbis_block(entries: &[Vec<u8>]) -> Vec<u8> {
		let vendor = b"reference libFLAC";
		let mut body = (vendor.len() as u32).to_le_bytes().to_vec();
		body.extend_from_slice(vendor);
		body.extend_from_slice(&(entries.len() as u32).to_le_bytes());
		for entry in entries {
			body.extend_from_slice(entry);
		}
		body
	}

	fn block(ty: u8, last: bool, body: &[u8]) -> Vec<u8> {
		let mut bytes = vec![ty | if last { 0x80 } else { 0 }];
		bytes.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
		bytes.extend_from_slice(body);
		bytes
	}

	fn picture_block(picture_type: u32, mime: &str, data: &[u8]) -> Vec<u8> {
		let mut body = picture_type.to_be_bytes().to_vec();
		body.extend_from_slice(&(mime.len() as u32).to_be_bytes());
		body.extend_from_slice(mime.as_bytes());
		body.extend_from_slice(&0u32.to_be_bytes()); // description
		body.extend_from_slice(&[0; 16]); // geometry
		body.extend_from_slice(&(data.len() as u32).to_be_bytes());
		body.extend_from_slice(data);
		body
	}

	fn parse(
		blocks: &[Vec<u8>],
		requested: &[TagKey],
	) -> (String, BTreeMap<TagKey, Option<TagValue>>) {
		let mut file = b"fLaC".to_vec();
		for b in blocks {
			file.extend_from_slice(b);
		}

		let mut provider = MemoryProvider::new();
		provider.insert("a.flac", file);

		let mut reader = WindowReader::open(&provider, "a.flac").unwrap();
		let mut sink = TagSink::new(requested);
		let format = read_from(&mut reader, &mut sink).unwrap();

		(format, sink.finish())
	}

	#[test_log::test]
	fn vorbis_comments() {
		let body = vorbis_block(&[
			comment_entry("ALBUM", "Void"),
			comment_entry("artist", "Nothing"),
			comment_entry("TITLE", "Silence"),
			comment_entry("TRACKNUMBER", "1"),
			comment_entry("DATE", "2024-03-01"),
		]);

		let requested = [
			TagKey::Album,
			TagKey::Artist,
			TagKey::Name,
			TagKey::Track,
			TagKey::Year,
		];
		let (format, map) = parse(&[block(4, true, &body)], &requested);

		assert_eq!(format, "FLAC");
		assert_eq!(map[&TagKey::Album], Some(TagValue::Text(String::from("Void"))));
		assert_eq!(
			map[&TagKey::Artist],
			Some(TagValue::Text(String::from("Nothing")))
		);
		assert_eq!(
			map[&TagKey::Name],
			Some(TagValue::Text(String::from("Silence")))
		);
		assert_eq!(map[&TagKey::Track], Some(TagValue::Number(1)));
		assert_eq!(map[&TagKey::Year], Some(TagValue::Number(2024)));
	}

	#[test_log::test]
	fn repeated_fields_keep_the_first() {
		let body = vorbis_block(&[
			comment_entry("ARTIST", "Nothing"),
			comment_entry("ARTIST", "Someone Else"),
		]);

		let (_, map) = parse(&[block(4, true, &body)], &[TagKey::Artist]);
		assert_eq!(
			map[&TagKey::Artist],
			Some(TagValue::Text(String::from("Nothing")))
		);
	}

	#[test_log::test]
	fn picture_type_filter() {
		let back_cover = picture_block(4, "image/png", &[1, 2, 3]);
		let front_cover = picture_block(3, "image/png", &[4, 5, 6]);

		let (_, map) = parse(
			&[block(6, false, &back_cover), block(6, true, &front_cover)],
			&[TagKey::Artwork],
		);

		let Some(TagValue::Text(uri)) = map[&TagKey::Artwork].as_ref() else {
			panic!("expected artwork");
		};
		let data = crate::util::bytes::base64_decode(
			uri.strip_prefix("data:image/png;base64,").unwrap(),
		)
		.unwrap();
		assert_eq!(data, [4, 5, 6]);
	}

	#[test_log::test]
	fn unknown_blocks_are_skipped() {
		// STREAMINFO-shaped filler followed by the comment block
		let filler = vec![0u8; 34];
		let body = vorbis_block(&[comment_entry("TITLE", "Silence")]);

		let (_, map) = parse(
			&[block(0, false, &filler), block(4, true, &body)],
			&[TagKey::Name],
		);
		assert_eq!(
			map[&TagKey::Name],
			Some(TagValue::Text(String::from("Silence")))
		);
	}

	#[test_log::test]
	fn missing_marker_fails() {
		let mut provider = MemoryProvider::new();
		provider.insert("a.flac", b"OggS\x00\x00\x00\x00".to_vec());

		let mut reader = WindowReader::open(&provider, "a.flac").unwrap();
		let mut sink = TagSink::new(&[TagKey::Name]);

		assert!(read_from(&mut reader, &mut sink).is_err());
	}
}
