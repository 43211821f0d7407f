//! The ID3v2 frame loop

use super::header::{Id3v2Header, Id3v2Version};
use crate::error::Result;
use crate::macros::err;
use crate::provider::FileProvider;
use crate::reader::WindowReader;
use crate::tag::{TagKey, TagSink};
use crate::util::bytes::{be_uint, synchsafe_uint};
use crate::util::text::{decode_text, latin1_decode, read_to_terminator, TextEncoding};

use std::io::Read;

use byteorder::ReadBytesExt;

// Format flags, from the second flag byte of a frame header
const FRAME_FLAG_V3_COMPRESSION: u8 = 0x80;
const FRAME_FLAG_V3_ENCRYPTION: u8 = 0x40;
const FRAME_FLAG_V4_COMPRESSION: u8 = 0x08;
const FRAME_FLAG_V4_ENCRYPTION: u8 = 0x04;
const FRAME_FLAG_V4_UNSYNCHRONISATION: u8 = 0x02;

/// Walk the frames of the loaded tag region
///
/// Stops at padding, at the end of the region, or as soon as every requested
/// tag holds a value.
pub(super) fn parse_frames<P: FileProvider>(
	reader: &mut WindowReader<'_, P>,
	sink: &mut TagSink,
	header: &Id3v2Header,
	region_len: usize,
) -> Result<()> {
	let frame_header_len = match header.version {
		Id3v2Version::V2 => 6,
		_ => 10,
	};

	loop {
		if sink.satisfied() {
			log::debug!("Every requested tag is filled, stopping");
			break;
		}

		if reader.is_finished()
			|| reader.position() + frame_header_len > region_len
			|| reader.remaining() < frame_header_len
		{
			break;
		}

		let mut frame_header = [0u8; 10];
		frame_header[..frame_header_len].copy_from_slice(reader.take(frame_header_len));

		// A zero byte where an identifier belongs means we reached the padding
		if frame_header[0] == 0 {
			log::debug!("Reached the tag padding, stopping");
			break;
		}

		let (id, size, format_flags) = match header.version {
			Id3v2Version::V2 => (&frame_header[..3], be_uint(&frame_header[3..6]), 0u8),
			Id3v2Version::V3 => (&frame_header[..4], be_uint(&frame_header[4..8]), frame_header[9]),
			Id3v2Version::V4 => (
				&frame_header[..4],
				synchsafe_uint(&frame_header[4..8]),
				frame_header[9],
			),
		};
		let size = size as usize;

		let frame_unsynchronised = header.version == Id3v2Version::V4
			&& format_flags & FRAME_FLAG_V4_UNSYNCHRONISATION != 0;

		// When the whole tag is marked unsynchronised, every v2.4 frame has to
		// agree with it
		if header.version == Id3v2Version::V4
			&& header.unsynchronisation
			&& !frame_unsynchronised
		{
			err!(Inconsistency(
				"Tag-level unsynchronisation is set, but a frame's unsynchronisation flag is unset"
			));
		}

		if size == 0 {
			log::debug!("Encountered a zero length frame, skipping");
			continue;
		}

		if size > region_len - reader.position() {
			log::warn!("Frame size exceeds the tag region, stopping");
			break;
		}

		let (compressed, encrypted) = match header.version {
			Id3v2Version::V3 => (
				format_flags & FRAME_FLAG_V3_COMPRESSION != 0,
				format_flags & FRAME_FLAG_V3_ENCRYPTION != 0,
			),
			Id3v2Version::V4 => (
				format_flags & FRAME_FLAG_V4_COMPRESSION != 0,
				format_flags & FRAME_FLAG_V4_ENCRYPTION != 0,
			),
			Id3v2Version::V2 => (false, false),
		};

		let Some(key) = map_frame_id(id) else {
			reader.skip(size);
			continue;
		};

		let wanted = sink.wants(key);
		if !wanted || compressed || encrypted {
			if wanted {
				log::warn!("Skipping compressed or encrypted frame");
			}

			reader.skip(size);
			continue;
		}

		// With the tag-level flag the whole region was already reversed; only
		// a lone per-frame flag still needs its own pass
		let frame_start = reader.position();
		let mut data_len = size;
		if frame_unsynchronised && !header.unsynchronisation {
			data_len = reader.unsynchronise(frame_start, size);
		}

		match key {
			TagKey::Artwork => {
				let frame_end = frame_start + data_len;
				if let Err(e) = parse_picture_frame(reader, header.version, frame_end, sink) {
					log::warn!("Unable to read attached picture, discarding: {e}");
				}
			},
			_ => match parse_text_frame(reader.peek(data_len)) {
				Ok(Some(text)) => sink.store_text(key, text),
				Ok(None) => {},
				Err(e) => log::warn!("Unable to decode text frame, discarding: {e}"),
			},
		}

		// Frames advance by their declared size, however much of the body was
		// actually consumed
		let consumed = reader.position() - frame_start;
		reader.skip(size.saturating_sub(consumed));
	}

	Ok(())
}

fn map_frame_id(id: &[u8]) -> Option<TagKey> {
	match id {
		b"TAL" | b"TALB" => Some(TagKey::Album),
		b"TP2" | b"TPE2" => Some(TagKey::AlbumArtist),
		b"TP1" | b"TPE1" => Some(TagKey::Artist),
		b"TT2" | b"TIT2" => Some(TagKey::Name),
		b"TRK" | b"TRCK" => Some(TagKey::Track),
		b"TYE" | b"TYER" | b"TDRC" => Some(TagKey::Year),
		b"PIC" | b"APIC" => Some(TagKey::Artwork),
		_ => None,
	}
}

/// A text information frame: one encoding byte, then the text
fn parse_text_frame(data: &[u8]) -> Result<Option<String>> {
	let Some((encoding_byte, text)) = data.split_first() else {
		return Ok(None);
	};

	let Some(encoding) = TextEncoding::from_u8(*encoding_byte) else {
		return Ok(None);
	};

	decode_text(encoding, text).map(Some)
}

/// An attached picture (`PIC`/`APIC`) frame, parsed out of the loaded window
///
/// `frame_end` is the window position one past the frame's data; a malformed
/// frame is dropped without failing the tag.
fn parse_picture_frame<P: FileProvider>(
	reader: &mut WindowReader<'_, P>,
	version: Id3v2Version,
	frame_end: usize,
	sink: &mut TagSink,
) -> Result<()> {
	let encoding_byte = reader.read_u8()?;
	let Some(encoding) = TextEncoding::from_u8(encoding_byte) else {
		return Ok(());
	};

	let mime;
	if version == Id3v2Version::V2 {
		// ID3v2.2 uses a fixed three byte image format
		let mut image_format = [0u8; 3];
		reader.read_exact(&mut image_format)?;

		mime = match &image_format {
			b"PNG" => String::from("image/png"),
			b"JPG" => String::from("image/jpeg"),
			_ => {
				log::warn!("Found an unexpected image format, discarding picture");
				return Ok(());
			},
		};
	} else {
		mime = latin1_decode(reader.read_until_nul());
	}

	if reader.position() >= frame_end {
		return Ok(());
	}

	// Only "Other" (0) and "Cover (front)" (3) qualify as cover art
	let picture_type = reader.read_u8()?;
	if picture_type != 0 && picture_type != 3 {
		log::debug!("Skipping picture of type {picture_type}");
		return Ok(());
	}

	// The description is not retained, but it has to be walked past in the
	// frame's declared encoding (UTF-16 terminates on an aligned zero pair)
	let remaining = (frame_end - reader.position()) as u64;
	let mut bounded = Read::take(&mut *reader, remaining);
	let _description = read_to_terminator(&mut bounded, encoding);

	if reader.position() >= frame_end {
		return Ok(());
	}

	let picture = reader.peek(frame_end - reader.position()).to_vec();
	reader.skip(picture.len());

	sink.store_artwork(&mime, &picture);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::provider::MemoryProvider;
	use crate::tag::TagValue;

	fn picture_sink(version: Id3v2Version, frame: &[u8]) -> TagSink {
		let mut provider = MemoryProvider::new();
		provider.insert("frame.bin", frame.to_vec());

		let mut reader = WindowReader::open(&provider, "frame.bin").unwrap();
		reader.load(0, frame.len()).unwrap();

		let mut sink = TagSink::new(&[TagKey::Artwork]);
		parse_picture_frame(&mut reader, version, frame.len(), &mut sink).unwrap();
		sink
	}

	#[test_log::test]
	fn frame_id_mapping() {
		assert_eq!(map_frame_id(b"TAL"), Some(TagKey::Album));
		assert_eq!(map_frame_id(b"TALB"), Some(TagKey::Album));
		assert_eq!(map_frame_id(b"TDRC"), Some(TagKey::Year));
		assert_eq!(map_frame_id(b"APIC"), Some(TagKey::Artwork));
		assert_eq!(map_frame_id(b"TXXX"), None);
	}

	#[test_log::test]
	fn text_frame_decoding() {
		assert_eq!(
			parse_text_frame(b"\x00Void\x00").unwrap().as_deref(),
			Some("Void")
		);
		assert_eq!(
			parse_text_frame("\x03沈黙".as_bytes()).unwrap().as_deref(),
			Some("沈黙")
		);

		// Unknown encodings drop the frame rather than failing the tag
		assert_eq!(parse_text_frame(b"\x09Void").unwrap(), None);
		assert_eq!(parse_text_frame(b"").unwrap(), None);
	}

	#[test_log::test]
	fn picture_frame_v23() {
		let mut frame = Vec::new();
		frame.push(0); // Latin-1 description
		frame.extend_from_slice(b"image/png\0");
		frame.push(3); // Cover (front)
		frame.extend_from_slice(b"front\0");
		frame.extend_from_slice(&[0x89, 0x50, 0x4E, 0x47]);

		let map = picture_sink(Id3v2Version::V3, &frame).finish();
		let Some(Some(TagValue::Text(uri))) = map.get(&TagKey::Artwork) else {
			panic!("expected artwork");
		};
		assert!(uri.starts_with("data:image/png;base64,"));
	}

	#[test_log::test]
	fn picture_frame_skips_other_types() {
		let mut frame = Vec::new();
		frame.push(0);
		frame.extend_from_slice(b"image/png\0");
		frame.push(4); // Cover (back)
		frame.extend_from_slice(b"\0");
		frame.extend_from_slice(&[0x89, 0x50, 0x4E, 0x47]);

		assert_eq!(picture_sink(Id3v2Version::V3, &frame).finish()[&TagKey::Artwork], None);
	}

	#[test_log::test]
	fn picture_frame_v22_format() {
		let mut frame = Vec::new();
		frame.push(0);
		frame.extend_from_slice(b"JPG");
		frame.push(0); // Other
		frame.extend_from_slice(b"\0");
		frame.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0]);

		let map = picture_sink(Id3v2Version::V2, &frame).finish();
		let Some(Some(TagValue::Text(uri))) = map.get(&TagKey::Artwork) else {
			panic!("expected artwork");
		};
		assert!(uri.starts_with("data:image/jpeg;base64,"));
	}
}
