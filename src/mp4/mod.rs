//! MP4 / M4A (ISO Base Media) parsing
//!
//! The walk is recursive descent over the atom tree: top level until `moov`,
//! then through the `udta` / `meta` / `ilst` containers to the iTunes-style
//! metadata leaves. Only atom headers and `ilst` leaf bodies are ever loaded,
//! so memory stays bounded by the largest leaf (typically `covr`).

mod atom;

use atom::{read_atom_head, AtomHead};

use crate::error::Result;
use crate::macros::err;
use crate::provider::FileProvider;
use crate::reader::WindowReader;
use crate::tag::{TagKey, TagSink};
use crate::util::bytes::be_uint;
use crate::util::text::utf8_decode;

use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt};

// `covr` data atom flags
const FLAG_PNG: u32 = 14;

/// Parse the metadata of an ISO Base Media file
///
/// Returns the format string, `"<major brand> (<minor version>)"`.
pub(crate) fn read_from<P: FileProvider>(
	reader: &mut WindowReader<'_, P>,
	sink: &mut TagSink,
) -> Result<String> {
	let file_end = reader.file_size();

	let Some(ftyp) = read_atom_head(reader, 0, file_end)? else {
		err!(FormatInvalid("File too small to contain an \"ftyp\" atom"));
	};

	if &ftyp.ident != b"ftyp" {
		err!(FormatInvalid("Expected \"ftyp\" to be the first atom"));
	}

	// Major brand (4) + minor version (4); the compatible brand list behind
	// them is not interesting
	if ftyp.content_len() < 8 {
		err!(FormatInvalid("\"ftyp\" atom too short"));
	}

	reader.load(ftyp.content_start(), 8)?;

	let mut major_brand = [0u8; 4];
	reader.read_exact(&mut major_brand)?;
	let minor_version = reader.read_u32::<BigEndian>()?;

	// Brands are ASCII and may carry significant trailing spaces ("M4A ")
	let major_brand = major_brand.iter().map(|b| *b as char).collect::<String>();

	log::debug!("Verified to be an MP4 file. Major brand: {major_brand}");

	let format = format!("{major_brand} ({minor_version})");

	// Walk the top level until `moov`; everything else is stepped over
	let mut offset = ftyp.start + ftyp.len;
	while let Some(head) = read_atom_head(reader, offset, file_end)? {
		if head.terminal {
			break;
		}

		if &head.ident == b"moov" {
			walk_children(reader, sink, head.content_start(), head.start + head.len, false)?;
			break;
		}

		offset += head.len;
	}

	Ok(format)
}

/// Walk the children of a container atom within `[offset, end)`
///
/// `udta`, `meta`, and `ilst` are treated as containers; inside `ilst` the
/// known metadata leaves are parsed. Stops on a terminal atom or once the
/// sink is satisfied.
fn walk_children<P: FileProvider>(
	reader: &mut WindowReader<'_, P>,
	sink: &mut TagSink,
	mut offset: u64,
	end: u64,
	in_ilst: bool,
) -> Result<()> {
	while let Some(head) = read_atom_head(reader, offset, end)? {
		if head.terminal {
			break;
		}

		if in_ilst {
			if let Some(key) = map_ilst_atom(&head.ident) {
				if sink.wants(key) {
					if let Err(e) = parse_item_data(reader, sink, key, &head) {
						log::warn!("Skipping metadata item with invalid content: {e}");
					}
				}
			}
		} else {
			match &head.ident {
				b"udta" | b"ilst" => {
					walk_children(
						reader,
						sink,
						head.content_start(),
						head.start + head.len,
						&head.ident == b"ilst",
					)?;
				},
				// A full `meta` atom carries 4 version/flags bytes before its
				// children
				b"meta" => {
					walk_children(
						reader,
						sink,
						head.content_start() + 4,
						head.start + head.len,
						false,
					)?;
				},
				_ => {},
			}
		}

		if sink.satisfied() {
			break;
		}

		offset += head.len;
	}

	Ok(())
}

fn map_ilst_atom(ident: &[u8; 4]) -> Option<TagKey> {
	match ident {
		b"\xA9alb" => Some(TagKey::Album),
		b"aART" => Some(TagKey::AlbumArtist),
		b"\xA9ART" => Some(TagKey::Artist),
		b"\xA9nam" => Some(TagKey::Name),
		b"trkn" => Some(TagKey::Track),
		b"\xA9day" => Some(TagKey::Year),
		b"covr" => Some(TagKey::Artwork),
		_ => None,
	}
}

/// Parse the `data` sub-atom of an `ilst` leaf
///
/// Layout: 4-byte size, `"data"`, 1 version byte, 3 flag bytes, 4 reserved
/// bytes, then the payload.
fn parse_item_data<P: FileProvider>(
	reader: &mut WindowReader<'_, P>,
	sink: &mut TagSink,
	key: TagKey,
	leaf: &AtomHead,
) -> Result<()> {
	let content_len = leaf.content_len();
	if content_len < 16 {
		err!(FormatInvalid("Metadata leaf too short to hold a \"data\" atom"));
	}

	reader.load(leaf.content_start(), content_len as usize)?;

	let _data_size = reader.read_u32::<BigEndian>()?;

	let mut ident = [0u8; 4];
	reader.read_exact(&mut ident)?;
	if &ident != b"data" {
		err!(FormatInvalid("Expected atom \"data\" to follow the leaf name"));
	}

	let _version = reader.read_u8()?;

	let mut flag_bytes = [0u8; 3];
	reader.read_exact(&mut flag_bytes)?;
	let flags = u32::from_be_bytes([0, flag_bytes[0], flag_bytes[1], flag_bytes[2]]);

	// The locale indicator is not interesting
	reader.skip(4);

	let payload = reader.take((content_len - 16) as usize);

	match key {
		TagKey::Track => {
			// The payload is the iTunes number pair; the track sits in the
			// second 16-bit word
			let track = if payload.len() >= 4 {
				be_uint(&payload[2..4]) as u32
			} else {
				be_uint(payload) as u32
			};

			if track > 0 {
				sink.store_number(TagKey::Track, track);
			}
		},
		TagKey::Artwork => {
			let mime = if flags == FLAG_PNG {
				"image/png"
			} else {
				"image/jpeg"
			};

			if !payload.is_empty() {
				let payload = payload.to_vec();
				sink.store_artwork(mime, &payload);
			}
		},
		_ => {
			let payload = payload.to_vec();
			match utf8_decode(&payload) {
				Ok(text) => sink.store_text(key, text),
				Err(_) => log::warn!("Non UTF-8 value found, discarding item"),
			}
		},
	}

	Ok(())
}
