//! Tag keys, values, and the extraction result record

use crate::util::bytes::base64_encode;

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// The closed set of tags this crate can extract
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TagKey {
	/// Album title
	Album,
	/// Album artist (may differ from the track artist on compilations)
	AlbumArtist,
	/// Track artist
	Artist,
	/// Embedded cover art, as a `data:<mime>;base64,<payload>` URI
	Artwork,
	/// Track title
	Name,
	/// Track number (the numerator of a `current/total` pair)
	Track,
	/// Release year (the first four digits of a date-like field)
	Year,
}

impl TagKey {
	/// The key's wire name
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Album => "album",
			Self::AlbumArtist => "albumArtist",
			Self::Artist => "artist",
			Self::Artwork => "artwork",
			Self::Name => "name",
			Self::Track => "track",
			Self::Year => "year",
		}
	}
}

impl Display for TagKey {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A single extracted tag value
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TagValue {
	/// A textual value (including artwork `data:` URIs)
	Text(String),
	/// A numeric value, used for [`TagKey::Track`] and [`TagKey::Year`] when
	/// the raw field normalises to a positive integer
	Number(u32),
}

impl TagValue {
	/// Returns the textual content, if this is a [`TagValue::Text`]
	pub fn text(&self) -> Option<&str> {
		match self {
			Self::Text(text) => Some(text),
			Self::Number(_) => None,
		}
	}

	/// Returns the numeric content, if this is a [`TagValue::Number`]
	pub fn number(&self) -> Option<u32> {
		match self {
			Self::Number(number) => Some(*number),
			Self::Text(_) => None,
		}
	}
}

/// The container family a file was identified as
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FileKind {
	/// FLAC
	Flac,
	/// MP3
	Mp3,
	/// M4A (ISO Base Media)
	M4a,
	/// MP4 (ISO Base Media)
	Mp4,
}

impl FileKind {
	/// The lowercase short name, matching the file extension
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Flac => "flac",
			Self::Mp3 => "mp3",
			Self::M4a => "m4a",
			Self::Mp4 => "mp4",
		}
	}
}

impl Display for FileKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// The result of a successful [`extract`](crate::extract)
#[derive(Clone, Debug)]
pub struct TaggedAudio {
	pub(crate) file_type: FileKind,
	pub(crate) format: String,
	pub(crate) metadata: BTreeMap<TagKey, Option<TagValue>>,
}

impl TaggedAudio {
	/// The container family
	pub fn file_type(&self) -> FileKind {
		self.file_type
	}

	/// A short string identifying the exact tag dialect, e.g. `"ID3v2.4"`
	pub fn format(&self) -> &str {
		&self.format
	}

	/// The extracted metadata
	///
	/// Every requested key is present; keys that were not found map to `None`.
	pub fn metadata(&self) -> &BTreeMap<TagKey, Option<TagValue>> {
		&self.metadata
	}

	/// Shorthand for looking up a single key's value
	pub fn get(&self, key: TagKey) -> Option<&TagValue> {
		self.metadata.get(&key).and_then(Option::as_ref)
	}

	/// Consume the record, returning the metadata map
	pub fn into_metadata(self) -> BTreeMap<TagKey, Option<TagValue>> {
		self.metadata
	}
}

/// Collects tag values for one extraction
///
/// The sink owns the requested-key bookkeeping: unrequested keys are refused,
/// the first stored occurrence of a key wins, and [`satisfied`](TagSink::satisfied)
/// flips once every requested key holds a value so the parsers can stop early.
pub(crate) struct TagSink {
	values: BTreeMap<TagKey, Option<TagValue>>,
	missing: usize,
}

impl TagSink {
	pub(crate) fn new(requested: &[TagKey]) -> Self {
		let mut values = BTreeMap::new();
		for key in requested {
			values.entry(*key).or_insert(None);
		}

		let missing = values.len();
		Self { values, missing }
	}

	/// Whether `key` was requested and still lacks a value
	pub(crate) fn wants(&self, key: TagKey) -> bool {
		matches!(self.values.get(&key), Some(None))
	}

	pub(crate) fn satisfied(&self) -> bool {
		self.missing == 0
	}

	/// Store a textual field, applying the track/year normalisation
	pub(crate) fn store_text(&mut self, key: TagKey, raw: String) {
		if raw.is_empty() {
			return;
		}

		let value = match key {
			TagKey::Track => normalise_track(&raw),
			TagKey::Year => normalise_year(&raw),
			_ => TagValue::Text(raw),
		};

		self.store(key, value);
	}

	pub(crate) fn store_number(&mut self, key: TagKey, number: u32) {
		self.store(key, TagValue::Number(number));
	}

	/// Store cover art as a `data:` URI
	pub(crate) fn store_artwork(&mut self, mime: &str, data: &[u8]) {
		let mime = canonical_mime(mime);
		let uri = format!("data:{mime};base64,{}", base64_encode(data));
		self.store(TagKey::Artwork, TagValue::Text(uri));
	}

	fn store(&mut self, key: TagKey, value: TagValue) {
		if !self.wants(key) {
			return;
		}

		log::trace!("Storing tag {key}");

		self.values.insert(key, Some(value));
		self.missing -= 1;
	}

	pub(crate) fn finish(self) -> BTreeMap<TagKey, Option<TagValue>> {
		self.values
	}
}

/// The numerator of a `current/total` pair, when it is a positive integer
fn normalise_track(raw: &str) -> TagValue {
	let numerator = raw.split('/').next().unwrap_or_default().trim();

	match numerator.parse::<u32>() {
		Ok(track) if track > 0 => TagValue::Number(track),
		_ => TagValue::Text(raw.to_owned()),
	}
}

/// The first four decimal digits of a date-like field
fn normalise_year(raw: &str) -> TagValue {
	let digits: String = raw.chars().filter(char::is_ascii_digit).take(4).collect();

	if digits.len() == 4 {
		if let Ok(year) = digits.parse::<u32>() {
			return TagValue::Number(year);
		}
	}

	TagValue::Text(raw.to_owned())
}

fn canonical_mime(mime: &str) -> String {
	let mime = mime.trim().to_ascii_lowercase();

	match mime.as_str() {
		"image/jpg" | "jpg" | "jpeg" => String::from("image/jpeg"),
		"png" => String::from("image/png"),
		_ => mime,
	}
}
