//! Container dispatch and the public extract operation

use crate::error::Result;
use crate::macros::err;
use crate::provider::{FileProvider, FsProvider};
use crate::reader::WindowReader;
use crate::tag::{FileKind, TagKey, TagSink, TaggedAudio};
use crate::{flac, id3, mp4};

use std::path::Path;

/// Extract the requested tags from the file at `uri`
///
/// The file's final extension (case-insensitive) selects the container
/// parser; `mp3`, `flac`, `m4a`, and `mp4` are supported. The returned
/// metadata map contains exactly the requested keys, with keys the file does
/// not carry mapped to `None`.
///
/// # Errors
///
/// * The provider reports the file as missing, or a read fails
/// * The extension is not supported
/// * The container's magic numbers or structure are invalid
///
/// # Examples
///
/// ```rust,no_run
/// use tagprobe::provider::FsProvider;
/// use tagprobe::{extract, TagKey};
///
/// # fn main() -> tagprobe::error::Result<()> {
/// let tagged = extract(
/// 	&FsProvider,
/// 	"music/silence.mp3",
/// 	&[TagKey::Artist, TagKey::Name],
/// )?;
///
/// println!("{} tag: {:?}", tagged.format(), tagged.get(TagKey::Name));
/// # Ok(())
/// # }
/// ```
pub fn extract<P: FileProvider>(
	provider: &P,
	uri: &str,
	requested: &[TagKey],
) -> Result<TaggedAudio> {
	let extension = extension_of(uri).unwrap_or_default();

	let file_type = if extension == "flac" {
		FileKind::Flac
	} else if extension == "mp3" {
		FileKind::Mp3
	} else if extension == "m4a" {
		FileKind::M4a
	} else if extension == "mp4" {
		FileKind::Mp4
	} else {
		err!(UnsupportedFile(extension));
	};

	let mut reader = WindowReader::open(provider, uri)?;
	let mut sink = TagSink::new(requested);

	let format = match file_type {
		FileKind::Flac => flac::read_from(&mut reader, &mut sink)?,
		FileKind::Mp3 => read_mp3(&mut reader, &mut sink)?,
		FileKind::M4a | FileKind::Mp4 => mp4::read_from(&mut reader, &mut sink)?,
	};

	Ok(TaggedAudio {
		file_type,
		format,
		metadata: sink.finish(),
	})
}

/// [`extract`] over the local filesystem
///
/// # Errors
///
/// See [`extract`]
pub fn extract_from_path(path: impl AsRef<Path>, requested: &[TagKey]) -> Result<TaggedAudio> {
	extract(&FsProvider, &path.as_ref().to_string_lossy(), requested)
}

/// An MP3 file carries its tag wherever the writer felt like putting it: an
/// ID3v2 tag at the start or end of the file takes precedence, an ID3v1
/// trailer is the fallback.
fn read_mp3<P: FileProvider>(
	reader: &mut WindowReader<'_, P>,
	sink: &mut TagSink,
) -> Result<String> {
	if let Some(header_offset) = id3::find_id3v2(reader)? {
		return id3::v2::read_from(reader, sink, header_offset);
	}

	id3::v1::read_from(reader, sink)
}

fn extension_of(uri: &str) -> Option<String> {
	let (_, extension) = uri.rsplit_once('.')?;

	if extension.is_empty() || extension.contains('/') {
		return None;
	}

	Some(extension.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
	use super::extension_of;

	#[test_log::test]
	fn final_extension_wins() {
		assert_eq!(extension_of("a.tar.mp3").as_deref(), Some("mp3"));
		assert_eq!(extension_of("a.MP3").as_deref(), Some("mp3"));
		assert_eq!(extension_of("dir.d/track.flac").as_deref(), Some("flac"));
	}

	#[test_log::test]
	fn missing_extension() {
		assert_eq!(extension_of("noext"), None);
		assert_eq!(extension_of("trailing."), None);
		assert_eq!(extension_of("dir.d/noext"), None);
	}
}
