//! Read a small, fixed set of tags (album, album artist, artist, title,
//! track number, release year, and embedded cover art) from audio files.
//!
//! # Supported containers
//!
//! | Container | Tag dialects |
//! |-----------|--------------|
//! | FLAC | Vorbis comments, PICTURE blocks |
//! | MP3 | ID3v1, ID3v1.1, ID3v2.2 / 2.3 / 2.4 |
//! | MP4 / M4A | iTunes-style `moov.udta.meta.ilst` |
//!
//! File bytes are pulled through a [`FileProvider`](provider::FileProvider),
//! a small stat + positioned-read capability, so the same parsers run over
//! the local filesystem, an in-memory fixture, or any other byte source. The
//! parsers load one bounded region at a time (a tag, a block, an atom) and
//! stop as soon as every requested tag has been seen, so even artwork-sized
//! files are never buffered whole.
//!
//! # Examples
//!
//! ```rust,no_run
//! use tagprobe::{extract_from_path, TagKey};
//!
//! # fn main() -> tagprobe::error::Result<()> {
//! let tagged = extract_from_path(
//! 	"music/silence.flac",
//! 	&[TagKey::Album, TagKey::Artist, TagKey::Artwork],
//! )?;
//!
//! assert_eq!(tagged.file_type().as_str(), "flac");
//!
//! // Every requested key is present in the output; keys the file does not
//! // carry map to `None`
//! for (key, value) in tagged.metadata() {
//! 	println!("{key}: {value:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub(crate) mod macros;
pub mod probe;
pub mod provider;
pub mod tag;

mod reader;
mod util;

mod flac;
mod id3;
mod mp4;

pub use probe::{extract, extract_from_path};
pub use tag::{FileKind, TagKey, TagValue, TaggedAudio};

pub use util::bytes::{base64_decode, base64_encode};
pub use util::text::TextEncoding;
