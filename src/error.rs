//! Contains the errors that can arise within tagprobe
//!
//! The primary error is [`ProbeError`]. The type of error is determined by [`ErrorKind`].

use std::fmt::{Debug, Display, Formatter};

/// Alias for `Result<T, ProbeError>`
pub type Result<T> = std::result::Result<T, ProbeError>;

/// The types of errors that can occur
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
	/// The file provider reported that the file does not exist
	FileMissing,
	/// A provider read failed, or the file ended where more data was required
	Io(std::io::Error),
	/// The file's extension does not belong to a supported container
	UnsupportedFile(String),
	/// A container magic number or structural invariant did not hold
	FormatInvalid(&'static str),
	/// An ID3v2 major version outside 2..=4, or a compressed ID3v2.2 tag
	///
	/// At the time the ID3v2.2 specification was written, a compression scheme
	/// wasn't decided. The spec recommends ignoring the tag entirely.
	UnsupportedVersion(&'static str),
	/// The tag-level unsynchronisation flag is set, but a frame's flag is not
	Inconsistency(&'static str),
}

/// Errors that could occur within tagprobe
pub struct ProbeError {
	pub(crate) kind: ErrorKind,
}

impl ProbeError {
	/// Create a `ProbeError` from an [`ErrorKind`]
	#[must_use]
	pub const fn new(kind: ErrorKind) -> Self {
		Self { kind }
	}

	/// Returns the [`ErrorKind`]
	pub fn kind(&self) -> &ErrorKind {
		&self.kind
	}
}

impl std::error::Error for ProbeError {}

impl Debug for ProbeError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:?}", self.kind)
	}
}

impl Display for ProbeError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self.kind {
			ErrorKind::FileMissing => write!(f, "The file does not exist"),
			ErrorKind::Io(ref err) => write!(f, "{err}"),
			ErrorKind::UnsupportedFile(ref ext) => {
				write!(f, "Unsupported file extension: \"{ext}\"")
			},
			ErrorKind::FormatInvalid(message) => write!(f, "{message}"),
			ErrorKind::UnsupportedVersion(message) => write!(f, "{message}"),
			ErrorKind::Inconsistency(message) => write!(f, "{message}"),
		}
	}
}

impl From<std::io::Error> for ProbeError {
	fn from(input: std::io::Error) -> Self {
		Self {
			kind: ErrorKind::Io(input),
		}
	}
}
