//! The file-provider capability consumed by the parsers
//!
//! Every parser touches file bytes exclusively through a [`FileProvider`],
//! which makes the I/O layer swappable: production code uses [`FsProvider`],
//! tests inject [`MemoryProvider`] fixtures.

use crate::error::Result;
use crate::macros::err;

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

/// The result of [`FileProvider::stat`]
#[derive(Copy, Clone, Debug)]
pub struct FileInfo {
	/// Whether the file exists
	pub exists: bool,
	/// The file's total size in bytes
	pub size: u64,
}

/// A random-access byte source addressed by URI
pub trait FileProvider {
	/// Report whether `uri` exists, and its size
	///
	/// # Errors
	///
	/// The underlying storage could not be queried
	fn stat(&self, uri: &str) -> Result<FileInfo>;

	/// Return the bytes `[offset, offset + length)` of `uri`
	///
	/// Exactly `length` bytes are returned unless the file ends first.
	///
	/// # Errors
	///
	/// The underlying read failed
	fn read(&self, uri: &str, length: u64, offset: u64) -> Result<Vec<u8>>;
}

/// A [`FileProvider`] over the local filesystem
#[derive(Copy, Clone, Debug, Default)]
pub struct FsProvider;

impl FileProvider for FsProvider {
	fn stat(&self, uri: &str) -> Result<FileInfo> {
		match std::fs::metadata(PathBuf::from(uri)) {
			Ok(metadata) => Ok(FileInfo {
				exists: true,
				size: metadata.len(),
			}),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileInfo {
				exists: false,
				size: 0,
			}),
			Err(e) => Err(e.into()),
		}
	}

	fn read(&self, uri: &str, length: u64, offset: u64) -> Result<Vec<u8>> {
		let mut file = File::open(PathBuf::from(uri))?;
		file.seek(SeekFrom::Start(offset))?;

		let mut bytes = Vec::new();
		file.take(length).read_to_end(&mut bytes)?;

		Ok(bytes)
	}
}

/// An in-memory [`FileProvider`] for tests and fixtures
#[derive(Clone, Debug, Default)]
pub struct MemoryProvider {
	files: HashMap<String, Vec<u8>>,
}

impl MemoryProvider {
	/// Create an empty provider
	pub fn new() -> Self {
		Self::default()
	}

	/// Register `bytes` under `uri`
	pub fn insert(&mut self, uri: impl Into<String>, bytes: Vec<u8>) {
		self.files.insert(uri.into(), bytes);
	}

	fn file(&self, uri: &str) -> Result<&[u8]> {
		match self.files.get(uri) {
			Some(bytes) => Ok(bytes),
			None => err!(FileMissing),
		}
	}
}

impl FileProvider for MemoryProvider {
	fn stat(&self, uri: &str) -> Result<FileInfo> {
		match self.files.get(uri) {
			Some(bytes) => Ok(FileInfo {
				exists: true,
				size: bytes.len() as u64,
			}),
			None => Ok(FileInfo {
				exists: false,
				size: 0,
			}),
		}
	}

	fn read(&self, uri: &str, length: u64, offset: u64) -> Result<Vec<u8>> {
		let bytes = self.file(uri)?;

		let start = std::cmp::min(offset as usize, bytes.len());
		let end = std::cmp::min(start.saturating_add(length as usize), bytes.len());

		Ok(bytes[start..end].to_vec())
	}
}
