//! The streaming window reader shared by all parsers

use crate::error::Result;
use crate::macros::err;
use crate::provider::FileProvider;

// Declared region sizes come straight off the wire, so they are capped before
// anything is handed to the provider. Nothing this crate parses legitimately
// approaches this.
const MAX_REGION_SIZE: usize = 64 * 1024 * 1024;

/// A cursor over an in-memory byte window, refilled on demand from a [`FileProvider`]
///
/// One reader is bound to one URI. Every [`load`](WindowReader::load) replaces
/// the window wholesale, so a region must be fully consumed before the next
/// region is loaded. Peak memory is the size of the largest loaded region.
pub(crate) struct WindowReader<'a, P: FileProvider> {
	provider: &'a P,
	uri: &'a str,
	window: Vec<u8>,
	cursor: usize,
	file_size: u64,
	finished: bool,
}

impl<'a, P: FileProvider> WindowReader<'a, P> {
	/// Bind a reader to `uri`, resolving the file's size
	pub(crate) fn open(provider: &'a P, uri: &'a str) -> Result<Self> {
		let info = provider.stat(uri)?;

		if !info.exists {
			err!(FileMissing);
		}

		Ok(Self {
			provider,
			uri,
			window: Vec::new(),
			cursor: 0,
			file_size: info.size,
			finished: false,
		})
	}

	pub(crate) fn file_size(&self) -> u64 {
		self.file_size
	}

	/// Replace the window with bytes `[offset, offset + len)` of the file
	///
	/// The cursor is reset and the `finished` flag cleared. A short read is an
	/// error here: callers only load regions whose lengths they have decoded
	/// from the container itself.
	pub(crate) fn load(&mut self, offset: u64, len: usize) -> Result<()> {
		if len > MAX_REGION_SIZE {
			err!(FormatInvalid("Declared region size exceeds the sanity limit"));
		}

		log::trace!("Loading {len} bytes at offset {offset}");

		let window = self.provider.read(self.uri, len as u64, offset)?;
		if window.len() < len {
			return Err(std::io::Error::new(
				std::io::ErrorKind::UnexpectedEof,
				"File ended while more data was required",
			)
			.into());
		}

		self.window = window;
		self.cursor = 0;
		self.finished = false;

		Ok(())
	}

	pub(crate) fn position(&self) -> usize {
		self.cursor
	}

	pub(crate) fn remaining(&self) -> usize {
		self.window.len() - self.cursor
	}

	pub(crate) fn is_finished(&self) -> bool {
		self.finished
	}

	/// Returns up to `n` bytes from the cursor, advancing it
	///
	/// If fewer than `n` bytes remain, whatever remains is returned and the
	/// `finished` flag is set.
	pub(crate) fn take(&mut self, n: usize) -> &[u8] {
		let start = self.cursor;
		let end = std::cmp::min(start + n, self.window.len());

		if end - start < n {
			self.finished = true;
		}

		self.cursor = end;
		&self.window[start..end]
	}

	/// Returns the bytes up to and including the first NUL, advancing past it
	///
	/// If no NUL remains in the window, everything up to the window end is
	/// returned and the `finished` flag is set.
	pub(crate) fn read_until_nul(&mut self) -> &[u8] {
		let start = self.cursor;

		match self.window[start..].iter().position(|b| *b == 0) {
			Some(nul_pos) => {
				self.cursor = start + nul_pos + 1;
				&self.window[start..=start + nul_pos]
			},
			None => {
				self.cursor = self.window.len();
				self.finished = true;
				&self.window[start..]
			},
		}
	}

	/// Advance the cursor by `min(n, remaining)`
	pub(crate) fn skip(&mut self, n: usize) {
		self.cursor = std::cmp::min(self.cursor + n, self.window.len());
	}

	/// Borrow up to `len` bytes at the cursor without advancing
	pub(crate) fn peek(&self, len: usize) -> &[u8] {
		let end = std::cmp::min(self.cursor + len, self.window.len());
		&self.window[self.cursor..end]
	}

	/// Remove every zero byte that immediately follows `0xFF` within
	/// `[offset, offset + len)` of the window, in place
	///
	/// Returns the region's new length. Bytes before `offset` and after the
	/// region keep their positions; when the region reaches the window end the
	/// window is truncated to the new length, so stale bytes can never be
	/// re-read as content.
	pub(crate) fn unsynchronise(&mut self, offset: usize, len: usize) -> usize {
		let end = std::cmp::min(offset.saturating_add(len), self.window.len());
		let offset = std::cmp::min(offset, end);

		let mut write_pos = offset;
		let mut read_pos = offset;
		let mut encountered_ff = false;

		while read_pos < end {
			let byte = self.window[read_pos];
			read_pos += 1;

			// Only drop the zero when it completes a valid `FF 00` pair
			if encountered_ff && byte == 0 {
				encountered_ff = false;
				continue;
			}

			encountered_ff = byte == 0xFF;
			self.window[write_pos] = byte;
			write_pos += 1;
		}

		let new_len = write_pos - offset;

		if end == self.window.len() {
			self.window.truncate(write_pos);
		}

		new_len
	}
}

impl<P: FileProvider> std::io::Read for WindowReader<'_, P> {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		let available = self.window.len() - self.cursor;
		let count = std::cmp::min(buf.len(), available);

		buf[..count].copy_from_slice(&self.window[self.cursor..self.cursor + count]);
		self.cursor += count;

		if count < buf.len() {
			self.finished = true;
		}

		Ok(count)
	}
}
