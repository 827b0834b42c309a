//! Streaming Intel HEX decoder writing straight into the EEPROM
//!
//! Record format (one per line): `:BBAAAATTDD..DDCC`
//! - BB: byte count
//! - AAAA: address (big endian)
//! - TT: record type; only 00 (data) and 01 (end of file) are supported
//! - DD: data bytes
//! - CC: two's complement checksum over all bytes; ignored unless asked for
//!
//! An empty line ends the input as well.

use crate::at28c::{
	Eeprom,
	Hardware,
};

/// Longer lines are truncated (16 data bytes still fit).
pub const MAX_LINE_LENGTH: usize = 45;

// ":" + count + address + type + checksum
const MIN_RECORD_LENGTH: usize = 11;

pub const DATA: u8 = 0x00;
pub const END_OF_FILE: u8 = 0x01;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ChecksumPolicy {
	Ignore,
	Verify,
}

impl Default for ChecksumPolicy {
	fn default() -> Self {
		ChecksumPolicy::Ignore
	}
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Record {
	pub byte_count: u8,
	pub address: u16,
	pub record_type: u8,
	/// only decoded for data records (or when verifying the checksum)
	pub data: Vec<u8>,
}

fn hex_byte(line: &[u8], pos: usize) -> crate::AResult<u8> {
	let digit = |pos: usize| -> crate::AResult<u8> {
		let c = line[pos];
		match (c as char).to_digit(16) {
			Some(d) => Ok(d as u8),
			None => bail!("Invalid hex digit {:?} at position {}", c as char, pos),
		}
	};
	Ok(digit(pos)? << 4 | digit(pos + 1)?)
}

impl Record {
	/// Parse a line without its terminator.
	pub fn parse(line: &[u8], checksum: ChecksumPolicy) -> crate::AResult<Record> {
		ensure!(line.len() >= MIN_RECORD_LENGTH, "Line too short ({} characters)", line.len());
		ensure!(line[0] == b':', "Missing start character (:)");

		let byte_count = hex_byte(line, 1)?;
		let address = (hex_byte(line, 3)? as u16) << 8 | hex_byte(line, 5)? as u16;
		let record_type = hex_byte(line, 7)?;

		let mut data = Vec::new();
		if record_type == DATA || checksum == ChecksumPolicy::Verify {
			let end = 9 + 2 * byte_count as usize;
			ensure!(line.len() >= end,
				"Line truncated: {} data bytes need {} characters, got {}", byte_count, end, line.len()
			);
			for i in 0..byte_count as usize {
				data.push(hex_byte(line, 9 + 2 * i)?);
			}
		}

		if checksum == ChecksumPolicy::Verify {
			let pos = 9 + 2 * byte_count as usize;
			ensure!(line.len() >= pos + 2, "Missing checksum");
			let expected = hex_byte(line, pos)?;
			let sum = [byte_count, (address >> 8) as u8, address as u8, record_type]
				.iter()
				.chain(data.iter())
				.fold(0u8, |sum, b| sum.wrapping_add(*b));
			let computed = sum.wrapping_neg();
			ensure!(computed == expected, "Checksum mismatch: line says 0x{:02x}, computed 0x{:02x}", expected, computed);
		}

		Ok(Record {
			byte_count,
			address,
			record_type,
			data,
		})
	}
}

/// Result of decoding one line
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum LineStatus {
	Ok,
	Error,
	End,
}

/// Result of feeding one character
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FeedStatus {
	Continue,
	Error,
	End,
}

impl From<LineStatus> for FeedStatus {
	fn from(status: LineStatus) -> Self {
		match status {
			LineStatus::Ok => FeedStatus::Continue,
			LineStatus::Error => FeedStatus::Error,
			LineStatus::End => FeedStatus::End,
		}
	}
}

#[derive(Debug)]
pub struct HexDecoder {
	buffer: Vec<u8>,
	checksum: ChecksumPolicy,
	ended: bool,
}

impl Default for HexDecoder {
	fn default() -> Self {
		HexDecoder::new(ChecksumPolicy::default())
	}
}

impl HexDecoder {
	pub fn new(checksum: ChecksumPolicy) -> Self {
		HexDecoder {
			buffer: Vec::with_capacity(MAX_LINE_LENGTH),
			checksum,
			ended: false,
		}
	}

	/// Start a new session.
	pub fn reset(&mut self) {
		self.buffer.clear();
		self.ended = false;
	}

	/// Whether the session saw its end; nothing more is processed until
	/// `reset`.
	pub fn is_ended(&self) -> bool {
		self.ended
	}

	pub fn feed_char<H: Hardware>(&mut self, c: u8, eeprom: &mut Eeprom<H>) -> crate::AResult<FeedStatus> {
		if self.ended {
			return Ok(FeedStatus::End);
		}

		match c {
			b'\r' => Ok(FeedStatus::Continue),
			b'\n' => {
				if self.buffer.is_empty() {
					self.ended = true;
					return Ok(FeedStatus::End);
				}
				let line = std::mem::replace(&mut self.buffer, Vec::with_capacity(MAX_LINE_LENGTH));
				let status = self.decode(&line, eeprom)?;
				if status == LineStatus::End {
					self.ended = true;
				}
				Ok(status.into())
			},
			c => {
				if self.buffer.len() < MAX_LINE_LENGTH {
					self.buffer.push(c);
				}
				Ok(FeedStatus::Continue)
			},
		}
	}

	/// Decode one line and program its data, verifying every byte right
	/// after writing it.
	///
	/// Only transport failures are errors; bad records and failed
	/// verification are reported and give `LineStatus::Error`.
	pub fn decode<H: Hardware>(&self, line: &[u8], eeprom: &mut Eeprom<H>) -> crate::AResult<LineStatus> {
		let record = match Record::parse(line, self.checksum) {
			Ok(record) => record,
			Err(e) => {
				warn!("Error processing hex line {:?}: {}", String::from_utf8_lossy(line), e);
				return Ok(LineStatus::Error);
			},
		};

		match record.record_type {
			DATA => {
				debug!("Data record: address 0x{:04x}, {} bytes", record.address, record.byte_count);
				for (i, &data) in record.data.iter().enumerate() {
					let address = record.address.wrapping_add(i as u16);
					eeprom.write_byte(address, data)?;
					if !eeprom.verify_byte(address, data)? {
						return Ok(LineStatus::Error);
					}
				}
				Ok(LineStatus::Ok)
			},
			END_OF_FILE => {
				info!("Hex input complete");
				Ok(LineStatus::End)
			},
			other => {
				warn!("Unsupported record type: 0x{:02x}", other);
				Ok(LineStatus::Error)
			},
		}
	}
}
