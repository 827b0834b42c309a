//! Interactive single-character command loop over any byte stream.
//!
//! Each command is one character (case doesn't matter); a line end right
//! after it is swallowed, so line-buffered terminals work as well as raw
//! ones. Values are entered as hex and confirmed with Enter.

use std::io::{
	self,
	Read,
	Write,
};

use crate::at28c::{
	Eeprom,
	Hardware,
	ERASED,
};
use crate::intel_hex::{
	ChecksumPolicy,
	FeedStatus,
	HexDecoder,
};
use crate::rom;
use crate::sweep;

const ROW_LENGTH: usize = 16;
const ROWS_PER_PAGE: usize = 10;

const HELP: &str = "
Commands:
 E - Erase EEPROM
 T - Full EEPROM test
 D - Dump EEPROM contents
 W - Write Intel HEX data to EEPROM
 R - Write default ROM image
 C - Check default ROM image
 X - Enable write protection
 S - Disable write protection
 ? - Help
";

/// Print `data` as one dump row starting at `address`.
pub fn write_row<W: Write>(output: &mut W, address: usize, data: &[u8]) -> io::Result<()> {
	write!(output, "{:04X}:", address)?;
	for b in data {
		write!(output, " {:02X}", b)?;
	}
	writeln!(output)
}

/// Dump `[start, end)` in rows of 16 bytes.
pub fn dump<H: Hardware, W: Write>(eeprom: &mut Eeprom<H>, output: &mut W, start: u16, end: u16) -> crate::AResult<()> {
	let mut row = Vec::with_capacity(ROW_LENGTH);
	let mut address = start as usize;
	while address < end as usize {
		let row_end = std::cmp::min(address + ROW_LENGTH, end as usize);
		row.clear();
		for a in address..row_end {
			row.push(eeprom.read_byte(a as u16)?);
		}
		write_row(output, address, &row)?;
		address = row_end;
	}
	Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum LineEnd {
	Keep,
	SkipAny,
	// CR seen, LF may follow
	SkipLf,
}

pub struct Console<R: Read, W: Write> {
	input: R,
	output: W,
	line_end: LineEnd,
	image: Vec<u8>,
	checksum: ChecksumPolicy,
	errors: u32,
}

impl<R: Read, W: Write> Console<R, W> {
	pub fn new(input: R, output: W) -> Self {
		Console {
			input,
			output,
			line_end: LineEnd::Keep,
			image: rom::IMAGE.to_vec(),
			checksum: ChecksumPolicy::default(),
			errors: 0,
		}
	}

	/// Image used by the `R` and `C` commands.
	pub fn set_image(&mut self, image: Vec<u8>) {
		self.image = image;
	}

	pub fn set_checksum_policy(&mut self, checksum: ChecksumPolicy) {
		self.checksum = checksum;
	}

	pub fn into_output(self) -> W {
		self.output
	}

	/// Process commands until the input ends.
	///
	/// Returns the number of errors counted along the way (failed
	/// verification, rejected HEX records).
	pub fn run<H: Hardware>(&mut self, eeprom: &mut Eeprom<H>) -> crate::AResult<u32> {
		writeln!(self.output, "Selected chip: {}", eeprom.chip())?;
		self.help()?;

		while let Some(c) = self.next_char()? {
			match c.to_ascii_uppercase() {
				b'\r' | b'\n' => {
					write!(self.output, "\n>")?;
					self.output.flush()?;
					continue;
				},
				b'?' => (),
				b'E' => {
					self.skip_line_end();
					self.erase(eeprom)?;
				},
				b'T' => {
					self.skip_line_end();
					let errors = sweep::run(eeprom)?;
					writeln!(self.output, "\nTest complete: {} errors", errors)?;
					self.errors += errors;
				},
				b'D' => {
					self.skip_line_end();
					self.dump(eeprom)?;
				},
				b'W' => {
					self.skip_line_end();
					self.hex_write(eeprom)?;
				},
				b'R' => {
					self.skip_line_end();
					let errors = rom::write_image(eeprom, &self.image)?;
					if errors == 0 {
						writeln!(self.output, "\nROM written correctly")?;
					} else {
						writeln!(self.output, "\nVerification failed with {} errors", errors)?;
					}
					self.errors += errors;
				},
				b'C' => {
					self.skip_line_end();
					let errors = rom::check_image(eeprom, &self.image)?;
					writeln!(self.output, "\nCheck complete: {} errors", errors)?;
					self.errors += errors;
				},
				b'X' | b'S' => {
					self.skip_line_end();
					let enable = c.to_ascii_uppercase() == b'X';
					writeln!(self.output, "\nWrite protection: {}", if enable { "enable..." } else { "disable..." })?;
					eeprom.write_protect(enable)?;
					writeln!(self.output, "Done.")?;
				},
				_ => {
					write!(self.output, "\nUnknown command. Type ? for help.\n>")?;
					self.output.flush()?;
					continue;
				},
			}
			self.help()?;
		}

		Ok(self.errors)
	}

	fn help(&mut self) -> crate::AResult<()> {
		write!(self.output, "{}\n>", HELP)?;
		self.output.flush()?;
		Ok(())
	}

	fn read_byte(&mut self) -> crate::AResult<Option<u8>> {
		let mut buf = [0u8];
		loop {
			match self.input.read(&mut buf) {
				Ok(0) => return Ok(None),
				Ok(_) => return Ok(Some(buf[0])),
				Err(ref e) if e.kind() == io::ErrorKind::Interrupted => (),
				Err(e) => return Err(e.into()),
			}
		}
	}

	fn next_char(&mut self) -> crate::AResult<Option<u8>> {
		loop {
			let c = self.read_byte()?;
			match (self.line_end, c) {
				(LineEnd::SkipAny, Some(b'\r')) => self.line_end = LineEnd::SkipLf,
				(LineEnd::SkipAny, Some(b'\n')) | (LineEnd::SkipLf, Some(b'\n')) => self.line_end = LineEnd::Keep,
				_ => {
					self.line_end = LineEnd::Keep;
					return Ok(c);
				},
			}
		}
	}

	// the line end following a command or answer is dropped when it shows up
	fn skip_line_end(&mut self) {
		self.line_end = LineEnd::SkipAny;
	}

	/// Prompt for a hex value; only the last `digits` digits typed count.
	///
	/// `None` if the input ended before Enter.
	fn read_hex(&mut self, label: &str, digits: usize, empty: u32) -> crate::AResult<Option<u32>> {
		write!(self.output, "\n{}: ", label)?;
		self.output.flush()?;

		let mut typed: Vec<u32> = Vec::with_capacity(digits);
		loop {
			let c = match self.next_char()? {
				None => return Ok(None),
				Some(c) => c,
			};
			match c {
				b'\r' | b'\n' => {
					if c == b'\r' {
						self.line_end = LineEnd::SkipLf;
					}
					break;
				},
				c => if let Some(d) = (c as char).to_digit(16) {
					if typed.len() == digits {
						typed.remove(0);
					}
					typed.push(d);
				},
			}
		}

		if typed.is_empty() {
			return Ok(Some(empty));
		}
		Ok(Some(typed.iter().fold(0, |value, &d| value << 4 | d)))
	}

	fn erase<H: Hardware>(&mut self, eeprom: &mut Eeprom<H>) -> crate::AResult<()> {
		let size = eeprom.chip().size() as u32;
		let start = match self.read_hex("Start", 4, 0)? {
			Some(v) => v % size,
			None => return Ok(()),
		};
		// applied after the modulo, so typing the chip size works too
		let end = match self.read_hex("End", 4, 0)?.map(|v| v % size) {
			Some(0) => size,
			Some(v) => v,
			None => return Ok(()),
		};
		let pattern = match self.read_hex("Pattern", 2, ERASED as u32)? {
			Some(v) => v as u8,
			None => return Ok(()),
		};
		writeln!(self.output)?;

		eeprom.erase_section(start as u16, end as u16, pattern)
	}

	fn dump<H: Hardware>(&mut self, eeprom: &mut Eeprom<H>) -> crate::AResult<()> {
		let size = eeprom.chip().size();
		let start = match self.read_hex("Addr", 4, 0)? {
			Some(v) => v as usize % size,
			None => return Ok(()),
		};
		writeln!(self.output)?;

		let mut rows = 0;
		let mut row = Vec::with_capacity(ROW_LENGTH);
		let mut address = start;
		while address < size {
			if rows == ROWS_PER_PAGE {
				write!(self.output, "Press SPACE to continue, Q to quit...")?;
				self.output.flush()?;
				loop {
					match self.next_char()?.map(|c| c.to_ascii_uppercase()) {
						None | Some(b'Q') => {
							self.skip_line_end();
							writeln!(self.output)?;
							return Ok(());
						},
						Some(b' ') => break,
						Some(_) => (),
					}
				}
				self.skip_line_end();
				writeln!(self.output)?;
				rows = 0;
			}

			let row_end = std::cmp::min(address + ROW_LENGTH, size);
			row.clear();
			for a in address..row_end {
				row.push(eeprom.read_byte(a as u16)?);
			}
			write_row(&mut self.output, address, &row)?;
			rows += 1;
			address = row_end;
		}
		Ok(())
	}

	fn hex_write<H: Hardware>(&mut self, eeprom: &mut Eeprom<H>) -> crate::AResult<()> {
		writeln!(self.output, "\nEnter Intel HEX data (finish with empty line):")?;
		self.output.flush()?;

		let mut decoder = HexDecoder::new(self.checksum);
		let mut errors = 0u32;
		while let Some(c) = self.next_char()? {
			match decoder.feed_char(c, eeprom)? {
				FeedStatus::Continue => (),
				FeedStatus::Error => {
					errors += 1;
					writeln!(self.output, "Error in line, see log")?;
				},
				FeedStatus::End => break,
			}
		}
		writeln!(self.output, "Hex input done: {} errors", errors)?;
		self.errors += errors;
		Ok(())
	}
}
