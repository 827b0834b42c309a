//! Destructive self test: the chip is split into six segments, each filled
//! with its own pattern and read back.

use std::fmt;

use crate::at28c::{
	Eeprom,
	Hardware,
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Pattern {
	WalkingOnes,
	AddressLow,
	Alternating,
	Zeros,
	Ones,
	InvertedAddressLow,
}

impl Pattern {
	pub const ALL: [Pattern; 6] = [
		Pattern::WalkingOnes,
		Pattern::AddressLow,
		Pattern::Alternating,
		Pattern::Zeros,
		Pattern::Ones,
		Pattern::InvertedAddressLow,
	];

	pub fn value(self, address: u16) -> u8 {
		match self {
			Pattern::WalkingOnes => 1 << (address & 7),
			Pattern::AddressLow => address as u8,
			Pattern::Alternating => if address & 1 == 0 { 0x55 } else { 0xaa },
			Pattern::Zeros => 0x00,
			Pattern::Ones => 0xff,
			Pattern::InvertedAddressLow => !(address as u8),
		}
	}

	pub fn name(self) -> &'static str {
		match self {
			Pattern::WalkingOnes => "walking ones",
			Pattern::AddressLow => "address low byte",
			Pattern::Alternating => "alternating 0x55/0xaa",
			Pattern::Zeros => "all zeros",
			Pattern::Ones => "all ones",
			Pattern::InvertedAddressLow => "inverted address low byte",
		}
	}
}

impl fmt::Display for Pattern {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// `[start, end)` of segment `index`; the last one takes the remainder.
pub fn segment(size: usize, index: usize) -> (usize, usize) {
	let len = size / Pattern::ALL.len();
	let start = index * len;
	let end = if index + 1 == Pattern::ALL.len() { size } else { start + len };
	(start, end)
}

/// Run the sweep over the whole chip; returns the number of cells that
/// didn't read back what was written.
pub fn run<H: Hardware>(eeprom: &mut Eeprom<H>) -> crate::AResult<u32> {
	let size = eeprom.chip().size();
	let mut errors = 0u32;

	for (index, &pattern) in Pattern::ALL.iter().enumerate() {
		let (start, end) = segment(size, index);
		info!("Testing 0x{:04x} - 0x{:04x}: {}", start, end - 1, pattern);

		let mut segment_errors = 0u32;
		for address in start..end {
			let address = address as u16;
			let data = pattern.value(address);
			eeprom.write_byte(address, data)?;
			if !eeprom.verify_byte(address, data)? {
				segment_errors += 1;
			}
		}
		if segment_errors != 0 {
			warn!("{}: {} errors", pattern, segment_errors);
		}
		errors += segment_errors;
	}

	info!("Test complete: {} errors", errors);
	Ok(errors)
}
