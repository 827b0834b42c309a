use std::fmt;
use std::str;

/// Supported members of the AT28C family.
///
/// They only differ in address width and in the addresses the software data
/// protection commands have to be written to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Chip {
	pub name: &'static str,
	pub address_bits: u8,
	/// (first, second) command address of the SDP sequences
	pub sdp_addresses: (u16, u16),
}

impl Chip {
	pub const AT28C64: Chip = Chip {
		name: "AT28C64",
		address_bits: 13,
		sdp_addresses: (0x1555, 0x0aaa),
	};

	pub const AT28C256: Chip = Chip {
		name: "AT28C256",
		address_bits: 15,
		sdp_addresses: (0x5555, 0x2aaa),
	};

	/// number of cells
	pub fn size(&self) -> usize {
		1usize << self.address_bits
	}

	pub fn contains(&self, address: u16) -> bool {
		(address as usize) < self.size()
	}

	/// number of address lines above A7 (driven directly, not by the expander)
	pub fn high_address_lines(&self) -> usize {
		self.address_bits as usize - 8
	}

	/// Command sequence toggling software data protection.
	///
	/// Disabling is the enable prefix followed by the disable code, then the
	/// prefix again with the terminal `0x20`.
	pub fn sdp_sequence(&self, enable: bool) -> Vec<(u16, u8)> {
		let (a, b) = self.sdp_addresses;
		if enable {
			vec![(a, 0xaa), (b, 0x55), (a, 0xa0)]
		} else {
			vec![(a, 0xaa), (b, 0x55), (a, 0x80), (a, 0xaa), (b, 0x55), (a, 0x20)]
		}
	}
}

impl Default for Chip {
	fn default() -> Self {
		Chip::AT28C64
	}
}

impl fmt::Display for Chip {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{} ({} bytes)", self.name, self.size())
	}
}

impl str::FromStr for Chip {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"64" | "at28c64" => Ok(Chip::AT28C64),
			"256" | "at28c256" => Ok(Chip::AT28C256),
			_ => bail!("unknown chip {:?} (expected at28c64 or at28c256)", s),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn presets() {
		assert_eq!(Chip::AT28C64.size(), 8192);
		assert_eq!(Chip::AT28C256.size(), 32768);
		assert_eq!(Chip::AT28C64.high_address_lines(), 5);
		assert_eq!(Chip::AT28C256.high_address_lines(), 7);
		assert!(Chip::AT28C64.contains(0x1fff));
		assert!(!Chip::AT28C64.contains(0x2000));
		assert!(Chip::AT28C256.contains(0x7fff));
		assert!(!Chip::AT28C256.contains(0x8000));
	}

	#[test]
	fn parse() {
		assert_eq!("64".parse::<Chip>().unwrap(), Chip::AT28C64);
		assert_eq!("AT28C256".parse::<Chip>().unwrap(), Chip::AT28C256);
		assert!("28c16".parse::<Chip>().is_err());
	}

	#[test]
	fn sdp_sequences() {
		let chip = Chip::AT28C256;
		assert_eq!(chip.sdp_sequence(true), vec![(0x5555, 0xaa), (0x2aaa, 0x55), (0x5555, 0xa0)]);
		let disable = chip.sdp_sequence(false);
		assert_eq!(disable.len(), 6);
		assert_eq!(disable[2], (0x5555, 0x80));
		assert_eq!(disable[5], (0x5555, 0x20));
		assert_eq!(Chip::AT28C64.sdp_sequence(true)[1], (0x0aaa, 0x55));
	}
}
