use std::path::PathBuf;

use linux_embedded_hal::{
	I2cdev,
	SysfsPin,
};

mod gpio;

pub use self::gpio::open_output;

use crate::chip::Chip;
use crate::mcp23017::{
	self,
	DirectLines,
	ExpanderBus,
};

/// Where the expander and the direct lines are found.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Wiring {
	pub i2c_device: PathBuf,
	pub expander_address: u8,
	pub write_enable: u32,
	pub output_enable: u32,
	pub chip_enable: u32,
	/// GPIO numbers for A8, A9, ...; only as many as the chip needs are used
	pub address_lines: Vec<u32>,
}

impl Default for Wiring {
	fn default() -> Self {
		Wiring {
			i2c_device: PathBuf::from("/dev/i2c-1"),
			expander_address: mcp23017::DEFAULT_ADDRESS,
			write_enable: 2,
			output_enable: 3,
			chip_enable: 4,
			address_lines: (5..12).collect(),
		}
	}
}

pub type LinuxBus = ExpanderBus<I2cdev, SysfsPin>;

pub fn open_bus(wiring: &Wiring, chip: &Chip) -> crate::AResult<LinuxBus> {
	let needed = chip.high_address_lines();
	ensure!(wiring.address_lines.len() >= needed,
		"{} needs {} direct address lines, only {} configured", chip.name, needed, wiring.address_lines.len()
	);

	let i2c = I2cdev::new(&wiring.i2c_device)
		.map_err(|e| format_err!("couldn't open I2C device {:?}: {}", wiring.i2c_device, e))?;

	// control lines are active-low: start them inactive
	let lines = DirectLines {
		write_enable: open_output(wiring.write_enable, true)?,
		output_enable: open_output(wiring.output_enable, true)?,
		chip_enable: open_output(wiring.chip_enable, true)?,
		address: wiring.address_lines[..needed]
			.iter()
			.map(|&number| open_output(number, false))
			.collect::<crate::AResult<Vec<_>>>()?,
	};

	Ok(ExpanderBus::new(i2c, wiring.expander_address, lines))
}
