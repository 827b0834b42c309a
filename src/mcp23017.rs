//! MCP23017 16-bit I/O expander (I²C), in its power-on `IOCON.BANK = 0`
//! register layout.
//!
//! Wiring used by the programmer:
//! - port A (GPA0..7): data bus D0..D7, switched between input and output
//! - port B (GPB0..7): address lines A0..A7, always output
//!
//! The remaining address lines and the three control lines are direct GPIO
//! outputs.

use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;

use crate::at28c::{
	ControlLine,
	Direction,
	Hardware,
};

#[allow(dead_code)]
mod consts {
	// default I²C address: A0..A2 pins tied to ground
	pub const DEFAULT_ADDRESS: u8 = 0x20;

	pub const IODIRA: u8 = 0x00; // bit set = input
	pub const IODIRB: u8 = 0x01;
	pub const GPIOA: u8 = 0x12;
	pub const GPIOB: u8 = 0x13;
}

pub use self::consts::DEFAULT_ADDRESS;
use self::consts::*;

/// The direct lines, all active-low control lines start out high (inactive).
pub struct DirectLines<P: OutputPin> {
	pub write_enable: P,
	pub output_enable: P,
	pub chip_enable: P,
	/// A8 upwards
	pub address: Vec<P>,
}

pub struct ExpanderBus<I: I2c, P: OutputPin> {
	i2c: I,
	address: u8,
	lines: DirectLines<P>,
}

fn set_pin<P: OutputPin>(pin: &mut P, name: &str, high: bool) -> crate::AResult<()> {
	let res = if high { pin.set_high() } else { pin.set_low() };
	res.map_err(|e| format_err!("couldn't set {} {}: {:?}", name, if high { "high" } else { "low" }, e))
}

impl<I: I2c, P: OutputPin> ExpanderBus<I, P> {
	pub fn new(i2c: I, address: u8, lines: DirectLines<P>) -> Self {
		ExpanderBus {
			i2c,
			address,
			lines,
		}
	}

	pub fn i2c(&mut self) -> &mut I {
		&mut self.i2c
	}

	fn write_register(&mut self, register: u8, value: u8) -> crate::AResult<()> {
		let address = self.address;
		self.i2c.write(address, &[register, value]).map_err(|e| {
			format_err!("I2C 0x{:02x}: write 0x{:02x} to register 0x{:02x}: {:?}", address, value, register, e)
		})
	}

	fn read_register(&mut self, register: u8) -> crate::AResult<u8> {
		let address = self.address;
		let mut buf = [0u8];
		self.i2c.write_read(address, &[register], &mut buf).map_err(|e| {
			format_err!("I2C 0x{:02x}: read register 0x{:02x}: {:?}", address, register, e)
		})?;
		Ok(buf[0])
	}
}

impl<I: I2c, P: OutputPin> Hardware for ExpanderBus<I, P> {
	fn init(&mut self) -> crate::AResult<()> {
		// fails here without an ACK from the expander
		let _ = self.read_register(IODIRB)?;
		self.write_register(IODIRB, 0x00)
	}

	fn set_address(&mut self, address: u16) -> crate::AResult<()> {
		self.write_register(GPIOB, address as u8)?;
		for (bit, pin) in self.lines.address.iter_mut().enumerate() {
			set_pin(pin, "address line", 0 != (address >> (8 + bit)) & 1)?;
		}
		Ok(())
	}

	fn set_bus_direction(&mut self, direction: Direction) -> crate::AResult<()> {
		let iodir = match direction {
			Direction::Input => 0xff,
			Direction::Output => 0x00,
		};
		self.write_register(IODIRA, iodir)
	}

	fn write_data(&mut self, data: u8) -> crate::AResult<()> {
		self.write_register(GPIOA, data)
	}

	fn read_data(&mut self) -> crate::AResult<u8> {
		self.read_register(GPIOA)
	}

	fn set_line(&mut self, line: ControlLine, active: bool) -> crate::AResult<()> {
		let (pin, name) = match line {
			ControlLine::WriteEnable => (&mut self.lines.write_enable, "WE"),
			ControlLine::OutputEnable => (&mut self.lines.output_enable, "OE"),
			ControlLine::ChipEnable => (&mut self.lines.chip_enable, "CE"),
		};
		set_pin(pin, name, !active)
	}
}
