use std::ops::{
	Deref,
	DerefMut,
};
use std::time::Duration;

use super::{
	ControlLine,
	Direction,
	Hardware,
};

// Datasheet minimums are in the 10ns - 100ns range; a microsecond is the
// finest resolution we can reliably sleep for anyway.
pub(super) const ADDRESS_SETUP: Duration = Duration::from_micros(1); // tAS
pub(super) const WRITE_PULSE: Duration = Duration::from_micros(1); // tWP, max 1000ns
pub(super) const DATA_HOLD: Duration = Duration::from_micros(1); // tDH
pub(super) const OUTPUT_ACCESS: Duration = Duration::from_micros(100); // tOE + tACC, generous
pub(super) const PROTECT_SETTLE: Duration = Duration::from_millis(10);

/// Chip enable is held active while this lives.
///
/// Dropping it (or calling `release`) deasserts OE and then CE, which brings
/// the chip back into standby.
pub struct Selected<'a, H: ?Sized + Hardware + 'a> {
	hardware: &'a mut H,
	released: bool,
}

impl<'a, H: ?Sized + Hardware> Selected<'a, H> {
	/// Like dropping, but reports transport errors.
	pub fn release(mut self) -> crate::AResult<()> {
		self.released = true;
		self.hardware.set_line(ControlLine::OutputEnable, false)?;
		self.hardware.set_line(ControlLine::ChipEnable, false)
	}

	// Present address and data, then pulse WE. The chip latches the address
	// on the falling and the data on the rising WE edge.
	//
	// Requires the bus to be driven by us and OE inactive.
	pub fn strobe(&mut self, address: u16, data: u8) -> crate::AResult<()> {
		self.hardware.set_address(address)?;
		self.hardware.write_data(data)?;
		self.pulse()
	}

	// WE pulse for whatever is already on the bus
	pub fn pulse(&mut self) -> crate::AResult<()> {
		self.hardware.delay(ADDRESS_SETUP);
		self.hardware.set_line(ControlLine::WriteEnable, true)?;
		self.hardware.delay(WRITE_PULSE);
		self.hardware.set_line(ControlLine::WriteEnable, false)?;
		self.hardware.delay(DATA_HOLD);
		Ok(())
	}
}

impl<'a, H: ?Sized + Hardware> Drop for Selected<'a, H> {
	fn drop(&mut self) {
		if !self.released {
			let _ = self.hardware.set_line(ControlLine::OutputEnable, false);
			let _ = self.hardware.set_line(ControlLine::ChipEnable, false);
		}
	}
}

impl<'a, H: ?Sized + Hardware> Deref for Selected<'a, H> {
	type Target = H;

	fn deref(&self) -> &Self::Target {
		&self.hardware
	}
}

impl<'a, H: ?Sized + Hardware> DerefMut for Selected<'a, H> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.hardware
	}
}

pub trait LowLevel: Hardware {
	// all control lines inactive, bus released
	fn idle(&mut self) -> crate::AResult<()> {
		self.set_line(ControlLine::WriteEnable, false)?;
		self.set_line(ControlLine::OutputEnable, false)?;
		self.set_line(ControlLine::ChipEnable, false)?;
		self.set_bus_direction(Direction::Input)
	}

	fn select(&mut self) -> crate::AResult<Selected<Self>> {
		self.set_line(ControlLine::ChipEnable, true)?;
		Ok(Selected {
			hardware: self,
			released: false,
		})
	}

	// one byte write cycle, without waiting for the chip to finish it
	fn write_cycle(&mut self, address: u16, data: u8) -> crate::AResult<()> {
		// OE must be inactive before we start driving the bus
		self.set_line(ControlLine::OutputEnable, false)?;
		self.set_line(ControlLine::WriteEnable, false)?;
		self.set_bus_direction(Direction::Output)?;
		self.set_address(address)?;
		self.write_data(data)?;

		let mut selected = self.select()?;
		selected.pulse()?;
		selected.release()
	}

	// While the internal write runs the chip outputs the complement of bit 7
	// of the byte being written (DATA polling); once it is done it outputs
	// the true data again.
	//
	// Returns the number of reads it took. With `limit` set this fails after
	// that many reads; without it a chip that never finishes hangs here.
	fn await_write_complete(&mut self, data: u8, limit: Option<usize>) -> crate::AResult<usize> {
		self.set_bus_direction(Direction::Input)?;
		self.set_line(ControlLine::WriteEnable, false)?;

		let mut selected = self.select()?;
		selected.set_line(ControlLine::OutputEnable, true)?;

		let expected = data & 0x80;
		let mut polls = 0usize;
		loop {
			polls += 1;
			if selected.read_data()? & 0x80 == expected {
				break;
			}
			if let Some(limit) = limit {
				ensure!(polls < limit, "write not completed after {} polls (I/O7 still inverted)", polls);
			}
		}

		selected.release()?;
		Ok(polls)
	}

	fn read_cycle(&mut self, address: u16) -> crate::AResult<u8> {
		self.set_address(address)?;
		self.set_bus_direction(Direction::Input)?;
		self.set_line(ControlLine::OutputEnable, false)?;
		self.set_line(ControlLine::WriteEnable, false)?;

		let mut selected = self.select()?;
		selected.delay(ADDRESS_SETUP);
		selected.set_line(ControlLine::OutputEnable, true)?;
		selected.delay(OUTPUT_ACCESS);
		let data = selected.read_data()?;
		selected.release()?;

		Ok(data)
	}
}

impl<H: Hardware + ?Sized> LowLevel for H {
}
