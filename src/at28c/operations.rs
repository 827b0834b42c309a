use crate::chip::Chip;

use super::{
	ControlLine,
	Direction,
	Hardware,
	low_level::{
		LowLevel,
		PROTECT_SETTLE,
	},
};

/// value read back for addresses beyond the chip
pub const ERASED: u8 = 0xff;

pub struct Eeprom<H: Hardware> {
	hardware: H,
	chip: Chip,
	poll_limit: Option<usize>,
}

impl<H: Hardware> Eeprom<H> {
	/// Bring up the bus and leave the chip in standby.
	///
	/// A transport failure here means nothing else is going to work either.
	pub fn open(mut hardware: H, chip: Chip) -> crate::AResult<Self> {
		with_context!(("initializing {} programmer", chip.name), {
			hardware.init()?;
			hardware.idle()
		})?;
		debug!("{} ready", chip);

		Ok(Eeprom {
			hardware,
			chip,
			poll_limit: None,
		})
	}

	pub fn chip(&self) -> &Chip {
		&self.chip
	}

	pub fn hardware(&mut self) -> &mut H {
		&mut self.hardware
	}

	pub fn into_hardware(self) -> H {
		self.hardware
	}

	/// Give up on a write after `limit` DATA polling reads; `None` waits
	/// forever.
	pub fn set_poll_limit(&mut self, limit: Option<usize>) {
		self.poll_limit = limit;
	}

	/// Write a byte and wait for the chip to finish programming it.
	///
	/// Addresses beyond the chip are ignored.
	pub fn write_byte(&mut self, address: u16, data: u8) -> crate::AResult<()> {
		if !self.chip.contains(address) {
			debug!("ignoring write to 0x{:04x}: beyond {}", address, self.chip.name);
			return Ok(());
		}

		self.hardware.write_cycle(address, data)?;
		let polls = self.hardware.await_write_complete(data, self.poll_limit).map_err(|e| {
			let msg = format!("write 0x{:02x} to 0x{:04x}: {}", data, address, e);
			failure::Error::from(e.context(msg))
		})?;
		trace!("wrote 0x{:02x} to 0x{:04x} ({} polls)", data, address, polls);

		Ok(())
	}

	/// Read a byte; addresses beyond the chip read as `ERASED`.
	pub fn read_byte(&mut self, address: u16) -> crate::AResult<u8> {
		if !self.chip.contains(address) {
			return Ok(ERASED);
		}

		self.hardware.read_cycle(address)
	}

	/// Compare a cell against `expected`; a mismatch gets logged, not raised.
	pub fn verify_byte(&mut self, address: u16, expected: u8) -> crate::AResult<bool> {
		let data = self.read_byte(address)?;
		if data != expected {
			warn!("Verification failed at 0x{:04x}: expected 0x{:02x}, read 0x{:02x}", address, expected, data);
			return Ok(false);
		}
		Ok(true)
	}

	/// Fill `[start, end)` with `pattern`, without verifying.
	pub fn erase_section(&mut self, start: u16, end: u16, pattern: u8) -> crate::AResult<()> {
		if start < end {
			info!("Erasing 0x{:04x} - 0x{:04x} with pattern 0x{:02x}", start, end - 1, pattern);
		}
		for address in start..end {
			self.write_byte(address, pattern)?;
			if address & 0x3ff == 0x3ff {
				debug!("erased up to 0x{:04x}", address);
			}
		}
		Ok(())
	}

	/// Toggle software data protection.
	///
	/// The command writes are plain write cycles; the chip doesn't do DATA
	/// polling for them, so we just wait for it to settle afterwards.
	pub fn write_protect(&mut self, enable: bool) -> crate::AResult<()> {
		info!("{} write protection on {}", if enable { "Enabling" } else { "Disabling" }, self.chip.name);
		let sequence = self.chip.sdp_sequence(enable);
		let hardware = &mut self.hardware;

		hardware.set_line(ControlLine::OutputEnable, false)?;
		hardware.set_line(ControlLine::WriteEnable, false)?;
		let mut selected = hardware.select()?;
		selected.set_bus_direction(Direction::Output)?;
		for &(address, command) in &sequence {
			selected.strobe(address, command)?;
		}
		selected.delay(PROTECT_SETTLE);
		selected.release()?;

		hardware.set_bus_direction(Direction::Input)
	}
}
