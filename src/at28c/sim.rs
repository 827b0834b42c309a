use std::collections::HashMap;
use std::mem;
use std::time::Duration;

use crate::chip::Chip;

use super::{
	ControlLine,
	Direction,
	Hardware,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Busy {
	data: u8,
	remaining: usize,
}

/// Signal-level model of an AT28C chip sitting on the bus.
///
/// - a write is latched on the rising WE edge while CE is active and OE
///   isn't
/// - after a write the next `busy_polls` reads report bit 7 inverted
/// - SDP command sequences toggle protection; while protected, writes go
///   through the motions (including the busy period) but don't change memory
///
/// Time doesn't pass: `delay` returns immediately and the busy period is
/// counted in reads.
pub struct SimulatedChip {
	chip: Chip,
	memory: Vec<u8>,
	address: u16,
	latch: u8,
	direction: Direction,
	write_enable: bool,
	output_enable: bool,
	chip_enable: bool,
	busy_polls: usize,
	busy: Option<Busy>,
	protected: bool,
	// writes that so far look like the start of an SDP command
	pending: Vec<(u16, u8)>,
	// address -> (mask, value): bits in `mask` always store as in `value`
	faults: HashMap<u16, (u8, u8)>,
	contention: usize,
	programmed: usize,
}

impl SimulatedChip {
	/// A blank (all `0xff`) chip that finishes each write after three polls.
	pub fn new(chip: Chip) -> Self {
		SimulatedChip {
			chip,
			memory: vec![0xff; chip.size()],
			address: 0,
			latch: 0,
			direction: Direction::Input,
			write_enable: false,
			output_enable: false,
			chip_enable: false,
			busy_polls: 3,
			busy: None,
			protected: false,
			pending: Vec::new(),
			faults: HashMap::new(),
			contention: 0,
			programmed: 0,
		}
	}

	pub fn with_busy_polls(mut self, busy_polls: usize) -> Self {
		self.busy_polls = busy_polls;
		self
	}

	pub fn chip(&self) -> &Chip {
		&self.chip
	}

	pub fn memory(&self) -> &[u8] {
		&self.memory
	}

	/// Preload memory, bypassing the bus and protection.
	pub fn load(&mut self, offset: usize, data: &[u8]) {
		self.memory[offset..offset + data.len()].copy_from_slice(data);
	}

	pub fn is_protected(&self) -> bool {
		self.protected
	}

	pub fn set_protected(&mut self, protected: bool) {
		self.protected = protected;
	}

	/// Make the bits in `mask` at `address` stuck at their value in `value`.
	pub fn stick_bits(&mut self, address: u16, mask: u8, value: u8) {
		self.faults.insert(address, (mask, value & mask));
	}

	/// How often both sides drove the data bus at the same time.
	pub fn contention(&self) -> usize {
		self.contention
	}

	/// Number of write cycles that reached the memory array (blocked writes
	/// don't count).
	pub fn programmed(&self) -> usize {
		self.programmed
	}

	fn chip_outputs(&self) -> bool {
		self.chip_enable && self.output_enable && !self.write_enable
	}

	fn check_contention(&mut self) {
		if self.direction == Direction::Output && self.chip_outputs() {
			self.contention += 1;
		}
	}

	fn bus_value(&self) -> u8 {
		match self.direction {
			Direction::Output => self.latch,
			Direction::Input => 0xff, // pull-ups
		}
	}

	fn program(&mut self, address: u16, data: u8) {
		self.busy = Some(Busy {
			data,
			remaining: self.busy_polls,
		});
		if self.protected {
			return;
		}
		let data = match self.faults.get(&address) {
			Some(&(mask, value)) => (data & !mask) | value,
			None => data,
		};
		self.memory[address as usize] = data;
		self.programmed += 1;
	}

	// a command sequence is broken by any other access: commit what we held
	fn flush_pending(&mut self) {
		for (address, data) in mem::replace(&mut self.pending, Vec::new()) {
			self.program(address, data);
		}
	}

	fn latch_write(&mut self, address: u16, data: u8) {
		let enable = self.chip.sdp_sequence(true);
		let disable = self.chip.sdp_sequence(false);

		let mut candidate = self.pending.clone();
		candidate.push((address, data));
		if candidate == enable {
			self.pending.clear();
			self.protected = true;
			return;
		}
		if candidate == disable {
			self.pending.clear();
			self.protected = false;
			return;
		}
		if enable.starts_with(&candidate) || disable.starts_with(&candidate) {
			self.pending = candidate;
			return;
		}

		self.flush_pending();
		if enable[0] == (address, data) {
			self.pending.push((address, data));
		} else {
			self.program(address, data);
		}
	}

	fn output(&mut self) -> u8 {
		self.flush_pending();
		let cell = self.memory[self.address as usize];
		if let Some(busy) = self.busy.as_mut() {
			if busy.remaining > 0 {
				busy.remaining -= 1;
				return (!busy.data & 0x80) | (cell & 0x7f);
			}
		}
		self.busy = None;
		cell
	}
}

impl Hardware for SimulatedChip {
	fn set_address(&mut self, address: u16) -> crate::AResult<()> {
		self.address = address & (self.chip.size() - 1) as u16;
		Ok(())
	}

	fn set_bus_direction(&mut self, direction: Direction) -> crate::AResult<()> {
		self.direction = direction;
		self.check_contention();
		Ok(())
	}

	fn write_data(&mut self, data: u8) -> crate::AResult<()> {
		self.latch = data;
		Ok(())
	}

	fn read_data(&mut self) -> crate::AResult<u8> {
		if self.chip_outputs() {
			// with contention the result is garbage anyway
			Ok(self.output())
		} else {
			Ok(self.bus_value())
		}
	}

	fn set_line(&mut self, line: ControlLine, active: bool) -> crate::AResult<()> {
		match line {
			ControlLine::WriteEnable => {
				let rising_edge = self.write_enable && !active;
				self.write_enable = active;
				if rising_edge && self.chip_enable && !self.output_enable {
					let data = self.bus_value();
					self.latch_write(self.address, data);
				}
			},
			ControlLine::OutputEnable => self.output_enable = active,
			ControlLine::ChipEnable => self.chip_enable = active,
		}
		self.check_contention();
		Ok(())
	}

	fn delay(&mut self, _duration: Duration) {
	}
}
