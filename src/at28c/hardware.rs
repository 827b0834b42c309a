use std::thread;
use std::time::{
	Duration,
	Instant,
};

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

/// Direction of the 8-bit data bus, seen from the programmer
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Direction {
	/// released; the chip may drive it
	Input,
	/// driven by the programmer
	Output,
}

/// The three (active-low) control lines of the chip
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ControlLine {
	WriteEnable,
	OutputEnable,
	ChipEnable,
}

/// Signal-level access to an AT28C socket.
///
/// Control lines are addressed by their logical state: `active == true`
/// pulls the (active-low) pin down.
pub trait Hardware {
	/// Bring up the transport: address port and direct address lines become
	/// outputs. Called once before anything else.
	fn init(&mut self) -> crate::AResult<()> {
		Ok(())
	}

	/// put `address` on A0..An; bits beyond the chip's width are dropped
	fn set_address(&mut self, address: u16) -> crate::AResult<()>;

	fn set_bus_direction(&mut self, direction: Direction) -> crate::AResult<()>;

	// only meaningful with `Direction::Output`
	fn write_data(&mut self, data: u8) -> crate::AResult<()>;

	// only meaningful with `Direction::Input`
	fn read_data(&mut self) -> crate::AResult<u8>;

	fn set_line(&mut self, line: ControlLine, active: bool) -> crate::AResult<()>;

	// delay for (at least) `duration`
	fn delay(&mut self, duration: Duration) {
		reliable_sleep(duration);
	}
}

impl<'a, H: ?Sized + Hardware> Hardware for &'a mut H {
	fn init(&mut self) -> crate::AResult<()> {
		H::init(*self)
	}
	fn set_address(&mut self, address: u16) -> crate::AResult<()> {
		H::set_address(*self, address)
	}
	fn set_bus_direction(&mut self, direction: Direction) -> crate::AResult<()> {
		H::set_bus_direction(*self, direction)
	}
	fn write_data(&mut self, data: u8) -> crate::AResult<()> {
		H::write_data(*self, data)
	}
	fn read_data(&mut self) -> crate::AResult<u8> {
		H::read_data(*self)
	}
	fn set_line(&mut self, line: ControlLine, active: bool) -> crate::AResult<()> {
		H::set_line(*self, line, active)
	}
	fn delay(&mut self, duration: Duration) {
		H::delay(*self, duration)
	}
}
