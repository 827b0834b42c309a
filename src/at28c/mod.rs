//! Protocol for the Atmel/Microchip AT28C64 / AT28C256 parallel EEPROMs
//!
//! Byte write cycle (CE controlled by us, OE inactive):
//! - address and data on the bus
//! - WE low for tWP: address latched on the falling edge, data on the rising
//!   edge
//! - the chip then programs the byte internally (up to 10ms); while that runs
//!   every read returns I/O7 inverted ("DATA polling")
//!
//! Read cycle: address on the bus, CE low, OE low, wait tACC, sample.
//!
//! Software data protection (SDP) is toggled by writing magic bytes to two
//! magic addresses:
//! - enable: AA @ A, 55 @ B, A0 @ A
//! - disable: AA @ A, 55 @ B, 80 @ A, AA @ A, 55 @ B, 20 @ A
//!
//! With SDP enabled writes without the unlock prefix are ignored (the chip
//! still runs through the write timer, so DATA polling keeps working).

mod hardware;
mod low_level;
mod operations;
mod sim;

pub use self::hardware::{
	ControlLine,
	Direction,
	Hardware,
	reliable_sleep,
};

pub use self::low_level::{
	LowLevel,
	Selected,
};

pub use self::operations::{
	ERASED,
	Eeprom,
};

pub use self::sim::SimulatedChip;

#[cfg(test)]
mod tests;
