use proptest::prelude::*;

use crate::chip::Chip;

use super::*;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Event {
	// CE going active, with what was on the bus at that point
	Select(u16, u8),
	Strobe(u16, u8),
	Read(u8),
}

// Records what a chip would see; answers reads with the last byte strobed
// (i.e. a chip that finishes writes instantly).
struct Recorder {
	address: u16,
	latch: u8,
	last: u8,
	direction: Direction,
	we: bool,
	oe: bool,
	ce: bool,
	events: Vec<Event>,
}

impl Recorder {
	fn new() -> Self {
		Recorder {
			address: 0,
			latch: 0,
			last: 0xff,
			direction: Direction::Input,
			we: false,
			oe: false,
			ce: false,
			events: Vec::new(),
		}
	}

	fn is_idle(&self) -> bool {
		!self.we && !self.oe && !self.ce && self.direction == Direction::Input
	}
}

impl Hardware for Recorder {
	fn set_address(&mut self, address: u16) -> crate::AResult<()> {
		self.address = address;
		Ok(())
	}
	fn set_bus_direction(&mut self, direction: Direction) -> crate::AResult<()> {
		self.direction = direction;
		Ok(())
	}
	fn write_data(&mut self, data: u8) -> crate::AResult<()> {
		self.latch = data;
		Ok(())
	}
	fn read_data(&mut self) -> crate::AResult<u8> {
		assert_eq!(self.direction, Direction::Input, "reading while driving the bus");
		self.events.push(Event::Read(self.last));
		Ok(self.last)
	}
	fn set_line(&mut self, line: ControlLine, active: bool) -> crate::AResult<()> {
		match line {
			ControlLine::WriteEnable => {
				if self.we && !active {
					assert!(self.ce, "WE pulse without CE");
					self.events.push(Event::Strobe(self.address, self.latch));
					self.last = self.latch;
				}
				self.we = active;
			},
			ControlLine::OutputEnable => self.oe = active,
			ControlLine::ChipEnable => {
				if !self.ce && active {
					self.events.push(Event::Select(self.address, self.latch));
				}
				self.ce = active;
			},
		}
		Ok(())
	}
	fn delay(&mut self, _duration: std::time::Duration) {
	}
}

fn simulated(chip: Chip) -> Eeprom<SimulatedChip> {
	Eeprom::open(SimulatedChip::new(chip), chip).unwrap()
}

proptest! {
	#[test]
	fn write_then_read(address in 0u16..0x2000, data in any::<u8>()) {
		let mut eeprom = simulated(Chip::AT28C64);
		eeprom.write_byte(address, data).unwrap();
		prop_assert_eq!(eeprom.read_byte(address).unwrap(), data);
		prop_assert_eq!(eeprom.hardware().contention(), 0);
	}

	#[test]
	fn beyond_chip(address in 0x8000u16..=0xffff, data in any::<u8>()) {
		let mut eeprom = simulated(Chip::AT28C256);
		eeprom.write_byte(address, data).unwrap();
		prop_assert_eq!(eeprom.read_byte(address).unwrap(), ERASED);
		prop_assert_eq!(eeprom.hardware().programmed(), 0);
	}
}

#[test]
fn beyond_chip_does_not_alias() {
	let mut eeprom = simulated(Chip::AT28C64);
	eeprom.write_byte(0x2005, 0x00).unwrap();
	assert_eq!(eeprom.read_byte(0x0005).unwrap(), 0xff);
	assert!(eeprom.hardware().memory().iter().all(|&b| b == 0xff));
}

#[test]
fn write_byte_sequence() {
	let mut eeprom = Eeprom::open(Recorder::new(), Chip::AT28C64).unwrap();
	eeprom.write_byte(0x0123, 0x9c).unwrap();

	let rec = eeprom.hardware();
	// address and data are set up before CE goes active
	assert_eq!(rec.events, vec![
		Event::Select(0x0123, 0x9c),
		Event::Strobe(0x0123, 0x9c),
		Event::Select(0x0123, 0x9c),
		Event::Read(0x9c),
	]);
	assert!(rec.is_idle());
}

#[test]
fn read_byte_returns_to_idle() {
	let mut sim = SimulatedChip::new(Chip::AT28C64);
	sim.load(0x40, &[0xde, 0xad]);
	let mut eeprom = Eeprom::open(sim, Chip::AT28C64).unwrap();
	assert_eq!(eeprom.read_byte(0x41).unwrap(), 0xad);
	assert_eq!(eeprom.read_byte(0x40).unwrap(), 0xde);
	assert_eq!(eeprom.hardware().contention(), 0);
}

#[test]
fn data_polling_counts_reads() {
	let mut sim = SimulatedChip::new(Chip::AT28C64).with_busy_polls(7);
	sim.write_cycle(0x10, 0x42).unwrap();
	assert_eq!(sim.await_write_complete(0x42, None).unwrap(), 8);

	// bit 7 set: the busy reads report it cleared
	sim.write_cycle(0x11, 0x80).unwrap();
	assert_eq!(sim.await_write_complete(0x80, None).unwrap(), 8);
	assert_eq!(&sim.memory()[0x10..0x12], &[0x42, 0x80]);
}

#[test]
fn poll_limit() {
	let sim = SimulatedChip::new(Chip::AT28C64).with_busy_polls(1000);
	let mut eeprom = Eeprom::open(sim, Chip::AT28C64).unwrap();
	eeprom.set_poll_limit(Some(10));
	assert!(eeprom.write_byte(0x20, 0x01).is_err());

	eeprom.set_poll_limit(None);
	eeprom.write_byte(0x21, 0x01).unwrap();
	assert_eq!(eeprom.read_byte(0x21).unwrap(), 0x01);
}

#[test]
fn verify_reports_mismatch() {
	let mut eeprom = simulated(Chip::AT28C64);
	eeprom.write_byte(0x300, 0x5a).unwrap();
	let programmed = eeprom.hardware().programmed();

	assert!(eeprom.verify_byte(0x300, 0x5a).unwrap());
	assert!(!eeprom.verify_byte(0x300, 0xa5).unwrap());
	assert!(!eeprom.verify_byte(0x2000, 0x00).unwrap());
	assert_eq!(eeprom.hardware().programmed(), programmed);
}

#[test]
fn erase_section_is_half_open() {
	let mut sim = SimulatedChip::new(Chip::AT28C64);
	sim.load(0, &[0x11; 0x40]);
	let mut eeprom = Eeprom::open(sim, Chip::AT28C64).unwrap();

	eeprom.erase_section(0x10, 0x20, 0x5a).unwrap();
	eeprom.erase_section(0x10, 0x20, 0x5a).unwrap();

	let memory = eeprom.hardware().memory();
	assert_eq!(memory[0x0f], 0x11);
	assert!(memory[0x10..0x20].iter().all(|&b| b == 0x5a));
	assert_eq!(memory[0x20], 0x11);
}

#[test]
fn erase_empty_range() {
	let mut eeprom = simulated(Chip::AT28C64);
	eeprom.erase_section(0x20, 0x20, 0x00).unwrap();
	eeprom.erase_section(0x30, 0x20, 0x00).unwrap();
	assert_eq!(eeprom.hardware().programmed(), 0);
}

#[test]
fn protect_sequence_on_the_wire() {
	let mut eeprom = Eeprom::open(Recorder::new(), Chip::AT28C64).unwrap();
	eeprom.write_protect(true).unwrap();
	assert_eq!(eeprom.hardware().events, vec![
		Event::Select(0, 0),
		Event::Strobe(0x1555, 0xaa),
		Event::Strobe(0x0aaa, 0x55),
		Event::Strobe(0x1555, 0xa0),
	]);
	assert!(eeprom.hardware().is_idle());

	let mut eeprom = Eeprom::open(Recorder::new(), Chip::AT28C256).unwrap();
	eeprom.write_protect(false).unwrap();
	let mut strobes = vec![Event::Select(0, 0)];
	strobes.extend([(0x5555, 0xaa), (0x2aaa, 0x55), (0x5555, 0x80), (0x5555, 0xaa), (0x2aaa, 0x55), (0x5555, 0x20)]
		.iter()
		.map(|&(a, d)| Event::Strobe(a, d)));
	assert_eq!(eeprom.hardware().events, strobes);
	assert!(eeprom.hardware().is_idle());
}

#[test]
fn protection_holds_until_disabled() {
	let mut eeprom = simulated(Chip::AT28C256);
	eeprom.write_byte(0x0100, 0x12).unwrap();

	eeprom.write_protect(true).unwrap();
	assert!(eeprom.hardware().is_protected());

	// same I/O7 as the stored byte: polling ends on the stale content
	eeprom.write_byte(0x0100, 0x34).unwrap();
	assert_eq!(eeprom.read_byte(0x0100).unwrap(), 0x12);

	// different I/O7 never completes; bounded polling gives up
	eeprom.set_poll_limit(Some(100));
	assert!(eeprom.write_byte(0x0100, 0x80).is_err());
	assert_eq!(eeprom.read_byte(0x0100).unwrap(), 0x12);

	eeprom.write_protect(false).unwrap();
	assert!(!eeprom.hardware().is_protected());
	eeprom.write_byte(0x0100, 0x80).unwrap();
	assert_eq!(eeprom.read_byte(0x0100).unwrap(), 0x80);
	assert_eq!(eeprom.hardware().contention(), 0);
}

#[test]
fn command_lookalikes_are_plain_writes() {
	let chip = Chip::AT28C64;
	let mut eeprom = simulated(chip);
	let (a, b) = chip.sdp_addresses;
	eeprom.write_byte(a, 0xaa).unwrap();
	eeprom.write_byte(b, 0x55).unwrap();
	eeprom.write_byte(a, 0xa0).unwrap();

	// each write was followed by polling reads, so no sequence was formed
	assert!(!eeprom.hardware().is_protected());
	assert_eq!(eeprom.read_byte(a).unwrap(), 0xa0);
	assert_eq!(eeprom.read_byte(b).unwrap(), 0x55);
}
