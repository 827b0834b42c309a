extern crate at28c_programmer;

use at28c_programmer::at28c::{
	Eeprom,
	Hardware,
	SimulatedChip,
};
use at28c_programmer::chip::Chip;
use at28c_programmer::intel_hex::{
	FeedStatus,
	HexDecoder,
};
use at28c_programmer::{
	rom,
	sweep,
};

fn feed<H: Hardware>(decoder: &mut HexDecoder, eeprom: &mut Eeprom<H>, input: &str) -> Vec<FeedStatus> {
	input.bytes()
		.map(|c| decoder.feed_char(c, eeprom).unwrap())
		.filter(|&status| status != FeedStatus::Continue)
		.collect()
}

#[test]
fn hex_file_into_at28c256() {
	let chip = Chip::AT28C256;
	let mut sim = SimulatedChip::new(chip);
	{
		let mut ee = Eeprom::open(&mut sim, chip).unwrap();
		let mut decoder = HexDecoder::default();
		let status = feed(&mut decoder, &mut ee, concat!(
			":10000000A2FF9AA9FF8D0260A9558D00606A4C0A7B\r\n",
			":027FFC0000E0A3\r\n",
			// second byte lands beyond the chip and reads back erased
			":027FFF00ABFF56\r\n",
			":00000001FF\r\n",
		));
		assert_eq!(status, vec![FeedStatus::End]);
	}

	assert_eq!(&sim.memory()[..16], &rom::IMAGE[..16]);
	assert_eq!(&sim.memory()[0x7ffc..], &[0x00, 0xe0, 0xff, 0xab]);
	assert_eq!(sim.contention(), 0);
}

#[test]
fn protection_end_to_end() {
	let chip = Chip::AT28C64;
	let mut ee = Eeprom::open(SimulatedChip::new(chip), chip).unwrap();
	ee.set_poll_limit(Some(100));
	ee.write_protect(true).unwrap();
	assert!(ee.hardware().is_protected());

	// bit 7 set like the erased cell: polling completes, verification fails
	let mut decoder = HexDecoder::default();
	assert_eq!(feed(&mut decoder, &mut ee, ":0100100092\n"), vec![FeedStatus::Error]);
	assert_eq!(ee.hardware().memory()[0x10], 0xff);

	// bit 7 differs: the chip never finishes
	assert!(ee.write_byte(0x0010, 0x12).is_err());

	ee.write_protect(false).unwrap();
	assert!(!ee.hardware().is_protected());
	assert!(feed(&mut decoder, &mut ee, ":020010009212\n").is_empty());
	assert_eq!(&ee.hardware().memory()[0x10..0x12], &[0x92, 0x12]);
}

#[test]
fn sweep_then_rom() {
	let chip = Chip::AT28C256;
	let mut ee = Eeprom::open(SimulatedChip::new(chip).with_busy_polls(1), chip).unwrap();
	assert_eq!(sweep::run(&mut ee).unwrap(), 0);
	assert_eq!(rom::check_image(&mut ee, &rom::IMAGE).unwrap() as usize, rom::IMAGE.len());
	assert_eq!(rom::write_image(&mut ee, &rom::IMAGE).unwrap(), 0);
	assert_eq!(rom::check_image(&mut ee, &rom::IMAGE).unwrap(), 0);
}
