use crate::at28c::{
	Eeprom,
	Hardware,
	ERASED,
};

mod image;

pub use self::image::IMAGE;

fn check_fits<H: Hardware>(eeprom: &Eeprom<H>, image: &[u8]) -> crate::AResult<()> {
	let size = eeprom.chip().size();
	ensure!(image.len() <= size,
		"Image too large for {}: {} bytes, chip has {}", eeprom.chip().name, image.len(), size
	);
	Ok(())
}

/// Program `image` at address 0 and read it back.
///
/// Returns the number of bytes that failed verification.
pub fn write_image<H: Hardware>(eeprom: &mut Eeprom<H>, image: &[u8]) -> crate::AResult<u32> {
	check_fits(eeprom, image)?;
	let len = image.len() as u16;

	info!("Step 1: erasing 0x{:04x} bytes", len);
	eeprom.erase_section(0, len, ERASED)?;

	info!("Step 2: writing image");
	for (address, &data) in image.iter().enumerate() {
		eeprom.write_byte(address as u16, data)?;
	}

	info!("Step 3: verifying image");
	let errors = check_image(eeprom, image)?;
	if errors == 0 {
		info!("Image written successfully");
	}
	Ok(errors)
}

/// Compare the chip against `image` without writing anything.
pub fn check_image<H: Hardware>(eeprom: &mut Eeprom<H>, image: &[u8]) -> crate::AResult<u32> {
	check_fits(eeprom, image)?;

	let mut errors = 0u32;
	for (address, &data) in image.iter().enumerate() {
		if !eeprom.verify_byte(address as u16, data)? {
			errors += 1;
		}
	}
	if errors != 0 {
		warn!("Verification failed with {} errors", errors);
	}
	Ok(errors)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::at28c::SimulatedChip;
	use crate::chip::Chip;

	#[test]
	fn write_and_check() {
		let mut sim = SimulatedChip::new(Chip::AT28C64);
		sim.load(0, &[0x00; 32]);
		let mut ee = Eeprom::open(sim, Chip::AT28C64).unwrap();

		assert_eq!(check_image(&mut ee, &IMAGE).unwrap(), IMAGE.len() as u32 - 1);
		assert_eq!(write_image(&mut ee, &IMAGE).unwrap(), 0);
		assert_eq!(check_image(&mut ee, &IMAGE).unwrap(), 0);

		let memory = ee.hardware().memory();
		assert_eq!(&memory[..IMAGE.len()], &IMAGE[..]);
		// past the image the chip is left alone
		assert_eq!(memory[IMAGE.len()], 0x00);
	}

	#[test]
	fn bad_cells_are_counted() {
		let mut sim = SimulatedChip::new(Chip::AT28C64);
		sim.stick_bits(0x0002, 0x01, 0x01);
		let mut ee = Eeprom::open(sim, Chip::AT28C64).unwrap();
		assert_eq!(write_image(&mut ee, &IMAGE).unwrap(), 1);
	}

	#[test]
	fn image_too_large() {
		let mut ee = Eeprom::open(SimulatedChip::new(Chip::AT28C64), Chip::AT28C64).unwrap();
		let image = vec![0u8; Chip::AT28C64.size() + 1];
		assert!(write_image(&mut ee, &image).is_err());
		assert_eq!(ee.hardware().programmed(), 0);
	}
}
