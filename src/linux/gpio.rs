use std::time::Duration;

use linux_embedded_hal::sysfs_gpio;
use linux_embedded_hal::SysfsPin;

use crate::at28c::reliable_sleep;

/// Export GPIO `number` (if needed) and make it an output starting at `high`.
pub fn open_output(number: u32, high: bool) -> crate::AResult<SysfsPin> {
	let pin = with_context!(("couldn't set up GPIO {} as output", number), {
		let pin = SysfsPin::new(number as u64);
		pin.export()?;

		// udev may need a moment to fix permissions of freshly exported lines;
		// "high"/"low" switch direction and level without a glitch
		let direction = if high { sysfs_gpio::Direction::High } else { sysfs_gpio::Direction::Low };
		let mut attempt = 0;
		loop {
			match pin.set_direction(direction.clone()) {
				Ok(()) => break,
				Err(sysfs_gpio::Error::Io(ref e)) if attempt < 10 && e.kind() == std::io::ErrorKind::PermissionDenied => {
					attempt += 1;
					reliable_sleep(Duration::from_millis(20));
				},
				Err(e) => return Err(e.into()),
			}
		}

		Ok(pin)
	})?;

	debug!("GPIO {}: output, initially {}", number, if high { "high" } else { "low" });
	Ok(pin)
}
