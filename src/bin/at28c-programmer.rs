#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate at28c_programmer;
use at28c_programmer::*;

use std::fs;
use std::io::{
	self,
	BufReader,
	Read,
};
use std::process::exit;

use at28c_programmer::at28c::{
	Eeprom,
	Hardware,
	SimulatedChip,
};
use at28c_programmer::chip::Chip;
use at28c_programmer::intel_hex::{
	ChecksumPolicy,
	FeedStatus,
	HexDecoder,
};

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<Option<T>>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => return Ok(None),
	};
	param.parse::<T>().map(Some).map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid parameter {}: {}", name, e);
		e.context(msg).into()
	})
}

// addresses and data are always hex, with or without "0x"
fn get_hex(matches: &clap::ArgMatches, name: &str) -> AResult<Option<u32>> {
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => return Ok(None),
	};
	let digits = param.trim_start_matches("0x").trim_start_matches("0X");
	u32::from_str_radix(digits, 16).map(Some).map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid parameter {}: {}", name, e);
		e.context(msg).into()
	})
}

fn get_address(matches: &clap::ArgMatches, name: &str, chip: &Chip) -> AResult<Option<u16>> {
	match get_hex(matches, name)? {
		None => Ok(None),
		Some(a) => {
			ensure!(a as usize <= chip.size(), "{} 0x{:x} beyond {}", name, a, chip);
			Ok(Some(a as u16))
		},
	}
}

fn get_byte(matches: &clap::ArgMatches, name: &str) -> AResult<Option<u8>> {
	match get_hex(matches, name)? {
		None => Ok(None),
		Some(b) => {
			ensure!(b <= 0xff, "{} 0x{:x} doesn't fit a byte", name, b);
			Ok(Some(b as u8))
		},
	}
}

fn wiring(matches: &clap::ArgMatches) -> AResult<linux::Wiring> {
	let mut wiring = linux::Wiring::default();
	if let Some(path) = matches.value_of("i2c") {
		wiring.i2c_device = path.into();
	}
	if let Some(address) = get_hex(matches, "expander")? {
		ensure!(address < 0x80, "invalid I2C address 0x{:x}", address);
		wiring.expander_address = address as u8;
	}
	if let Some(we) = get_param(matches, "we")? {
		wiring.write_enable = we;
	}
	if let Some(oe) = get_param(matches, "oe")? {
		wiring.output_enable = oe;
	}
	if let Some(ce) = get_param(matches, "ce")? {
		wiring.chip_enable = ce;
	}
	if let Some(lines) = matches.value_of("address") {
		wiring.address_lines = lines.split(',')
			.map(|n| n.trim().parse::<u32>().map_err(|e| format_err!("invalid GPIO number {:?}: {}", n, e)))
			.collect::<AResult<Vec<_>>>()?;
	}
	Ok(wiring)
}

fn load_image(sub_m: &clap::ArgMatches) -> AResult<Vec<u8>> {
	match sub_m.value_of("IMAGE") {
		None => Ok(rom::IMAGE.to_vec()),
		Some(path) => fs::read(path).map_err(|e| {
			let e = failure::Error::from(e);
			let msg = format!("couldn't read image {:?}: {}", path, e);
			e.context(msg).into()
		}),
	}
}

fn write_hex<H: Hardware>(eeprom: &mut Eeprom<H>, sub_m: &clap::ArgMatches) -> AResult<u32> {
	let checksum = if sub_m.is_present("strict") { ChecksumPolicy::Verify } else { ChecksumPolicy::Ignore };
	let input: Box<dyn Read> = match sub_m.value_of("FILE") {
		None | Some("-") => Box::new(io::stdin()),
		Some(path) => Box::new(fs::File::open(path).map_err(|e| {
			let e = failure::Error::from(e);
			let msg = format!("couldn't open {:?}: {}", path, e);
			failure::Error::from(e.context(msg))
		})?),
	};

	let mut decoder = HexDecoder::new(checksum);
	let mut errors = 0u32;
	for c in BufReader::new(input).bytes() {
		match decoder.feed_char(c?, eeprom)? {
			FeedStatus::Continue => (),
			FeedStatus::Error => errors += 1,
			FeedStatus::End => break,
		}
	}
	// last line without line end
	if !decoder.is_ended() && decoder.feed_char(b'\n', eeprom)? == FeedStatus::Error {
		errors += 1;
	}
	info!("Hex input processed: {} errors", errors);
	Ok(errors)
}

fn run<H: Hardware>(matches: &clap::ArgMatches, eeprom: &mut Eeprom<H>) -> AResult<u32> {
	let chip = *eeprom.chip();
	eeprom.set_poll_limit(get_param(matches, "polls")?);

	match matches.subcommand() {
		("read", Some(sub_m)) => {
			let address = get_address(sub_m, "ADDR", &chip)?.unwrap_or(0);
			println!("{:04X}: {:02X}", address, eeprom.read_byte(address)?);
			Ok(0)
		},
		("write_byte", Some(sub_m)) => {
			let address = get_address(sub_m, "ADDR", &chip)?.unwrap_or(0);
			let data = get_byte(sub_m, "DATA")?.unwrap_or(0);
			eeprom.write_byte(address, data)?;
			Ok(if eeprom.verify_byte(address, data)? { 0 } else { 1 })
		},
		("dump", Some(sub_m)) => {
			let start = get_address(sub_m, "START", &chip)?.unwrap_or(0);
			let end = get_address(sub_m, "END", &chip)?.unwrap_or(chip.size() as u16);
			ensure!(start <= end, "START 0x{:04x} after END 0x{:04x}", start, end);
			let stdout = io::stdout();
			console::dump(eeprom, &mut stdout.lock(), start, end)?;
			Ok(0)
		},
		("erase", Some(sub_m)) => {
			let start = get_address(sub_m, "START", &chip)?.unwrap_or(0);
			let end = match get_address(sub_m, "END", &chip)? {
				None | Some(0) => chip.size() as u16,
				Some(end) => end,
			};
			let pattern = get_byte(sub_m, "PATTERN")?.unwrap_or(at28c::ERASED);
			eeprom.erase_section(start, end, pattern)?;
			Ok(0)
		},
		("write", Some(sub_m)) => write_hex(eeprom, sub_m),
		("test", _) => sweep::run(eeprom),
		("rom", Some(sub_m)) => rom::write_image(eeprom, &load_image(sub_m)?),
		("check", Some(sub_m)) => rom::check_image(eeprom, &load_image(sub_m)?),
		("protect", _) => {
			eeprom.write_protect(true)?;
			Ok(0)
		},
		("unprotect", _) => {
			eeprom.write_protect(false)?;
			Ok(0)
		},
		("console", Some(sub_m)) => {
			let stdin = io::stdin();
			let stdout = io::stdout();
			let mut console = console::Console::new(stdin.lock(), stdout.lock());
			if sub_m.is_present("strict") {
				console.set_checksum_policy(ChecksumPolicy::Verify);
			}
			console.run(eeprom)
		},
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main_app() -> AResult<u32> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg chip: --chip +takes_value "chip type: AT28C64 (default) or AT28C256")
		(@arg simulate: --simulate "use a simulated chip instead of the hardware")
		(@arg i2c: --i2c +takes_value "I2C device of the expander (default /dev/i2c-1)")
		(@arg expander: --expander +takes_value "I2C address of the MCP23017 (hex, default 20)")
		(@arg we: --we +takes_value "GPIO driving WE (default 2)")
		(@arg oe: --oe +takes_value "GPIO driving OE (default 3)")
		(@arg ce: --ce +takes_value "GPIO driving CE (default 4)")
		(@arg address: --address +takes_value "comma separated GPIOs driving A8 upwards (default 5,6,...)")
		(@arg polls: --polls +takes_value "give up on a write after this many polls (default: wait forever)")
		(@subcommand read =>
			(about: "read a single byte")
			(@arg ADDR: +required "address (hex)")
		)
		(@subcommand write_byte =>
			(about: "write and verify a single byte")
			(@arg ADDR: +required "address (hex)")
			(@arg DATA: +required "data (hex)")
		)
		(@subcommand dump =>
			(about: "hex dump of the chip contents")
			(@arg START: "first address (hex, default 0)")
			(@arg END: "end address, exclusive (hex, default chip size)")
		)
		(@subcommand erase =>
			(about: "fill a range with a pattern")
			(@arg START: "first address (hex, default 0)")
			(@arg END: "end address, exclusive (hex, 0 or missing: chip size)")
			(@arg PATTERN: "fill byte (hex, default FF)")
		)
		(@subcommand write =>
			(about: "program Intel HEX data")
			(@arg strict: --strict "reject records with a bad checksum")
			(@arg FILE: "input file, - for stdin (default)")
		)
		(@subcommand test =>
			(about: "destructive test of the whole chip")
		)
		(@subcommand rom =>
			(about: "program a ROM image at address 0 and verify it")
			(@arg IMAGE: "binary image (default: built-in test program)")
		)
		(@subcommand check =>
			(about: "compare the chip against a ROM image")
			(@arg IMAGE: "binary image (default: built-in test program)")
		)
		(@subcommand protect =>
			(about: "enable software data protection")
		)
		(@subcommand unprotect =>
			(about: "disable software data protection")
		)
		(@subcommand console =>
			(about: "interactive single-character command console")
			(@arg strict: --strict "reject HEX records with a bad checksum")
		)
	).get_matches();

	let chip: Chip = get_param(&matches, "chip")?.unwrap_or_default();
	info!("Selected chip: {}", chip);

	if matches.is_present("simulate") {
		let mut eeprom = Eeprom::open(SimulatedChip::new(chip), chip)?;
		run(&matches, &mut eeprom)
	} else {
		let bus = linux::open_bus(&wiring(&matches)?, &chip)?;
		let mut eeprom = Eeprom::open(bus, chip)?;
		run(&matches, &mut eeprom)
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	match main_app() {
		Ok(0) => (),
		Ok(errors) => {
			error!("{} errors", errors);
			exit(2);
		},
		Err(e) => {
			error!("Error: {}", e);
			exit(1);
		},
	}
}
