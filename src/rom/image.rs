// 6502 test program, assembled for the chip mapped at $e000:
// - e000: a2 ff     LDX #$ff
// - e002: 9a        TXS
// - e003: a9 ff     LDA #$ff
// - e005: 8d 02 60  STA $6002   VIA DDRB: all outputs
// - e008: a9 55     LDA #$55
// - e00a: 8d 00 60  STA $6000   VIA ORB (loop)
// - e00d: 6a        ROR A
// - e00e: 4c 0a e0  JMP $e00a
pub const IMAGE: [u8; 17] = [
	0xa2, 0xff, 0x9a, 0xa9, 0xff, 0x8d, 0x02, 0x60,
	0xa9, 0x55, 0x8d, 0x00, 0x60, 0x6a, 0x4c, 0x0a,
	0xe0,
];
