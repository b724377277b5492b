// Packet layout
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_HEADER_SIZE: usize = 4;
pub const TS_SYNC_BYTE: u8 = 0x47;

// Adaptation field: the PCR flag byte plus 6 PCR bytes need at least 7
pub const MIN_PCR_ADAPTATION_LENGTH: usize = 7;
pub const MAX_ADAPTATION_LENGTH: usize = TS_PACKET_SIZE - 5;

// Clocks
pub const PCR_HZ: u64 = 27_000_000;
/// 33-bit base times 300 plus extension: the PCR counter wraps here.
pub const PCR_WRAP_TICKS: u64 = (1u64 << 33) * 300;
