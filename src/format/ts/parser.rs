use super::types::*;

/// PCR of a single 188-byte packet in 27 MHz ticks.
///
/// Returns `None` unless the packet starts with the sync byte, carries an
/// adaptation field (`adaptation_field_control` 2 or 3) long enough to hold
/// a PCR, and has the PCR flag set.
pub fn read_pcr(packet: &[u8]) -> Option<u64> {
    if packet.len() < TS_PACKET_SIZE || packet[0] != TS_SYNC_BYTE {
        return None;
    }

    let adaptation_field_control = (packet[3] >> 4) & 0x03;
    if adaptation_field_control != 2 && adaptation_field_control != 3 {
        return None;
    }

    let adaptation_length = packet[4] as usize;
    if !(MIN_PCR_ADAPTATION_LENGTH..=MAX_ADAPTATION_LENGTH).contains(&adaptation_length) {
        return None;
    }

    if (packet[5] & 0x10) == 0 {
        return None;
    }

    let pos = 6;
    let pcr_base = ((packet[pos] as u64) << 25)
        | ((packet[pos + 1] as u64) << 17)
        | ((packet[pos + 2] as u64) << 9)
        | ((packet[pos + 3] as u64) << 1)
        | ((packet[pos + 4] & 0x80) as u64 >> 7);
    let pcr_ext = (((packet[pos + 4] & 0x01) as u64) << 8) | (packet[pos + 5] as u64);
    // an out-of-range extension (300..=511) can push past the wrap point
    Some((pcr_base * 300 + pcr_ext) % PCR_WRAP_TICKS)
}

/// Build a 188-byte packet carrying `ticks` as its PCR. Used by tests and
/// the demo's synthetic source.
pub fn pcr_packet(pid: u16, ticks: u64) -> [u8; TS_PACKET_SIZE] {
    let base = (ticks / 300) & ((1u64 << 33) - 1);
    let ext = ticks % 300;

    let mut packet = [0xffu8; TS_PACKET_SIZE];
    packet[0] = TS_SYNC_BYTE;
    packet[1] = ((pid >> 8) as u8) & 0x1f;
    packet[2] = pid as u8;
    packet[3] = 0x20; // adaptation field only
    packet[4] = (TS_PACKET_SIZE - 5) as u8;
    packet[5] = 0x10; // PCR flag
    packet[6] = (base >> 25) as u8;
    packet[7] = (base >> 17) as u8;
    packet[8] = (base >> 9) as u8;
    packet[9] = (base >> 1) as u8;
    packet[10] = (((base & 0x01) as u8) << 7) | 0x7e | ((ext >> 8) as u8 & 0x01);
    packet[11] = ext as u8;
    packet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_pcr_roundtrip_values() {
        for ticks in [0u64, 2_700_000, 29_700_000, 27_000_000 * 3600 + 299, PCR_WRAP_TICKS - 1] {
            assert_eq!(read_pcr(&pcr_packet(0x100, ticks)), Some(ticks), "ticks {}", ticks);
        }
    }

    #[test]
    fn test_read_pcr_known_bytes() {
        // base = 9000 (0.1 s at 90 kHz), ext = 0
        let mut packet = [0xffu8; TS_PACKET_SIZE];
        packet[..12].copy_from_slice(&[0x47, 0x01, 0x00, 0x30, 0xb7, 0x10, 0x00, 0x00, 0x11, 0x94, 0x7e, 0x00]);
        assert_eq!(read_pcr(&packet), Some(9000 * 300));
    }

    #[test]
    fn test_read_pcr_illegal_extension_stays_below_wrap() {
        // base = 2^33 - 1, ext = 511
        let mut packet = pcr_packet(0x100, 0);
        packet[6..12].copy_from_slice(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
        let ticks = read_pcr(&packet).unwrap();
        assert!(ticks < PCR_WRAP_TICKS);
        assert_eq!(ticks, ((1u64 << 33) - 1) * 300 + 511 - PCR_WRAP_TICKS);
    }

    #[test]
    fn test_read_pcr_rejects() {
        let good = pcr_packet(0x100, 2_700_000);

        assert_eq!(read_pcr(&good[..187]), None);

        let mut bad_sync = good;
        bad_sync[0] = 0x46;
        assert_eq!(read_pcr(&bad_sync), None);

        let mut payload_only = good;
        payload_only[3] = 0x10;
        assert_eq!(read_pcr(&payload_only), None);

        let mut short_af = good;
        short_af[4] = 6;
        assert_eq!(read_pcr(&short_af), None);

        let mut long_af = good;
        long_af[4] = 184;
        assert_eq!(read_pcr(&long_af), None);

        let mut no_flag = good;
        no_flag[5] = 0x00;
        assert_eq!(read_pcr(&no_flag), None);
    }
}
