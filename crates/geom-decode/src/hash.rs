//! Name hashing.
//!
//! Names are hashed with reflected CRC-32 (polynomial `0x04C11DB7`, initial
//! value `0xFFFFFFFF`) but, unlike zlib's CRC-32, without the final XOR.

const POLYNOMIAL: u32 = 0xEDB8_8320;

const TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ POLYNOMIAL } else { crc >> 1 };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// Hash a name the way the format stores name hashes.
#[must_use]
pub fn name_hash(name: &str) -> u32 {
    name.bytes().fold(0xFFFF_FFFF, |crc, byte| {
        TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize] ^ (crc >> 8)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value() {
        // Standard CRC-32 of "123456789" is 0xCBF43926; this variant skips the final XOR.
        assert_eq!(name_hash("123456789"), !0xCBF4_3926);
    }

    #[test]
    fn empty_name_is_initial_value() {
        assert_eq!(name_hash(""), 0xFFFF_FFFF);
    }
}
