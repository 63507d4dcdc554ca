//! Frame checksum
//!
//! Every checksummed frame ends with one byte chosen so that the sum of all
//! bytes in the frame, modulo 256, is 255.

/// Calculate the checksum byte for the given frame contents (excluding the checksum)
pub fn calc_checksum(bytes: &[u8]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    255 - sum
}

/// Check the trailing checksum byte of a complete frame
///
/// Returns false for an empty slice, which cannot carry a checksum.
pub fn verify_checksum(frame: &[u8]) -> bool {
    match frame.split_last() {
        Some((&checksum, contents)) => calc_checksum(contents) == checksum,
        None => false,
    }
}

/// Return a copy of `bytes` with its checksum appended
pub fn with_checksum(bytes: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(bytes.len() + 1);
    frame.extend_from_slice(bytes);
    frame.push(calc_checksum(bytes));
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_calc_checksum() {
        assert_eq!(255, calc_checksum(&[]));
        assert_eq!(234, calc_checksum(&[21]));
        assert_eq!(155, calc_checksum(&[3, 64, 33]));
        assert_eq!(188, calc_checksum(&[3, 64, 0]));
        assert_eq!(
            192,
            calc_checksum(&[64, 33, 18, 5, 0, 0, 0, 39, 0, 0, 160, 0, 0, 0, 0, 0, 0, 0, 0])
        );
    }

    #[test]
    fn test_verify_checksum() {
        assert!(verify_checksum(&[3, 64, 97, 91]));
        assert!(!verify_checksum(&[3, 64, 97, 92]));
        assert!(verify_checksum(&[21, 234]));
        assert!(!verify_checksum(&[]));
    }

    #[test]
    fn test_appended_checksum_always_verifies() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in 0..64 {
            let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            let frame = with_checksum(&bytes);
            assert!(verify_checksum(&frame), "{:?}", frame);

            let total = frame.iter().fold(0u32, |acc, &b| acc + b as u32);
            assert_eq!(255, total % 256);
        }
    }
}
