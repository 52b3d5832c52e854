//! The partition hash function. Every stream UUID maps to a 32-bit hash
//! which the routing map then resolves to an owning member by range lookup.
//!
//! This is a 32-bit MurmurHash3 variant seeded with `1`, modelled byte for
//! byte on the reference implementation rather than a textbook one: the main
//! loop advances the window by one byte instead of four, so it hashes
//! overlapping 4-byte windows rather than disjoint blocks, and the tail
//! (reached only when the input length isn't a multiple of four, which never
//! happens for a 16-byte UUID) folds its trailing bytes in from the end of
//! the buffer rather than the start. Neither quirk is a bug we get to fix:
//! every node in the cluster computes hashes this way, so a "corrected"
//! implementation would simply resolve UUIDs to the wrong owner.

const C1: u32 = 0xcc9e2d51;
const C2: u32 = 0x1b873593;

fn mix(mut k: u32) -> u32 {
    k = k.wrapping_mul(C1);
    k = k.rotate_left(15);
    k.wrapping_mul(C2)
}

/// MurmurHash3 (x86, 32-bit) over arbitrary bytes, seeded with `seed`.
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    let len = data.len();
    let mut h = seed;

    if len > 3 {
        for i in 0..len - 3 {
            let k = u32::from(data[i])
                | u32::from(data[i + 1]) << 8
                | u32::from(data[i + 2]) << 16
                | u32::from(data[i + 3]) << 24;
            h ^= mix(k);
            h = h.rotate_left(13);
            h = h.wrapping_mul(5).wrapping_add(0xe6546b64);
        }
    }

    let tail = len & 3;
    if tail != 0 {
        let mut k: u32 = 0;
        for step in 0..tail {
            k = (k << 8) | u32::from(data[len - 1 - step]);
        }
        h ^= mix(k);
    }

    h ^= len as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

/// Hash a stream UUID to its position in the partition ring.
pub fn hash_uuid(uuid: &[u8; 16]) -> u32 {
    murmur3_32(uuid, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid(bytes: [u8; 16]) -> [u8; 16] {
        bytes
    }

    #[test]
    fn known_vectors() {
        let cases: &[([u8; 16], u32)] = &[
            ([0u8; 16], 1290395861),
            ([0xff; 16], 1114621134),
            (
                [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
                661048825,
            ),
            (
                [15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0],
                3761959442,
            ),
            (
                [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
                1859779352,
            ),
            (
                [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
                875755127,
            ),
            (
                [
                    0xde, 0xad, 0xbe, 0xef, 0xde, 0xad, 0xbe, 0xef, 0xde, 0xad, 0xbe, 0xef, 0xde,
                    0xad, 0xbe, 0xef,
                ],
                2821201286,
            ),
            (*b"0123456789abcdef", 1828522458),
        ];

        for (input, expected) in cases {
            assert_eq!(hash_uuid(&uuid(*input)), *expected, "input {input:?}");
        }
    }

    #[test]
    fn all_zero_uuid_is_not_special_cased() {
        // A plausible off-by-one bug is to special-case the zero UUID into
        // hash zero; the reference function does not.
        assert_ne!(hash_uuid(&[0u8; 16]), 0);
    }
}
