const FNV32_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the key bytes with the sign bit cleared. Same value as
/// Go's `fnv.New32a().Sum32() & 0x7fffffff`, so routing matches the Go workers.
///
/// Map and reduce run in different processes and never talk to each other,
/// so this has to stay bit-for-bit stable.
pub fn ihash(key: &str) -> u32 {
    let hash = key.bytes().fold(FNV32_OFFSET_BASIS, |acc, b| {
        (acc ^ u32::from(b)).wrapping_mul(FNV32_PRIME)
    });
    hash & 0x7fff_ffff
}

/// Reduce bucket for `key`. `n_reduce` must be at least 1.
pub fn partition(key: &str, n_reduce: usize) -> usize {
    debug_assert!(n_reduce > 0);
    ihash(key) as usize % n_reduce
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_reference_fnv1a_vectors() {
        // published FNV-1a 32 values, masked to 31 bits
        assert_eq!(ihash(""), 0x811c_9dc5 & 0x7fff_ffff);
        assert_eq!(ihash("a"), 0xe40c_292c & 0x7fff_ffff);
        assert_eq!(ihash("foobar"), 0xbf9c_f968 & 0x7fff_ffff);
    }

    #[test]
    fn partition_is_in_range_and_stable() {
        for n in 1..=17 {
            for key in ["a", "b", "the", "", "Ünïcode", "a somewhat longer key"] {
                let p = partition(key, n);
                assert!(p < n);
                assert_eq!(p, partition(key, n));
            }
        }
    }

    #[test]
    fn single_partition_takes_everything() {
        assert_eq!(partition("anything", 1), 0);
        assert_eq!(partition("", 1), 0);
    }
}
