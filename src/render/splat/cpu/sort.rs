//! Least-significant-digit radix sort of key-value pairs.

use rayon::{iter::ParallelIterator, slice::ParallelSlice};

/// Number of bits per digit.
pub const RADIX_BIT_COUNT: u32 = 8;
/// Number of digit values.
pub const RADIX_COUNT: usize = 1 << RADIX_BIT_COUNT;
/// Number of keys per histogram tile.
pub const TILE_SIZE: usize = 1024;

/// Sorting `values` by `keys` in ascending order.
///
/// Only the lowest `key_bit_count` bits of keys are compared.
/// It is stable, so pairs with equal keys keep their input order.
pub fn sort(
    keys: Vec<u32>,
    values: Vec<u32>,
    key_bit_count: u32,
) -> (Vec<u32>, Vec<u32>) {
    debug_assert_eq!(keys.len(), values.len());

    let pass_count = key_bit_count.div_ceil(RADIX_BIT_COUNT).min(4);
    let mut keys = keys;
    let mut values = values;
    let mut keys_next = vec![0; keys.len()];
    let mut values_next = vec![0; values.len()];

    for pass in 0..pass_count {
        let radix_shift = pass * RADIX_BIT_COUNT;
        let digit = |key: u32| ((key >> radix_shift) as usize) & (RADIX_COUNT - 1);

        // Histograms per tile
        let histograms = keys
            .par_chunks(TILE_SIZE)
            .map(|tile| {
                let mut histogram = [0_usize; RADIX_COUNT];
                tile.iter().for_each(|&key| histogram[digit(key)] += 1);
                histogram
            })
            .collect::<Vec<_>>();

        // Exclusive offsets in radix-major order
        let mut offsets = vec![[0_usize; RADIX_COUNT]; histograms.len()];
        let mut offset = 0;
        for radix in 0..RADIX_COUNT {
            for (tile, histogram) in histograms.iter().enumerate() {
                offsets[tile][radix] = offset;
                offset += histogram[radix];
            }
        }

        // Scattering in order
        for (tile, (keys_tile, values_tile)) in keys
            .chunks(TILE_SIZE)
            .zip(values.chunks(TILE_SIZE))
            .enumerate()
        {
            let offsets = &mut offsets[tile];
            for (&key, &value) in keys_tile.iter().zip(values_tile) {
                let target = &mut offsets[digit(key)];
                keys_next[*target] = key;
                values_next[*target] = value;
                *target += 1;
            }
        }

        std::mem::swap(&mut keys, &mut keys_next);
        std::mem::swap(&mut values, &mut values_next);
    }

    (keys, values)
}
