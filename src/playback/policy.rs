//! Index arithmetic for queue navigation.

use rand::Rng;

/// Wrap a requested index into the queue: below zero selects the last
/// track, past the end selects the first.
pub fn wrap_index(index: isize, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    if index < 0 {
        Some(len - 1)
    } else if index as usize >= len {
        Some(0)
    } else {
        Some(index as usize)
    }
}

/// Uniform pick in `0..len` that avoids `current` when there is a choice.
pub fn random_index_excluding<R: Rng + ?Sized>(rng: &mut R, len: usize, current: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    loop {
        let i = rng.random_range(0..len);
        if i != current {
            return i;
        }
    }
}
