//! Threshold band lookup.
//!
//! Scoring rules are expressed as ordered tables of `(lower_bound, value)`
//! pairs, highest bound first. A single lookup walks the table and returns the
//! value of the first band whose lower bound the input reaches, so each table
//! can be tested on its own.

/// Return the value of the first band whose inclusive lower bound is `<= input`.
///
/// Tables must be sorted by descending lower bound. Returns `None` if the
/// input is below every bound (a table ending in a `0` bound is total over `u32`).
#[must_use]
pub fn band_lookup<T: Copy>(table: &[(u32, T)], input: u32) -> Option<T> {
    table
        .iter()
        .find(|(lower_bound, _)| input >= *lower_bound)
        .map(|(_, value)| *value)
}

/// Whether a table is sorted by strictly descending lower bound.
#[must_use]
pub fn is_well_ordered<T>(table: &[(u32, T)]) -> bool {
    table.windows(2).all(|pair| match pair {
        [(a, _), (b, _)] => a > b,
        _ => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[(u32, char)] = &[(10, 'c'), (5, 'b'), (1, 'a')];

    #[test]
    fn test_lookup_hits_band_boundaries() {
        assert_eq!(band_lookup(TABLE, 10), Some('c'));
        assert_eq!(band_lookup(TABLE, 9), Some('b'));
        assert_eq!(band_lookup(TABLE, 5), Some('b'));
        assert_eq!(band_lookup(TABLE, 1), Some('a'));
    }

    #[test]
    fn test_lookup_below_all_bounds() {
        assert_eq!(band_lookup(TABLE, 0), None);
    }

    #[test]
    fn test_well_ordered() {
        assert!(is_well_ordered(TABLE));
        assert!(!is_well_ordered(&[(1, ()), (5, ())]));
        assert!(is_well_ordered::<()>(&[]));
    }
}
