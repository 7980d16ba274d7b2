//! Page spec parsing and selection validation
//!
//! Tools accept human-entered page specs like "1,3-5,10" (1-indexed, inclusive
//! ranges). Parsing is deliberately best-effort: malformed or out-of-range
//! tokens are dropped rather than rejected, so a mostly-right spec still acts
//! on the pages it does name. Reordering is the opposite: a reorder must
//! account for every page exactly once, so `validate_reorder` rejects on the
//! first anomaly instead of dropping anything. The two policies are separate
//! on purpose.

use crate::error::PageForgeError;
use std::collections::BTreeSet;

/// Parse a page spec string into sorted, deduplicated 0-indexed page indices.
///
/// # Arguments
/// * `spec` - Spec string like "1-3, 5, 8-10" (1-indexed on input)
/// * `page_count` - Total pages in the document (for bounds checking)
///
/// # Returns
/// Sorted Vec of 0-indexed page indices. Bad tokens are silently dropped;
/// range endpoints outside the document are clamped into it. Deletion-style
/// consumers walk the result high-to-low so earlier removals never shift a
/// not-yet-removed index.
pub fn parse_page_spec(spec: &str, page_count: usize) -> Vec<usize> {
    let mut pages = BTreeSet::new();

    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if part.contains('-') {
            // Range like "1-3"
            let bounds: Vec<&str> = part.split('-').collect();
            if bounds.len() == 2 {
                if let (Ok(start), Ok(end)) = (
                    bounds[0].trim().parse::<usize>(),
                    bounds[1].trim().parse::<usize>(),
                ) {
                    let start = start.max(1);
                    let end = end.min(page_count);
                    for n in start..=end {
                        pages.insert(n - 1);
                    }
                }
            }
        } else {
            // Single page like "5"
            if let Ok(n) = part.parse::<usize>() {
                if n >= 1 && n <= page_count {
                    pages.insert(n - 1);
                }
            }
        }
    }

    pages.into_iter().collect()
}

/// Validate a reorder permutation over a document of `page_count` pages.
///
/// `order` is 0-indexed: output page N takes its content from source page
/// `order[N]`. Every source page must appear exactly once. The error names
/// the first offending value; nothing is ever dropped or repaired here, since
/// a partial reorder silently loses pages.
pub fn validate_reorder(order: &[usize], page_count: usize) -> Result<(), PageForgeError> {
    if order.len() != page_count {
        return Err(PageForgeError::ValidationError(format!(
            "Reorder must list all {} pages, got {}",
            page_count,
            order.len()
        )));
    }

    let mut seen = vec![false; page_count];
    for &index in order {
        if index >= page_count {
            return Err(PageForgeError::ValidationError(format!(
                "Page index {} out of range (document has {} pages)",
                index, page_count
            )));
        }
        if seen[index] {
            return Err(PageForgeError::ValidationError(format!(
                "Page index {} appears more than once",
                index
            )));
        }
        seen[index] = true;
    }

    Ok(())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: Result is always sorted ascending
        #[test]
        fn result_is_sorted(spec in "[0-9, -]+", page_count in 1usize..100) {
            let result = parse_page_spec(&spec, page_count);
            let mut sorted = result.clone();
            sorted.sort();
            prop_assert_eq!(result, sorted, "Result should be sorted");
        }

        /// Property: Result has no duplicates
        #[test]
        fn no_duplicates(spec in "[0-9, -]+", page_count in 1usize..100) {
            let result = parse_page_spec(&spec, page_count);
            let unique: BTreeSet<_> = result.iter().collect();
            prop_assert_eq!(result.len(), unique.len(), "Should have no duplicates");
        }

        /// Property: All indices are within 0..page_count
        #[test]
        fn all_indices_in_bounds(spec in "[0-9, -]+", page_count in 1usize..100) {
            let result = parse_page_spec(&spec, page_count);
            for index in result {
                prop_assert!(index < page_count, "Index {} should be < {}", index, page_count);
            }
        }

        /// Property: Empty input produces empty output
        #[test]
        fn empty_input_empty_output(page_count in 1usize..100) {
            let result = parse_page_spec("", page_count);
            prop_assert!(result.is_empty(), "Empty input should produce empty output");
        }

        /// Property: A single valid page maps to its 0-indexed position
        #[test]
        fn single_page_shifts_down(page in 1usize..=100, page_count in 1usize..=100) {
            if page <= page_count {
                let result = parse_page_spec(&page.to_string(), page_count);
                prop_assert_eq!(result, vec![page - 1]);
            }
        }

        /// Property: Range 1-N with N pages selects every index
        #[test]
        fn full_range_selects_all(page_count in 1usize..50) {
            let spec = format!("1-{}", page_count);
            let result = parse_page_spec(&spec, page_count);
            let expected: Vec<usize> = (0..page_count).collect();
            prop_assert_eq!(result, expected, "Full range should select all pages");
        }

        /// Property: Order of tokens in the spec doesn't affect output
        #[test]
        fn order_independent(a in 1usize..=10, b in 1usize..=10, c in 1usize..=10) {
            let page_count = 10;
            let r1 = parse_page_spec(&format!("{}, {}, {}", a, b, c), page_count);
            let r2 = parse_page_spec(&format!("{}, {}, {}", c, a, b), page_count);
            let r3 = parse_page_spec(&format!("{}, {}, {}", b, c, a), page_count);

            prop_assert_eq!(&r1, &r2, "Order should not matter");
            prop_assert_eq!(&r2, &r3, "Order should not matter");
        }

        /// Property: Any permutation of 0..n validates for reorder
        #[test]
        fn shuffled_identity_validates(n in 1usize..20, seed in 0u64..1000) {
            let mut order: Vec<usize> = (0..n).collect();
            // Cheap deterministic shuffle
            let mut state = seed;
            for i in (1..order.len()).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let j = (state >> 33) as usize % (i + 1);
                order.swap(i, j);
            }
            prop_assert!(validate_reorder(&order, n).is_ok());
        }

        /// Property: Dropping any entry from a permutation fails validation
        #[test]
        fn short_order_rejected(n in 2usize..20) {
            let order: Vec<usize> = (0..n - 1).collect();
            prop_assert!(validate_reorder(&order, n).is_err());
        }
    }
}
