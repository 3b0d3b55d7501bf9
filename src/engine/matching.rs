//! Face template matching.
//!
//! A face template is a fixed-length embedding vector. Matching is a linear
//! nearest-neighbor search under a Euclidean distance tolerance; at
//! back-office roster sizes this needs no index.

/// Maximum embedding distance still considered a match. Stricter than the
/// usual 0.6 so a stranger is rejected rather than matched to the closest
/// registered face.
pub const DEFAULT_TOLERANCE: f64 = 0.45;

/// The winning candidate of a roster search.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceMatch {
    pub employee_id: u64,
    pub distance: f64,
    /// `1 - distance`, clamped to [0, 1] and rounded to two decimals.
    pub confidence: f64,
}

/// Euclidean distance between two embeddings, or `None` when the
/// dimensionalities differ.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    Some(
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f64>()
            .sqrt(),
    )
}

/// Search every candidate and return the one with the minimum distance, if
/// that distance is strictly under `tolerance`.
///
/// Candidates whose embedding length differs from the query are skipped, not
/// fatal. Candidates tied on distance resolve to the first one in input
/// order. An empty pool or a best distance at/over tolerance is a plain
/// no-match, never an error.
pub fn best_match<'a, I>(query: &[f64], candidates: I, tolerance: f64) -> Option<FaceMatch>
where
    I: IntoIterator<Item = (u64, &'a [f64])>,
{
    let mut best: Option<(u64, f64)> = None;

    for (employee_id, embedding) in candidates {
        let Some(distance) = euclidean_distance(query, embedding) else {
            continue;
        };
        // Strict improvement only, so the first candidate wins ties.
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((employee_id, distance));
        }
    }

    match best {
        Some((employee_id, distance)) if distance < tolerance => Some(FaceMatch {
            employee_id,
            distance,
            confidence: super::round2((1.0 - distance).clamp(0.0, 1.0)),
        }),
        _ => None,
    }
}

/// Decode a stored face template. Templates are little-endian `f64` blobs;
/// a byte length that is not a multiple of 8 means a corrupt row.
pub fn embedding_from_bytes(bytes: &[u8]) -> Option<Vec<f64>> {
    if bytes.is_empty() || bytes.len() % 8 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect(),
    )
}

/// Encode a face template for storage.
pub fn embedding_to_bytes(embedding: &[f64]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_candidate_matches_with_full_confidence() {
        let query = vec![0.1, 0.2, 0.3];
        let pool = vec![(7u64, query.clone())];
        let m = best_match(
            &query,
            pool.iter().map(|(id, e)| (*id, e.as_slice())),
            DEFAULT_TOLERANCE,
        )
        .unwrap();
        assert_eq!(m.employee_id, 7);
        assert_eq!(m.distance, 0.0);
        assert_eq!(m.confidence, 1.0);
    }

    #[test]
    fn empty_pool_is_no_match_not_an_error() {
        let query = vec![0.1, 0.2];
        let pool: Vec<(u64, Vec<f64>)> = Vec::new();
        assert!(
            best_match(
                &query,
                pool.iter().map(|(id, e)| (*id, e.as_slice())),
                DEFAULT_TOLERANCE
            )
            .is_none()
        );
    }

    #[test]
    fn best_distance_at_or_over_tolerance_is_no_match() {
        let query = vec![0.0, 0.0];
        let pool = vec![(1u64, vec![0.5, 0.0]), (2u64, vec![3.0, 4.0])];
        // Candidate 1 sits exactly at the tolerance; the comparison is
        // strict, so it does not match.
        assert!(
            best_match(&query, pool.iter().map(|(id, e)| (*id, e.as_slice())), 0.5).is_none()
        );
    }

    #[test]
    fn minimum_distance_candidate_wins() {
        let query = vec![0.0, 0.0];
        let pool = vec![(1u64, vec![0.3, 0.0]), (2u64, vec![0.1, 0.0])];
        let m = best_match(
            &query,
            pool.iter().map(|(id, e)| (*id, e.as_slice())),
            DEFAULT_TOLERANCE,
        )
        .unwrap();
        assert_eq!(m.employee_id, 2);
    }

    #[test]
    fn ties_keep_first_candidate_in_input_order() {
        let query = vec![0.0, 0.0];
        let pool = vec![(5u64, vec![0.2, 0.0]), (9u64, vec![-0.2, 0.0])];
        let m = best_match(
            &query,
            pool.iter().map(|(id, e)| (*id, e.as_slice())),
            DEFAULT_TOLERANCE,
        )
        .unwrap();
        assert_eq!(m.employee_id, 5);
    }

    #[test]
    fn mismatched_dimensionality_is_skipped_not_fatal() {
        let query = vec![0.0, 0.0];
        let pool = vec![(1u64, vec![0.1, 0.0, 0.0]), (2u64, vec![0.2, 0.0])];
        let m = best_match(
            &query,
            pool.iter().map(|(id, e)| (*id, e.as_slice())),
            DEFAULT_TOLERANCE,
        )
        .unwrap();
        // Candidate 1 is closer but has the wrong dimensionality.
        assert_eq!(m.employee_id, 2);
    }

    #[test]
    fn confidence_is_clamped_and_rounded() {
        let query = vec![0.0];
        let pool = vec![(1u64, vec![0.333])];
        let m = best_match(
            &query,
            pool.iter().map(|(id, e)| (*id, e.as_slice())),
            DEFAULT_TOLERANCE,
        )
        .unwrap();
        assert_eq!(m.confidence, 0.67);
    }

    #[test]
    fn embedding_bytes_round_trip() {
        let embedding = vec![0.125, -3.5, 42.0];
        let bytes = embedding_to_bytes(&embedding);
        assert_eq!(embedding_from_bytes(&bytes), Some(embedding));
    }

    #[test]
    fn truncated_blob_decodes_to_none() {
        assert_eq!(embedding_from_bytes(&[0u8; 12]), None);
        assert_eq!(embedding_from_bytes(&[]), None);
    }
}
