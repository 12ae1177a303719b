//! Threshold checks deciding which keys get reported.

/// Big key check.
///
/// A non-zero length threshold takes precedence: when set, only the
/// serialized length is compared and the cardinality is ignored. The
/// cardinality threshold applies only when no length threshold is set.
/// With both thresholds at zero nothing qualifies.
pub fn is_big_key(
    serialized_length: u64,
    cardinality: u64,
    length_threshold: u64,
    cardinality_threshold: u64,
) -> bool {
    if length_threshold != 0 {
        serialized_length >= length_threshold
    } else if cardinality_threshold != 0 {
        cardinality >= cardinality_threshold
    } else {
        false
    }
}

/// Hot key check. A zero threshold lets every key through.
pub fn is_hot_key(frequency: u64, threshold: u64) -> bool {
    frequency >= threshold
}
