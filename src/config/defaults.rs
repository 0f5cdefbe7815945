use crate::estimator::MAX_REFERENCE_ROWS;

pub(super) fn default_bind_addr() -> String {
    "127.0.0.1:8787".to_string()
}

pub(super) fn default_reference_limit() -> usize {
    MAX_REFERENCE_ROWS
}

pub(super) fn clamp_reference_limit(value: usize) -> usize {
    value.clamp(1, MAX_REFERENCE_ROWS)
}
