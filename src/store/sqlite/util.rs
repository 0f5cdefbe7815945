use std::path::Path;

use rusqlite::types::ValueRef;

use super::super::StoreError;

/// Translate rusqlite errors into friendlier StoreError variants.
pub(super) fn map_sql_error(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(sql_err, _)
            if sql_err.code == rusqlite::ErrorCode::DatabaseBusy
                || sql_err.code == rusqlite::ErrorCode::DatabaseLocked =>
        {
            StoreError::Busy
        }
        rusqlite::Error::InvalidQuery
        | rusqlite::Error::InvalidParameterName(_)
        | rusqlite::Error::MultipleStatement => StoreError::Unexpected,
        other => StoreError::Sql(other),
    }
}

/// Read a numeric column leniently: integers widen, numeric text parses.
///
/// Returns `None` for NULL, blobs, non-numeric text and non-finite values
/// such as `NaN` or `inf`.
pub(super) fn numeric_column(value: ValueRef<'_>) -> Option<f64> {
    let number = match value {
        ValueRef::Real(v) => v,
        ValueRef::Integer(v) => v as f64,
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok()?,
        ValueRef::Null | ValueRef::Blob(_) => return None,
    };
    number.is_finite().then_some(number)
}

pub(super) fn create_parent_if_needed(path: &Path) -> Result<(), StoreError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
        path: parent.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_column_accepts_numbers_and_numeric_text() {
        assert_eq!(numeric_column(ValueRef::Real(1.5)), Some(1.5));
        assert_eq!(numeric_column(ValueRef::Integer(7)), Some(7.0));
        assert_eq!(numeric_column(ValueRef::Text(b" 6.25 ")), Some(6.25));
        assert_eq!(numeric_column(ValueRef::Text(b"n/a")), None);
        assert_eq!(numeric_column(ValueRef::Null), None);
        assert_eq!(numeric_column(ValueRef::Blob(&[1, 2])), None);
    }

    #[test]
    fn numeric_column_rejects_non_finite_values() {
        assert_eq!(numeric_column(ValueRef::Text(b"NaN")), None);
        assert_eq!(numeric_column(ValueRef::Text(b"-nan")), None);
        assert_eq!(numeric_column(ValueRef::Text(b"inf")), None);
        assert_eq!(numeric_column(ValueRef::Real(f64::INFINITY)), None);
        assert_eq!(numeric_column(ValueRef::Real(f64::NAN)), None);
    }

    #[test]
    fn busy_errors_map_to_busy() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(map_sql_error(err), StoreError::Busy));
    }
}
