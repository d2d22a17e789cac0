// src/common/db_utils.rs

use crate::common::error::AppError;

/// Converte violação de chave única em `AppError::Duplicate`, o resto segue como erro de banco.
pub(crate) fn map_unique_violation(e: sqlx::Error, message: impl Into<String>) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::Duplicate(message.into());
        }
    }
    e.into()
}

/// Remove ids repetidos preservando a ordem de chegada.
pub(crate) fn dedup_ids<T: PartialEq + Copy>(ids: &[T]) -> Vec<T> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        assert_eq!(dedup_ids(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert!(dedup_ids::<u8>(&[]).is_empty());
    }

    #[test]
    fn non_database_errors_are_not_duplicates() {
        let err = map_unique_violation(sqlx::Error::RowNotFound, "dup");
        assert!(matches!(err, AppError::DatabaseError(_)));
    }
}
