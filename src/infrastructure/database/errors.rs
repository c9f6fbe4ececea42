//! Classification of sqlx errors into the compliance error taxonomy.

use crate::domain::errors::ComplianceError;

const SERVICE: &str = "database";

/// SQLSTATE codes the store distinguishes.
mod sqlstate {
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const CHECK_VIOLATION: &str = "23514";
    pub const ARRAY_SUBSCRIPT_ERROR: &str = "2202E";
    pub const UNDEFINED_TABLE: &str = "42P01";
    pub const UNDEFINED_OBJECT: &str = "42704";
    pub const UNDEFINED_FUNCTION: &str = "42883";
    pub const DUPLICATE_OBJECT: &str = "42710";
}

/// SQLSTATE of a database-reported error.
pub fn sqlstate(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code.into_owned())
}

/// True when the statement referenced a table that does not exist.
pub fn is_undefined_table(err: &sqlx::Error) -> bool {
    sqlstate(err).as_deref() == Some(sqlstate::UNDEFINED_TABLE)
}

/// Maps an error raised while reading or writing rows.
pub fn map_query_error(err: sqlx::Error, context: &str) -> ComplianceError {
    match sqlstate(&err).as_deref() {
        Some(sqlstate::UNIQUE_VIOLATION) => {
            ComplianceError::Schema(format!("{context}: duplicate document id ({err})"))
        }
        Some(sqlstate::CHECK_VIOLATION | sqlstate::ARRAY_SUBSCRIPT_ERROR) => {
            ComplianceError::Data(format!("{context}: vector rejected by table ({err})"))
        }
        Some(sqlstate::UNDEFINED_TABLE) => ComplianceError::Schema(format!(
            "{context}: corpus table does not exist, run ingest first ({err})"
        )),
        _ => ComplianceError::external(SERVICE, format!("{context}: {err}")),
    }
}

/// Maps an error raised by a DDL statement or a store function call.
///
/// Anything the server rejected is a schema problem; I/O failures stay external.
pub fn map_ddl_error(err: sqlx::Error, context: &str) -> ComplianceError {
    match &err {
        sqlx::Error::Database(_) => {
            let hint = match sqlstate(&err).as_deref() {
                Some(sqlstate::UNDEFINED_FUNCTION | sqlstate::UNDEFINED_OBJECT) => {
                    " (is the embedding/index extension installed?)"
                }
                Some(sqlstate::DUPLICATE_OBJECT) => " (object already exists)",
                _ => "",
            };
            ComplianceError::Schema(format!("{context}: {err}{hint}"))
        }
        _ => ComplianceError::external(SERVICE, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorKind;

    #[test]
    fn test_io_errors_are_external() {
        let err = map_query_error(sqlx::Error::PoolTimedOut, "count");
        assert_eq!(err.kind(), ErrorKind::ExternalService);
        let err = map_ddl_error(sqlx::Error::PoolClosed, "create table");
        assert_eq!(err.kind(), ErrorKind::ExternalService);
    }

    #[test]
    fn test_row_not_found_is_external() {
        assert!(!is_undefined_table(&sqlx::Error::RowNotFound));
        let err = map_query_error(sqlx::Error::RowNotFound, "max id");
        assert!(err.to_string().contains("max id"));
    }
}
