use crate::application::repos::StoreError;

pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        decode @ (sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::TypeNotFound { .. }) => StoreError::decode(decode),
        sqlx::Error::Database(db) if db.message().contains("does not exist") => {
            StoreError::Unavailable(format!("schema mismatch: {}", db.message()))
        }
        other => StoreError::unavailable(other),
    }
}
