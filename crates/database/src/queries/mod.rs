use charging::database::DatabaseError;

pub mod station;

pub(crate) fn convert_error(why: sqlx::Error) -> DatabaseError {
    match why {
        sqlx::Error::RowNotFound => DatabaseError::NotFound,
        _ => DatabaseError::Other(Box::new(why)),
    }
}

/// Builds a single-row `INSERT` that overwrites every non-key column when a
/// row with the same key already exists.
pub fn upsert_statement(table: &str, columns: &[&str], conflict_set: &[&str]) -> String {
    let placeholders = (1..=columns.len())
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let updates = columns
        .iter()
        .filter(|column| !conflict_set.contains(column))
        .map(|column| format!("{column} = EXCLUDED.{column}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders}) ON CONFLICT ({}) DO UPDATE SET {updates};",
        columns.join(", "),
        conflict_set.join(", "),
    )
}

/// Builds a `SELECT` of `columns` from `table`, followed by `tail`.
pub fn select_statement(table: &str, columns: &[&str], tail: &str) -> String {
    format!("SELECT {} FROM {table} {tail};", columns.join(", "))
}
