use model::stats::NamedCount;
use sqlx::prelude::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct TotalsRow {
    pub total: i64,
    pub offline: i64,
    pub tesla: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct NamedCountRow {
    pub name: String,
    pub count: i64,
}

impl From<NamedCountRow> for NamedCount {
    fn from(row: NamedCountRow) -> Self {
        Self {
            name: row.name,
            count: row.count.max(0) as u64,
        }
    }
}
