use chrono::{DateTime, NaiveDate, Utc};
use sqlx::MySqlPool;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug)]
pub enum SqlValue {
    String(String),
    U64(u64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Null,
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::String(v)
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        SqlValue::U64(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        match v {
            Some(s) => SqlValue::String(s),
            None => SqlValue::Null,
        }
    }
}

/// Dynamic `UPDATE` statement for partial updates. Column names are supplied
/// by handlers as string literals, never taken from request input.
#[derive(Debug)]
pub struct UpdateBuilder {
    table: &'static str,
    columns: Vec<&'static str>,
    values: Vec<SqlValue>,
}

impl UpdateBuilder {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn set(&mut self, column: &'static str, value: impl Into<SqlValue>) -> &mut Self {
        self.columns.push(column);
        self.values.push(value.into());
        self
    }

    /// Adds the assignment only when the payload supplied the field.
    pub fn set_opt(&mut self, column: &'static str, value: Option<impl Into<SqlValue>>) -> &mut Self {
        if let Some(v) = value {
            self.set(column, v);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn build(self, id_column: &str, id: u64) -> SqlUpdate {
        let set_clause = self
            .columns
            .iter()
            .map(|c| format!("{c} = ?"))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!("UPDATE {} SET {} WHERE {} = ?", self.table, set_clause, id_column);

        let mut values = self.values;
        values.push(SqlValue::U64(id));

        SqlUpdate { sql, values }
    }
}

#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_update_for_supplied_fields_only() {
        let mut builder = UpdateBuilder::new("tasks");
        builder
            .set_opt("title", Some("Ship it".to_string()))
            .set_opt("description", None::<String>)
            .set("status", "Completed".to_string());

        let update = builder.build("id", 42);
        assert_eq!(update.sql, "UPDATE tasks SET title = ?, status = ? WHERE id = ?");
        assert_eq!(update.values.len(), 3);
        assert!(matches!(update.values[2], SqlValue::U64(42)));
    }

    #[test]
    fn empty_builder_is_detectable() {
        let mut builder = UpdateBuilder::new("users");
        assert!(builder.is_empty());
        builder.set_opt("name", None::<String>);
        assert!(builder.is_empty());
        builder.set("name", "x".to_string());
        assert!(!builder.is_empty());
    }

    #[test]
    fn explicit_null_clears_a_column() {
        let mut builder = UpdateBuilder::new("customer_measurements");
        builder.set("note", SqlValue::Null);
        let update = builder.build("id", 1);
        assert_eq!(
            update.sql,
            "UPDATE customer_measurements SET note = ? WHERE id = ?"
        );
        assert!(matches!(update.values[0], SqlValue::Null));
    }
}
