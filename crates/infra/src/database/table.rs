//! Negotiation table naming and SQL
//!
//! Both stores share the column layout; only placeholders and type casts
//! differ between dialects.

use dealsync_domain::{DealSyncError, Result, StoreConfig};

/// Persisted columns, in bind order. `crm_id` is the natural key.
pub const COLUMNS: [&str; 11] = [
    "crm_id",
    "criada_em",
    "valor_recorrente",
    "valor_nao_recorrente",
    "previsao_fechamento",
    "status",
    "funil",
    "ordem_funil",
    "estagio",
    "ordem_estagio",
    "data_fechamento",
];

/// Postgres parameter types, aligned with [`COLUMNS`].
const PG_CASTS: [&str; 11] = [
    "text",
    "timestamptz",
    "float8",
    "float8",
    "date",
    "text",
    "text",
    "int4",
    "text",
    "int4",
    "timestamptz",
];

/// SQL dialect of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `$n::type` placeholders
    Postgres,
    /// `?n` placeholders
    Sqlite,
}

impl Dialect {
    fn param(self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${}::{}", index + 1, PG_CASTS[index]),
            Self::Sqlite => format!("?{}", index + 1),
        }
    }

    fn column(self, index: usize) -> String {
        match self {
            Self::Postgres => format!("{}::{}", quote_ident(COLUMNS[index]), PG_CASTS[index]),
            Self::Sqlite => quote_ident(COLUMNS[index]),
        }
    }
}

/// Optionally schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: Option<String>,
    name: String,
}

impl TableName {
    /// Blank schemas are dropped; a blank name is a config error.
    pub fn new(schema: Option<&str>, name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DealSyncError::Config("table name must not be empty".into()));
        }
        let schema = schema.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        Ok(Self { schema, name: name.to_string() })
    }

    /// Postgres table from config (schema-qualified when a schema is set).
    pub fn from_store_config(config: &StoreConfig) -> Result<Self> {
        Self::new(config.schema.as_deref(), &config.table)
    }

    /// Same table without its schema, for single-schema stores.
    pub fn unqualified(&self) -> Self {
        Self { schema: None, name: self.name.clone() }
    }

    /// Quoted identifier, e.g. `"comercial"."negociacoes"`.
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.name)),
            None => quote_ident(&self.name),
        }
    }

    /// Every column of every row, in [`COLUMNS`] order.
    pub fn select_all_sql(&self, dialect: Dialect) -> String {
        let columns: Vec<String> = (0..COLUMNS.len()).map(|i| dialect.column(i)).collect();
        format!("SELECT {} FROM {}", columns.join(", "), self.quoted())
    }

    /// Single-row insert binding [`COLUMNS`] in order.
    pub fn insert_sql(&self, dialect: Dialect) -> String {
        let columns: Vec<String> = COLUMNS.iter().map(|c| quote_ident(c)).collect();
        let params: Vec<String> = (0..COLUMNS.len()).map(|i| dialect.param(i)).collect();
        format!("INSERT INTO {} ({}) VALUES ({})", self.quoted(), columns.join(", "), params.join(", "))
    }

    /// Full-row overwrite keyed by `crm_id` (first parameter).
    pub fn update_sql(&self, dialect: Dialect) -> String {
        let assignments: Vec<String> = (1..COLUMNS.len())
            .map(|i| format!("{} = {}", quote_ident(COLUMNS[i]), dialect.param(i)))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE {} = {}",
            self.quoted(),
            assignments.join(", "),
            quote_ident(COLUMNS[0]),
            dialect.param(0)
        )
    }

    /// Delete by id. Postgres binds a `text[]`, SQLite a single id.
    pub fn delete_sql(&self, dialect: Dialect) -> String {
        match dialect {
            Dialect::Postgres => {
                format!("DELETE FROM {} WHERE {} = ANY($1::text[])", self.quoted(), quote_ident(COLUMNS[0]))
            }
            Dialect::Sqlite => {
                format!("DELETE FROM {} WHERE {} = ?1", self.quoted(), quote_ident(COLUMNS[0]))
            }
        }
    }

    /// Unconditional delete.
    pub fn delete_all_sql(&self) -> String {
        format!("DELETE FROM {}", self.quoted())
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableName {
        TableName::new(Some("comercial"), "negociacoes").unwrap()
    }

    #[test]
    fn quotes_schema_and_table() {
        assert_eq!(table().quoted(), r#""comercial"."negociacoes""#);
        assert_eq!(table().unqualified().quoted(), r#""negociacoes""#);
        assert_eq!(TableName::new(Some("  "), "t").unwrap().quoted(), r#""t""#);
    }

    #[test]
    fn embedded_quotes_are_escaped() {
        let table = TableName::new(None, r#"bad"name"#).unwrap();
        assert_eq!(table.quoted(), r#""bad""name""#);
    }

    #[test]
    fn empty_table_name_is_a_config_error() {
        assert!(matches!(TableName::new(None, " "), Err(DealSyncError::Config(_))));
    }

    #[test]
    fn postgres_insert_types_every_parameter() {
        let sql = table().insert_sql(Dialect::Postgres);
        assert!(sql.starts_with(r#"INSERT INTO "comercial"."negociacoes" ("crm_id", "criada_em""#));
        assert!(sql.contains("$1::text, $2::timestamptz, $3::float8"));
        assert!(sql.ends_with("$11::timestamptz)"));
    }

    #[test]
    fn update_keys_on_crm_id() {
        let sql = table().unqualified().update_sql(Dialect::Sqlite);
        assert!(sql.starts_with(r#"UPDATE "negociacoes" SET "criada_em" = ?2"#));
        assert!(sql.ends_with(r#"WHERE "crm_id" = ?1"#));
    }

    #[test]
    fn postgres_delete_binds_an_array() {
        assert_eq!(
            table().delete_sql(Dialect::Postgres),
            r#"DELETE FROM "comercial"."negociacoes" WHERE "crm_id" = ANY($1::text[])"#
        );
    }
}
