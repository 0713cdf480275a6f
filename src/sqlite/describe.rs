//! Parameter type inference.
//!
//! SQLite does not report declared types for `?` placeholders, so they are
//! recovered from the statement text: INSERT value lists map onto the target
//! columns, `column <op> ?` comparisons onto the compared column, and `LIMIT`/
//! `OFFSET` onto BIGINT. Anything else is reported as unimplemented rather than
//! guessed.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::SqlMarshalError;
use crate::types::ColumnType;

use super::scanner::{ScannedSql, scan};

static INSERT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)^\s*INSERT\s+(?:OR\s+\w+\s+)?INTO\s+("[^"]+"|[\w.]+)\s*(?:\(([^)]*)\))?\s*VALUES\s*(.*?)\s*;?\s*$"#,
    )
    .expect("INSERT pattern is valid")
});

static COMPARISON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)("[^"]+"|[\w.]+)\s*(?:=|==|<>|!=|<=|>=|<|>|NOT\s+LIKE|LIKE|NOT\s+GLOB|GLOB)\s*$"#,
    )
    .expect("comparison pattern is valid")
});

static LIMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\b(?:LIMIT|OFFSET)\s*$").expect("limit pattern is valid"));

static TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\b(?:FROM|JOIN|UPDATE|INTO)\s+("[^"]+"|[\w.]+)"#)
        .expect("table pattern is valid")
});

/// Declared columns of one table, keyed by uppercased name.
struct TableColumns {
    ordered: Vec<String>,
    declared: HashMap<String, String>,
}

impl TableColumns {
    fn load(conn: &rusqlite::Connection, table: &str) -> Result<Self, SqlMarshalError> {
        let mut stmt = conn.prepare_cached("SELECT name, type FROM pragma_table_info(?1)")?;
        let mut rows = stmt.query([table])?;
        let mut ordered = Vec::new();
        let mut declared = HashMap::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            let decl: String = row.get(1)?;
            let key = name.to_uppercase();
            ordered.push(key.clone());
            declared.insert(key, decl);
        }
        if ordered.is_empty() {
            return Err(SqlMarshalError::ExecutionError(format!(
                "no such table: {table}"
            )));
        }
        Ok(Self { ordered, declared })
    }

    fn column_type(&self, table: &str, column: &str) -> Option<Result<ColumnType, SqlMarshalError>> {
        self.declared.get(column).map(|decl| {
            decl.parse::<ColumnType>()
                .map_err(|err| err.with_context(format!("column {table}.{column}")))
        })
    }
}

/// Infer the declared type of every `?` in `sql`, in order.
///
/// # Errors
/// Returns `Unimplemented` when a placeholder's column cannot be determined, or an
/// engine error if a referenced table cannot be inspected.
pub(super) fn parameter_types(
    conn: &rusqlite::Connection,
    sql: &str,
) -> Result<Vec<ColumnType>, SqlMarshalError> {
    let scanned = scan(sql);
    if scanned.placeholders.is_empty() {
        return Ok(Vec::new());
    }

    if let Some(types) = describe_insert(conn, &scanned)? {
        return Ok(types);
    }
    describe_predicates(conn, &scanned, sql)
}

fn describe_insert(
    conn: &rusqlite::Connection,
    scanned: &ScannedSql,
) -> Result<Option<Vec<ColumnType>>, SqlMarshalError> {
    let Some(caps) = INSERT_RE.captures(&scanned.masked) else {
        return Ok(None);
    };
    let table = unquote(&caps[1]);
    let values = caps.get(3).map_or("", |m| m.as_str());
    let Some(tuples) = split_tuples(values) else {
        return Ok(None);
    };

    let columns = TableColumns::load(conn, &table)?;
    let targets: Vec<String> = match caps.get(2) {
        Some(list) => list
            .as_str()
            .split(',')
            .map(|name| unquote(name.trim()).to_uppercase())
            .collect(),
        None => columns.ordered.clone(),
    };

    let mut types = Vec::with_capacity(scanned.placeholders.len());
    for tuple in &tuples {
        if tuple.len() != targets.len() {
            return Err(SqlMarshalError::ExecutionError(format!(
                "{} values for {} columns in INSERT into {table}",
                tuple.len(),
                targets.len()
            )));
        }
        for (item, column) in tuple.iter().zip(&targets) {
            match item.trim() {
                "?" => {
                    let column_type = columns.column_type(&table, column).ok_or_else(|| {
                        SqlMarshalError::ExecutionError(format!(
                            "table {table} has no column named {column}"
                        ))
                    })??;
                    types.push(column_type);
                }
                other if other.contains('?') => {
                    return Err(SqlMarshalError::Unimplemented(format!(
                        "cannot infer a parameter type inside the expression '{other}'"
                    )));
                }
                _ => {}
            }
        }
    }

    if types.len() != scanned.placeholders.len() {
        return Ok(None);
    }
    Ok(Some(types))
}

fn describe_predicates(
    conn: &rusqlite::Connection,
    scanned: &ScannedSql,
    sql: &str,
) -> Result<Vec<ColumnType>, SqlMarshalError> {
    let mut tables: Vec<(String, TableColumns)> = Vec::new();
    for caps in TABLE_RE.captures_iter(&scanned.masked) {
        let name = unquote(&caps[1]);
        if tables.iter().all(|(known, _)| !known.eq_ignore_ascii_case(&name)) {
            let columns = TableColumns::load(conn, &name)?;
            tables.push((name, columns));
        }
    }

    let mut types = Vec::with_capacity(scanned.placeholders.len());
    for (position, &offset) in scanned.placeholders.iter().enumerate() {
        let before = &scanned.masked[..offset];
        if LIMIT_RE.is_match(before) {
            types.push(ColumnType::BigInt);
            continue;
        }

        let column = COMPARISON_RE
            .captures(before)
            .map(|caps| unquote(caps[1].rsplit('.').next().unwrap_or(&caps[1])).to_uppercase());
        let resolved = column.and_then(|column| {
            tables
                .iter()
                .find_map(|(table, columns)| columns.column_type(table, &column))
        });
        match resolved {
            Some(column_type) => types.push(column_type?),
            None => {
                return Err(SqlMarshalError::Unimplemented(format!(
                    "cannot infer the type of parameter {} in: {sql}",
                    position + 1
                )));
            }
        }
    }
    Ok(types)
}

// Splits `(a, ?), (?, f(1, 2))` into its tuples of top-level items.
fn split_tuples(values: &str) -> Option<Vec<Vec<String>>> {
    let mut tuples = Vec::new();
    let mut depth = 0usize;
    let mut current: Vec<String> = Vec::new();
    let mut item = String::new();

    for ch in values.chars() {
        match ch {
            '(' => {
                if depth > 0 {
                    item.push(ch);
                }
                depth += 1;
            }
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    current.push(std::mem::take(&mut item));
                    tuples.push(std::mem::take(&mut current));
                } else {
                    item.push(ch);
                }
            }
            ',' if depth == 1 => current.push(std::mem::take(&mut item)),
            ',' | ' ' | '\t' | '\r' | '\n' if depth == 0 => {}
            _ if depth == 0 => return None,
            _ => item.push(ch),
        }
    }

    if depth != 0 || tuples.is_empty() {
        return None;
    }
    Some(tuples)
}

fn unquote(identifier: &str) -> String {
    identifier
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .map_or_else(|| identifier.to_string(), |inner| inner.replace("\"\"", "\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> rusqlite::Connection {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (i INTEGER, si SMALLINT, c10 CHAR(10), memo BLOB SUB_TYPE TEXT);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn insert_with_column_list() {
        let types =
            parameter_types(&conn(), "INSERT INTO t (si, c10) VALUES (?, ?)").unwrap();
        assert_eq!(
            types,
            vec![ColumnType::SmallInt, ColumnType::FixedChar { length: 10 }]
        );
    }

    #[test]
    fn insert_without_column_list_uses_table_order() {
        let types = parameter_types(&conn(), "insert into t values (?, 3, ?, ?)").unwrap();
        assert_eq!(types[0], ColumnType::Integer);
        assert_eq!(types[1], ColumnType::FixedChar { length: 10 });
        assert!(types[2].is_blob());
    }

    #[test]
    fn predicates_and_limit() {
        let types = parameter_types(
            &conn(),
            "SELECT i FROM t WHERE t.si >= ? AND \"C10\" = ? ORDER BY i LIMIT ?",
        )
        .unwrap();
        assert_eq!(
            types,
            vec![
                ColumnType::SmallInt,
                ColumnType::FixedChar { length: 10 },
                ColumnType::BigInt
            ]
        );
    }

    #[test]
    fn update_set_clause() {
        let types = parameter_types(&conn(), "UPDATE t SET si = ? WHERE i = ?").unwrap();
        assert_eq!(types, vec![ColumnType::SmallInt, ColumnType::Integer]);
    }

    #[test]
    fn unresolvable_parameter_is_unimplemented() {
        let err = parameter_types(&conn(), "SELECT ? + 1 FROM t").unwrap_err();
        assert!(matches!(err, SqlMarshalError::Unimplemented(_)));
    }

    #[test]
    fn tuples_split_at_top_level() {
        let tuples = split_tuples("(?, f(1, 2)), (3, ?)").unwrap();
        assert_eq!(tuples.len(), 2);
        assert_eq!(tuples[0], vec!["?".to_string(), " f(1, 2)".to_string()]);
        assert_eq!(tuples[1][1].trim(), "?");
        assert!(split_tuples("(?, ?) garbage").is_none());
    }
}
