use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use sql_marshal::prelude::*;

use crate::args::{RunConfig, Scenario};

/// Checks made by one scenario and the ones that did not hold.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub(crate) scenario: Scenario,
    pub(crate) checks: usize,
    pub(crate) failures: Vec<String>,
}

impl Outcome {
    fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            checks: 0,
            failures: Vec::new(),
        }
    }

    fn check(&mut self, ok: bool, describe: impl FnOnce() -> String) {
        self.checks += 1;
        if !ok {
            let failure = describe();
            tracing::warn!(scenario = ?self.scenario, "{}", failure);
            self.failures.push(failure);
        }
    }
}

pub(crate) fn run(
    scenario: Scenario,
    config: &RunConfig,
    conn: &mut Connection<SqliteEngine>,
    rng: &mut ChaCha8Rng,
) -> Result<Outcome, SqlMarshalError> {
    match scenario {
        Scenario::BasicTypes => basic_types(config, conn),
        Scenario::TextBlob => text_blob(config, conn),
        Scenario::BinaryBlob => binary_blob(config, conn, rng),
        Scenario::IncorrectTypes => incorrect_types(conn),
    }
}

const TYPED_COLUMNS: [(&str, &str); 13] = [
    ("I", "INTEGER"),
    ("SI", "SMALLINT"),
    ("BI", "BIGINT"),
    ("F", "FLOAT"),
    ("D", "DOUBLE PRECISION"),
    ("C", "CHAR"),
    ("C10", "CHAR(10)"),
    ("VC", "VARCHAR(1)"),
    ("VC10", "VARCHAR(10)"),
    ("VC10000", "VARCHAR(10000)"),
    ("DT", "DATE"),
    ("TM", "TIME"),
    ("TS", "TIMESTAMP"),
];

fn column_list() -> String {
    TYPED_COLUMNS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn generated_row(i: u32) -> Vec<HostValue> {
    let c = char::from_u32(i + 64).map(String::from).unwrap_or_default();
    let stamp = FixedOffset::east_opt(2 * 3600)
        .and_then(|offset| offset.with_ymd_and_hms(2006, 1, 1, i, i, i).single())
        .map_or(HostValue::Null, HostValue::from);
    vec![
        i64::from(i).into(),
        i64::from(i).into(),
        (i64::from(i) * 1_000_000_000).into(),
        (f64::from(i) / 2.0).into(),
        (f64::from(i * 3333) / 2.0).into(),
        c.clone().into(),
        c.repeat(5).into(),
        c.clone().into(),
        c.repeat(i as usize).into(),
        c.repeat(i as usize * 1_000).into(),
        NaiveDate::from_ymd_opt(2000, i + 1, i + 1).into(),
        NaiveTime::from_hms_opt(12, i, i).into(),
        stamp,
    ]
}

fn basic_types(config: &RunConfig, conn: &mut Connection<SqliteEngine>) -> Result<Outcome, SqlMarshalError> {
    let mut outcome = Outcome::new(Scenario::BasicTypes);
    let columns: Vec<String> = TYPED_COLUMNS
        .iter()
        .map(|(name, declared)| format!("{name} {declared}"))
        .collect();
    conn.execute_script(&format!(
        "DROP TABLE IF EXISTS RT_TYPES; CREATE TABLE RT_TYPES ({});",
        columns.join(", ")
    ))?;

    let placeholders = vec!["?"; TYPED_COLUMNS.len()].join(", ");
    let insert = format!("INSERT INTO RT_TYPES ({}) VALUES ({placeholders})", column_list());
    conn.transaction(|tx| {
        let statement = tx.prepare(&insert)?;
        for i in 0..config.rows {
            tx.execute_prepared(&statement, &generated_row(i))?;
        }
        Ok(())
    })?;

    let rows = conn.query(
        &format!("SELECT {} FROM RT_TYPES ORDER BY I", column_list()),
        &[],
    )?;
    outcome.check(rows.len() == config.rows as usize, || {
        format!("expected {} rows, read {}", config.rows, rows.len())
    });
    for (i, row) in (0..config.rows).zip(&rows) {
        let mut expected = generated_row(i);
        if let HostValue::Text(padded) = &mut expected[6] {
            padded.push_str("     ");
        }
        for ((name, _), want) in TYPED_COLUMNS.iter().zip(&expected) {
            let got = row.get(name);
            outcome.check(got == Some(want), || {
                format!("row {i} column {name}: wrote {want:?}, read {got:?}")
            });
        }
    }
    Ok(outcome)
}

fn text_blob(config: &RunConfig, conn: &mut Connection<SqliteEngine>) -> Result<Outcome, SqlMarshalError> {
    let mut outcome = Outcome::new(Scenario::TextBlob);
    conn.execute_script(
        "DROP TABLE IF EXISTS RT_MEMOS; CREATE TABLE RT_MEMOS (ID INTEGER, MEMO BLOB SUB_TYPE TEXT);",
    )?;

    let line = "All work and no play makes Jack a dull boy.\n";
    let memo = line.repeat(config.blob_size.div_ceil(line.len()));
    conn.transaction(|tx| {
        for id in 0..config.rows {
            tx.execute(
                "INSERT INTO RT_MEMOS (ID, MEMO) VALUES (?, ?)",
                &[i64::from(id).into(), format!("{id}: {memo}").into()],
            )?;
        }
        Ok(())
    })?;

    let rows = conn.query("SELECT ID, MEMO FROM RT_MEMOS ORDER BY ID", &[])?;
    outcome.check(rows.len() == config.rows as usize, || {
        format!("expected {} memos, read {}", config.rows, rows.len())
    });
    for (id, row) in (0..config.rows).zip(&rows) {
        let expected = format!("{id}: {memo}");
        let got = row.get("MEMO").and_then(HostValue::as_text);
        outcome.check(got == Some(expected.as_str()), || {
            format!(
                "memo {id}: wrote {} bytes, read {:?} bytes",
                expected.len(),
                got.map(str::len)
            )
        });
    }
    outcome.check(conn.engine().staged_blobs() == 0, || {
        format!("{} blobs still staged", conn.engine().staged_blobs())
    });
    Ok(outcome)
}

fn binary_blob(
    config: &RunConfig,
    conn: &mut Connection<SqliteEngine>,
    rng: &mut ChaCha8Rng,
) -> Result<Outcome, SqlMarshalError> {
    let mut outcome = Outcome::new(Scenario::BinaryBlob);
    conn.execute_script(
        "DROP TABLE IF EXISTS RT_FILES; \
         CREATE TABLE RT_FILES (ID INTEGER, CONTENT BLOB SUB_TYPE BINARY SEGMENT SIZE(1000));",
    )?;

    let payload: Vec<u8> = (0..config.blob_size * 3).map(|_| rng.random::<u8>()).collect();
    conn.transaction(|tx| {
        for id in 0..3_i64 {
            tx.execute(
                "INSERT INTO RT_FILES (ID, CONTENT) VALUES (?, ?)",
                &[id.into(), payload.clone().into()],
            )?;
        }
        Ok(())
    })?;

    let rows = conn.query("SELECT ID, CONTENT FROM RT_FILES ORDER BY ID", &[])?;
    outcome.check(rows.len() == 3, || format!("expected 3 files, read {}", rows.len()));
    for row in &rows {
        let id = row.get("ID").and_then(HostValue::as_int);
        let content = row.get("CONTENT").and_then(HostValue::as_bytes);
        outcome.check(content.map(<[u8]>::len) == Some(payload.len()), || {
            format!(
                "file {id:?}: wrote {} bytes, read {:?}",
                payload.len(),
                content.map(<[u8]>::len)
            )
        });
        outcome.check(content == Some(payload.as_slice()), || {
            format!("file {id:?}: content differs")
        });
    }
    Ok(outcome)
}

fn rejected_values(column: &str) -> Vec<(HostValue, ErrorKind)> {
    use ErrorKind::{InvalidArgument, RangeOverflow, TypeMismatch};
    let now = || HostValue::from(Utc::now());
    match column {
        "I" => vec![
            ("five".into(), TypeMismatch),
            (now(), TypeMismatch),
            (5_000_000_000_i64.into(), RangeOverflow),
        ],
        "SI" => vec![
            ("five".into(), TypeMismatch),
            (now(), TypeMismatch),
            (100_000.into(), RangeOverflow),
        ],
        "BI" => vec![
            ("five".into(), TypeMismatch),
            (now(), TypeMismatch),
            (HostValue::Integer(i128::from(u64::MAX) * 10), RangeOverflow),
        ],
        "F" => vec![("five".into(), TypeMismatch), (1e39.into(), RangeOverflow)],
        "D" => vec![("five".into(), TypeMismatch)],
        "C" => vec![("too long".into(), RangeOverflow)],
        "C10" => vec![(now(), RangeOverflow)],
        "VC" => vec![
            ("too long".into(), RangeOverflow),
            ((1.0 / 3.0).into(), RangeOverflow),
        ],
        "VC10" => vec![((1.0 / 3.0).into(), RangeOverflow)],
        "VC10000" => vec![("X".repeat(10_001).into(), RangeOverflow)],
        "DT" => vec![(2006.into(), InvalidArgument)],
        "TM" | "TS" => vec![
            ("2006/1/1".into(), TypeMismatch),
            (10_000.into(), TypeMismatch),
        ],
        _ => Vec::new(),
    }
}

fn incorrect_types(conn: &mut Connection<SqliteEngine>) -> Result<Outcome, SqlMarshalError> {
    let mut outcome = Outcome::new(Scenario::IncorrectTypes);
    let schema: String = TYPED_COLUMNS
        .iter()
        .map(|(name, declared)| {
            format!("DROP TABLE IF EXISTS RT_BAD_{name}; CREATE TABLE RT_BAD_{name} (VAL {declared});\n")
        })
        .collect();
    conn.execute_script(&schema)?;

    for (name, declared) in TYPED_COLUMNS {
        let insert = format!("INSERT INTO RT_BAD_{name} (VAL) VALUES (?)");
        for (value, expected) in rejected_values(name) {
            let result = conn.execute(&insert, std::slice::from_ref(&value));
            let kind = result.as_ref().err().map(SqlMarshalError::kind);
            outcome.check(kind == Some(expected), || {
                format!("{declared} <- {value:?}: expected {expected:?}, got {result:?}")
            });
        }
        let stored = conn.query(&format!("SELECT VAL FROM RT_BAD_{name}"), &[])?;
        outcome.check(stored.is_empty(), || {
            format!("{declared}: {} rejected row(s) were stored", stored.len())
        });
    }
    Ok(outcome)
}
