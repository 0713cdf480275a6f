#![cfg(feature = "sqlite")]

use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone};
use sql_marshal::prelude::*;

const DDL: &str = "
    CREATE TABLE TEST (
        I INTEGER,
        SI SMALLINT,
        BI BIGINT,
        F FLOAT,
        D DOUBLE PRECISION,
        C CHAR,
        C10 CHAR(10),
        VC VARCHAR(1),
        VC10 VARCHAR(10),
        VC10000 VARCHAR(10000),
        DT DATE,
        TM TIME,
        TS TIMESTAMP
    );
";

const INSERT: &str = "INSERT INTO TEST (I, SI, BI, F, D, C, C10, VC, VC10, VC10000, DT, TM, TS) \
                      VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

const SELECT: &str =
    "SELECT I, SI, BI, F, D, C, C10, VC, VC10, VC10000, DT, TM, TS FROM TEST ORDER BY I";

/// Row `i` as inserted.
fn generated_row(i: u32) -> Vec<HostValue> {
    let c = char::from_u32(i + 64).unwrap().to_string();
    let offset = FixedOffset::east_opt(2 * 3600).unwrap();
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
        NaiveDate::from_ymd_opt(2000, i + 1, i + 1).unwrap().into(),
        NaiveTime::from_hms_opt(12, i, i).unwrap().into(),
        offset
            .with_ymd_and_hms(2006, 1, 1, i, i, i)
            .single()
            .unwrap()
            .into(),
    ]
}

/// Row `i` as it reads back: CHAR(10) comes back blank-padded.
fn expected_row(i: u32) -> Vec<HostValue> {
    let mut row = generated_row(i);
    let c = char::from_u32(i + 64).unwrap().to_string();
    row[6] = format!("{}     ", c.repeat(5)).into();
    row
}

fn insert_generated_rows<E: EngineClient>(conn: &mut Connection<E>) -> Result<(), SqlMarshalError> {
    conn.transaction(|tx| {
        let insert = tx.prepare(INSERT)?;
        for i in 0..10 {
            assert_eq!(tx.execute_prepared(&insert, &generated_row(i))?, 1);
        }
        Ok(())
    })
}

fn assert_generated_rows(rows: &ResultSet) {
    assert_eq!(rows.len(), 10);
    for (i, row) in (0..10).zip(rows) {
        assert_eq!(row.values(), expected_row(i).as_slice(), "row {i}");
    }
}

#[test]
fn generated_rows_round_trip() -> Result<(), SqlMarshalError> {
    let mut conn = SqliteOptionsBuilder::new(":memory:".into()).build()?;
    conn.execute_script(DDL)?;

    insert_generated_rows(&mut conn)?;
    let rows = conn.query(SELECT, &[])?;

    assert_generated_rows(&rows);
    assert_eq!(
        rows.column_names().unwrap(),
        ["I", "SI", "BI", "F", "D", "C", "C10", "VC", "VC10", "VC10000", "DT", "TM", "TS"]
    );
    Ok(())
}

#[test]
fn rows_survive_reopening_the_database() -> Result<(), SqlMarshalError> {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("marshal.db").to_string_lossy().into_owned();

    {
        let mut conn = SqliteOptionsBuilder::new(path.clone()).wal(true).build()?;
        conn.execute_script(DDL)?;
        insert_generated_rows(&mut conn)?;
    }

    let mut conn = Connection::open_sqlite(SqliteOptions::new(path))?;
    assert_generated_rows(&conn.query(SELECT, &[])?);
    Ok(())
}

#[test]
fn timestamps_are_stored_in_utc() -> Result<(), SqlMarshalError> {
    let mut conn = SqliteOptionsBuilder::new(":memory:".into()).build()?;
    conn.execute_script(DDL)?;
    insert_generated_rows(&mut conn)?;

    let stored: String = conn.engine().connection().query_row(
        "SELECT TS FROM TEST WHERE I = 3",
        [],
        |row| row.get(0),
    )?;
    assert_eq!(stored, "2006-01-01 01:03:03");

    let rows = conn.query("SELECT I, TS FROM TEST WHERE I = ?", &[3.into()])?;
    let ts = rows.results[0].get("ts").and_then(HostValue::as_instant).unwrap();
    assert_eq!(ts.offset().local_minus_utc(), 0);
    assert_eq!(ts.to_rfc3339(), "2006-01-01T01:03:03+00:00");
    Ok(())
}

#[test]
fn parameters_in_predicates_are_typed_by_their_column() -> Result<(), SqlMarshalError> {
    let mut conn = SqliteOptionsBuilder::new(":memory:".into()).build()?;
    conn.execute_script(DDL)?;
    insert_generated_rows(&mut conn)?;

    let rows = conn.query(
        "SELECT I, VC10 FROM TEST WHERE SI >= ? AND SI < ? ORDER BY I LIMIT ?",
        &[2.into(), 8.into(), 3.into()],
    )?;
    let ids: Vec<i128> = rows.iter().filter_map(|row| row.get("I")?.as_int()).collect();
    assert_eq!(ids, vec![2, 3, 4]);

    let err = conn
        .query("SELECT I FROM TEST WHERE SI = ?", &[100_000.into()])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RangeOverflow);

    let changed = conn.execute("UPDATE TEST SET VC = ? WHERE I < ?", &["Z".into(), 4.into()])?;
    assert_eq!(changed, 4);
    Ok(())
}

#[test]
fn nulls_round_trip_in_every_column() -> Result<(), SqlMarshalError> {
    let mut conn = SqliteOptionsBuilder::new(":memory:".into()).build()?;
    conn.execute_script(DDL)?;

    let mut params = vec![HostValue::Integer(1)];
    params.extend(std::iter::repeat_n(HostValue::Null, 12));
    conn.execute(INSERT, &params)?;

    let rows = conn.query(SELECT, &[])?;
    assert_eq!(rows.results[0].values(), params.as_slice());
    Ok(())
}

#[test]
fn computed_result_columns_are_unsupported() -> Result<(), SqlMarshalError> {
    let mut conn = SqliteOptionsBuilder::new(":memory:".into()).build()?;
    conn.execute_script(DDL)?;
    let err = conn.query("SELECT COUNT(*) FROM TEST", &[]).unwrap_err();
    assert!(matches!(err, SqlMarshalError::Unimplemented(_)), "{err}");
    Ok(())
}
