use likob::storage::row::Value;
use likob::{Database, ErrorKind, QueryResult, ResultSet};

fn setup() -> Database {
    let mut db = Database::new();
    db.execute("CREATE TABLE t (id INT PRIMARY KEY)").unwrap();
    for id in [4, 2, 3, 1] {
        db.execute(&format!("INSERT INTO t VALUES ({})", id)).unwrap();
    }
    db
}

fn query(db: &mut Database, sql: &str) -> ResultSet {
    match db.execute(sql).unwrap() {
        QueryResult::Rows(rs) => rs,
        other => panic!("expected rows, got {:?}", other),
    }
}

#[test]
fn limit_and_offset_on_ordered_rows() {
    let mut db = setup();
    let rs = query(&mut db, "SELECT id FROM t ORDER BY id LIMIT 2 OFFSET 3");
    assert_eq!(rs.rows, vec![vec![Value::Integer(4)]]);
    let rs = query(&mut db, "SELECT id FROM t ORDER BY id LIMIT 2");
    assert_eq!(rs.column_values("id"), vec![Value::Integer(1), Value::Integer(2)]);
    let rs = query(&mut db, "SELECT id FROM t ORDER BY id OFFSET 1");
    assert_eq!(rs.len(), 3);
}

#[test]
fn offset_past_the_end_is_empty() {
    let mut db = setup();
    let rs = query(&mut db, "SELECT id FROM t ORDER BY id LIMIT 2 OFFSET 10");
    assert!(rs.is_empty());
    let rs = query(&mut db, "SELECT id FROM t LIMIT 0");
    assert!(rs.is_empty());
}

#[test]
fn pagination_applies_after_grouping() {
    let mut db = setup();
    let rs = query(&mut db, "SELECT COUNT(*) FROM t LIMIT 5");
    assert_eq!(rs.rows, vec![vec![Value::Integer(4)]]);
}

#[test]
fn bad_counts_are_parse_errors() {
    let mut db = setup();
    for sql in ["SELECT id FROM t LIMIT -1", "SELECT id FROM t LIMIT x", "SELECT id FROM t LIMIT 1.5"] {
        assert_eq!(db.execute(sql).unwrap_err().kind(), ErrorKind::Parse, "{}", sql);
    }
}
