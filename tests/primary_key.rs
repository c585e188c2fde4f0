use likob::storage::row::Value;
use likob::{Database, DbError, ErrorKind, QueryResult, ResultSet};

fn query(db: &mut Database, sql: &str) -> ResultSet {
    match db.execute(sql).unwrap() {
        QueryResult::Rows(rs) => rs,
        other => panic!("expected rows, got {:?}", other),
    }
}

#[test]
fn duplicate_primary_key_is_rejected() {
    let mut db = Database::new();
    db.execute("CREATE TABLE t (id INT PRIMARY KEY, name TEXT)").unwrap();
    db.execute("INSERT INTO t VALUES (1, 'a')").unwrap();
    let err = db.execute("INSERT INTO t VALUES (1, 'b')").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Constraint);
    assert!(matches!(err, DbError::DuplicateKey { ref column, .. } if column == "id"));

    let rs = query(&mut db, "SELECT * FROM t");
    assert_eq!(rs.rows, vec![vec![Value::Integer(1), Value::from("a")]]);
}

#[test]
fn null_primary_key_is_rejected() {
    let mut db = Database::new();
    db.execute("CREATE TABLE t (id INT PRIMARY KEY, name TEXT)").unwrap();
    let err = db.execute("INSERT INTO t VALUES (NULL, 'a')").unwrap_err();
    assert!(matches!(err, DbError::NullPrimaryKey(_)));
    let err = db.execute("INSERT INTO t (name) VALUES ('a')").unwrap_err();
    assert!(matches!(err, DbError::NullPrimaryKey(_)));
}

#[test]
fn two_primary_keys_is_schema_error() {
    let mut db = Database::new();
    let err = db.execute("CREATE TABLE t (a INT PRIMARY KEY, b INT PRIMARY KEY)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert!(!db.catalog().contains_table("t"));
}

#[test]
fn text_primary_key() {
    let mut db = Database::new();
    db.execute("CREATE TABLE codes (code VARCHAR(8) PRIMARY KEY, label TEXT)").unwrap();
    db.execute("INSERT INTO codes VALUES ('US', 'United States')").unwrap();
    assert!(db.execute("INSERT INTO codes VALUES ('US', 'again')").is_err());
    db.execute("INSERT INTO codes VALUES ('us', 'lowercase')").unwrap();
    assert_eq!(query(&mut db, "SELECT * FROM codes").len(), 2);
}

#[test]
fn key_is_free_again_after_delete() {
    let mut db = Database::new();
    db.execute("CREATE TABLE t (id INT PRIMARY KEY, name TEXT)").unwrap();
    db.execute("INSERT INTO t VALUES (1, 'a')").unwrap();
    db.execute("DELETE FROM t WHERE id = 1").unwrap();
    db.execute("INSERT INTO t VALUES (1, 'b')").unwrap();
    let rs = query(&mut db, "SELECT name FROM t WHERE id = 1");
    assert_eq!(rs.rows, vec![vec![Value::from("b")]]);
}

#[test]
fn create_then_duplicate_then_select_scenario() {
    let mut db = Database::new();
    db.execute("CREATE TABLE t (id INT PRIMARY KEY, name TEXT)").unwrap();
    db.execute("INSERT INTO t VALUES (1,'a')").unwrap();
    let err = db.execute("INSERT INTO t VALUES (1,'b')").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Constraint);
    let rs = query(&mut db, "SELECT * FROM t");
    assert_eq!(rs.len(), 1);
    assert_eq!(rs.get(0, "id"), Some(&Value::Integer(1)));
    assert_eq!(rs.get(0, "name"), Some(&Value::from("a")));
}
