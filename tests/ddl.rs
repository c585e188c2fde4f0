use likob::storage::row::{ColumnType, Value};
use likob::{Database, DbError, ErrorKind, QueryResult};

#[test]
fn create_table_reports_success() {
    let mut db = Database::new();
    let res = db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name VARCHAR(20), score REAL, ok BOOL)").unwrap();
    assert_eq!(res, QueryResult::Message("Table 't' created successfully".into()));
    let table = db.catalog().get_table("t").unwrap();
    let types: Vec<ColumnType> = table.columns().iter().map(|c| c.col_type).collect();
    assert_eq!(types, vec![ColumnType::Int, ColumnType::Text, ColumnType::Float, ColumnType::Boolean]);
    assert!(table.index_named("pk_t").is_some());
}

#[test]
fn duplicate_table_and_if_not_exists() {
    let mut db = Database::new();
    db.execute("CREATE TABLE t (id INT)").unwrap();
    assert!(matches!(db.execute("CREATE TABLE t (id INT)").unwrap_err(), DbError::TableExists(_)));
    db.execute("CREATE TABLE IF NOT EXISTS t (other TEXT)").unwrap();
    assert_eq!(db.catalog().get_table("t").unwrap().columns()[0].name, "id");
}

#[test]
fn drop_table_and_if_exists() {
    let mut db = Database::new();
    db.execute("CREATE TABLE t (id INT)").unwrap();
    db.execute("DROP TABLE t").unwrap();
    assert!(!db.catalog().contains_table("t"));
    assert!(matches!(db.execute("DROP TABLE t").unwrap_err(), DbError::TableNotFound(_)));
    db.execute("DROP TABLE IF EXISTS t").unwrap();
}

#[test]
fn malformed_ddl() {
    let mut db = Database::new();
    for sql in [
        "CREATE TABLE t (id BLOB)",
        "CREATE TABLE t id INT",
        "CREATE TABLE t (id INT",
        "CREATE VIEW v",
        "TRUNCATE t",
    ] {
        assert_eq!(db.execute(sql).unwrap_err().kind(), ErrorKind::Parse, "{}", sql);
    }
}

#[test]
fn identifiers_are_case_sensitive_keywords_are_not() {
    let mut db = Database::new();
    db.execute("create table Items (Id int primary key)").unwrap();
    db.execute("insert into Items values (1)").unwrap();
    assert!(matches!(db.execute("SELECT * FROM items").unwrap_err(), DbError::TableNotFound(_)));
    let QueryResult::Rows(rs) = db.execute("select Id from Items where Id = 1").unwrap() else {
        panic!("expected rows");
    };
    assert_eq!(rs.rows, vec![vec![Value::Integer(1)]]);
}

#[test]
fn round_trip_by_primary_key() {
    let mut db = Database::new();
    db.execute("CREATE TABLE t (id INT PRIMARY KEY, name TEXT, score FLOAT)").unwrap();
    for (id, name, score) in [(1, "a", "1.25"), (2, "b", "7"), (3, "c", "'2.5'")] {
        db.execute(&format!("INSERT INTO t VALUES ({}, '{}', {})", id, name, score)).unwrap();
    }
    let QueryResult::Rows(rs) = db.execute("SELECT * FROM t WHERE id = 2").unwrap() else {
        panic!("expected rows");
    };
    assert_eq!(rs.rows, vec![vec![Value::Integer(2), Value::from("b"), Value::Float(7.0)]]);
    let QueryResult::Rows(rs) = db.execute("SELECT score FROM t WHERE id = 3").unwrap() else {
        panic!("expected rows");
    };
    assert_eq!(rs.rows, vec![vec![Value::Float(2.5)]]);
}
