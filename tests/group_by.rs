use likob::storage::row::Value;
use likob::{Database, QueryResult, ResultSet};

fn setup() -> Database {
    let mut db = Database::new();
    db.execute_script(
        "CREATE TABLE t (id INT PRIMARY KEY, k INT, v INT, tag TEXT);
         INSERT INTO t VALUES (1, 1, 10, 'x');
         INSERT INTO t VALUES (2, 1, 20, 'y');
         INSERT INTO t VALUES (3, 2, 5, 'x');",
    )
    .unwrap();
    db
}

fn query(db: &mut Database, sql: &str) -> ResultSet {
    match db.execute(sql).unwrap() {
        QueryResult::Rows(rs) => rs,
        other => panic!("expected rows, got {:?}", other),
    }
}

#[test]
fn sum_per_group_in_first_seen_order() {
    let mut db = setup();
    let rs = query(&mut db, "SELECT k, SUM(v) AS s FROM t GROUP BY k");
    assert_eq!(rs.columns, vec!["k", "s"]);
    assert_eq!(
        rs.rows,
        vec![vec![Value::Integer(1), Value::Integer(30)], vec![Value::Integer(2), Value::Integer(5)]]
    );
}

#[test]
fn first_seen_order_follows_insertion() {
    let mut db = setup();
    db.execute("INSERT INTO t VALUES (0, 9, 1, 'z')").unwrap();
    let rs = query(&mut db, "SELECT k, COUNT(*) FROM t GROUP BY k");
    assert_eq!(rs.column_values("k"), vec![Value::Integer(1), Value::Integer(2), Value::Integer(9)]);
    assert_eq!(rs.column_values("COUNT(*)"), vec![Value::Integer(2), Value::Integer(1), Value::Integer(1)]);
}

#[test]
fn multiple_grouping_columns() {
    let mut db = setup();
    db.execute("INSERT INTO t VALUES (4, 1, 1, 'x')").unwrap();
    let rs = query(&mut db, "SELECT k, tag, COUNT(*) AS n FROM t GROUP BY k, tag");
    assert_eq!(
        rs.rows,
        vec![
            vec![Value::Integer(1), Value::from("x"), Value::Integer(2)],
            vec![Value::Integer(1), Value::from("y"), Value::Integer(1)],
            vec![Value::Integer(2), Value::from("x"), Value::Integer(1)],
        ]
    );
}

#[test]
fn null_keys_form_one_group() {
    let mut db = setup();
    db.execute("INSERT INTO t VALUES (5, NULL, 1, 'x')").unwrap();
    db.execute("INSERT INTO t VALUES (6, NULL, 2, 'x')").unwrap();
    let rs = query(&mut db, "SELECT k, SUM(v) FROM t GROUP BY k");
    assert_eq!(rs.len(), 3);
    assert_eq!(rs.rows[2], vec![Value::Null, Value::Integer(3)]);
}

#[test]
fn grouped_and_ordered_by_aggregate() {
    let mut db = setup();
    let rs = query(&mut db, "SELECT tag, SUM(v) AS s FROM t GROUP BY tag ORDER BY s DESC");
    assert_eq!(
        rs.rows,
        vec![vec![Value::from("y"), Value::Integer(20)], vec![Value::from("x"), Value::Integer(15)]]
    );
    let rs = query(&mut db, "SELECT tag FROM t GROUP BY tag ORDER BY MAX(v)");
    assert_eq!(rs.column_values("tag"), vec![Value::from("x"), Value::from("y")]);
}

#[test]
fn group_by_with_where() {
    let mut db = setup();
    let rs = query(&mut db, "SELECT k, COUNT(*) AS n FROM t WHERE v > 5 GROUP BY k");
    assert_eq!(rs.rows, vec![vec![Value::Integer(1), Value::Integer(2)]]);
}

#[test]
fn group_by_unknown_column() {
    let mut db = setup();
    assert!(db.execute("SELECT COUNT(*) FROM t GROUP BY nope").is_err());
}
