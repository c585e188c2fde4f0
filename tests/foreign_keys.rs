use likob::storage::row::Value;
use likob::{Database, DbError, ErrorKind, QueryResult, ResultSet};

fn setup() -> Database {
    let mut db = Database::new();
    db.execute_script(
        "CREATE TABLE customers (id INT PRIMARY KEY, name TEXT);
         CREATE TABLE orders (id INT PRIMARY KEY, customer_id INT REFERENCES customers(id), total FLOAT);
         INSERT INTO customers VALUES (1, 'Ann');
         INSERT INTO customers VALUES (2, 'Bo');
         INSERT INTO orders VALUES (10, 1, 5.0);",
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
fn insert_requires_existing_parent() {
    let mut db = setup();
    let err = db.execute("INSERT INTO orders VALUES (11, 3, 1.0)").unwrap_err();
    assert!(matches!(err, DbError::ForeignKeyViolation(_)));
    assert_eq!(err.kind(), ErrorKind::Constraint);
    db.execute("INSERT INTO orders VALUES (11, 2, 1.0)").unwrap();
}

#[test]
fn null_reference_is_allowed() {
    let mut db = setup();
    db.execute("INSERT INTO orders VALUES (12, NULL, 2.0)").unwrap();
    assert_eq!(query(&mut db, "SELECT * FROM orders").len(), 2);
}

#[test]
fn delete_of_referenced_parent_is_restricted() {
    let mut db = setup();
    let before = db.catalog().clone();
    let err = db.execute("DELETE FROM customers WHERE id = 1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Constraint);
    assert_eq!(db.catalog(), &before);

    // an unreferenced parent can go
    db.execute("DELETE FROM customers WHERE id = 2").unwrap();
    // once the child is gone the parent can go too
    db.execute("DELETE FROM orders WHERE customer_id = 1").unwrap();
    db.execute("DELETE FROM customers WHERE id = 1").unwrap();
    assert!(query(&mut db, "SELECT * FROM customers").is_empty());
}

#[test]
fn delete_all_parents_is_restricted_as_a_whole() {
    let mut db = setup();
    assert!(db.execute("DELETE FROM customers").is_err());
    assert_eq!(query(&mut db, "SELECT * FROM customers").len(), 2);
}

#[test]
fn update_child_to_missing_parent_fails() {
    let mut db = setup();
    let err = db.execute("UPDATE orders SET customer_id = 9 WHERE id = 10").unwrap_err();
    assert!(matches!(err, DbError::ForeignKeyViolation(_)));
    db.execute("UPDATE orders SET customer_id = 2 WHERE id = 10").unwrap();
    let rs = query(&mut db, "SELECT customer_id FROM orders");
    assert_eq!(rs.rows, vec![vec![Value::Integer(2)]]);
}

#[test]
fn changing_a_referenced_key_is_restricted() {
    let mut db = setup();
    let err = db.execute("UPDATE customers SET id = 5 WHERE id = 1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Constraint);
    db.execute("UPDATE customers SET id = 6 WHERE id = 2").unwrap();
    db.execute("UPDATE customers SET name = 'Annie' WHERE id = 1").unwrap();
}

#[test]
fn reference_target_must_exist() {
    let mut db = Database::new();
    let err = db.execute("CREATE TABLE orphans (id INT, parent INT REFERENCES nowhere(id))").unwrap_err();
    assert!(matches!(err, DbError::TableNotFound(_)));
    db.execute("CREATE TABLE parents (id INT PRIMARY KEY)").unwrap();
    let err = db.execute("CREATE TABLE kids (id INT, parent INT REFERENCES parents(nope))").unwrap_err();
    assert!(matches!(err, DbError::ColumnNotFound(_)));
}

#[test]
fn referenced_table_cannot_be_dropped() {
    let mut db = setup();
    let err = db.execute("DROP TABLE customers").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
    db.execute("DROP TABLE orders").unwrap();
    db.execute("DROP TABLE customers").unwrap();
    assert!(db.catalog().table_names().is_empty());
}

#[test]
fn self_reference() {
    let mut db = Database::new();
    db.execute("CREATE TABLE staff (id INT PRIMARY KEY, boss INT REFERENCES staff(id))").unwrap();
    db.execute("INSERT INTO staff VALUES (1, 1)").unwrap();
    db.execute("INSERT INTO staff VALUES (2, 1)").unwrap();
    assert!(db.execute("INSERT INTO staff VALUES (3, 7)").is_err());
    assert!(db.execute("DELETE FROM staff WHERE id = 1").is_err());
    db.execute("DELETE FROM staff WHERE id = 2").unwrap();
}
