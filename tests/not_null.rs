use likob::storage::row::Value;
use likob::{Database, DbError, QueryResult};

fn setup() -> Database {
    let mut db = Database::new();
    db.execute("CREATE TABLE users (id INT PRIMARY KEY, email TEXT NOT NULL, nick TEXT NULL)").unwrap();
    db
}

#[test]
fn not_null_rejects_null() {
    let mut db = setup();
    let err = db.execute("INSERT INTO users VALUES (1, NULL, 'x')").unwrap_err();
    assert!(matches!(err, DbError::NullViolation(ref c) if c == "email"));
    let err = db.execute("INSERT INTO users (id, nick) VALUES (1, 'x')").unwrap_err();
    assert!(matches!(err, DbError::NullViolation(_)));
}

#[test]
fn nullable_accepts_null() {
    let mut db = setup();
    db.execute("INSERT INTO users VALUES (1, 'a@x', NULL)").unwrap();
    let QueryResult::Rows(rs) = db.execute("SELECT nick FROM users WHERE nick IS NULL").unwrap() else {
        panic!("expected rows");
    };
    assert_eq!(rs.rows, vec![vec![Value::Null]]);
}

#[test]
fn update_to_null_is_rejected() {
    let mut db = setup();
    db.execute("INSERT INTO users VALUES (1, 'a@x', NULL)").unwrap();
    let err = db.execute("UPDATE users SET email = NULL WHERE id = 1").unwrap_err();
    assert!(matches!(err, DbError::NullViolation(_)));
    let QueryResult::Rows(rs) = db.execute("SELECT email FROM users").unwrap() else {
        panic!("expected rows");
    };
    assert_eq!(rs.rows, vec![vec![Value::from("a@x")]]);
}
