use pgchain::{
    ChainError, ChainResult, ConnectionConfig, ConnectionProvider, Database, Direction, Value,
};

const USERS: &str = "
    CREATE TEMP TABLE users (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        age INT,
        status TEXT NOT NULL DEFAULT 'active',
        email TEXT UNIQUE
    )";

/// Connect to `DATABASE_URL` and run `ddl`, or return `None` when no database is configured.
///
/// Every call gets its own connection, so temp tables never collide between tests.
async fn connect(ddl: &str) -> Option<Database<ConnectionProvider>> {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").ok()?;
    let config =
        ConnectionConfig::from_url(&url).expect("DATABASE_URL is not a valid postgres URL");
    let provider = ConnectionProvider::new(config);
    provider
        .client()
        .await
        .expect("connect")
        .batch_execute(ddl)
        .await
        .expect("create test table");
    Some(Database::new(provider))
}

macro_rules! db_or_skip {
    ($name:literal) => {
        match connect(USERS).await {
            Some(db) => db,
            None => {
                eprintln!("DATABASE_URL is not set; skipping {}", $name);
                return Ok(());
            }
        }
    };
}

async fn add_user(
    db: &Database<ConnectionProvider>,
    name: &str,
    age: i32,
    status: &str,
) -> ChainResult<Value> {
    db.from("users")
        .insert([
            ("name", Value::from(name)),
            ("age", Value::from(age)),
            ("status", Value::from(status)),
        ])
        .await
}

#[tokio::test]
async fn filter_selects_only_matching_rows() -> ChainResult<()> {
    let db = db_or_skip!("filter_selects_only_matching_rows");
    add_user(&db, "Ann", 30, "active").await?;
    add_user(&db, "Bob", 16, "active").await?;
    add_user(&db, "Dee", 25, "active").await?;

    let rows = db
        .from("users")
        .filter("age >= 18, status = active")
        .order_by([("name", Direction::Asc)])
        .select_all(&["name", "age"])
        .await?;
    let names: Vec<String> = rows
        .iter()
        .filter_map(|r| r.get("name").and_then(Value::as_str).map(str::to_string))
        .collect();
    assert_eq!(names, vec!["Ann", "Dee"]);
    assert_eq!(rows[0].get("age"), Some(&Value::Int(30)));
    Ok(())
}

#[tokio::test]
async fn insert_then_select_round_trips() -> ChainResult<()> {
    let db = db_or_skip!("insert_then_select_round_trips");
    let id = db
        .from("users")
        .insert([("name", Value::from("Ann")), ("age", Value::from(30))])
        .await?;
    let id = id.as_i64().expect("generated id");

    let row = db
        .from("users")
        .filter(&format!("id = {id}"))
        .select_one(&[])
        .await?
        .expect("inserted row");
    assert_eq!(row.get("name"), Some(&Value::Text("Ann".into())));
    assert_eq!(row.get("age"), Some(&Value::Int(30)));
    assert_eq!(row.get("email"), Some(&Value::Null));
    Ok(())
}

#[tokio::test]
async fn inserted_text_is_sanitized() -> ChainResult<()> {
    let db = db_or_skip!("inserted_text_is_sanitized");
    db.from("users")
        .insert([("name", "<script>x</script>Tom & Jerry")])
        .await?;
    let row = db.from("users").select_one(&["name"]).await?.expect("row");
    assert_eq!(row.get("name"), Some(&Value::Text("xTom &amp; Jerry".into())));
    Ok(())
}

#[tokio::test]
async fn unquoted_values_match_text_as_written() -> ChainResult<()> {
    let db = db_or_skip!("unquoted_values_match_text_as_written");
    db.from("users")
        .insert([("name", "02134"), ("status", "+1.50")])
        .await?;
    db.from("users").insert([("name", "2134")]).await?;

    let rows = db
        .from("users")
        .filter("name = 02134, status = +1.50")
        .select_all(&["name"])
        .await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::Text("02134".into())));

    let row = db.from("users").filter("age = null").select_one(&["name"]).await?;
    assert!(row.is_some());
    Ok(())
}

#[tokio::test]
async fn delete_removes_exactly_one_row() -> ChainResult<()> {
    let db = db_or_skip!("delete_removes_exactly_one_row");
    for i in 1..=6 {
        add_user(&db, &format!("user{i}"), 20 + i, "active").await?;
    }

    let removed = db.from("users").filter("id = 5").delete().await?;
    assert_eq!(removed, 1);
    assert_eq!(db.from("users").count().await?, Value::Int(5));
    assert!(db.from("users").filter("id = 5").select_one(&[]).await?.is_none());
    assert!(db.from("users").filter("id = 6").select_one(&[]).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn update_changes_filtered_rows() -> ChainResult<()> {
    let db = db_or_skip!("update_changes_filtered_rows");
    add_user(&db, "Ann", 30, "active").await?;
    add_user(&db, "Bob", 40, "active").await?;

    let changed = db
        .from("users")
        .filter("name = Bob")
        .update([("status", Value::from("inactive")), ("age", Value::from("41"))])
        .await?;
    assert_eq!(changed, 1);

    let bob = db
        .from("users")
        .filter("name = Bob")
        .select_one(&["status", "age"])
        .await?
        .expect("row");
    assert_eq!(bob.get("status"), Some(&Value::Text("inactive".into())));
    assert_eq!(bob.get("age"), Some(&Value::Int(41)));

    let err = db.from("users").update([("status", "x")]).await.unwrap_err();
    assert!(matches!(err, ChainError::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn aggregates_over_filtered_rows() -> ChainResult<()> {
    let db = db_or_skip!("aggregates_over_filtered_rows");
    add_user(&db, "Ann", 20, "active").await?;
    add_user(&db, "Bob", 30, "active").await?;
    add_user(&db, "Cid", 40, "active").await?;
    add_user(&db, "Dee", 99, "inactive").await?;

    let active = || db.from("users").filter("status = active");
    assert_eq!(active().count().await?, Value::Int(3));
    assert_eq!(active().sum("age").await?, Value::Int(90));
    assert_eq!(active().avg("age").await?, Value::Real(30.0));
    assert_eq!(active().min("age").await?, Value::Int(20));
    assert_eq!(active().max("age").await?, Value::Int(40));
    assert_eq!(active().count_column("email").await?, Value::Int(0));
    assert_eq!(
        db.from("users").filter("status = gone").max("age").await?,
        Value::Null
    );
    Ok(())
}

#[tokio::test]
async fn paging_walks_the_table() -> ChainResult<()> {
    let db = db_or_skip!("paging_walks_the_table");
    for i in 1..=5 {
        add_user(&db, &format!("user{i}"), i, "active").await?;
    }
    let page = |n| {
        db.from("users")
            .order_by([("id", Direction::Asc)])
            .limit(2, Some(n))
    };
    assert_eq!(page(1).select_all(&["id"]).await?.len(), 2);
    assert_eq!(page(3).select_all(&["id"]).await?.len(), 1);
    assert!(page(4).select_all(&["id"]).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn unique_violation_is_a_statement_error() -> ChainResult<()> {
    let db = db_or_skip!("unique_violation_is_a_statement_error");
    db.from("users")
        .insert([("name", "Ann"), ("email", "ann@example.com")])
        .await?;
    let err = db
        .from("users")
        .insert([("name", "Ann"), ("email", "ann@example.com")])
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());
    assert!(err.is_statement_error());

    let err = db
        .from("missing_table")
        .select_all(&[])
        .await
        .unwrap_err();
    assert!(err.is_statement_error());
    Ok(())
}

#[tokio::test]
async fn unreachable_server_is_a_connection_error() {
    let provider = ConnectionProvider::new(
        ConnectionConfig::new("nowhere")
            .with_host("127.0.0.1")
            .with_port(1),
    );
    let db = Database::new(provider);
    let err = db.from("users").select_all(&[]).await.unwrap_err();
    assert!(err.is_connection_error());
    assert!(!err.is_statement_error());
}
