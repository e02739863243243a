use chrono::NaiveDate;
use deebee::prelude::*;
use deebee::test_utils::ScriptedConnector;

fn scripted() -> (ScriptedConnector, Db) {
    let connector = ScriptedConnector::new();
    let db = Db::new(Pool::new(connector.clone().shared()));
    (connector, db)
}

#[tokio::test]
async fn operators_render_into_where_sections() -> Result<(), DbError> {
    let (connector, db) = scripted();
    let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
    let filter = Filter::new()
        .and("status__nin", vec!["spam", "void"])
        .and("score__bw", (10, 20))
        .and("created__between", (day(1), day(31)))
        .and("title__contains", "it's")
        .and("slug__ends", "-draft")
        .and("archived", false)
        .and("owner", Value::Null)
        .and("shape", "ST_MakePoint(1, 2)");

    db.get_list("posts", &ListOptions::new().filter(filter).unpaged())
        .await?;
    assert_eq!(
        connector.executed(),
        ["select * from posts where status not in ('spam','void') \
          and score between 10 and 20 \
          and created between '2024-01-01' and '2024-01-31' \
          and title like '%it''s%' \
          and slug like '%-draft' \
          and archived = false \
          and owner = null \
          and shape = ST_MakePoint(1, 2)"]
    );
    Ok(())
}

#[tokio::test]
async fn unknown_suffixes_fall_back_to_equality() -> Result<(), DbError> {
    let (connector, db) = scripted();
    db.count("users", &Filter::new().and("age__around", 40))
        .await?;
    assert_eq!(
        connector.executed(),
        ["select count(*) as count from users where age = 40"]
    );
    Ok(())
}

#[tokio::test]
async fn unrenderable_filters_never_reach_the_backend() {
    let (connector, db) = scripted();
    let empty_in = Filter::new().and("id__in", Vec::<i64>::new());
    let nan = Filter::new().and("score", f64::NAN);
    let scalar_between = Filter::new().and("score__bw", 5);

    for filter in [empty_in, nan, scalar_between] {
        let result = db.count("users", &filter).await;
        assert!(matches!(result, Err(DbError::RenderError(_))), "{result:?}");
    }
    assert!(connector.executed().is_empty());
    assert_eq!(connector.connections_opened(), 0);
}

#[tokio::test]
async fn get_item_orders_without_paginating() -> Result<(), DbError> {
    let (connector, db) = scripted();
    connector.respond(
        "select * from events",
        &["id"],
        vec![vec![Value::Int(9)], vec![Value::Int(4)]],
    );
    let newest = db
        .get_item("events", &Filter::new().and("kind", "login"), "id desc")
        .await?;
    assert_eq!(newest.get("id"), Some(&Value::Int(9)));
    assert_eq!(
        connector.executed(),
        ["select * from events where kind = 'login' order by id desc"]
    );
    Ok(())
}

#[tokio::test]
async fn payloads_from_serializable_structs() -> Result<(), DbError> {
    #[derive(serde::Serialize)]
    struct NewUser<'a> {
        age: u8,
        name: &'a str,
    }

    let (connector, db) = scripted();
    let record = Record::from_serialize(&NewUser { age: 30, name: "Bob" })?;
    db.insert("users", record).await?;
    assert_eq!(
        connector.executed(),
        ["insert into users(age, name) values (30,'Bob') returning *"]
    );
    Ok(())
}

#[tokio::test]
async fn failed_commands_keep_backend_text() {
    let (connector, db) = scripted();
    connector.fail_when("delete", "permission denied for table users");
    let err = db.execute("delete from users", &[]).await.unwrap_err();
    match err {
        DbError::ExecutionError(msg) => assert!(msg.contains("permission denied")),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(connector.cursors_closed(), connector.cursors_opened());
    assert_eq!(db.pool().status().busy, 0);
}
