use std::time::Duration;

use deebee::prelude::*;
use deebee::test_utils::ScriptedConnector;

#[tokio::test]
async fn sessions_are_recycled_across_commands() -> Result<(), DbError> {
    let connector = ScriptedConnector::new();
    let db = Db::new(Pool::new(connector.clone().shared()));
    for _ in 0..10 {
        db.execute("select 1", &[]).await?;
    }
    assert_eq!(connector.connections_opened(), 1);
    assert_eq!(
        db.pool().status(),
        PoolStatus {
            free: 1,
            busy: 0,
            created: 1,
            closed: false
        }
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_commands_each_get_a_session() -> Result<(), Box<dyn std::error::Error>> {
    let connector = ScriptedConnector::new();
    connector.with_latency(Duration::from_millis(30));
    let db = Db::new(Pool::new(connector.clone().shared()));

    let mut handles = Vec::new();
    for i in 0..4 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            db.execute(&format!("select {i}"), &[]).await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let status = db.pool().status();
    assert_eq!(status.busy, 0);
    assert_eq!(status.free as u64, status.created);
    assert!(connector.connections_opened() >= 2);
    assert_eq!(connector.cursors_closed(), 4);
    Ok(())
}

#[tokio::test]
async fn cancelled_commands_still_release_their_session() {
    let connector = ScriptedConnector::new();
    connector.with_latency(Duration::from_secs(5));
    let db = Db::new(Pool::new(connector.clone().shared()));

    let slow = db.execute("select pg_sleep(5)", &[]);
    let timed_out = tokio::time::timeout(Duration::from_millis(20), slow).await;
    assert!(timed_out.is_err());
    assert_eq!(db.pool().status().busy, 0);
}

#[tokio::test]
async fn shutdown_closes_idle_sessions_and_refuses_new_work() -> Result<(), DbError> {
    let connector = ScriptedConnector::new();
    let db = Db::new(Pool::new(connector.clone().shared()));
    db.execute("select 1", &[]).await?;

    db.shutdown().await?;
    db.shutdown().await?;
    assert_eq!(connector.connections_closed(), 1);

    let err = db.execute("select 1", &[]).await.unwrap_err();
    assert!(matches!(err, DbError::ConnectionError(_)));
    Ok(())
}

#[tokio::test]
async fn connect_failures_surface_unchanged() {
    let connector = ScriptedConnector::new();
    connector.fail_connects("password authentication failed");
    let db = Db::new(Pool::new(connector.shared()));
    match db.count("users", &Filter::new()).await {
        Err(DbError::ConnectionError(msg)) => assert!(msg.contains("password")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn unknown_backends_are_configuration_errors() {
    let lookup = |name: &str| (name == "DEEBEE_TYPE").then(|| "mysql".to_string());
    assert!(matches!(
        DbConfig::from_lookup("", lookup),
        Err(DbError::ConfigError(_))
    ));
}

#[cfg(feature = "postgres")]
#[test]
fn incomplete_postgres_options_are_rejected_at_connect() {
    let config = DbConfig::postgres(PostgresOptions::builder().host("localhost").finish());
    assert!(matches!(Db::connect(&config), Err(DbError::ConfigError(_))));
}
