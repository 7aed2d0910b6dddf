//! ScyllaDB schema creation
//!
//! Timestamps are stored as BIGINT epoch milliseconds.

use scylla::Session;

use crate::error::PersistenceError;

/// Audit rows are kept for one year
const AUDIT_TTL_SECS: u32 = 365 * 24 * 60 * 60;

pub async fn create_keyspace(
    session: &Session,
    keyspace: &str,
    replication_factor: u8,
) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    );
    session
        .query_unpaged(query, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create keyspace: {}", e)))?;
    Ok(())
}

/// `CREATE TABLE` statements by table name
pub fn table_statements(keyspace: &str) -> Vec<(&'static str, String)> {
    vec![
        (
            "conversations",
            format!(
                r#"
        CREATE TABLE IF NOT EXISTS {}.conversations (
            user_id TEXT,
            created_at BIGINT,
            id UUID,
            session_id TEXT,
            question TEXT,
            answer TEXT,
            confidence FLOAT,
            needs_review BOOLEAN,
            sources_json TEXT,
            topic TEXT,
            PRIMARY KEY ((user_id), created_at, id)
        ) WITH CLUSTERING ORDER BY (created_at DESC, id DESC)
    "#,
                keyspace
            ),
        ),
        (
            "feedback",
            format!(
                r#"
        CREATE TABLE IF NOT EXISTS {}.feedback (
            conversation_id UUID,
            created_at BIGINT,
            user_id TEXT,
            rating TINYINT,
            correction TEXT,
            PRIMARY KEY ((conversation_id), created_at)
        ) WITH CLUSTERING ORDER BY (created_at DESC)
    "#,
                keyspace
            ),
        ),
        (
            "audit_log",
            format!(
                r#"
        CREATE TABLE IF NOT EXISTS {}.audit_log (
            partition_date TEXT,
            created_at BIGINT,
            id UUID,
            event_type TEXT,
            user_id TEXT,
            detail TEXT,
            PRIMARY KEY ((partition_date), created_at, id)
        ) WITH CLUSTERING ORDER BY (created_at DESC, id DESC)
        AND default_time_to_live = {}
    "#,
                keyspace, AUDIT_TTL_SECS
            ),
        ),
    ]
}

pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    for (table, statement) in table_statements(keyspace) {
        session.query_unpaged(statement, &[]).await.map_err(|e| {
            PersistenceError::SchemaError(format!("Failed to create {} table: {}", table, e))
        })?;
    }
    tracing::info!("All tables created successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_use_keyspace() {
        let statements = table_statements("turf");
        let names: Vec<_> = statements.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["conversations", "feedback", "audit_log"]);
        assert!(statements
            .iter()
            .all(|(name, sql)| sql.contains(&format!("turf.{}", name))));
        assert!(statements[2].1.contains("default_time_to_live"));
    }
}
