//! SQLite run repository implementation.
//!
//! Implements `RunRepository` from `quarry-core`. Run requests, checkpoint
//! states and updates are stored as JSON text.

use chrono::{DateTime, Utc};
use quarry_core::repository::run::RunRepository;
use quarry_types::error::RepositoryError;
use quarry_types::workflow::{Checkpoint, RunRecord, RunStatus};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `RunRepository`.
#[derive(Clone)]
pub struct SqliteRunRepository {
    pool: DatabasePool,
}

impl SqliteRunRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

struct RunRow {
    id: String,
    workflow: String,
    request: String,
    status: String,
    error: Option<String>,
    started_at: String,
    completed_at: Option<String>,
    last_stage_index: Option<i64>,
}

impl RunRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            workflow: row.try_get("workflow")?,
            request: row.try_get("request")?,
            status: row.try_get("status")?,
            error: row.try_get("error")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            last_stage_index: row.try_get("last_stage_index")?,
        })
    }

    fn into_run(self) -> Result<RunRecord, RepositoryError> {
        let status: RunStatus = serde_json::from_value(serde_json::Value::String(self.status.clone()))
            .map_err(|_| RepositoryError::Query(format!("invalid run status: {}", self.status)))?;
        let request = serde_json::from_str(&self.request)
            .map_err(|e| RepositoryError::Query(format!("invalid request JSON: {e}")))?;

        Ok(RunRecord {
            id: parse_uuid(&self.id)?,
            workflow: self.workflow,
            request,
            status,
            error: self.error,
            started_at: parse_datetime(&self.started_at)?,
            completed_at: self.completed_at.as_deref().map(parse_datetime).transpose()?,
            last_stage_index: self.last_stage_index.map(|i| i as u32),
        })
    }
}

struct CheckpointRow {
    run_id: String,
    stage_index: i64,
    stage: String,
    state: String,
    update_json: String,
    created_at: String,
}

impl CheckpointRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            run_id: row.try_get("run_id")?,
            stage_index: row.try_get("stage_index")?,
            stage: row.try_get("stage")?,
            state: row.try_get("state")?,
            update_json: row.try_get("update_json")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_checkpoint(self) -> Result<Checkpoint, RepositoryError> {
        Ok(Checkpoint {
            run_id: parse_uuid(&self.run_id)?,
            stage_index: self.stage_index as u32,
            stage: self.stage,
            state: serde_json::from_str(&self.state)
                .map_err(|e| RepositoryError::Query(format!("invalid checkpoint state: {e}")))?,
            update: serde_json::from_str(&self.update_json)
                .map_err(|e| RepositoryError::Query(format!("invalid checkpoint update: {e}")))?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    s.parse::<Uuid>()
        .map_err(|e| RepositoryError::Query(format!("invalid UUID: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// RunRepository impl
// ---------------------------------------------------------------------------

impl RunRepository for SqliteRunRepository {
    async fn create_run(&self, run: &RunRecord) -> Result<(), RepositoryError> {
        let request = serde_json::to_string(&run.request)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO runs
               (id, workflow, request, status, error, started_at, completed_at, last_stage_index)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(run.id.to_string())
        .bind(&run.workflow)
        .bind(&request)
        .bind(run.status.to_string())
        .bind(&run.error)
        .bind(format_datetime(&run.started_at))
        .bind(run.completed_at.as_ref().map(format_datetime))
        .bind(run.last_stage_index.map(i64::from))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn update_run_status(
        &self,
        run_id: &Uuid,
        status: RunStatus,
        error: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let completed_at = match status {
            RunStatus::Running => None,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled => {
                Some(format_datetime(&Utc::now()))
            }
        };

        let result = sqlx::query(
            "UPDATE runs SET status = ?, error = ?, completed_at = ? WHERE id = ?",
        )
        .bind(status.to_string())
        .bind(error)
        .bind(&completed_at)
        .bind(run_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get_run(&self, run_id: &Uuid) -> Result<Option<RunRecord>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM runs WHERE id = ?")
            .bind(run_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let r = RunRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(r.into_run()?))
            }
            None => Ok(None),
        }
    }

    async fn list_runs(&self, limit: u32) -> Result<Vec<RunRecord>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM runs ORDER BY started_at DESC, id DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut runs = Vec::with_capacity(rows.len());
        for row in &rows {
            let r = RunRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            runs.push(r.into_run()?);
        }
        Ok(runs)
    }

    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), RepositoryError> {
        let state = serde_json::to_string(&checkpoint.state)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let update = serde_json::to_string(&checkpoint.update)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO checkpoints (run_id, stage_index, stage, state, update_json, created_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(run_id, stage_index) DO UPDATE SET
                 stage = excluded.stage,
                 state = excluded.state,
                 update_json = excluded.update_json,
                 created_at = excluded.created_at"#,
        )
        .bind(checkpoint.run_id.to_string())
        .bind(i64::from(checkpoint.stage_index))
        .bind(&checkpoint.stage)
        .bind(&state)
        .bind(&update)
        .bind(format_datetime(&checkpoint.created_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query("UPDATE runs SET last_stage_index = ? WHERE id = ?")
            .bind(i64::from(checkpoint.stage_index))
            .bind(checkpoint.run_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }

    async fn latest_checkpoint(&self, run_id: &Uuid) -> Result<Option<Checkpoint>, RepositoryError> {
        let row = sqlx::query(
            "SELECT * FROM checkpoints WHERE run_id = ? ORDER BY stage_index DESC LIMIT 1",
        )
        .bind(run_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let r = CheckpointRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(r.into_checkpoint()?))
            }
            None => Ok(None),
        }
    }

    async fn list_checkpoints(&self, run_id: &Uuid) -> Result<Vec<Checkpoint>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM checkpoints WHERE run_id = ? ORDER BY stage_index ASC")
            .bind(run_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut checkpoints = Vec::with_capacity(rows.len());
        for row in &rows {
            let r = CheckpointRow::from_row(row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            checkpoints.push(r.into_checkpoint()?);
        }
        Ok(checkpoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn test_repo() -> SqliteRunRepository {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        SqliteRunRepository::new(DatabasePool::new(&url).await.unwrap())
    }

    fn run(started_at: DateTime<Utc>) -> RunRecord {
        RunRecord {
            id: Uuid::now_v7(),
            workflow: "research".to_string(),
            request: json!({"topic": "graph databases", "search_limit": 5}),
            status: RunStatus::Running,
            error: None,
            started_at,
            completed_at: None,
            last_stage_index: None,
        }
    }

    fn checkpoint(run_id: Uuid, stage_index: u32, stage: &str, report: &str) -> Checkpoint {
        Checkpoint {
            run_id,
            stage_index,
            stage: stage.to_string(),
            state: json!({"topic": "graph databases", "report": report}),
            update: json!({"report": report}),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_run() {
        let repo = test_repo().await;
        let record = run(Utc::now());
        repo.create_run(&record).await.unwrap();

        let loaded = repo.get_run(&record.id).await.unwrap().unwrap();
        assert_eq!(loaded.workflow, "research");
        assert_eq!(loaded.status, RunStatus::Running);
        assert_eq!(loaded.request["search_limit"], 5);
        assert!(loaded.completed_at.is_none());

        assert!(repo.get_run(&Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_status_sets_completion() {
        let repo = test_repo().await;
        let record = run(Utc::now());
        repo.create_run(&record).await.unwrap();

        repo.update_run_status(&record.id, RunStatus::Failed, Some("boom"))
            .await
            .unwrap();
        let loaded = repo.get_run(&record.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, RunStatus::Failed);
        assert_eq!(loaded.error.as_deref(), Some("boom"));
        assert!(loaded.completed_at.is_some());

        repo.update_run_status(&record.id, RunStatus::Running, None)
            .await
            .unwrap();
        let loaded = repo.get_run(&record.id).await.unwrap().unwrap();
        assert!(loaded.error.is_none());
        assert!(loaded.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_update_missing_run_is_not_found() {
        let repo = test_repo().await;
        let err = repo
            .update_run_status(&Uuid::now_v7(), RunStatus::Completed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_list_runs_most_recent_first() {
        let repo = test_repo().await;
        let now = Utc::now();
        let older = run(now - chrono::Duration::minutes(5));
        let newer = run(now);
        repo.create_run(&older).await.unwrap();
        repo.create_run(&newer).await.unwrap();

        let runs = repo.list_runs(10).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, newer.id);
        assert_eq!(repo.list_runs(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_checkpoint_upsert_and_latest() {
        let repo = test_repo().await;
        let record = run(Utc::now());
        repo.create_run(&record).await.unwrap();
        assert!(repo.latest_checkpoint(&record.id).await.unwrap().is_none());

        repo.save_checkpoint(&checkpoint(record.id, 0, "researcher", "a"))
            .await
            .unwrap();
        repo.save_checkpoint(&checkpoint(record.id, 1, "summarizer", "b"))
            .await
            .unwrap();
        // Same key replaces.
        repo.save_checkpoint(&checkpoint(record.id, 1, "summarizer", "c"))
            .await
            .unwrap();

        let all = repo.list_checkpoints(&record.id).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].stage, "researcher");

        let latest = repo.latest_checkpoint(&record.id).await.unwrap().unwrap();
        assert_eq!(latest.stage_index, 1);
        assert_eq!(latest.state["report"], "c");
        assert_eq!(latest.update, json!({"report": "c"}));

        let loaded = repo.get_run(&record.id).await.unwrap().unwrap();
        assert_eq!(loaded.last_stage_index, Some(1));
    }

    #[tokio::test]
    async fn test_checkpoint_requires_run() {
        let repo = test_repo().await;
        let result = repo
            .save_checkpoint(&checkpoint(Uuid::now_v7(), 0, "researcher", "a"))
            .await;
        assert!(result.is_err());
    }
}
