//! Persistence for verification outcomes.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tokio::sync::RwLock;

use super::BaseOutcomeStore;
use crate::common::{OutcomeId, SessionId};
use crate::domains::verification::{OutcomeStatus, ReasonCode, VerificationOutcome};

// =============================================================================
// Postgres
// =============================================================================

pub struct PostgresOutcomeStore {
    pool: PgPool,
}

impl PostgresOutcomeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OutcomeRow {
    id: OutcomeId,
    user_id: String,
    session_id: SessionId,
    status: String,
    trust_score: Option<f64>,
    reason_codes: Json<Vec<ReasonCode>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OutcomeRow> for VerificationOutcome {
    type Error = anyhow::Error;

    fn try_from(row: OutcomeRow) -> Result<Self> {
        let status = OutcomeStatus::parse(&row.status)
            .ok_or_else(|| anyhow!("Unknown outcome status in database: {}", row.status))?;
        Ok(VerificationOutcome {
            id: row.id,
            user_id: row.user_id,
            session_id: row.session_id,
            status,
            trust_score: row.trust_score,
            reason_codes: row.reason_codes.0,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl BaseOutcomeStore for PostgresOutcomeStore {
    async fn record(&self, outcome: &VerificationOutcome) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO verification_outcomes
                (id, user_id, session_id, status, trust_score, reason_codes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(outcome.id)
        .bind(&outcome.user_id)
        .bind(outcome.session_id)
        .bind(outcome.status.as_str())
        .bind(outcome.trust_score)
        .bind(Json(&outcome.reason_codes))
        .bind(outcome.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_user_verified(
        &self,
        user_id: &str,
        trust_score: f64,
        verified_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_identity_verifications (user_id, trust_score, verified_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET trust_score = EXCLUDED.trust_score, verified_at = EXCLUDED.verified_at
            "#,
        )
        .bind(user_id)
        .bind(trust_score)
        .bind(verified_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest_for_user(&self, user_id: &str) -> Result<Option<VerificationOutcome>> {
        let row = sqlx::query_as::<_, OutcomeRow>(
            r#"
            SELECT id, user_id, session_id, status, trust_score, reason_codes, created_at
            FROM verification_outcomes
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(VerificationOutcome::try_from).transpose()
    }
}

// =============================================================================
// In-memory
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedUser {
    pub user_id: String,
    pub trust_score: f64,
    pub verified_at: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct InMemoryOutcomeStore {
    outcomes: Arc<RwLock<Vec<VerificationOutcome>>>,
    verified_users: Arc<RwLock<Vec<VerifiedUser>>>,
}

impl InMemoryOutcomeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn outcomes(&self) -> Vec<VerificationOutcome> {
        self.outcomes.read().await.clone()
    }

    pub async fn verified_user(&self, user_id: &str) -> Option<VerifiedUser> {
        self.verified_users
            .read()
            .await
            .iter()
            .find(|u| u.user_id == user_id)
            .cloned()
    }
}

#[async_trait]
impl BaseOutcomeStore for InMemoryOutcomeStore {
    async fn record(&self, outcome: &VerificationOutcome) -> Result<()> {
        let mut outcomes = self.outcomes.write().await;
        if outcomes.iter().any(|o| o.id == outcome.id) {
            return Err(anyhow!("Outcome {} already recorded", outcome.id));
        }
        outcomes.push(outcome.clone());
        Ok(())
    }

    async fn mark_user_verified(
        &self,
        user_id: &str,
        trust_score: f64,
        verified_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut users = self.verified_users.write().await;
        users.retain(|u| u.user_id != user_id);
        users.push(VerifiedUser {
            user_id: user_id.to_string(),
            trust_score,
            verified_at,
        });
        Ok(())
    }

    async fn latest_for_user(&self, user_id: &str) -> Result<Option<VerificationOutcome>> {
        Ok(self
            .outcomes
            .read()
            .await
            .iter()
            .filter(|o| o.user_id == user_id)
            .max_by_key(|o| (o.created_at, o.id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn outcome(user_id: &str, status: OutcomeStatus, created_at: DateTime<Utc>) -> VerificationOutcome {
        VerificationOutcome {
            id: OutcomeId::new(),
            user_id: user_id.to_string(),
            session_id: SessionId::new(),
            status,
            trust_score: Some(50.0),
            reason_codes: vec![],
            created_at,
        }
    }

    #[tokio::test]
    async fn test_outcomes_are_insert_only() {
        let store = InMemoryOutcomeStore::new();
        let first = outcome("u1", OutcomeStatus::Rejected, Utc::now());
        store.record(&first).await.unwrap();
        assert!(store.record(&first).await.is_err());
    }

    #[tokio::test]
    async fn test_latest_for_user_prefers_newest() {
        let store = InMemoryOutcomeStore::new();
        let now = Utc::now();
        store.record(&outcome("u1", OutcomeStatus::Rejected, now - Duration::minutes(5))).await.unwrap();
        store.record(&outcome("u1", OutcomeStatus::Approved, now)).await.unwrap();
        store.record(&outcome("u2", OutcomeStatus::Rejected, now + Duration::minutes(1))).await.unwrap();

        let latest = store.latest_for_user("u1").await.unwrap().unwrap();
        assert_eq!(latest.status, OutcomeStatus::Approved);
        assert_eq!(store.outcomes().await.len(), 3);
        assert!(store.latest_for_user("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_user_verified_replaces_previous_score() {
        let store = InMemoryOutcomeStore::new();
        store.mark_user_verified("u1", 70.0, Utc::now()).await.unwrap();
        store.mark_user_verified("u1", 87.0, Utc::now()).await.unwrap();
        assert_eq!(store.verified_user("u1").await.unwrap().trust_score, 87.0);
    }
}
