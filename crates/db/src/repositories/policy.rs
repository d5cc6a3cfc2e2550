use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};

use renewly_core::domain::policy::{PolicyId, PolicyNumber, PolicyRecord};

use super::{PolicyRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPolicyRepository {
    pool: DbPool,
}

impl SqlPolicyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PolicyRepository for SqlPolicyRepository {
    async fn save_policy(&self, record: PolicyRecord) -> Result<PolicyRecord, RepositoryError> {
        let eligible_upsells = serde_json::to_string(&record.eligible_upsells)
            .map_err(|error| RepositoryError::Decode(format!("eligible_upsells: {error}")))?;
        let raw_parse = serde_json::to_string(&record.raw_parse)
            .map_err(|error| RepositoryError::Decode(format!("raw_parse: {error}")))?;

        sqlx::query(
            "INSERT INTO policies (
                id,
                policy_number,
                customer_name,
                customer_contact,
                policy_type,
                insurer_name,
                expiry_date,
                premium_amount,
                no_claim_bonus_percent,
                eligible_upsells,
                raw_parse,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(policy_number) DO UPDATE SET
                customer_name = excluded.customer_name,
                customer_contact = excluded.customer_contact,
                policy_type = excluded.policy_type,
                insurer_name = excluded.insurer_name,
                expiry_date = excluded.expiry_date,
                premium_amount = excluded.premium_amount,
                no_claim_bonus_percent = excluded.no_claim_bonus_percent,
                eligible_upsells = excluded.eligible_upsells,
                raw_parse = excluded.raw_parse,
                updated_at = excluded.updated_at",
        )
        .bind(&record.id.0)
        .bind(&record.policy_number.0)
        .bind(record.customer_name.as_deref())
        .bind(record.customer_contact.as_deref())
        .bind(record.policy_type.as_deref())
        .bind(record.insurer_name.as_deref())
        .bind(record.expiry_date.map(|date| date.format("%Y-%m-%d").to_string()))
        .bind(record.premium_amount.map(|amount| amount.to_string()))
        .bind(record.no_claim_bonus_percent.map(|percent| percent.to_string()))
        .bind(eligible_upsells)
        .bind(raw_parse)
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.get_policy(&record.policy_number).await?.ok_or_else(|| {
            RepositoryError::Decode(format!(
                "policy `{}` was not readable after upsert",
                record.policy_number
            ))
        })
    }

    async fn get_policy(
        &self,
        policy_number: &PolicyNumber,
    ) -> Result<Option<PolicyRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                policy_number,
                customer_name,
                customer_contact,
                policy_type,
                insurer_name,
                expiry_date,
                premium_amount,
                no_claim_bonus_percent,
                eligible_upsells,
                raw_parse,
                created_at,
                updated_at
             FROM policies
             WHERE policy_number = ?",
        )
        .bind(&policy_number.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(policy_from_row).transpose()
    }
}

fn policy_from_row(row: SqliteRow) -> Result<PolicyRecord, RepositoryError> {
    let eligible_upsells_raw = row.try_get::<String, _>("eligible_upsells")?;
    let eligible_upsells = serde_json::from_str(&eligible_upsells_raw).map_err(|error| {
        RepositoryError::Decode(format!("invalid json in `eligible_upsells`: {error}"))
    })?;
    let raw_parse_raw = row.try_get::<String, _>("raw_parse")?;
    let raw_parse = serde_json::from_str(&raw_parse_raw)
        .map_err(|error| RepositoryError::Decode(format!("invalid json in `raw_parse`: {error}")))?;

    Ok(PolicyRecord {
        id: PolicyId(row.try_get("id")?),
        policy_number: PolicyNumber(row.try_get("policy_number")?),
        customer_name: row.try_get("customer_name")?,
        customer_contact: row.try_get("customer_contact")?,
        policy_type: row.try_get("policy_type")?,
        insurer_name: row.try_get("insurer_name")?,
        expiry_date: parse_optional_date("expiry_date", row.try_get("expiry_date")?)?,
        premium_amount: parse_optional_decimal("premium_amount", row.try_get("premium_amount")?)?,
        no_claim_bonus_percent: parse_optional_decimal(
            "no_claim_bonus_percent",
            row.try_get("no_claim_bonus_percent")?,
        )?,
        eligible_upsells,
        raw_parse,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

fn parse_optional_date(
    column: &str,
    value: Option<String>,
) -> Result<Option<NaiveDate>, RepositoryError> {
    value
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|error| {
                RepositoryError::Decode(format!("invalid date in `{column}`: `{raw}` ({error})"))
            })
        })
        .transpose()
}

fn parse_optional_decimal(
    column: &str,
    value: Option<String>,
) -> Result<Option<Decimal>, RepositoryError> {
    value
        .map(|raw| {
            Decimal::from_str(&raw).map_err(|error| {
                RepositoryError::Decode(format!("invalid decimal in `{column}`: `{raw}` ({error})"))
            })
        })
        .transpose()
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}
