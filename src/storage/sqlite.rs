// ABOUTME: SQLite implementation of the PaymentStore trait
// ABOUTME: Schema migration plus row mapping for all payment-routing tables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

//! SQLite persistence backend.
//!
//! Uuids are stored as canonical hyphenated strings, timestamps as RFC 3339
//! text, and JSON metadata as serialized text.

use super::PaymentStore;
use crate::models::{
    AccountKind, Business, ConnectAccount, CustomerRecord, CustomerStatus, ProcessorConfig,
    ProcessorKind, UserProfile,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// SQLite-backed payment store
#[derive(Clone)]
pub struct SqlitePaymentStore {
    pool: SqlitePool,
}

impl SqlitePaymentStore {
    /// Open (or create) the database at `database_url`.
    ///
    /// # Errors
    ///
    /// Returns an error when the pool cannot be established.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .with_context(|| format!("failed to open database at {database_url}"))?;
        Ok(Self { pool })
    }

    /// Access the underlying pool (integration tests)
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_uuid(raw: &str, column: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("invalid uuid in column {column}: {raw}"))
}

fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid timestamp in column {column}: {raw}"))
}

fn row_to_business(row: &sqlx::sqlite::SqliteRow) -> Result<Business> {
    let id: String = row.try_get("id")?;
    let processor_config_id: Option<String> = row.try_get("processor_config_id")?;
    let connect_account_id: Option<String> = row.try_get("connect_account_id")?;
    Ok(Business {
        id: parse_uuid(&id, "id")?,
        name: row.try_get("name")?,
        processor_config_id: processor_config_id
            .map(|v| parse_uuid(&v, "processor_config_id"))
            .transpose()?,
        connect_account_id: connect_account_id
            .map(|v| parse_uuid(&v, "connect_account_id"))
            .transpose()?,
    })
}

fn row_to_connect_account(row: &sqlx::sqlite::SqliteRow) -> Result<ConnectAccount> {
    let id: String = row.try_get("id")?;
    let business_id: String = row.try_get("business_id")?;
    let account_kind: String = row.try_get("account_kind")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    Ok(ConnectAccount {
        id: parse_uuid(&id, "id")?,
        remote_account_id: row.try_get("remote_account_id")?,
        account_kind: AccountKind::parse(&account_kind)
            .ok_or_else(|| anyhow!("invalid account_kind: {account_kind}"))?,
        country_code: row.try_get("country_code")?,
        contact_email: row.try_get("contact_email")?,
        charges_enabled: row.try_get("charges_enabled")?,
        details_submitted: row.try_get("details_submitted")?,
        payouts_enabled: row.try_get("payouts_enabled")?,
        business_id: parse_uuid(&business_id, "business_id")?,
        created_at: parse_timestamp(&created_at, "created_at")?,
        updated_at: parse_timestamp(&updated_at, "updated_at")?,
    })
}

fn row_to_customer_record(row: &sqlx::sqlite::SqliteRow) -> Result<CustomerRecord> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let status: String = row.try_get("status")?;
    let metadata: String = row.try_get("metadata")?;
    let remote_created_at: Option<String> = row.try_get("remote_created_at")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    Ok(CustomerRecord {
        id: parse_uuid(&id, "id")?,
        remote_customer_id: row.try_get("remote_customer_id")?,
        user_id: parse_uuid(&user_id, "user_id")?,
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        country_code: row.try_get("country_code")?,
        status: CustomerStatus::parse(&status),
        remote_created_at: remote_created_at
            .map(|v| parse_timestamp(&v, "remote_created_at"))
            .transpose()?,
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
        created_at: parse_timestamp(&created_at, "created_at")?,
        updated_at: parse_timestamp(&updated_at, "updated_at")?,
    })
}

#[async_trait]
impl PaymentStore for SqlitePaymentStore {
    async fn migrate(&self) -> Result<()> {
        // raw_sql: the schema script carries multiple statements
        sqlx::raw_sql(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                display_name TEXT,
                country_code TEXT
            );

            CREATE TABLE IF NOT EXISTS processor_configs (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                description TEXT
            );

            CREATE TABLE IF NOT EXISTS businesses (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                processor_config_id TEXT REFERENCES processor_configs(id),
                connect_account_id TEXT
            );

            CREATE TABLE IF NOT EXISTS connect_accounts (
                id TEXT PRIMARY KEY,
                remote_account_id TEXT NOT NULL,
                account_kind TEXT NOT NULL,
                country_code TEXT NOT NULL,
                contact_email TEXT NOT NULL,
                charges_enabled INTEGER NOT NULL DEFAULT 0,
                details_submitted INTEGER NOT NULL DEFAULT 0,
                payouts_enabled INTEGER NOT NULL DEFAULT 0,
                business_id TEXT NOT NULL UNIQUE REFERENCES businesses(id),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS customer_records (
                id TEXT PRIMARY KEY,
                remote_customer_id TEXT NOT NULL,
                user_id TEXT NOT NULL UNIQUE REFERENCES users(id),
                email TEXT NOT NULL,
                display_name TEXT,
                country_code TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                remote_created_at TEXT,
                metadata TEXT NOT NULL DEFAULT 'null',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )
        .execute(&self.pool)
        .await
        .context("failed to run migrations")?;
        Ok(())
    }

    async fn create_business(&self, business: &Business) -> Result<()> {
        sqlx::query(
            "INSERT INTO businesses (id, name, processor_config_id, connect_account_id)
             VALUES (?, ?, ?, ?)",
        )
        .bind(business.id.to_string())
        .bind(&business.name)
        .bind(business.processor_config_id.map(|v| v.to_string()))
        .bind(business.connect_account_id.map(|v| v.to_string()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_business(&self, business_id: Uuid) -> Result<Option<Business>> {
        let row = sqlx::query("SELECT * FROM businesses WHERE id = ?")
            .bind(business_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_business).transpose()
    }

    async fn set_business_connect_account(
        &self,
        business_id: Uuid,
        connect_account_id: Option<Uuid>,
    ) -> Result<()> {
        sqlx::query("UPDATE businesses SET connect_account_id = ? WHERE id = ?")
            .bind(connect_account_id.map(|v| v.to_string()))
            .bind(business_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_processor_config(&self, config: &ProcessorConfig) -> Result<()> {
        sqlx::query(
            "INSERT INTO processor_configs (id, kind, enabled, description)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 kind = excluded.kind,
                 enabled = excluded.enabled,
                 description = excluded.description",
        )
        .bind(config.id.to_string())
        .bind(config.kind.as_str())
        .bind(config.enabled)
        .bind(&config.description)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_processor_config_for_business(
        &self,
        business_id: Uuid,
    ) -> Result<Option<ProcessorConfig>> {
        let row = sqlx::query(
            "SELECT pc.id, pc.kind, pc.enabled, pc.description
             FROM processor_configs pc
             JOIN businesses b ON b.processor_config_id = pc.id
             WHERE b.id = ?",
        )
        .bind(business_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let id: String = row.try_get("id")?;
            let kind: String = row.try_get("kind")?;
            Ok(ProcessorConfig {
                id: parse_uuid(&id, "id")?,
                // Unknown kinds are preserved upstream; at this layer an
                // unparseable value maps to Other so the resolver can apply
                // its fallback policy.
                kind: ProcessorKind::parse(&kind).unwrap_or(ProcessorKind::Other),
                enabled: row.try_get("enabled")?,
                description: row.try_get("description")?,
            })
        })
        .transpose()
    }

    async fn insert_connect_account(&self, account: &ConnectAccount) -> Result<()> {
        sqlx::query(
            "INSERT INTO connect_accounts (
                 id, remote_account_id, account_kind, country_code, contact_email,
                 charges_enabled, details_submitted, payouts_enabled, business_id,
                 created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(account.id.to_string())
        .bind(&account.remote_account_id)
        .bind(account.account_kind.as_str())
        .bind(&account.country_code)
        .bind(&account.contact_email)
        .bind(account.charges_enabled)
        .bind(account.details_submitted)
        .bind(account.payouts_enabled)
        .bind(account.business_id.to_string())
        .bind(account.created_at.to_rfc3339())
        .bind(account.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_connect_account_by_business(
        &self,
        business_id: Uuid,
    ) -> Result<Option<ConnectAccount>> {
        let row = sqlx::query("SELECT * FROM connect_accounts WHERE business_id = ?")
            .bind(business_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_connect_account).transpose()
    }

    async fn get_connect_account_by_remote_id(
        &self,
        remote_account_id: &str,
    ) -> Result<Option<ConnectAccount>> {
        let row = sqlx::query("SELECT * FROM connect_accounts WHERE remote_account_id = ?")
            .bind(remote_account_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_connect_account).transpose()
    }

    async fn update_connect_account_flags(
        &self,
        account_id: Uuid,
        charges_enabled: bool,
        details_submitted: bool,
        payouts_enabled: bool,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE connect_accounts
             SET charges_enabled = ?, details_submitted = ?, payouts_enabled = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(charges_enabled)
        .bind(details_submitted)
        .bind(payouts_enabled)
        .bind(Utc::now().to_rfc3339())
        .bind(account_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_connect_account(&self, account_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM connect_accounts WHERE id = ?")
            .bind(account_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_customer_record(&self, record: &CustomerRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO customer_records (
                 id, remote_customer_id, user_id, email, display_name, country_code,
                 status, remote_created_at, metadata, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                 remote_customer_id = excluded.remote_customer_id,
                 email = excluded.email,
                 display_name = excluded.display_name,
                 country_code = excluded.country_code,
                 status = excluded.status,
                 remote_created_at = excluded.remote_created_at,
                 metadata = excluded.metadata,
                 updated_at = excluded.updated_at",
        )
        .bind(record.id.to_string())
        .bind(&record.remote_customer_id)
        .bind(record.user_id.to_string())
        .bind(&record.email)
        .bind(&record.display_name)
        .bind(&record.country_code)
        .bind(record.status.as_str())
        .bind(record.remote_created_at.map(|v| v.to_rfc3339()))
        .bind(record.metadata.to_string())
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_customer_record_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<CustomerRecord>> {
        let row = sqlx::query("SELECT * FROM customer_records WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_customer_record).transpose()
    }

    async fn create_user(&self, user: &UserProfile) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, email, display_name, country_code) VALUES (?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.country_code)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            let id: String = row.try_get("id")?;
            Ok(UserProfile {
                id: parse_uuid(&id, "id")?,
                email: row.try_get("email")?,
                display_name: row.try_get("display_name")?,
                country_code: row.try_get("country_code")?,
            })
        })
        .transpose()
    }
}
