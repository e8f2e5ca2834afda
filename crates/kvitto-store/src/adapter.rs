// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed [`Repository`] adapter.

use async_trait::async_trait;
use kvitto_config::StorageConfig;
use kvitto_core::traits::{Repository, ServiceAdapter};
use kvitto_core::{
    AdapterKind, BrandProfile, HealthStatus, KvittoError, OutputFormat, ReceiptFields,
    ReceiptRecord, UserRecord, VirtualAccount,
};
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;

use crate::database::Database;
use crate::queries;

/// Repository over a single SQLite database file.
///
/// The connection is opened lazily by [`Repository::initialize`] so the
/// adapter can be constructed before the runtime exists. All access funnels
/// through one background connection, which serializes writes.
pub struct SqliteRepository {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteRepository {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, KvittoError> {
        self.db
            .get()
            .ok_or_else(|| KvittoError::Internal("repository used before initialize".to_string()))
    }
}

#[async_trait]
impl ServiceAdapter for SqliteRepository {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Repository
    }

    async fn health_check(&self) -> Result<HealthStatus, KvittoError> {
        let Some(db) = self.db.get() else {
            return Ok(HealthStatus::Unhealthy("not initialized".to_string()));
        };
        let probe = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
                Ok(one)
            })
            .await;
        match probe {
            Ok(1) => Ok(HealthStatus::Healthy),
            Ok(other) => Ok(HealthStatus::Degraded(format!(
                "probe returned {other}"
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), KvittoError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn initialize(&self) -> Result<(), KvittoError> {
        self.db
            .get_or_try_init(|| Database::open(&self.config.database_path, self.config.wal_mode))
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), KvittoError> {
        self.shutdown().await
    }

    async fn find_user(&self, address: &str) -> Result<Option<UserRecord>, KvittoError> {
        queries::users::find_user(self.db()?, address).await
    }

    async fn find_user_by_payment_reference(
        &self,
        reference: &str,
    ) -> Result<Option<UserRecord>, KvittoError> {
        queries::users::find_by_payment_reference(self.db()?, reference).await
    }

    async fn insert_user(&self, user: &UserRecord) -> Result<(), KvittoError> {
        queries::users::insert_user(self.db()?, user).await
    }

    async fn update_brand_profile(
        &self,
        address: &str,
        profile: &BrandProfile,
    ) -> Result<(), KvittoError> {
        queries::users::update_brand_profile(self.db()?, address, profile).await
    }

    async fn set_logo_url(&self, address: &str, url: &str) -> Result<(), KvittoError> {
        queries::users::set_logo_url(self.db()?, address, url).await
    }

    async fn set_output_format(
        &self,
        address: &str,
        format: OutputFormat,
    ) -> Result<(), KvittoError> {
        queries::users::set_output_format(self.db()?, address, format).await
    }

    async fn set_virtual_account(
        &self,
        address: &str,
        account: &VirtualAccount,
    ) -> Result<(), KvittoError> {
        queries::users::set_virtual_account(self.db()?, address, account).await
    }

    async fn mark_paid(
        &self,
        address: &str,
        paid_until: Option<DateTime<Utc>>,
    ) -> Result<(), KvittoError> {
        queries::users::mark_paid(self.db()?, address, paid_until).await
    }

    async fn increment_receipts_used(&self, address: &str) -> Result<i64, KvittoError> {
        queries::users::increment_receipts_used(self.db()?, address).await
    }

    async fn increment_edits_used(&self, address: &str) -> Result<i64, KvittoError> {
        queries::users::increment_edits_used(self.db()?, address).await
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, KvittoError> {
        queries::users::list_users(self.db()?).await
    }

    async fn insert_receipt(&self, receipt: &ReceiptRecord) -> Result<(), KvittoError> {
        queries::receipts::insert_receipt(self.db()?, receipt).await
    }

    async fn get_receipt(&self, id: &str) -> Result<Option<ReceiptRecord>, KvittoError> {
        queries::receipts::get_receipt(self.db()?, id).await
    }

    async fn latest_receipt(&self, owner: &str) -> Result<Option<ReceiptRecord>, KvittoError> {
        queries::receipts::latest_for_owner(self.db()?, owner).await
    }

    async fn update_receipt_fields(
        &self,
        id: &str,
        fields: &ReceiptFields,
    ) -> Result<(), KvittoError> {
        queries::receipts::update_fields(self.db()?, id, fields).await
    }

    async fn count_receipts(&self) -> Result<i64, KvittoError> {
        queries::receipts::count_all(self.db()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use kvitto_core::SubscriptionPlan;

    async fn open_repo(dir: &tempfile::TempDir) -> SqliteRepository {
        let path = dir.path().join("kvitto.db");
        let repo = SqliteRepository::new(StorageConfig {
            database_path: path.to_string_lossy().into_owned(),
            wal_mode: true,
        });
        repo.initialize().await.unwrap();
        repo
    }

    #[tokio::test]
    async fn user_roundtrip_and_missing_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open_repo(&dir).await;

        assert!(repo.find_user("2348011111111").await.unwrap().is_none());

        let user = UserRecord::new("2348011111111");
        repo.insert_user(&user).await.unwrap();

        let found = repo.find_user("2348011111111").await.unwrap().unwrap();
        assert_eq!(found.address, user.address);
        assert_eq!(found.plan, SubscriptionPlan::Annual);
        assert_eq!(found.receipts_used, 0);
        assert!(!found.is_paid);

        repo.close().await.unwrap();
    }

    #[tokio::test]
    async fn narrow_updates_do_not_clobber_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open_repo(&dir).await;

        repo.insert_user(&UserRecord::new("u1")).await.unwrap();

        let profile = BrandProfile {
            business_name: "Ada Cakes".to_string(),
            brand_color: "#aa3377".to_string(),
            business_address: Some("12 Allen Ave".to_string()),
            contact_phone: Some("08012345678".to_string()),
            template: 2,
            output_format: OutputFormat::Pdf,
        };
        repo.update_brand_profile("u1", &profile).await.unwrap();
        repo.set_logo_url("u1", "https://img.example/logo.png")
            .await
            .unwrap();
        repo.set_virtual_account(
            "u1",
            &VirtualAccount {
                account_number: "9012345678".to_string(),
                bank_name: "Wema Bank".to_string(),
                reference: "ref-u1".to_string(),
            },
        )
        .await
        .unwrap();

        let user = repo.find_user("u1").await.unwrap().unwrap();
        assert_eq!(user.business_name.as_deref(), Some("Ada Cakes"));
        assert_eq!(user.template, 2);
        assert_eq!(user.output_format, OutputFormat::Pdf);
        assert_eq!(user.logo_url.as_deref(), Some("https://img.example/logo.png"));
        assert_eq!(user.payment_reference.as_deref(), Some("ref-u1"));
        assert_eq!(user.bank_name.as_deref(), Some("Wema Bank"));
    }

    #[tokio::test]
    async fn payment_reference_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open_repo(&dir).await;

        repo.insert_user(&UserRecord::new("u1")).await.unwrap();
        repo.set_virtual_account(
            "u1",
            &VirtualAccount {
                account_number: "9000000001".to_string(),
                bank_name: "Wema Bank".to_string(),
                reference: "ref-abc".to_string(),
            },
        )
        .await
        .unwrap();

        let hit = repo
            .find_user_by_payment_reference("ref-abc")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.address, "u1");
        assert!(
            repo.find_user_by_payment_reference("ref-zzz")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn counters_increment_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open_repo(&dir).await;

        repo.insert_user(&UserRecord::new("u1")).await.unwrap();

        assert_eq!(repo.increment_receipts_used("u1").await.unwrap(), 1);
        assert_eq!(repo.increment_receipts_used("u1").await.unwrap(), 2);
        assert_eq!(repo.increment_receipts_used("u1").await.unwrap(), 3);
        assert_eq!(repo.increment_edits_used("u1").await.unwrap(), 1);

        let user = repo.find_user("u1").await.unwrap().unwrap();
        assert_eq!(user.receipts_used, 3);
        assert_eq!(user.edits_used, 1);
    }

    #[tokio::test]
    async fn mark_paid_sets_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open_repo(&dir).await;

        repo.insert_user(&UserRecord::new("u1")).await.unwrap();
        let until = Utc::now() + Duration::days(365);
        repo.mark_paid("u1", Some(until)).await.unwrap();

        let user = repo.find_user("u1").await.unwrap().unwrap();
        assert!(user.is_paid);
        let stored = user.paid_until.unwrap();
        assert!((stored - until).num_seconds().abs() < 1);
    }

    #[tokio::test]
    async fn receipt_roundtrip_latest_and_edit() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open_repo(&dir).await;

        repo.insert_user(&UserRecord::new("owner")).await.unwrap();

        let mut older = ReceiptRecord::new(
            "owner",
            "Chinedu",
            vec!["Cake".to_string(), "Drink".to_string()],
            vec!["1500".to_string(), "500".to_string()],
            "Transfer",
            "2000",
        );
        older.created_at = Utc::now() - Duration::seconds(30);
        let newer = ReceiptRecord::new(
            "owner",
            "Bisi",
            vec!["Shoes".to_string()],
            vec!["7500.50".to_string()],
            "Cash",
            "7500.50",
        );
        repo.insert_receipt(&older).await.unwrap();
        repo.insert_receipt(&newer).await.unwrap();

        let fetched = repo.get_receipt(&older.id).await.unwrap().unwrap();
        assert_eq!(fetched.items, vec!["Cake", "Drink"]);
        assert_eq!(fetched.total, "2000");

        let latest = repo.latest_receipt("owner").await.unwrap().unwrap();
        assert_eq!(latest.id, newer.id);

        let fields = ReceiptFields {
            customer_name: "Chinedu O.".to_string(),
            items: vec!["Cake".to_string(), "Drink".to_string()],
            prices: vec!["1500".to_string(), "700".to_string()],
            payment_method: "POS".to_string(),
            total: "2200".to_string(),
        };
        repo.update_receipt_fields(&older.id, &fields).await.unwrap();

        let edited = repo.get_receipt(&older.id).await.unwrap().unwrap();
        assert_eq!(edited.id, older.id);
        assert_eq!(edited.owner, "owner");
        assert_eq!(edited.customer_name, "Chinedu O.");
        assert_eq!(edited.total, "2200");
        assert_eq!(edited.created_at, fetched.created_at);

        assert_eq!(repo.count_receipts().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn editing_missing_receipt_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open_repo(&dir).await;

        let fields = ReceiptFields {
            customer_name: "n".to_string(),
            items: vec!["i".to_string()],
            prices: vec!["1".to_string()],
            payment_method: "Cash".to_string(),
            total: "1".to_string(),
        };
        let err = repo
            .update_receipt_fields("no-such-id", &fields)
            .await
            .unwrap_err();
        assert!(matches!(err, KvittoError::ReceiptNotFound { .. }));
    }

    #[tokio::test]
    async fn health_reflects_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kvitto.db");
        let repo = SqliteRepository::new(StorageConfig {
            database_path: path.to_string_lossy().into_owned(),
            wal_mode: false,
        });

        assert!(matches!(
            repo.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));

        repo.initialize().await.unwrap();
        assert_eq!(repo.health_check().await.unwrap(), HealthStatus::Healthy);
        assert_eq!(repo.name(), "sqlite");
        assert_eq!(repo.kind(), AdapterKind::Repository);

        repo.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kvitto.db");
        let config = StorageConfig {
            database_path: path.to_string_lossy().into_owned(),
            wal_mode: true,
        };

        {
            let repo = SqliteRepository::new(config.clone());
            repo.initialize().await.unwrap();
            repo.insert_user(&UserRecord::new("persist-me")).await.unwrap();
            repo.close().await.unwrap();
        }

        let repo = SqliteRepository::new(config);
        repo.initialize().await.unwrap();
        assert!(repo.find_user("persist-me").await.unwrap().is_some());
    }
}
