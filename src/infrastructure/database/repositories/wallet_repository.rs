//! SeaORM implementation of WalletRepository
//!
//! `append` runs in one database transaction: a version-guarded wallet
//! update, the ledger row, then the payment upserts. Any failure rolls all
//! of it back.

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::debug;

use super::{anchor_columns, db_err, fetch_page, insert_err, parse_column};
use crate::domain::wallet::{
    LedgerAppend, LedgerTransaction, Payment, TransactionFilter, WalletInfo, WalletRepository,
};
use crate::domain::{DomainError, DomainResult, LedgerAnchor};
use crate::infrastructure::database::entities::{ledger_transaction, payment, wallet};
use crate::shared::{PageRequest, PaginatedResult};

pub struct SeaOrmWalletRepository {
    db: DatabaseConnection,
}

impl SeaOrmWalletRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn wallet_to_domain(m: wallet::Model) -> WalletInfo {
    WalletInfo {
        id: m.id,
        user_id: m.user_id,
        balance: m.balance,
        currency: m.currency,
        version: m.version,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn transaction_to_domain(m: ledger_transaction::Model) -> DomainResult<LedgerTransaction> {
    Ok(LedgerTransaction {
        tx_type: parse_column("tx_type", &m.tx_type)?,
        status: parse_column("transaction status", &m.status)?,
        anchor: LedgerAnchor::from_columns(m.anchor_tx_hash, m.anchor_block_number, m.anchor_orgs),
        id: m.id,
        wallet_id: m.wallet_id,
        user_id: m.user_id,
        amount: m.amount,
        balance_before: m.balance_before,
        balance_after: m.balance_after,
        reservation_id: m.reservation_id,
        session_id: m.session_id,
        payment_id: m.payment_id,
        description: m.description,
        created_at: m.created_at,
    })
}

fn payment_to_domain(m: payment::Model) -> DomainResult<Payment> {
    Ok(Payment {
        payment_type: parse_column("payment_type", &m.payment_type)?,
        status: parse_column("payment status", &m.status)?,
        anchor: LedgerAnchor::from_columns(m.anchor_tx_hash, m.anchor_block_number, m.anchor_orgs),
        id: m.id,
        wallet_id: m.wallet_id,
        user_id: m.user_id,
        amount: m.amount,
        reference_id: m.reference_id,
        description: m.description,
        refunded_amount: m.refunded_amount,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn payment_to_active(p: Payment) -> payment::ActiveModel {
    let (tx_hash, block_number, orgs) = anchor_columns(&p.anchor);
    payment::ActiveModel {
        id: Set(p.id),
        wallet_id: Set(p.wallet_id),
        user_id: Set(p.user_id),
        amount: Set(p.amount),
        payment_type: Set(p.payment_type.as_str().to_string()),
        reference_id: Set(p.reference_id),
        description: Set(p.description),
        status: Set(p.status.as_str().to_string()),
        refunded_amount: Set(p.refunded_amount),
        anchor_tx_hash: Set(tx_hash),
        anchor_block_number: Set(block_number),
        anchor_orgs: Set(orgs),
        created_at: Set(p.created_at),
        updated_at: Set(p.updated_at),
    }
}

fn payments_to_domain(models: Vec<payment::Model>) -> DomainResult<Vec<Payment>> {
    models.into_iter().map(payment_to_domain).collect()
}

fn transactions_to_domain(
    models: Vec<ledger_transaction::Model>,
) -> DomainResult<Vec<LedgerTransaction>> {
    models.into_iter().map(transaction_to_domain).collect()
}

async fn write_entry(txn: &DatabaseTransaction, entry: LedgerAppend) -> DomainResult<()> {
    let wallet_id = entry.wallet.id.clone();
    let updated = wallet::Entity::update_many()
        .col_expr(wallet::Column::Balance, Expr::value(entry.wallet.balance))
        .col_expr(wallet::Column::Version, Expr::value(entry.wallet.version))
        .col_expr(wallet::Column::UpdatedAt, Expr::value(entry.wallet.updated_at))
        .filter(wallet::Column::Id.eq(wallet_id.as_str()))
        .filter(wallet::Column::Version.eq(entry.expected_version))
        .exec(txn)
        .await
        .map_err(db_err)?;

    if updated.rows_affected == 0 {
        let exists = wallet::Entity::find_by_id(wallet_id.as_str())
            .one(txn)
            .await
            .map_err(db_err)?
            .is_some();
        return Err(if exists {
            DomainError::Conflict(format!(
                "wallet {} changed since version {}",
                wallet_id, entry.expected_version
            ))
        } else {
            DomainError::not_found("Wallet", wallet_id)
        });
    }

    let tx = entry.transaction;
    let (tx_hash, block_number, orgs) = anchor_columns(&tx.anchor);
    ledger_transaction::ActiveModel {
        id: Set(tx.id),
        wallet_id: Set(tx.wallet_id),
        user_id: Set(tx.user_id),
        tx_type: Set(tx.tx_type.as_str().to_string()),
        amount: Set(tx.amount),
        balance_before: Set(tx.balance_before),
        balance_after: Set(tx.balance_after),
        status: Set(tx.status.as_str().to_string()),
        reservation_id: Set(tx.reservation_id),
        session_id: Set(tx.session_id),
        payment_id: Set(tx.payment_id),
        description: Set(tx.description),
        anchor_tx_hash: Set(tx_hash),
        anchor_block_number: Set(block_number),
        anchor_orgs: Set(orgs),
        wallet_version: Set(entry.wallet.version),
        created_at: Set(tx.created_at),
    }
    .insert(txn)
    .await
    .map_err(db_err)?;

    for p in entry.payments {
        let exists = payment::Entity::find_by_id(p.id.as_str())
            .one(txn)
            .await
            .map_err(db_err)?
            .is_some();
        let model = payment_to_active(p);
        if exists {
            model.update(txn).await.map_err(db_err)?;
        } else {
            model.insert(txn).await.map_err(db_err)?;
        }
    }
    Ok(())
}

// ── WalletRepository impl ───────────────────────────────────────

#[async_trait]
impl WalletRepository for SeaOrmWalletRepository {
    async fn create(&self, w: WalletInfo) -> DomainResult<()> {
        let user_id = w.user_id.clone();
        let model = wallet::ActiveModel {
            id: Set(w.id),
            user_id: Set(w.user_id),
            balance: Set(w.balance),
            currency: Set(w.currency),
            version: Set(w.version),
            created_at: Set(w.created_at),
            updated_at: Set(w.updated_at),
        };
        model
            .insert(&self.db)
            .await
            .map_err(|e| insert_err(e, || format!("user {} already has a wallet", user_id)))?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<WalletInfo>> {
        let model = wallet::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(wallet_to_domain))
    }

    async fn find_by_user(&self, user_id: &str) -> DomainResult<Option<WalletInfo>> {
        let model = wallet::Entity::find()
            .filter(wallet::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(wallet_to_domain))
    }

    async fn append(&self, entry: LedgerAppend) -> DomainResult<()> {
        debug!(
            wallet_id = %entry.wallet.id,
            expected_version = entry.expected_version,
            "Appending ledger entry"
        );
        let txn = self.db.begin().await.map_err(db_err)?;
        match write_entry(&txn, entry).await {
            Ok(()) => txn.commit().await.map_err(db_err),
            Err(e) => {
                txn.rollback().await.map_err(db_err)?;
                Err(e)
            }
        }
    }

    async fn record_payment(&self, p: Payment) -> DomainResult<()> {
        let id = p.id.clone();
        payment_to_active(p)
            .insert(&self.db)
            .await
            .map_err(|e| insert_err(e, || format!("payment {} already exists", id)))?;
        Ok(())
    }

    async fn find_transactions(
        &self,
        wallet_id: &str,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<LedgerTransaction>> {
        let mut query = ledger_transaction::Entity::find()
            .filter(ledger_transaction::Column::WalletId.eq(wallet_id));
        if let Some(tx_type) = filter.tx_type {
            query = query.filter(ledger_transaction::Column::TxType.eq(tx_type.as_str()));
        }
        let query = query.order_by_desc(ledger_transaction::Column::WalletVersion);

        let (models, total) = fetch_page(&self.db, query, page).await?;
        Ok(PaginatedResult::new(
            transactions_to_domain(models)?,
            total,
            page.page,
            page.limit,
        ))
    }

    async fn all_transactions(&self, wallet_id: &str) -> DomainResult<Vec<LedgerTransaction>> {
        let models = ledger_transaction::Entity::find()
            .filter(ledger_transaction::Column::WalletId.eq(wallet_id))
            .order_by_asc(ledger_transaction::Column::WalletVersion)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        transactions_to_domain(models)
    }

    async fn find_transaction(&self, id: &str) -> DomainResult<Option<LedgerTransaction>> {
        let model = ledger_transaction::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(transaction_to_domain).transpose()
    }

    async fn find_payment(&self, id: &str) -> DomainResult<Option<Payment>> {
        let model = payment::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(payment_to_domain).transpose()
    }

    async fn find_payments_for_user(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<Payment>> {
        let query = payment::Entity::find()
            .filter(payment::Column::UserId.eq(user_id))
            .order_by_desc(payment::Column::CreatedAt)
            .order_by_desc(payment::Column::Id);
        let (models, total) = fetch_page(&self.db, query, page).await?;
        Ok(PaginatedResult::new(
            payments_to_domain(models)?,
            total,
            page.page,
            page.limit,
        ))
    }

    async fn find_payments_by_reference(&self, reference_id: &str) -> DomainResult<Vec<Payment>> {
        let models = payment::Entity::find()
            .filter(payment::Column::ReferenceId.eq(reference_id))
            .order_by_asc(payment::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        payments_to_domain(models)
    }
}
