use std::fmt::Debug;

use log::*;
use smm_common::Money;
use sqlx::SqlitePool;

use super::{catalog, db_url, deposits, ledger, new_pool, orders, users};
use crate::{
    db::traits::{
        AccountManagement,
        CatalogManagement,
        CreditOutcome,
        DepositTransition,
        PanelDatabase,
        PanelDatabaseError,
        TransitionMode,
    },
    db_types::{
        ActiveStatus,
        ApiProvider,
        CauseRef,
        Category,
        Deposit,
        DepositDetail,
        DepositStatus,
        GatewayProvider,
        LedgerEntry,
        NewApiProvider,
        NewDeposit,
        NewOrder,
        NewPaymentGateway,
        NewService,
        NewUser,
        Order,
        OrderProgress,
        OrderStatusType,
        PaymentGateway,
        Service,
        User,
        UserStatus,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl PanelDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order_with_debit(&self, order: NewOrder) -> Result<Order, PanelDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let user_id = order.user_id;
        let charge = order.charge;
        let balance = ledger::debit(user_id, charge, &mut tx).await?;
        let order = orders::insert_order(order, &mut tx).await?;
        let memo = format!("Order {}", order.invoice);
        ledger::record_entry(user_id, -charge, CauseRef::order(order.id), balance, &memo, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order #{} saved. {charge} debited from user #{user_id}, leaving {balance}", order.id);
        Ok(order)
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(order_id, &mut conn).await
    }

    async fn mark_order_dispatched(&self, order_id: i64, pid: &str) -> Result<Order, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::mark_dispatched(order_id, pid, &mut conn).await
    }

    async fn mark_order_dispatch_failed(&self, order_id: i64, reason: &str) -> Result<Order, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::mark_dispatch_failed(order_id, reason, &mut conn).await
    }

    async fn apply_order_progress(
        &self,
        order_id: i64,
        expected: OrderStatusType,
        progress: OrderProgress,
    ) -> Result<Option<Order>, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::apply_progress(order_id, expected, progress, &mut conn).await
    }

    async fn fetch_syncable_orders(&self) -> Result<Vec<Order>, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_syncable_orders(&mut conn).await
    }

    async fn set_order_status(&self, order_id: i64, status: OrderStatusType) -> Result<Order, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::update_status(order_id, status, &mut conn).await?;
        info!("🗃️ Order #{order_id} status set to {status}");
        Ok(order)
    }

    async fn delete_order(&self, order_id: i64) -> Result<Order, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::delete_order(order_id, &mut conn).await?;
        info!("🗃️ Order #{order_id} ({}) deleted. Its charge of {} was not returned.", order.invoice, order.charge);
        Ok(order)
    }

    async fn refund_order(&self, order_id: i64) -> Result<(Order, CreditOutcome), PanelDatabaseError> {
        let mut tx = self.pool.begin().await?;
        if !orders::lock_for_update(order_id, &mut tx).await? {
            return Err(PanelDatabaseError::OrderNotFound(order_id));
        }
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(PanelDatabaseError::OrderNotFound(order_id))?;
        let outcome = if order.charge.is_zero() {
            CreditOutcome::NothingToCredit
        } else {
            let memo = format!("Refund for order {}", order.invoice);
            ledger::credit_once(order.user_id, order.charge, CauseRef::refund(order.id), &memo, &mut tx).await?
        };
        let order = orders::update_status(order_id, OrderStatusType::Canceled, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order #{order_id} refunded ({outcome:?}) and canceled");
        Ok((order, outcome))
    }

    async fn insert_deposit(&self, deposit: NewDeposit) -> Result<Deposit, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        deposits::insert_deposit(deposit, &mut conn).await
    }

    async fn fetch_deposit(&self, deposit_id: i64) -> Result<Option<Deposit>, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        deposits::fetch_deposit(deposit_id, &mut conn).await
    }

    async fn update_deposit_detail(
        &self,
        deposit_id: i64,
        detail: &DepositDetail,
    ) -> Result<Deposit, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        deposits::update_detail(deposit_id, detail, &mut conn).await
    }

    async fn transition_deposit(
        &self,
        deposit_id: i64,
        status: DepositStatus,
        mode: TransitionMode,
    ) -> Result<DepositTransition, PanelDatabaseError> {
        let mut tx = self.pool.begin().await?;
        if !deposits::lock_for_update(deposit_id, &mut tx).await? {
            return Err(PanelDatabaseError::DepositNotFound(deposit_id));
        }
        let deposit = deposits::fetch_deposit(deposit_id, &mut tx)
            .await?
            .ok_or(PanelDatabaseError::DepositNotFound(deposit_id))?;
        let previous = deposit.status;
        if previous == status {
            trace!("🗃️ Deposit #{deposit_id} is already {status}");
            return Ok(DepositTransition::Unchanged(deposit));
        }
        if mode == TransitionMode::Automatic && previous.is_terminal() {
            debug!("🗃️ Deposit #{deposit_id} is {previous}, which is final. Not moving it to {status}");
            return Ok(DepositTransition::Unchanged(deposit));
        }
        let updated = match deposits::compare_and_set_status(deposit_id, previous, status, &mut tx).await? {
            Some(d) => d,
            None => {
                debug!("🗃️ Deposit #{deposit_id} changed while we were looking at it. Leaving it alone");
                return Ok(DepositTransition::Unchanged(deposit));
            },
        };
        let credit = if status == DepositStatus::Payment {
            let memo = format!("Deposit #{deposit_id}");
            Some(ledger::credit_once(updated.user_id, updated.amount, CauseRef::deposit(deposit_id), &memo, &mut tx).await?)
        } else {
            None
        };
        tx.commit().await?;
        info!("🗃️ Deposit #{deposit_id} moved from {previous} to {status} ({mode:?})");
        Ok(DepositTransition::Changed { deposit: updated, previous, credit })
    }

    async fn fetch_pending_remote_deposits(&self) -> Result<Vec<Deposit>, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        deposits::fetch_pending_remote_deposits(&mut conn).await
    }

    async fn close(&mut self) -> Result<(), PanelDatabaseError> {
        self.pool.close().await;
        Ok(())
    }
}

impl AccountManagement for SqliteDatabase {
    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user(user_id, &mut conn).await
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_for_user(user_id, &mut conn).await
    }

    async fn fetch_deposits_for_user(&self, user_id: i64) -> Result<Vec<Deposit>, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        deposits::fetch_deposits_for_user(user_id, &mut conn).await
    }

    async fn fetch_ledger_for_user(&self, user_id: i64) -> Result<Vec<LedgerEntry>, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        ledger::fetch_entries_for_user(user_id, &mut conn).await
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn fetch_service(&self, service_id: i64) -> Result<Option<Service>, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_service(service_id, &mut conn).await
    }

    async fn fetch_provider(&self, provider_id: i64) -> Result<Option<ApiProvider>, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_provider(provider_id, &mut conn).await
    }

    async fn fetch_active_providers(&self) -> Result<Vec<ApiProvider>, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_active_providers(&mut conn).await
    }

    async fn update_provider_balance(
        &self,
        provider_id: i64,
        balance: Money,
        currency: &str,
    ) -> Result<ApiProvider, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::update_provider_balance(provider_id, balance, currency, &mut conn).await
    }

    async fn fetch_gateway(&self, gateway_id: i64) -> Result<Option<PaymentGateway>, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_gateway(gateway_id, &mut conn).await
    }

    async fn fetch_default_gateway(
        &self,
        provider: GatewayProvider,
    ) -> Result<Option<PaymentGateway>, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_default_gateway(provider, &mut conn).await
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, PanelDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, PanelDatabaseError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding schema migrations.
    pub async fn migrate(&self) -> Result<(), PanelDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| PanelDatabaseError::DatabaseError(format!("Migration failed. {e}")))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    // Catalog maintenance. The admin screens that manage these records live outside the core; these methods exist for
    // seeding and tests.

    pub async fn create_user(&self, user: NewUser) -> Result<User, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        users::insert_user(user, &mut conn).await
    }

    pub async fn set_user_status(&self, user_id: i64, status: UserStatus) -> Result<User, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        users::update_user_status(user_id, status, &mut conn).await
    }

    pub async fn create_category(&self, name: &str) -> Result<Category, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::insert_category(name, &mut conn).await
    }

    pub async fn create_service(&self, service: NewService) -> Result<Service, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::insert_service(service, &mut conn).await
    }

    pub async fn set_service_status(&self, service_id: i64, status: ActiveStatus) -> Result<Service, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::update_service_status(service_id, status, &mut conn).await
    }

    pub async fn set_service_prices(
        &self,
        service_id: i64,
        price_api: Money,
        price_sale: Money,
        price_reseller: Money,
    ) -> Result<Service, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::update_service_prices(service_id, price_api, price_sale, price_reseller, &mut conn).await
    }

    pub async fn create_provider(&self, provider: NewApiProvider) -> Result<ApiProvider, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::insert_provider(provider, &mut conn).await
    }

    pub async fn set_provider_status(
        &self,
        provider_id: i64,
        status: ActiveStatus,
    ) -> Result<ApiProvider, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::update_provider_status(provider_id, status, &mut conn).await
    }

    pub async fn create_gateway(&self, gateway: NewPaymentGateway) -> Result<PaymentGateway, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::insert_gateway(gateway, &mut conn).await
    }

    pub async fn set_gateway_status(
        &self,
        gateway_id: i64,
        status: ActiveStatus,
    ) -> Result<PaymentGateway, PanelDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        catalog::update_gateway_status(gateway_id, status, &mut conn).await
    }
}
