use std::fmt::Debug;

use log::*;
use smm_common::{
    remote::{
        CryptomusApi,
        CryptomusInvoiceRequest,
        CryptomusPaymentLookup,
        PaypalApi,
        PaypalOrderRequest,
        RemoteApiError,
    },
    Money,
};

use crate::{
    db::traits::{DepositTransition, PanelDatabase, TransitionMode},
    db_types::{
        CryptomusConfig,
        Deposit,
        DepositDetail,
        DepositStatus,
        GatewayConfig,
        GatewayProvider,
        NewDeposit,
        PaymentGateway,
        PaypalConfig,
        UserStatus,
    },
    panel_api::{
        batch::BatchReport,
        deposit_objects::{CreateDepositRequest, DepositCheckResult, DepositInitiation, DepositUrls},
        errors::PanelApiError,
        status_maps::{deposit_status_for_cryptomus, deposit_status_for_paypal},
    },
};

/// `DepositApi` opens deposits with the payment gateways and reconciles them against what the gateways report.
///
/// Deposit status only ever changes through [`PanelDatabase::transition_deposit`], which credits the wallet exactly
/// once when a deposit first reaches `PAYMENT`. Reconciliation can therefore be repeated as often as you like.
pub struct DepositApi<B, Pp, C> {
    db: B,
    paypal: Pp,
    cryptomus: C,
    urls: DepositUrls,
}

impl<B, Pp, C> Debug for DepositApi<B, Pp, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DepositApi")
    }
}

impl<B, Pp, C> DepositApi<B, Pp, C> {
    pub fn new(db: B, paypal: Pp, cryptomus: C, urls: DepositUrls) -> Self {
        Self { db, paypal, cryptomus, urls }
    }
}

impl<B, Pp, C> DepositApi<B, Pp, C>
where
    B: PanelDatabase,
    Pp: PaypalApi,
    C: CryptomusApi,
{
    pub async fn fetch_deposit(&self, deposit_id: i64) -> Result<Deposit, PanelApiError> {
        self.db
            .fetch_deposit(deposit_id)
            .await?
            .ok_or_else(|| PanelApiError::NotFound(format!("Deposit #{deposit_id} does not exist")))
    }

    /// Opens a `PENDING` deposit for `user_id`.
    ///
    /// The gateway's fee percentage is charged on top of the requested amount; only the requested amount is credited to
    /// the wallet when the deposit is paid. For PayPal and Cryptomus a hosted checkout is created and its URL returned.
    /// If the gateway cannot create the checkout, the deposit is marked `ERROR` and the gateway's error is returned.
    pub async fn create_deposit(
        &self,
        user_id: i64,
        request: CreateDepositRequest,
    ) -> Result<DepositInitiation, PanelApiError> {
        let user = self
            .db
            .fetch_user(user_id)
            .await?
            .ok_or_else(|| PanelApiError::NotFound(format!("User #{user_id} does not exist")))?;
        if user.status != UserStatus::Active {
            return Err(PanelApiError::validation(format!("User #{user_id} may not make deposits")));
        }
        let gateway = self.gateway_for_request(&request).await?;
        if !gateway.status.is_active() {
            return Err(PanelApiError::validation(format!("Payment gateway {} is not available", gateway.name)));
        }
        let amount = request.amount;
        if amount <= Money::default() {
            return Err(PanelApiError::validation("The deposit amount must be positive"));
        }
        if amount < gateway.min_deposit {
            return Err(PanelApiError::validation(format!(
                "The minimum deposit for {} is {}",
                gateway.name, gateway.min_deposit
            )));
        }
        let fee = amount
            .percentage(gateway.config.fee_percent())
            .map_err(|e| PanelApiError::validation(e.to_string()))?;
        let charged = amount + fee;
        match &gateway.config {
            GatewayConfig::Paypal(config) => self.open_paypal_deposit(user_id, &gateway, config, amount, fee).await,
            GatewayConfig::Cryptomus(config) => {
                self.open_cryptomus_deposit(user_id, &gateway, config, amount, fee).await
            },
            GatewayConfig::Manual(config) => {
                let detail = DepositDetail::Manual {
                    bank_name: config.bank_name.clone(),
                    account_name: config.account_name.clone(),
                    account_number: config.account_number.clone(),
                    instructions: config.instructions.clone(),
                    fee,
                };
                let deposit = self.insert_deposit(user_id, &gateway, amount, detail).await?;
                info!("🔄️💰️ Manual deposit #{} of {amount} opened for user #{user_id}", deposit.id);
                Ok(DepositInitiation { deposit, charged, fee, redirect_url: None })
            },
            GatewayConfig::Invalid(reason) => Err(PanelApiError::Configuration(reason.clone())),
        }
    }

    async fn gateway_for_request(&self, request: &CreateDepositRequest) -> Result<PaymentGateway, PanelApiError> {
        match (request.gateway_id, request.provider) {
            (Some(id), provider) => {
                let gateway = self
                    .db
                    .fetch_gateway(id)
                    .await?
                    .ok_or_else(|| PanelApiError::NotFound(format!("Payment gateway #{id} does not exist")))?;
                match provider {
                    Some(p) if p != gateway.provider => Err(PanelApiError::validation(format!(
                        "Payment gateway #{id} is a {} gateway, not {p}",
                        gateway.provider
                    ))),
                    _ => Ok(gateway),
                }
            },
            (None, Some(provider)) => self
                .db
                .fetch_default_gateway(provider)
                .await?
                .ok_or_else(|| PanelApiError::NotFound(format!("There is no active {provider} payment gateway"))),
            (None, None) => Err(PanelApiError::validation("Either a gateway id or a gateway provider is required")),
        }
    }

    async fn insert_deposit(
        &self,
        user_id: i64,
        gateway: &PaymentGateway,
        amount: Money,
        detail: DepositDetail,
    ) -> Result<Deposit, PanelApiError> {
        let deposit = NewDeposit { user_id, gateway_id: Some(gateway.id), amount, detail };
        Ok(self.db.insert_deposit(deposit).await?)
    }

    async fn open_paypal_deposit(
        &self,
        user_id: i64,
        gateway: &PaymentGateway,
        config: &PaypalConfig,
        amount: Money,
        fee: Money,
    ) -> Result<DepositInitiation, PanelApiError> {
        let detail = DepositDetail::Paypal { order_id: None, approve_url: None, fee };
        let deposit = self.insert_deposit(user_id, gateway, amount, detail).await?;
        let charged = amount + fee;
        let request = PaypalOrderRequest {
            amount: charged,
            currency: config.currency.clone(),
            reference: format!("DEP-{}", deposit.id),
            return_url: self.urls.return_url_for(deposit.id),
            cancel_url: self.urls.cancel_url_for(deposit.id),
        };
        trace!("🛰️💰️ Creating PayPal order for deposit #{}", deposit.id);
        let order = match self.paypal.create_order(&config.credentials(), &request).await {
            Ok(order) => order,
            Err(e) => return Err(self.fail_deposit(deposit.id, e).await),
        };
        let detail = DepositDetail::Paypal { order_id: Some(order.id.clone()), approve_url: order.approve_url.clone(), fee };
        let deposit = self.db.update_deposit_detail(deposit.id, &detail).await?;
        info!("🛰️💰️ PayPal order {} created for deposit #{} ({charged})", order.id, deposit.id);
        Ok(DepositInitiation { deposit, charged, fee, redirect_url: order.approve_url })
    }

    async fn open_cryptomus_deposit(
        &self,
        user_id: i64,
        gateway: &PaymentGateway,
        config: &CryptomusConfig,
        amount: Money,
        fee: Money,
    ) -> Result<DepositInitiation, PanelApiError> {
        let placeholder = DepositDetail::Cryptomus { order_id: String::new(), uuid: None, pay_url: None, fee };
        let deposit = self.insert_deposit(user_id, gateway, amount, placeholder).await?;
        // The invoice's order id is derived from the deposit id, so it can only be set once the row exists. Store it
        // before calling out, so the invoice can be found by order id even if the response is lost.
        let order_id = format!("DEP-{}", deposit.id);
        let detail = DepositDetail::Cryptomus { order_id: order_id.clone(), uuid: None, pay_url: None, fee };
        let deposit = self.db.update_deposit_detail(deposit.id, &detail).await?;
        let charged = amount + fee;
        let request = CryptomusInvoiceRequest {
            amount: charged,
            currency: config.currency.clone(),
            order_id: order_id.clone(),
            url_return: Some(self.urls.return_url_for(deposit.id)),
            url_callback: self.urls.callback_url_for(deposit.id),
        };
        trace!("🛰️💰️ Creating Cryptomus invoice {order_id}");
        let invoice = match self.cryptomus.create_invoice(&config.credentials(), &request).await {
            Ok(invoice) => invoice,
            Err(e) => return Err(self.fail_deposit(deposit.id, e).await),
        };
        let detail = DepositDetail::Cryptomus {
            order_id,
            uuid: Some(invoice.uuid.clone()),
            pay_url: Some(invoice.url.clone()),
            fee,
        };
        let deposit = self.db.update_deposit_detail(deposit.id, &detail).await?;
        info!("🛰️💰️ Cryptomus invoice {} created for deposit #{} ({charged})", invoice.uuid, deposit.id);
        Ok(DepositInitiation { deposit, charged, fee, redirect_url: Some(invoice.url) })
    }

    /// Marks a freshly opened deposit as `ERROR` after the gateway refused to open a checkout for it.
    async fn fail_deposit(&self, deposit_id: i64, error: RemoteApiError) -> PanelApiError {
        warn!("🛰️💰️ The gateway could not open a checkout for deposit #{deposit_id}. {error}");
        if let Err(e) = self.db.transition_deposit(deposit_id, DepositStatus::Error, TransitionMode::Automatic).await {
            error!("🔄️💰️ Could not mark deposit #{deposit_id} as failed. {e}");
        }
        PanelApiError::Remote(error)
    }

    /// Captures an approved PayPal order and applies the result. Capturing a deposit that is already final is a no-op.
    pub async fn capture_paypal_deposit(&self, deposit_id: i64) -> Result<DepositCheckResult, PanelApiError> {
        let deposit = self.fetch_deposit(deposit_id).await?;
        let order_id = paypal_order_id(&deposit)?;
        if deposit.status.is_terminal() {
            return Ok(DepositCheckResult::Unchanged { deposit });
        }
        let config = self.paypal_config(&deposit).await?;
        let order = self.paypal.capture_order(&config.credentials(), &order_id).await?;
        debug!("🛰️💰️ PayPal order {order_id} for deposit #{deposit_id} captured with status {}", order.status);
        self.apply_remote_status(deposit, deposit_status_for_paypal(&order.status)).await
    }

    /// Asks PayPal for the state of a deposit's order and applies it.
    pub async fn check_paypal_status(&self, deposit_id: i64) -> Result<DepositCheckResult, PanelApiError> {
        let deposit = self.fetch_deposit(deposit_id).await?;
        self.check_paypal(deposit).await
    }

    async fn check_paypal(&self, deposit: Deposit) -> Result<DepositCheckResult, PanelApiError> {
        let order_id = paypal_order_id(&deposit)?;
        if deposit.status.is_terminal() {
            return Ok(DepositCheckResult::Unchanged { deposit });
        }
        let config = self.paypal_config(&deposit).await?;
        let order = self.paypal.order_status(&config.credentials(), &order_id).await?;
        trace!("🛰️💰️ PayPal order {order_id} for deposit #{} is {}", deposit.id, order.status);
        self.apply_remote_status(deposit, deposit_status_for_paypal(&order.status)).await
    }

    /// Asks Cryptomus for the state of a deposit's invoice and applies it.
    pub async fn check_cryptomus_status(&self, deposit_id: i64) -> Result<DepositCheckResult, PanelApiError> {
        let deposit = self.fetch_deposit(deposit_id).await?;
        self.check_cryptomus(deposit).await
    }

    async fn check_cryptomus(&self, deposit: Deposit) -> Result<DepositCheckResult, PanelApiError> {
        let lookup = match &deposit.detail {
            DepositDetail::Cryptomus { uuid: Some(uuid), .. } => CryptomusPaymentLookup::Uuid(uuid.clone()),
            DepositDetail::Cryptomus { order_id, .. } if !order_id.is_empty() => {
                CryptomusPaymentLookup::OrderId(order_id.clone())
            },
            DepositDetail::Cryptomus { .. } => {
                return Err(PanelApiError::validation(format!("Deposit #{} has no Cryptomus invoice", deposit.id)))
            },
            _ => return Err(PanelApiError::validation(format!("Deposit #{} is not a Cryptomus deposit", deposit.id))),
        };
        if deposit.status.is_terminal() {
            return Ok(DepositCheckResult::Unchanged { deposit });
        }
        let gateway = self.gateway_for_deposit(&deposit, GatewayProvider::Cryptomus).await?;
        let GatewayConfig::Cryptomus(config) = &gateway.config else {
            return Err(config_mismatch(&gateway, GatewayProvider::Cryptomus));
        };
        let invoice = self.cryptomus.payment_info(&config.credentials(), &lookup).await?;
        trace!("🛰️💰️ Cryptomus invoice for deposit #{} is {}", deposit.id, invoice.status);
        self.apply_remote_status(deposit, deposit_status_for_cryptomus(&invoice.status)).await
    }

    /// Checks a deposit with whichever gateway it was made through. Manual deposits report
    /// [`DepositCheckResult::NoAutoCheck`].
    pub async fn check_deposit_status(&self, deposit_id: i64) -> Result<DepositCheckResult, PanelApiError> {
        let deposit = self.fetch_deposit(deposit_id).await?;
        self.check_deposit(deposit).await
    }

    async fn check_deposit(&self, deposit: Deposit) -> Result<DepositCheckResult, PanelApiError> {
        match deposit.detail {
            DepositDetail::Paypal { .. } => self.check_paypal(deposit).await,
            DepositDetail::Cryptomus { .. } => self.check_cryptomus(deposit).await,
            DepositDetail::Manual { .. } | DepositDetail::Unsupported => {
                Ok(DepositCheckResult::NoAutoCheck { deposit })
            },
        }
    }

    /// Reconciles every pending PayPal and Cryptomus deposit. A failure on one deposit is recorded in the report and
    /// the run continues.
    pub async fn update_all_deposits(&self) -> Result<BatchReport, PanelApiError> {
        let deposits = self.db.fetch_pending_remote_deposits().await?;
        debug!("🔄️💰️ Reconciling {} pending deposits", deposits.len());
        let mut report = BatchReport::default();
        for deposit in deposits {
            let id = deposit.id;
            match self.check_deposit(deposit).await {
                Ok(result) => report.record_success(result.is_updated()),
                Err(e) => {
                    warn!("🔄️💰️ Could not reconcile deposit #{id}. {e}");
                    report.record_failure(id, e.to_string());
                },
            }
        }
        info!("🔄️💰️ Deposit reconciliation complete. {report}");
        Ok(report)
    }

    async fn apply_remote_status(
        &self,
        deposit: Deposit,
        status: Option<DepositStatus>,
    ) -> Result<DepositCheckResult, PanelApiError> {
        let Some(status) = status else {
            return Ok(DepositCheckResult::Unchanged { deposit });
        };
        match self.db.transition_deposit(deposit.id, status, TransitionMode::Automatic).await? {
            DepositTransition::Changed { deposit, previous, credit } => {
                let credited = credit.map(|c| c.was_credited()).unwrap_or(false);
                info!("🔄️💰️ Deposit #{} moved from {previous} to {}", deposit.id, deposit.status);
                Ok(DepositCheckResult::Updated { deposit, previous, credited })
            },
            DepositTransition::Unchanged(deposit) => Ok(DepositCheckResult::Unchanged { deposit }),
        }
    }

    async fn paypal_config(&self, deposit: &Deposit) -> Result<PaypalConfig, PanelApiError> {
        let gateway = self.gateway_for_deposit(deposit, GatewayProvider::Paypal).await?;
        match gateway.config {
            GatewayConfig::Paypal(config) => Ok(config),
            _ => Err(config_mismatch(&gateway, GatewayProvider::Paypal)),
        }
    }

    /// The gateway a deposit was made through or, if that gateway has since been removed, the default gateway for the
    /// same provider.
    async fn gateway_for_deposit(
        &self,
        deposit: &Deposit,
        provider: GatewayProvider,
    ) -> Result<PaymentGateway, PanelApiError> {
        if let Some(id) = deposit.gateway_id {
            if let Some(gateway) = self.db.fetch_gateway(id).await? {
                return Ok(gateway);
            }
        }
        self.db.fetch_default_gateway(provider).await?.ok_or_else(|| {
            PanelApiError::Configuration(format!("No {provider} gateway is configured to check deposit #{}", deposit.id))
        })
    }
}

fn paypal_order_id(deposit: &Deposit) -> Result<String, PanelApiError> {
    match &deposit.detail {
        DepositDetail::Paypal { order_id: Some(id), .. } => Ok(id.clone()),
        DepositDetail::Paypal { order_id: None, .. } => {
            Err(PanelApiError::validation(format!("Deposit #{} has no PayPal order", deposit.id)))
        },
        _ => Err(PanelApiError::validation(format!("Deposit #{} is not a PayPal deposit", deposit.id))),
    }
}

fn config_mismatch(gateway: &PaymentGateway, expected: GatewayProvider) -> PanelApiError {
    match &gateway.config {
        GatewayConfig::Invalid(reason) => PanelApiError::Configuration(reason.clone()),
        _ => PanelApiError::Configuration(format!("Payment gateway {} is not a {expected} gateway", gateway.name)),
    }
}
