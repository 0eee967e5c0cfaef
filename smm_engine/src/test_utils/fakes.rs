//! Scripted, in-memory stand-ins for the SMM provider and payment gateway APIs.
//!
//! Each fake is cheaply cloneable and shares its state between clones, so a test can keep a handle to script
//! responses and inspect calls after moving a clone into the API under test.
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use smm_common::{
    remote::{
        CryptomusApi,
        CryptomusCredentials,
        CryptomusInvoice,
        CryptomusInvoiceRequest,
        CryptomusPaymentLookup,
        CryptomusPaymentStatus,
        PaypalApi,
        PaypalCredentials,
        PaypalOrder,
        PaypalOrderRequest,
        PaypalOrderStatus,
        ProviderBalance,
        ProviderEndpoint,
        ProviderOrderRequest,
        ProviderOrderStatus,
        RemoteApiError,
        SmmProviderApi,
    },
    Money,
};

//--------------------------------------     FakeProvider     -------------------------------------------------------
#[derive(Default)]
struct ProviderState {
    next_pid: u64,
    add_order_failures: VecDeque<RemoteApiError>,
    submitted: Vec<ProviderOrderRequest>,
    statuses: HashMap<String, Result<ProviderOrderStatus, RemoteApiError>>,
    status_calls: usize,
    balance: Option<Result<ProviderBalance, RemoteApiError>>,
}

#[derive(Clone, Default)]
pub struct FakeProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `add_order` call fails with `error`.
    pub fn fail_next_order(&self, error: RemoteApiError) {
        self.state.lock().unwrap().add_order_failures.push_back(error);
    }

    pub fn set_status(&self, pid: &str, status: ProviderOrderStatus) {
        self.state.lock().unwrap().statuses.insert(pid.to_string(), Ok(status));
    }

    pub fn set_status_error(&self, pid: &str, error: RemoteApiError) {
        self.state.lock().unwrap().statuses.insert(pid.to_string(), Err(error));
    }

    pub fn set_balance(&self, balance: Result<ProviderBalance, RemoteApiError>) {
        self.state.lock().unwrap().balance = Some(balance);
    }

    pub fn submitted(&self) -> Vec<ProviderOrderRequest> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn status_calls(&self) -> usize {
        self.state.lock().unwrap().status_calls
    }
}

impl SmmProviderApi for FakeProvider {
    async fn add_order(
        &self,
        _endpoint: &ProviderEndpoint,
        order: &ProviderOrderRequest,
    ) -> Result<String, RemoteApiError> {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.add_order_failures.pop_front() {
            return Err(e);
        }
        state.next_pid += 1;
        state.submitted.push(order.clone());
        Ok(format!("{}", 9000 + state.next_pid))
    }

    async fn order_status(
        &self,
        _endpoint: &ProviderEndpoint,
        pid: &str,
    ) -> Result<ProviderOrderStatus, RemoteApiError> {
        let mut state = self.state.lock().unwrap();
        state.status_calls += 1;
        state.statuses.get(pid).cloned().unwrap_or_else(|| Err(RemoteApiError::Rejected("Incorrect order ID".into())))
    }

    async fn balance(&self, _endpoint: &ProviderEndpoint) -> Result<ProviderBalance, RemoteApiError> {
        let state = self.state.lock().unwrap();
        state.balance.clone().unwrap_or_else(|| Ok(ProviderBalance { balance: Money::from_units(100), currency: "USD".into() }))
    }
}

//--------------------------------------      FakePaypal      -------------------------------------------------------
#[derive(Default)]
struct PaypalState {
    next_id: u64,
    create_failures: VecDeque<RemoteApiError>,
    created: Vec<PaypalOrderRequest>,
    orders: HashMap<String, PaypalOrder>,
    calls: usize,
}

#[derive(Clone, Default)]
pub struct FakePaypal {
    state: Arc<Mutex<PaypalState>>,
}

impl FakePaypal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_create(&self, error: RemoteApiError) {
        self.state.lock().unwrap().create_failures.push_back(error);
    }

    /// Simulates the payer acting on the order, e.g. approving it.
    pub fn set_order_status(&self, order_id: &str, status: PaypalOrderStatus) {
        if let Some(order) = self.state.lock().unwrap().orders.get_mut(order_id) {
            order.status = status;
        }
    }

    pub fn created(&self) -> Vec<PaypalOrderRequest> {
        self.state.lock().unwrap().created.clone()
    }

    /// The number of status and capture calls made
    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }
}

impl PaypalApi for FakePaypal {
    async fn create_order(
        &self,
        _credentials: &PaypalCredentials,
        order: &PaypalOrderRequest,
    ) -> Result<PaypalOrder, RemoteApiError> {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.create_failures.pop_front() {
            return Err(e);
        }
        state.next_id += 1;
        let id = format!("PAYPAL-{}", state.next_id);
        let created = PaypalOrder {
            id: id.clone(),
            status: PaypalOrderStatus::Created,
            approve_url: Some(format!("https://www.sandbox.paypal.com/checkoutnow?token={id}")),
        };
        state.created.push(order.clone());
        state.orders.insert(id, created.clone());
        Ok(created)
    }

    async fn order_status(&self, _credentials: &PaypalCredentials, order_id: &str) -> Result<PaypalOrder, RemoteApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state
            .orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| RemoteApiError::Http { status: 404, message: "RESOURCE_NOT_FOUND".into() })
    }

    async fn capture_order(
        &self,
        _credentials: &PaypalCredentials,
        order_id: &str,
    ) -> Result<PaypalOrder, RemoteApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| RemoteApiError::Http { status: 404, message: "RESOURCE_NOT_FOUND".into() })?;
        match order.status {
            PaypalOrderStatus::Approved => {
                order.status = PaypalOrderStatus::Completed;
                Ok(order.clone())
            },
            PaypalOrderStatus::Completed => {
                Err(RemoteApiError::Http { status: 422, message: "ORDER_ALREADY_CAPTURED".into() })
            },
            _ => Err(RemoteApiError::Http { status: 422, message: "ORDER_NOT_APPROVED".into() }),
        }
    }
}

//--------------------------------------    FakeCryptomus     -------------------------------------------------------
#[derive(Default)]
struct CryptomusState {
    create_failures: VecDeque<RemoteApiError>,
    created: Vec<CryptomusInvoiceRequest>,
    /// Keyed by our order id
    invoices: HashMap<String, CryptomusInvoice>,
    lookup_failures: HashMap<String, RemoteApiError>,
    lookups: usize,
}

#[derive(Clone, Default)]
pub struct FakeCryptomus {
    state: Arc<Mutex<CryptomusState>>,
}

impl FakeCryptomus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_create(&self, error: RemoteApiError) {
        self.state.lock().unwrap().create_failures.push_back(error);
    }

    pub fn set_status(&self, order_id: &str, status: CryptomusPaymentStatus) {
        if let Some(invoice) = self.state.lock().unwrap().invoices.get_mut(order_id) {
            invoice.status = status;
        }
    }

    /// Lookups for the invoice with this order id fail with `error`.
    pub fn fail_lookups_for(&self, order_id: &str, error: RemoteApiError) {
        self.state.lock().unwrap().lookup_failures.insert(order_id.to_string(), error);
    }

    pub fn created(&self) -> Vec<CryptomusInvoiceRequest> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn lookups(&self) -> usize {
        self.state.lock().unwrap().lookups
    }
}

impl CryptomusApi for FakeCryptomus {
    async fn create_invoice(
        &self,
        _credentials: &CryptomusCredentials,
        invoice: &CryptomusInvoiceRequest,
    ) -> Result<CryptomusInvoice, RemoteApiError> {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.create_failures.pop_front() {
            return Err(e);
        }
        let uuid = format!("uuid-{}", invoice.order_id);
        let created = CryptomusInvoice {
            url: format!("https://pay.cryptomus.com/pay/{uuid}"),
            uuid,
            order_id: invoice.order_id.clone(),
            status: CryptomusPaymentStatus::Check,
        };
        state.created.push(invoice.clone());
        state.invoices.insert(invoice.order_id.clone(), created.clone());
        Ok(created)
    }

    async fn payment_info(
        &self,
        _credentials: &CryptomusCredentials,
        lookup: &CryptomusPaymentLookup,
    ) -> Result<CryptomusInvoice, RemoteApiError> {
        let mut state = self.state.lock().unwrap();
        state.lookups += 1;
        let invoice = match lookup {
            CryptomusPaymentLookup::OrderId(id) => state.invoices.get(id),
            CryptomusPaymentLookup::Uuid(uuid) => state.invoices.values().find(|i| &i.uuid == uuid),
        }
        .cloned()
        .ok_or_else(|| RemoteApiError::Rejected("Payment not found".into()))?;
        if let Some(e) = state.lookup_failures.get(&invoice.order_id) {
            return Err(e.clone());
        }
        Ok(invoice)
    }
}
