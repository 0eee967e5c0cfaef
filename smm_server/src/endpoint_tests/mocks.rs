use mockall::mock;
use smm_common::remote::{
    CryptomusApi,
    CryptomusCredentials,
    CryptomusInvoice,
    CryptomusInvoiceRequest,
    CryptomusPaymentLookup,
    PaypalApi,
    PaypalCredentials,
    PaypalOrder,
    PaypalOrderRequest,
    ProviderBalance,
    ProviderEndpoint,
    ProviderOrderRequest,
    ProviderOrderStatus,
    RemoteApiError,
    SmmProviderApi,
};

mock! {
    pub SmmProvider {}
    impl SmmProviderApi for SmmProvider {
        async fn add_order(&self, endpoint: &ProviderEndpoint, order: &ProviderOrderRequest) -> Result<String, RemoteApiError>;
        async fn order_status(&self, endpoint: &ProviderEndpoint, remote_id: &str) -> Result<ProviderOrderStatus, RemoteApiError>;
        async fn balance(&self, endpoint: &ProviderEndpoint) -> Result<ProviderBalance, RemoteApiError>;
    }
}

mock! {
    pub Paypal {}
    impl PaypalApi for Paypal {
        async fn create_order(&self, credentials: &PaypalCredentials, order: &PaypalOrderRequest) -> Result<PaypalOrder, RemoteApiError>;
        async fn order_status(&self, credentials: &PaypalCredentials, order_id: &str) -> Result<PaypalOrder, RemoteApiError>;
        async fn capture_order(&self, credentials: &PaypalCredentials, order_id: &str) -> Result<PaypalOrder, RemoteApiError>;
    }
}

mock! {
    pub Cryptomus {}
    impl CryptomusApi for Cryptomus {
        async fn create_invoice(&self, credentials: &CryptomusCredentials, invoice: &CryptomusInvoiceRequest) -> Result<CryptomusInvoice, RemoteApiError>;
        async fn payment_info(&self, credentials: &CryptomusCredentials, lookup: &CryptomusPaymentLookup) -> Result<CryptomusInvoice, RemoteApiError>;
    }
}
