//! The public API of the panel core.
//!
//! Each API struct is generic over its storage backend (anything implementing
//! [`PanelDatabase`](crate::PanelDatabase)) and, where it talks to the outside world, over the remote clients it
//! uses. The server wires in concrete HTTP clients; tests wire in scripted fakes.
//!
//! * [`order_flow_api::OrderFlowApi`] prices and places orders and dispatches them to providers.
//! * [`order_sync_api::OrderSyncApi`] reconciles order status and provider balances.
//! * [`deposit_api::DepositApi`] opens deposits with PayPal, Cryptomus or manual gateways and reconciles them.
//! * [`admin_api::AdminApi`] carries the operator overrides.
//! * [`accounts_api::AccountApi`] provides read-only wallet and history views.
pub mod accounts_api;
pub mod admin_api;
pub mod batch;
pub mod deposit_api;
pub mod deposit_objects;
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod order_sync_api;
pub mod status_maps;
