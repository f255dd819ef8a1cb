//! Transactional mail for the storefront.
//!
//! Two messages go out when an order is placed:
//! - a confirmation to the customer
//! - an alert to the shop operator
//!
//! Delivery goes through the `MailTransport` trait so handlers can be tested
//! with recording or failing fakes, and a disabled mail config degrades to the
//! no-op transport without touching the checkout path.

pub mod notifier;
pub mod templates;
pub mod transport;

pub use notifier::{Notifier, NotifyError, OrderMailer};
pub use transport::{EmailMessage, HttpRelayTransport, MailTransport, NoopTransport, TransportError};
