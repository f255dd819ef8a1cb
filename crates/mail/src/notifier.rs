use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::info;

use shopfront_core::domain::order::{order_total, Order, OrderLine};

use crate::templates::{build_templates, OPERATOR_ALERT, ORDER_CONFIRMATION};
use crate::transport::{EmailMessage, MailTransport, TransportError};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail template error: {0}")]
    Template(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Outbound notifications triggered by storefront events.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn order_placed(&self, order: &Order, lines: &[OrderLine]) -> Result<(), NotifyError>;
}

/// Renders and sends the order confirmation pair: one message to the
/// customer, one to the shop operator. Both must deliver; a transport
/// failure propagates to the caller.
pub struct OrderMailer {
    templates: Tera,
    transport: Arc<dyn MailTransport>,
    store_name: String,
    currency: String,
    operator_address: String,
}

impl OrderMailer {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        store_name: String,
        currency: String,
        operator_address: String,
    ) -> Result<Self, NotifyError> {
        let templates = build_templates().map_err(|err| NotifyError::Template(err.to_string()))?;
        Ok(Self { templates, transport, store_name, currency, operator_address })
    }

    fn order_context(&self, order: &Order, lines: &[OrderLine]) -> Context {
        let rendered_lines: Vec<serde_json::Value> = lines
            .iter()
            .map(|line| {
                json!({
                    "product_id": line.product_id.0,
                    "product_name": line.product_name,
                    "quantity": line.quantity,
                    "unit_price": line.unit_price.to_string(),
                    "line_total": line.line_total().to_string(),
                })
            })
            .collect();

        let mut ctx = Context::new();
        ctx.insert("store_name", &self.store_name);
        ctx.insert("currency", &self.currency);
        ctx.insert("order_id", &order.id.0);
        ctx.insert("customer_name", &order.customer_name);
        ctx.insert("email", &order.email);
        ctx.insert("phone", &order.phone);
        ctx.insert("address", &order.address);
        ctx.insert("notes", &order.notes);
        ctx.insert("lines", &rendered_lines);
        ctx.insert("total", &order_total(lines).to_string());
        ctx
    }
}

#[async_trait]
impl Notifier for OrderMailer {
    async fn order_placed(&self, order: &Order, lines: &[OrderLine]) -> Result<(), NotifyError> {
        let ctx = self.order_context(order, lines);

        let confirmation_body = self
            .templates
            .render(ORDER_CONFIRMATION, &ctx)
            .map_err(|err| NotifyError::Template(err.to_string()))?;
        let alert_body = self
            .templates
            .render(OPERATOR_ALERT, &ctx)
            .map_err(|err| NotifyError::Template(err.to_string()))?;

        self.transport
            .deliver(&EmailMessage {
                to: order.email.clone(),
                subject: format!("{} order {}", self.store_name, order.id.0),
                body: confirmation_body,
            })
            .await?;

        self.transport
            .deliver(&EmailMessage {
                to: self.operator_address.clone(),
                subject: format!("New order {}", order.id.0),
                body: alert_body,
            })
            .await?;

        info!(
            event_name = "mail.order_placed",
            order_id = %order.id.0,
            line_count = lines.len(),
            "sent order notification pair"
        );
        Ok(())
    }
}
