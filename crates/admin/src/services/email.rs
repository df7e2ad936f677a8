//! Email service for back-office notifications.
//!
//! Uses SMTP via lettre with Askama HTML and plain-text templates. Handlers
//! treat every send as best-effort: the status change is already committed,
//! so a failed email is logged and never fails the request.

use askama::Template;
use chrono::{DateTime, Utc};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use qyve_core::{Email, RefundStatus};

use crate::config::EmailConfig;
use crate::models::order::Order;
use crate::models::refund::RefundRequest;

#[derive(Template)]
#[template(path = "email/shipping_notification.html")]
struct ShippingNotificationHtml<'a> {
    customer_name: &'a str,
    order_number: &'a str,
    carrier: &'a str,
    tracking_number: &'a str,
    order_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/shipping_notification.txt")]
struct ShippingNotificationText<'a> {
    customer_name: &'a str,
    order_number: &'a str,
    carrier: &'a str,
    tracking_number: &'a str,
    order_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/refund_status.html")]
struct RefundStatusHtml<'a> {
    customer_name: &'a str,
    status_label: &'a str,
    summary: String,
    refund_amount: Option<String>,
    admin_notes: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "email/refund_status.txt")]
struct RefundStatusText<'a> {
    customer_name: &'a str,
    status_label: &'a str,
    summary: String,
    refund_amount: Option<String>,
    admin_notes: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "email/test_email.html")]
struct TestEmailHtml {
    sent_at: String,
}

#[derive(Template)]
#[template(path = "email/test_email.txt")]
struct TestEmailText {
    sent_at: String,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// The order has no tracking details to announce.
    #[error("Order {0} has not shipped")]
    NotShipped(String),
}

struct Rendered {
    subject: String,
    text: String,
    html: String,
}

/// Email service for sending back-office notifications.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    shop_url: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, shop_url: &str) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            shop_url: shop_url.to_string(),
        })
    }

    /// Tell the customer their order shipped, with the tracking number.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::NotShipped` if the order has no tracking number,
    /// or an error if rendering or delivery fails.
    pub async fn send_shipping_notification(&self, order: &Order) -> Result<(), EmailError> {
        let rendered = render_shipping_notification(order, &self.shop_url)?;
        self.send(&order.customer_email, rendered).await
    }

    /// Tell the customer a reviewer decided on their refund request.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_refund_status(&self, request: &RefundRequest) -> Result<(), EmailError> {
        let rendered = render_refund_status(request)?;
        self.send(&request.customer_email, rendered).await
    }

    /// Send a diagnostic message to check SMTP settings.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_test(&self, to: &Email) -> Result<(), EmailError> {
        let rendered = render_test_email(Utc::now())?;
        self.send(to, rendered).await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send(&self, to: &Email, rendered: Rendered) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .as_str()
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.masked()))?)
            .subject(&rendered.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(rendered.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(rendered.html),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to.masked(), subject = %rendered.subject, "Email sent successfully");
        Ok(())
    }
}

fn render_shipping_notification(order: &Order, shop_url: &str) -> Result<Rendered, EmailError> {
    let Some(tracking_number) = order.tracking_number.as_deref() else {
        return Err(EmailError::NotShipped(order.order_number.clone()));
    };
    let carrier = order.carrier.as_deref().unwrap_or("our courier");
    let order_url = format!("{shop_url}/orders/{}", order.order_number);

    let html = ShippingNotificationHtml {
        customer_name: &order.customer_name,
        order_number: &order.order_number,
        carrier,
        tracking_number,
        order_url: &order_url,
    }
    .render()?;
    let text = ShippingNotificationText {
        customer_name: &order.customer_name,
        order_number: &order.order_number,
        carrier,
        tracking_number,
        order_url: &order_url,
    }
    .render()?;

    Ok(Rendered {
        subject: format!("QYVE order {} has shipped", order.order_number),
        text,
        html,
    })
}

fn refund_summary(request: &RefundRequest) -> String {
    let order = &request.order_number;
    match request.status {
        RefundStatus::Pending => format!("Your refund request for order {order} is waiting for review."),
        RefundStatus::Approved => format!(
            "Your refund request for order {order} was approved. We will let you know once the money is on its way."
        ),
        RefundStatus::Rejected => {
            format!("Your refund request for order {order} was not approved.")
        }
        RefundStatus::Processed => format!(
            "Your refund for order {order} has been sent. Depending on your bank it can take a few days to appear."
        ),
    }
}

fn render_refund_status(request: &RefundRequest) -> Result<Rendered, EmailError> {
    let status_label = request.status.as_str();
    let summary = refund_summary(request);
    let refund_amount = request.refund_amount.map(|m| m.to_string());
    let admin_notes = request.admin_notes.as_deref();

    let html = RefundStatusHtml {
        customer_name: &request.customer_name,
        status_label,
        summary: summary.clone(),
        refund_amount: refund_amount.clone(),
        admin_notes,
    }
    .render()?;
    let text = RefundStatusText {
        customer_name: &request.customer_name,
        status_label,
        summary,
        refund_amount,
        admin_notes,
    }
    .render()?;

    Ok(Rendered {
        subject: format!(
            "Update on your refund request for {}: {status_label}",
            request.order_number
        ),
        text,
        html,
    })
}

fn render_test_email(now: DateTime<Utc>) -> Result<Rendered, EmailError> {
    let sent_at = now.format("%Y-%m-%d %H:%M:%S UTC").to_string();
    Ok(Rendered {
        subject: "QYVE email test".to_string(),
        text: TestEmailText {
            sent_at: sent_at.clone(),
        }
        .render()?,
        html: TestEmailHtml { sent_at }.render()?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    use qyve_core::shipping::Address;
    use qyve_core::{CurrencyCode, Money, OrderId, OrderStatus, PaymentStatus, RefundRequestId};

    use super::*;

    fn idr(amount: i64) -> Money {
        Money::new(Decimal::from(amount), CurrencyCode::IDR)
    }

    fn shipped_order() -> Order {
        Order {
            id: OrderId::new(1),
            order_number: "QY-20261018-AB12CD".to_string(),
            customer_email: Email::parse("rani@example.com").unwrap(),
            customer_name: "Rani".to_string(),
            customer_phone: None,
            shipping_address: Address {
                name: "Rani".to_string(),
                company: None,
                street1: "Jl. Sudirman 1".to_string(),
                street2: None,
                city: "Jakarta".to_string(),
                state: None,
                postal_code: "10220".to_string(),
                country: "ID".to_string(),
                phone: None,
                email: None,
            },
            subtotal: idr(900_000),
            shipping_cost: idr(20_000),
            total: idr(920_000),
            status: OrderStatus::Shipped,
            payment_status: PaymentStatus::Paid,
            payment_reference: None,
            carrier: Some("jne".to_string()),
            service_level: Some("jne_reg".to_string()),
            tracking_number: Some("JNE0012345".to_string()),
            label_url: None,
            shipped_at: Some(Utc::now()),
            delivered_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            items: Vec::new(),
        }
    }

    fn refund(status: RefundStatus) -> RefundRequest {
        RefundRequest {
            id: RefundRequestId::new(42),
            order_id: OrderId::new(1),
            order_number: "QY-20261018-AB12CD".to_string(),
            customer_name: "Rani".to_string(),
            customer_email: Email::parse("rani@example.com").unwrap(),
            order_total: idr(920_000),
            reason: "Wrong size".to_string(),
            description: None,
            status,
            admin_notes: None,
            refund_amount: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_shipping_notification_has_tracking() {
        let rendered = render_shipping_notification(&shipped_order(), "https://qyve.id").unwrap();
        assert!(rendered.subject.contains("QY-20261018-AB12CD"));
        assert!(rendered.text.contains("JNE0012345"));
        assert!(rendered.text.contains("jne"));
        assert!(rendered.text.contains("https://qyve.id/orders/QY-20261018-AB12CD"));
    }

    #[test]
    fn test_shipping_notification_requires_tracking() {
        let mut order = shipped_order();
        order.tracking_number = None;
        assert!(matches!(
            render_shipping_notification(&order, "https://qyve.id"),
            Err(EmailError::NotShipped(_))
        ));
    }

    #[test]
    fn test_processed_refund_shows_amount_and_notes() {
        let mut request = refund(RefundStatus::Processed);
        request.refund_amount = Some(idr(450_000));
        request.admin_notes = Some("Refunded one tee".to_string());

        let rendered = render_refund_status(&request).unwrap();
        assert!(rendered.subject.ends_with("processed"));
        assert!(rendered.text.contains("Rp450000"));
        assert!(rendered.text.contains("Refunded one tee"));
        assert!(rendered.html.contains("Rp450000"));
    }

    #[test]
    fn test_rejected_refund_omits_amount() {
        let rendered = render_refund_status(&refund(RefundStatus::Rejected)).unwrap();
        assert!(rendered.text.contains("was not approved"));
        assert!(!rendered.text.contains("Refund amount"));
    }

    #[test]
    fn test_test_email_is_timestamped() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        let rendered = render_test_email(now).unwrap();
        assert!(rendered.text.contains("2026-10-18 09:30:00 UTC"));
    }
}
