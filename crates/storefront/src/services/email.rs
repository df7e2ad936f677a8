//! Email service for customer-facing transactional mail.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and plain-text templates.
//! Sending is best-effort from the caller's point of view: handlers log a
//! failure and still return success, since the order or request is already
//! committed.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use qyve_core::Email;

use crate::config::EmailConfig;
use crate::models::order::Order;
use crate::models::preorder::Preorder;
use crate::models::refund::RefundRequest;

/// One row of the order summary table.
struct LineSummary {
    product_name: String,
    size: String,
    quantity: i32,
    line_total: String,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    customer_name: &'a str,
    order_number: &'a str,
    lines: &'a [LineSummary],
    subtotal: String,
    shipping_cost: String,
    total: String,
    order_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    customer_name: &'a str,
    order_number: &'a str,
    lines: &'a [LineSummary],
    subtotal: String,
    shipping_cost: String,
    total: String,
    order_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/refund_received.html")]
struct RefundReceivedHtml<'a> {
    order_number: &'a str,
    reason: &'a str,
    request_id: String,
}

#[derive(Template)]
#[template(path = "email/refund_received.txt")]
struct RefundReceivedText<'a> {
    order_number: &'a str,
    reason: &'a str,
    request_id: String,
}

#[derive(Template)]
#[template(path = "email/preorder_confirmation.html")]
struct PreorderConfirmationHtml<'a> {
    customer_name: &'a str,
    product_name: &'a str,
    size: &'a str,
    quantity: i32,
    deposit_amount: String,
}

#[derive(Template)]
#[template(path = "email/preorder_confirmation.txt")]
struct PreorderConfirmationText<'a> {
    customer_name: &'a str,
    product_name: &'a str,
    size: &'a str,
    quantity: i32,
    deposit_amount: String,
}

#[derive(Template)]
#[template(path = "email/newsletter_welcome.html")]
struct NewsletterWelcomeHtml<'a> {
    shop_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/newsletter_welcome.txt")]
struct NewsletterWelcomeText<'a> {
    shop_url: &'a str,
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
}

/// A rendered email ready to send.
#[derive(Debug)]
struct Rendered {
    subject: String,
    text: String,
    html: String,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    base_url: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// `base_url` is the public shop URL used for links in messages.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, base_url: &str) -> Result<Self, SmtpError> {
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
            base_url: base_url.to_string(),
        })
    }

    /// Send the order confirmation with its line items and totals.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_confirmation(&self, order: &Order) -> Result<(), EmailError> {
        let rendered = render_order_confirmation(order, &self.base_url)?;
        self.send(&order.customer_email, rendered).await
    }

    /// Acknowledge a new refund request.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_refund_received(&self, request: &RefundRequest) -> Result<(), EmailError> {
        let rendered = render_refund_received(request)?;
        self.send(&request.customer_email, rendered).await
    }

    /// Confirm a pre-order and the deposit due.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_preorder_confirmation(
        &self,
        preorder: &Preorder,
        product_name: &str,
    ) -> Result<(), EmailError> {
        let rendered = render_preorder_confirmation(preorder, product_name)?;
        self.send(&preorder.customer_email, rendered).await
    }

    /// Welcome a new newsletter subscriber.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_newsletter_welcome(&self, to: &Email) -> Result<(), EmailError> {
        let rendered = render_newsletter_welcome(&self.base_url)?;
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

fn render_order_confirmation(order: &Order, base_url: &str) -> Result<Rendered, EmailError> {
    let lines: Vec<LineSummary> = order
        .items
        .iter()
        .map(|line| LineSummary {
            product_name: line.product_name.clone(),
            size: line.size.clone(),
            quantity: line.quantity,
            line_total: line
                .unit_price
                .checked_mul_quantity(line.quantity)
                .map_or_else(|_| line.unit_price.to_string(), |m| m.to_string()),
        })
        .collect();
    let order_url = format!("{base_url}/orders/{}", order.order_number);

    let html = OrderConfirmationHtml {
        customer_name: &order.customer_name,
        order_number: &order.order_number,
        lines: &lines,
        subtotal: order.subtotal.to_string(),
        shipping_cost: order.shipping_cost.to_string(),
        total: order.total.to_string(),
        order_url: &order_url,
    }
    .render()?;
    let text = OrderConfirmationText {
        customer_name: &order.customer_name,
        order_number: &order.order_number,
        lines: &lines,
        subtotal: order.subtotal.to_string(),
        shipping_cost: order.shipping_cost.to_string(),
        total: order.total.to_string(),
        order_url: &order_url,
    }
    .render()?;

    Ok(Rendered {
        subject: format!("QYVE order {} confirmed", order.order_number),
        text,
        html,
    })
}

fn render_refund_received(request: &RefundRequest) -> Result<Rendered, EmailError> {
    let html = RefundReceivedHtml {
        order_number: &request.order_number,
        reason: &request.reason,
        request_id: request.id.to_string(),
    }
    .render()?;
    let text = RefundReceivedText {
        order_number: &request.order_number,
        reason: &request.reason,
        request_id: request.id.to_string(),
    }
    .render()?;

    Ok(Rendered {
        subject: format!("We received your refund request for {}", request.order_number),
        text,
        html,
    })
}

fn render_preorder_confirmation(
    preorder: &Preorder,
    product_name: &str,
) -> Result<Rendered, EmailError> {
    let html = PreorderConfirmationHtml {
        customer_name: &preorder.customer_name,
        product_name,
        size: &preorder.size,
        quantity: preorder.quantity,
        deposit_amount: preorder.deposit_amount.to_string(),
    }
    .render()?;
    let text = PreorderConfirmationText {
        customer_name: &preorder.customer_name,
        product_name,
        size: &preorder.size,
        quantity: preorder.quantity,
        deposit_amount: preorder.deposit_amount.to_string(),
    }
    .render()?;

    Ok(Rendered {
        subject: format!("Your QYVE pre-order: {product_name}"),
        text,
        html,
    })
}

fn render_newsletter_welcome(shop_url: &str) -> Result<Rendered, EmailError> {
    Ok(Rendered {
        subject: "Welcome to the QYVE newsletter".to_string(),
        text: NewsletterWelcomeText { shop_url }.render()?,
        html: NewsletterWelcomeHtml { shop_url }.render()?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use qyve_core::shipping::Address;
    use qyve_core::{
        CurrencyCode, Money, OrderId, OrderStatus, PaymentStatus, PreorderId, PreorderStatus,
        ProductId, RefundRequestId, RefundStatus,
    };

    use super::*;
    use crate::models::order::OrderLine;

    fn idr(amount: i64) -> Money {
        Money::new(Decimal::from(amount), CurrencyCode::IDR)
    }

    fn order() -> Order {
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
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            carrier: None,
            tracking_number: None,
            shipped_at: None,
            delivered_at: None,
            created_at: Utc::now(),
            items: vec![OrderLine {
                product_id: ProductId::new(7),
                product_name: "Aero Runner Tee".to_string(),
                size: "M".to_string(),
                quantity: 2,
                unit_price: idr(450_000),
            }],
        }
    }

    #[test]
    fn test_order_confirmation_lists_lines_and_total() {
        let rendered = render_order_confirmation(&order(), "https://qyve.id").unwrap();
        assert!(rendered.subject.contains("QY-20261018-AB12CD"));
        assert!(rendered.text.contains("Aero Runner Tee"));
        assert!(rendered.text.contains("Rp900000"));
        assert!(rendered.text.contains("Rp920000"));
        assert!(rendered.text.contains("https://qyve.id/orders/QY-20261018-AB12CD"));
        assert!(rendered.html.contains("Aero Runner Tee"));
    }

    #[test]
    fn test_html_escapes_customer_input() {
        let mut order = order();
        order.customer_name = "<script>alert(1)</script>".to_string();
        let rendered = render_order_confirmation(&order, "https://qyve.id").unwrap();
        assert!(!rendered.html.contains("<script>"));
    }

    #[test]
    fn test_refund_received_mentions_order() {
        let request = RefundRequest {
            id: RefundRequestId::new(42),
            order_id: OrderId::new(1),
            order_number: "QY-20261018-AB12CD".to_string(),
            customer_email: Email::parse("rani@example.com").unwrap(),
            reason: "Wrong size".to_string(),
            description: None,
            status: RefundStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let rendered = render_refund_received(&request).unwrap();
        assert!(rendered.subject.contains("QY-20261018-AB12CD"));
        assert!(rendered.text.contains("Wrong size"));
        assert!(rendered.text.contains("42"));
    }

    #[test]
    fn test_preorder_confirmation_shows_deposit() {
        let preorder = Preorder {
            id: PreorderId::new(3),
            product_id: ProductId::new(9),
            size: "L".to_string(),
            customer_name: "Dimas".to_string(),
            customer_email: Email::parse("dimas@example.com").unwrap(),
            customer_phone: None,
            quantity: 1,
            unit_price: idr(600_000),
            deposit_amount: idr(300_000),
            status: PreorderStatus::Pending,
            created_at: Utc::now(),
        };
        let rendered = render_preorder_confirmation(&preorder, "Stride Jacket").unwrap();
        assert!(rendered.subject.contains("Stride Jacket"));
        assert!(rendered.text.contains("Rp300000"));
    }

    #[test]
    fn test_newsletter_welcome_links_shop() {
        let rendered = render_newsletter_welcome("https://qyve.id").unwrap();
        assert!(rendered.text.contains("https://qyve.id"));
        assert!(rendered.html.contains("Welcome to QYVE"));
    }
}
