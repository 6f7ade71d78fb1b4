//! Outgoing email: account verification, password resets and marketplace notifications.

use lettre::{
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use rust_decimal::Decimal;
use std::{path::Path, time::Duration};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    config::{Config, EmailTransportConfig},
    errors::Error,
};

pub struct EmailService {
    transport: EmailTransport,
    from_email: String,
    from_name: String,
    public_url: String,
}

enum EmailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

/// Outcome of a payout request, as told to the provider
pub enum PayoutDecision<'a> {
    Approved,
    Rejected { reason: &'a str },
}

impl EmailService {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let email_config = &config.email;

        let transport = match &email_config.transport {
            EmailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                if !use_tls {
                    tracing::warn!("SMTP TLS is disabled - this is not recommended for production");
                }

                let smtp_builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                } else {
                    Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host))
                }
                .map_err(|e| Error::Internal {
                    operation: format!("create SMTP transport: {e}"),
                })?
                .port(*port)
                .credentials(Credentials::new(username.clone(), password.clone()));

                EmailTransport::Smtp(smtp_builder.build())
            }
            EmailTransportConfig::File { path } => {
                let emails_dir = Path::new(path);
                if !emails_dir.exists() {
                    std::fs::create_dir_all(emails_dir).map_err(|e| Error::Internal {
                        operation: format!("create emails directory: {e}"),
                    })?;
                }
                EmailTransport::File(AsyncFileTransport::<Tokio1Executor>::new(emails_dir))
            }
        };

        Ok(Self {
            transport,
            from_email: email_config.from_email.clone(),
            from_name: email_config.from_name.clone(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn send_verification_email(&self, to_email: &str, to_name: Option<&str>, token_id: &Uuid, token: &str) -> Result<(), Error> {
        let link = format!("{}/verify-email?id={}&token={}", self.public_url, token_id, token);
        let body = layout(
            "Confirm your email address",
            to_name,
            &format!(
                r#"<p>Welcome to Mercado! Please confirm your email address to finish setting up your account.</p>
        <p><a href="{link}">Confirm email address</a></p>
        <p>Or copy and paste this link into your browser:</p>
        <p>{link}</p>"#
            ),
        );

        self.send_email(to_email, to_name, "Confirm your email address", &body).await
    }

    pub async fn send_password_reset_email(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        token_id: &Uuid,
        token: &str,
        valid_for: Duration,
    ) -> Result<(), Error> {
        let link = format!("{}/reset-password?id={}&token={}", self.public_url, token_id, token);
        let minutes = valid_for.as_secs() / 60;
        let body = layout(
            "Password Reset Request",
            to_name,
            &format!(
                r#"<p>We received a request to reset your password. If you didn't make this request, you can safely ignore this email.</p>
        <p><a href="{link}">Reset your password</a></p>
        <p>Or copy and paste this link into your browser:</p>
        <p>{link}</p>
        <p>This link will expire in {minutes} minutes.</p>"#
            ),
        );

        self.send_email(to_email, to_name, "Password Reset Request", &body).await
    }

    pub async fn send_payout_decision(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        amount: Decimal,
        decision: PayoutDecision<'_>,
    ) -> Result<(), Error> {
        let (subject, content) = match decision {
            PayoutDecision::Approved => (
                "Your payout was approved",
                format!("<p>Your payout request of {amount} has been approved and is on its way.</p>"),
            ),
            PayoutDecision::Rejected { reason } => (
                "Your payout was rejected",
                format!(
                    r#"<p>Your payout request of {amount} was rejected for the following reason:</p>
        <blockquote>{}</blockquote>
        <p>The earnings are available again and can be included in a new request.</p>"#,
                    escape(reason)
                ),
            ),
        };

        self.send_email(to_email, to_name, subject, &layout(subject, to_name, &content)).await
    }

    pub async fn send_contest_winner_email(&self, to_email: &str, to_name: Option<&str>, contest_title: &str, prize: &str) -> Result<(), Error> {
        let subject = "You won a contest!";
        let content = format!(
            "<p>Congratulations! Your entry was drawn as the winner of <strong>{}</strong>.</p>\n        <p>Prize: {}</p>\n        <p>The organiser will contact you to arrange delivery.</p>",
            escape(contest_title),
            escape(prize)
        );

        self.send_email(to_email, to_name, subject, &layout(subject, to_name, &content)).await
    }

    #[instrument(skip(self, body), err)]
    async fn send_email(&self, to_email: &str, to_name: Option<&str>, subject: &str, body: &str) -> Result<(), Error> {
        let from = format!("{} <{}>", self.from_name, self.from_email)
            .parse::<Mailbox>()
            .map_err(|e| Error::Internal {
                operation: format!("parse from email: {e}"),
            })?;

        let to = if let Some(name) = to_name {
            format!("{name} <{to_email}>")
        } else {
            to_email.to_string()
        }
        .parse::<Mailbox>()
        .map_err(|e| Error::Internal {
            operation: format!("parse to email: {e}"),
        })?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body.to_string())
            .map_err(|e| Error::Internal {
                operation: format!("build email message: {e}"),
            })?;

        match &self.transport {
            EmailTransport::Smtp(smtp) => {
                smtp.send(message).await.map_err(|e| Error::Upstream {
                    service: "Email".to_string(),
                    message: e.to_string(),
                })?;
            }
            EmailTransport::File(file) => {
                file.send(message).await.map_err(|e| Error::Internal {
                    operation: format!("send file email: {e}"),
                })?;
            }
        }

        debug!("Email sent");
        Ok(())
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

fn layout(title: &str, to_name: Option<&str>, content: &str) -> String {
    let greeting = match to_name {
        Some(name) => format!("Hello {},", escape(name)),
        None => "Hello,".to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .footer {{ margin-top: 30px; font-size: 12px; color: #666; }}
    </style>
</head>
<body>
    <div class="container">
        <h2>{title}</h2>

        <p>{greeting}</p>

        {content}

        <div class="footer">
            <p>This is an automated message, please do not reply to this email.</p>
        </div>
    </div>
</body>
</html>"#
    )
}
