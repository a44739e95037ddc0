//! Email service for sending verification and password reset links.

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::path::Path;

use crate::{config::Config, errors::Error};

pub struct EmailService {
    transport: EmailTransport,
    from_email: String,
    from_name: String,
    reply_to: Option<String>,
}

enum EmailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

impl EmailService {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let email_config = &config.email;

        let transport = match &email_config.transport {
            crate::config::EmailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                // Use SMTP transport
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
            crate::config::EmailTransportConfig::File { path } => {
                // Use file transport for development/testing
                let emails_dir = Path::new(path);
                if !emails_dir.exists() {
                    std::fs::create_dir_all(emails_dir).map_err(|e| Error::Internal {
                        operation: format!("create emails directory: {e}"),
                    })?;
                }
                let file_transport = AsyncFileTransport::<Tokio1Executor>::new(emails_dir);
                EmailTransport::File(file_transport)
            }
        };

        Ok(Self {
            transport,
            from_email: email_config.from_email.clone(),
            from_name: email_config.from_name.clone(),
            reply_to: email_config.reply_to.clone(),
        })
    }

    /// Send the account verification link.
    pub async fn send_verification_email(&self, to_email: &str, to_name: &str, action_url: &str) -> Result<(), Error> {
        let subject = "Email Verification";
        let body = self.create_action_body(
            to_name,
            "Verifica tu dirección de email",
            "Haz clic en el enlace para verificar tu cuenta. El enlace vence en 24 horas.",
            "Verificar email",
            action_url,
        );

        self.send_email(to_email, to_name, subject, &body).await
    }

    /// Send the password reset link.
    pub async fn send_password_reset_email(&self, to_email: &str, to_name: &str, action_url: &str) -> Result<(), Error> {
        let subject = "Password Reset";
        let body = self.create_action_body(
            to_name,
            "Restablece tu contraseña",
            "Recibimos una solicitud para restablecer tu contraseña. Si no fuiste tú, ignora este email. El enlace vence en 1 hora.",
            "Restablecer contraseña",
            action_url,
        );

        self.send_email(to_email, to_name, subject, &body).await
    }

    async fn send_email(&self, to_email: &str, to_name: &str, subject: &str, body: &str) -> Result<(), Error> {
        // Create from mailbox
        let from = format!("{} <{}>", self.from_name, self.from_email)
            .parse::<Mailbox>()
            .map_err(|e| Error::Internal {
                operation: format!("parse from email: {e}"),
            })?;

        // Create to mailbox
        let to = format!("{to_name} <{to_email}>").parse::<Mailbox>().map_err(|e| Error::Internal {
            operation: format!("parse to email: {e}"),
        })?;

        // Build message
        let mut builder = Message::builder().from(from).to(to).subject(subject);
        if let Some(reply_to) = &self.reply_to {
            let reply_to = reply_to.parse::<Mailbox>().map_err(|e| Error::Internal {
                operation: format!("parse reply-to email: {e}"),
            })?;
            builder = builder.reply_to(reply_to);
        }
        let message = builder
            .header(ContentType::TEXT_HTML)
            .body(body.to_string())
            .map_err(|e| Error::Internal {
                operation: format!("build email message: {e}"),
            })?;

        // Send based on transport type
        match &self.transport {
            EmailTransport::Smtp(smtp) => {
                smtp.send(message).await.map_err(|e| Error::EmailDispatch {
                    reason: format!("send SMTP email: {e}"),
                })?;
            }
            EmailTransport::File(file) => {
                file.send(message).await.map_err(|e| Error::EmailDispatch {
                    reason: format!("send file email: {e}"),
                })?;
            }
        }

        Ok(())
    }

    fn create_action_body(&self, to_name: &str, heading: &str, explanation: &str, action_label: &str, action_url: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{heading}</title>
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .footer {{ margin-top: 30px; font-size: 12px; color: #666; }}
    </style>
</head>
<body>
    <div class="container">
        <h2>{heading}</h2>

        <p>Hola {to_name},</p>

        <p>{explanation}</p>

        <p><a href="{action_url}">{action_label}</a></p>

        <p>O copia y pega este enlace en tu navegador:</p>
        <p>{action_url}</p>

        <div class="footer">
            <p>Este es un mensaje automático, por favor no respondas a este email.</p>
        </div>
    </div>
</body>
</html>"#
        )
    }
}
