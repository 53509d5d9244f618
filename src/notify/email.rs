use std::sync::Arc;

use crate::config::Config;

/// Send an HTML email via SMTP with STARTTLS.
///
/// Returns early (with a warning log) if SMTP credentials are not configured.
/// Rejects newlines in `to` and `subject` to prevent header injection.
#[tracing::instrument(skip(config, html), fields(%to), err)]
pub async fn send(config: &Config, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
    use lettre::message::Mailbox;
    use lettre::message::header::ContentType;
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

    // Email header injection prevention: reject newlines in to/subject
    if to.contains('\n') || to.contains('\r') {
        anyhow::bail!("email 'to' address contains invalid characters");
    }
    if subject.contains('\n') || subject.contains('\r') {
        anyhow::bail!("email subject contains invalid characters");
    }

    let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) else {
        tracing::warn!("SMTP credentials not configured, skipping email send");
        return Ok(());
    };

    let from: Mailbox = format!("{} <{username}>", config.app_name)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid sender address '{username}': {e}"))?;

    let to_mailbox: Mailbox = to
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid recipient address '{to}': {e}"))?;

    let message = Message::builder()
        .from(from)
        .to(to_mailbox)
        .subject(subject)
        .header(ContentType::TEXT_HTML)
        .body(html.to_owned())
        .map_err(|e| anyhow::anyhow!("failed to build email: {e}"))?;

    let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        .map_err(|e| anyhow::anyhow!("SMTP relay setup failed: {e}"))?
        .port(config.smtp_port)
        .credentials(Credentials::new(username.clone(), password.clone()))
        .build();

    // One retry on transient failure
    match transport.send(message.clone()).await {
        Ok(_) => {
            tracing::info!(to, subject, "email sent");
            Ok(())
        }
        Err(first_err) => {
            tracing::warn!(error = %first_err, "email send failed, retrying once");
            transport
                .send(message)
                .await
                .map_err(|e| anyhow::anyhow!("email send failed after retry: {e}"))?;
            tracing::info!(to, subject, "email sent on retry");
            Ok(())
        }
    }
}

/// Deliver an email on a detached task. Failures are logged, never returned,
/// so a mail outage cannot fail the request that triggered it.
pub fn send_in_background(config: Arc<Config>, to: String, subject: String, html: String) {
    tokio::spawn(async move {
        if let Err(e) = send(&config, &to, &subject, &html).await {
            tracing::error!(error = %e, %to, "background email failed");
        }
    });
}

pub fn verification_email(config: &Config, token: &str) -> (String, String) {
    let link = format!("http://{}/api/v1/auth/verify/{token}", config.domain);
    let subject = format!("Welcome to {} - Verify Your Email", config.app_name);
    let html = format!(
        "<h1>Welcome to {}!</h1>\n\
         <p>Please click <a href=\"{link}\">here</a> to verify your email address.</p>\n\
         <p>This link will expire in 24 hours.</p>",
        config.app_name
    );
    (subject, html)
}

pub fn password_reset_email(config: &Config, token: &str) -> (String, String) {
    let link = format!("http://{}/auth/reset-password?token={token}", config.domain);
    let html = format!(
        "<h1>Password Reset Request</h1>\n\
         <p>Click <a href=\"{link}\">here</a> to reset your password.</p>\n\
         <p>This link will expire in 1 hour.</p>\n\
         <p>If you didn't request this, please ignore this email.</p>"
    );
    ("Password Reset Request".to_owned(), html)
}
