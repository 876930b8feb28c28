//! SMTP mail delivery.
//!
//! Plain-text messages only: password resets and on-demand goal alert
//! summaries. The transport is built once at startup from the SMTP
//! config block; when that block is absent the mail endpoints fail with
//! a clear error instead of silently dropping messages.

use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;
use crate::error::ApiError;

pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
    from_name: String,
}

impl Mailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, ApiError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|err| ApiError::internal(format!("smtp transport: {err}")))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self {
            transport,
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
        })
    }

    pub async fn send_text(&self, to: &str, subject: &str, body: String) -> Result<(), ApiError> {
        let from_address = format!("{} <{}>", self.from_name, self.from_email);
        let email = Message::builder()
            .from(
                from_address
                    .parse()
                    .map_err(|err| ApiError::internal(format!("invalid from address: {err}")))?,
            )
            .to(to
                .parse()
                .map_err(|err| ApiError::validation(format!("invalid recipient: {err}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|err| ApiError::internal(format!("build email: {err}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|err| ApiError::internal(format!("smtp send: {err}")))?;

        info!(to = %to, subject = %subject, "Sent mail");
        Ok(())
    }
}

pub fn password_reset_subject() -> &'static str {
    "Password reset"
}

pub fn password_reset_body(name: &str, token: &str) -> String {
    format!(
        "Hi {name},\n\n\
         A password reset was requested for your account. Use this code\n\
         within the next hour to choose a new password:\n\n\
         {token}\n\n\
         If you did not request this, you can ignore this message.\n"
    )
}

pub fn alert_summary_subject(month: u32, year: i32) -> String {
    format!("Goal alerts for {month:02}/{year}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_body_contains_name_and_token() {
        let body = password_reset_body("Maria", "tok-123");
        assert!(body.contains("Maria"));
        assert!(body.contains("tok-123"));
    }

    #[test]
    fn alert_subject_is_zero_padded() {
        assert_eq!(alert_summary_subject(3, 2024), "Goal alerts for 03/2024");
        assert_eq!(alert_summary_subject(11, 2024), "Goal alerts for 11/2024");
    }
}
