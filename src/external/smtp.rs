use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::{
    config::SmtpConfig,
    entities::EmailMessage,
    error::{configuration_error, email_send_failed_error, invalid_input_error, Error},
    external::Mailer,
};

const IMPLICIT_TLS_PORT: u16 = 465;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, sender: &str, timeout: Duration) -> Result<Self, Error> {
        let relay = if config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        };
        let builder = relay.map_err(|_| configuration_error("EMAIL_HOST"))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(timeout))
            .build();

        let sender = sender
            .parse::<Mailbox>()
            .map_err(|_| configuration_error("EMAIL_USER"))?;

        Ok(Self { transport, sender })
    }
}

fn mailbox(address: &str) -> Result<Mailbox, Error> {
    address
        .parse()
        .map_err(|_| invalid_input_error(format!("{:?} is not an email address", address)))
}

fn build_message(sender: &Mailbox, message: &EmailMessage) -> Result<Message, Error> {
    let mut builder = Message::builder()
        .from(sender.clone())
        .to(mailbox(&message.to)?)
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_HTML);

    if let Some(cc) = &message.cc {
        builder = builder.cc(mailbox(cc)?);
    }

    builder
        .body(message.html.clone())
        .map_err(email_send_failed_error)
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[tracing::instrument(skip(self, message), fields(to = %message.to))]
    async fn send(&self, message: &EmailMessage) -> Result<(), Error> {
        let email = build_message(&self.sender, message)?;

        self.transport
            .send(email)
            .await
            .map_err(email_send_failed_error)?;

        Ok(())
    }
}
