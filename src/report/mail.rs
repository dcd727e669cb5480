// brutility/src/report/mail.rs
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

use crate::config::{MailSettings, Settings};
use crate::errors::{AppError, Result};
use crate::report::format::megabytes_value;
use crate::report::inventory::{BackupStats, Inventory};

pub const REPORT_SUBJECT: &str = "Backup Report - Database Backup Activity";

#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Hands a finished message to the outside world.
pub trait MailTransport {
    fn send(&self, settings: &MailSettings, message: &MailMessage) -> Result<()>;
}

/// SMTP submission with STARTTLS and login.
#[derive(Debug, Default)]
pub struct SmtpMailer;

impl MailTransport for SmtpMailer {
    fn send(&self, settings: &MailSettings, message: &MailMessage) -> Result<()> {
        let from: Mailbox = message
            .from
            .parse()
            .map_err(|e| AppError::MailConfig(format!("invalid SMTP_USER address {:?}: {}", message.from, e)))?;
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| AppError::MailConfig(format!("invalid RECIPIENT_EMAIL address {:?}: {}", message.to, e)))?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| AppError::MailSend(format!("could not build message: {}", e)))?;

        let mailer = SmtpTransport::starttls_relay(&settings.host)
            .map_err(|e| AppError::MailSend(format!("could not reach {}: {}", settings.host, e)))?
            .port(settings.port)
            .credentials(Credentials::new(settings.user.clone(), settings.password.clone()))
            .build();

        mailer
            .send(&email)
            .map_err(|e| AppError::MailSend(format!("{}:{} rejected the message: {}", settings.host, settings.port, e)))?;
        Ok(())
    }
}

pub fn report_body(stats: &BackupStats) -> String {
    format!(
        "Hello,

Here is your latest backup report:

- 📅 Backups taken this week: {}
- 📅 Backups taken this month: {}
- 💾 Total backup size till date: {:.2} MB
- 📁 Last backup size: {:.2} MB

Regards,
(BRUtility) Backup Restore Utility
",
        stats.weekly_count,
        stats.monthly_count,
        megabytes_value(stats.total_size_bytes),
        megabytes_value(stats.last_backup_size_bytes),
    )
}

pub fn build_report(settings: &MailSettings, stats: &BackupStats) -> MailMessage {
    MailMessage {
        from: settings.user.clone(),
        to: settings.recipient.clone(),
        subject: REPORT_SUBJECT.to_string(),
        body: report_body(stats),
    }
}

/// Emails the inventory summary. Returns false when there was nothing to
/// report and no email was sent.
pub fn send_backup_report(inventory: &Inventory, settings: &Settings, transport: &dyn MailTransport) -> Result<bool> {
    if inventory.is_empty() {
        println!("No backups found, skipping email report.");
        return Ok(false);
    }

    let mail_settings = settings.mail()?;
    let message = build_report(&mail_settings, &inventory.stats);

    println!("📧 Sending email...");
    transport.send(&mail_settings, &message)?;
    info!(recipient = %message.to, "backup report sent");
    println!("✅ Email sent successfully.");
    Ok(true)
}
