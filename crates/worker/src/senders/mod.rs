//! Concrete delivery channels.

pub mod hook;
pub mod mail;
pub mod pushall;
pub mod sms;

pub use hook::HookSender;
pub use mail::MailSender;
pub use pushall::BroadcastFanout;
pub use sms::SmsSender;

use pushgate_common::types::Recipient;

/// Substitute recipient fields into a message template.
///
/// Supported placeholders: `{id}`, `{nickname}`, `{email}`,
/// `{phone_number}`. Unknown text passes through untouched.
pub(crate) fn render_template(template: &str, recipient: &Recipient) -> String {
    template
        .replace("{id}", &recipient.id)
        .replace("{nickname}", &recipient.nickname)
        .replace("{email}", &recipient.email)
        .replace("{phone_number}", &recipient.phone_number)
}
