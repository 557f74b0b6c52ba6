use std::io::Cursor;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use image::Luma;
use lettre::message::{header::ContentType, Attachment, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use log::info;
use qrcode::QrCode;

use crate::settings::ReceiptSettings;

use super::ReceiptSink;

const QR_CID: &str = "receipt-qr";

/// Mails the receipt as a multipart message: a plain-text part and an HTML
/// part with the same text plus an inline QR image encoding it. Sender,
/// recipient, and subject are fixed configuration.
pub struct SmtpDispatcher {
    settings: ReceiptSettings,
    password: String,
}

impl SmtpDispatcher {
    pub fn new(settings: ReceiptSettings, password: String) -> Self {
        Self { settings, password }
    }

    fn compose_and_send(&self, body: &str) -> Result<()> {
        let qr_png = render_qr_png(body)?;

        let html = format!(
            "<p>{}</p><img src=\"cid:{QR_CID}\" alt=\"receipt QR\"/>",
            body.replace('\n', "<br>")
        );

        let qr_part = Attachment::new_inline(QR_CID.to_string())
            .body(qr_png, ContentType::parse("image/png")?);

        let message = Message::builder()
            .from(self.settings.sender.parse()?)
            .to(self.settings.recipient.parse()?)
            .subject(&self.settings.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::plain(body.to_string()))
                    .multipart(MultiPart::related().singlepart(SinglePart::html(html)).singlepart(qr_part)),
            )
            .context("failed to compose receipt message")?;

        let mailer = SmtpTransport::starttls_relay(&self.settings.smtp_host)?
            .credentials(Credentials::new(
                self.settings.sender.clone(),
                self.password.clone(),
            ))
            .build();

        mailer.send(&message).context("smtp send failed")?;
        info!("receipt mailed to {}", self.settings.recipient);
        Ok(())
    }
}

#[async_trait]
impl ReceiptSink for SmtpDispatcher {
    async fn send_receipt(&self, body: &str) -> Result<()> {
        let settings = self.settings.clone();
        let password = self.password.clone();
        let body = body.to_string();

        // SMTP transport is blocking; keep it off the runtime workers.
        tokio::task::spawn_blocking(move || {
            SmtpDispatcher { settings, password }.compose_and_send(&body)
        })
        .await
        .map_err(|err| anyhow!("receipt dispatch worker join failed: {err}"))?
    }
}

/// Renders `text` as a QR code PNG.
fn render_qr_png(text: &str) -> Result<Vec<u8>> {
    let code = QrCode::new(text.as_bytes()).context("qr encode failed")?;
    let image = code.render::<Luma<u8>>().min_dimensions(240, 240).build();

    let mut png = Vec::new();
    image::DynamicImage::ImageLuma8(image)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .context("qr png encode failed")?;

    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qr_render_produces_a_png() {
        let png = render_qr_png("apple x 1 = 1.50 EUR\n\nTotal: 1.50 EUR").unwrap();
        // PNG magic bytes.
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
