use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".into(),
            baud_rate: 115_200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Strictly-greater-than confidence cutoff for accepting a detection.
    pub confidence_threshold: f32,
    pub frame_interval_ms: u64,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            frame_interval_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutSettings {
    pub approval_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            approval_timeout_secs: 10,
            poll_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSettings {
    /// Base URL of the keyed price/nutrition store; records live at
    /// `{base_url}/{product_name}`.
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8089/prices".into(),
            request_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptSettings {
    pub smtp_host: String,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    /// Environment variable holding the SMTP password. Never stored in
    /// the settings file itself.
    pub password_env: String,
}

impl Default for ReceiptSettings {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".into(),
            sender: "smartshoppingcart11@gmail.com".into(),
            recipient: "cvetoda@gmail.com".into(),
            subject: "Your Receipt".into(),
            password_env: "APP_PASSWORD".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub serial: SerialSettings,
    pub detection: DetectionSettings,
    pub checkout: CheckoutSettings,
    pub pricing: PricingSettings,
    pub receipt: ReceiptSettings,
}

impl Settings {
    /// Loads settings from a JSON file, falling back to defaults when the
    /// file is missing or unreadable as JSON.
    pub fn load(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Ok(serde_json::from_str(&contents).unwrap_or_default())
    }

    pub fn smtp_password(&self) -> Option<String> {
        std::env::var(&self.receipt.password_env).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_in_defaults() {
        let parsed: Settings =
            serde_json::from_str(r#"{"serial":{"port":"/dev/ttyACM1"}}"#).unwrap();
        assert_eq!(parsed.serial.port, "/dev/ttyACM1");
        assert_eq!(parsed.serial.baud_rate, 115_200);
        assert_eq!(parsed.checkout.approval_timeout_secs, 10);
        assert!((parsed.detection.confidence_threshold - 0.5).abs() < f32::EPSILON);
    }
}
