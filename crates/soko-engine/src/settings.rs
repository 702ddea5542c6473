//! # Engine Settings
//!
//! Configuration for the transaction engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Explicit path passed to Settings::load_from                        │
//! │                                                                         │
//! │  2. TOML config file in the platform config directory                  │
//! │     ~/.config/soko-pos/engine.toml (Linux)                             │
//! │     ~/Library/Application Support/com.soko.pos/engine.toml (macOS)     │
//! │                                                                         │
//! │  3. Default values (lowest priority)                                   │
//! │     16% VAT inclusive, 50% max discount, loyalty on                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # engine.toml
//! [store]
//! name = "Soko Duka"
//!
//! [pricing]
//! vat_rate_bps = 1600          # 16%
//! default_mode = "inclusive"
//!
//! [discount]
//! max_percent_bps = 5000       # operators may grant up to 50%
//! max_fixed_cents = 100000     # or up to 1,000.00 off
//!
//! [loyalty]
//! enabled = true
//! earn_per_cents = 10000       # one point per 100.00 spent
//! redeem_value_cents = 100     # each point worth 1.00
//! max_redeem_bps = 5000        # at most half a sale paid in points
//!
//! [documents]
//! invoice_prefix = "INV-"
//! shift_prefix = "SHF-"
//!
//! [sync]
//! item_timeout_secs = 10
//! max_retry_elapsed_secs = 30
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use soko_core::{LoyaltyRules, PricingMode, VatRate};

// =============================================================================
// Sections
// =============================================================================

/// Store identity, printed on reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub name: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: "Soko Duka".to_string(),
        }
    }
}

/// VAT rate and the default pricing mode for new catalog entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSettings {
    pub vat_rate_bps: u32,
    pub default_mode: PricingMode,
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            vat_rate_bps: 1600,
            default_mode: PricingMode::Inclusive,
        }
    }
}

/// What operators are allowed to grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscountSettings {
    /// Maximum percentage discount, in basis points.
    pub max_percent_bps: u32,
    /// Maximum fixed discount, in cents.
    pub max_fixed_cents: i64,
}

impl Default for DiscountSettings {
    fn default() -> Self {
        DiscountSettings {
            max_percent_bps: 5000,
            max_fixed_cents: 100_000,
        }
    }
}

/// Document-number prefixes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    pub invoice_prefix: String,
    pub shift_prefix: String,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        DocumentSettings {
            invoice_prefix: "INV-".to_string(),
            shift_prefix: "SHF-".to_string(),
        }
    }
}

/// Sync sweep tuning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Bounded timeout for one remote delivery attempt.
    pub item_timeout_secs: u64,
    /// Total backoff budget per entry within one sweep; afterwards the
    /// entry stays queued for the next sweep.
    pub max_retry_elapsed_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            item_timeout_secs: 10,
            max_retry_elapsed_secs: 30,
        }
    }
}

// =============================================================================
// Settings
// =============================================================================

/// The engine's configuration object.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub pricing: PricingSettings,
    pub discount: DiscountSettings,
    pub loyalty: LoyaltyRules,
    pub documents: DocumentSettings,
    pub sync: SyncSettings,
}

impl Settings {
    /// Returns the configured VAT rate.
    #[inline]
    pub fn vat_rate(&self) -> VatRate {
        VatRate::from_bps(self.pricing.vat_rate_bps)
    }

    /// Default config file location for this platform, if resolvable.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "soko", "pos")
            .map(|dirs| dirs.config_dir().join("engine.toml"))
    }

    /// Loads settings from the default location, falling back to defaults
    /// when the file is missing or the platform has no config directory.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No config directory available; using default settings");
                Settings::default()
            }
        }
    }

    /// Loads settings from an explicit path, falling back to defaults on a
    /// missing file and logging (not failing) on a malformed one.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(settings) => {
                    info!(path = %path.display(), "Settings loaded");
                    settings
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Malformed settings file; using defaults");
                    Settings::default()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "No settings file; using defaults");
                Settings::default()
            }
        }
    }

    /// Serializes the settings to TOML (for writing a starter file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
