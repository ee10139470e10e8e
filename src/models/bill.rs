use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A finalized transaction. Immutable once created from a session that
/// holds both an item and a weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub timestamp: DateTime<Utc>,
    pub item_id: String,
    pub weight_kg: f64,
    pub unit_price: f64,
}

impl Bill {
    pub fn new(timestamp: DateTime<Utc>, item_id: String, weight_kg: f64, unit_price: f64) -> Self {
        Self {
            timestamp,
            item_id,
            weight_kg,
            unit_price,
        }
    }

    pub fn total(&self) -> f64 {
        self.unit_price * self.weight_kg
    }

    /// Second-resolution human timestamp, as printed in the ledger.
    pub fn timestamp_display(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Filesystem-safe timestamp used to name the receipt artifact.
    /// Second resolution, so two finalizations within the same second
    /// collide on purpose instead of silently overwriting.
    pub fn file_stamp(&self) -> String {
        self.timestamp.format("%Y-%m-%d_%H-%M-%S").to_string()
    }

    /// One ledger row, trailing newline included. Weight at 3 decimal
    /// places, money at 2.
    pub fn ledger_row(&self) -> String {
        format!(
            "{},{},{:.3},{:.2},{:.2}\n",
            self.timestamp_display(),
            self.item_id,
            self.weight_kg,
            self.unit_price,
            self.total()
        )
    }

    /// The receipt text layout, shared by the terminal display and the
    /// rendered receipt image.
    pub fn render_text(&self) -> String {
        format!(
            "AUTOMATED BILLING SYSTEM\n\
             Date & Time : {}\n\
             -------------------------------\n\
             Item        : {}\n\
             Weight (kg) : {:.3}\n\
             Price / kg  : Rs. {:.2}\n\
             -------------------------------\n\
             Total Price : Rs. {:.2}\n\
             -------------------------------",
            self.timestamp_display(),
            self.item_id,
            self.weight_kg,
            self.unit_price,
            self.total()
        )
    }
}
