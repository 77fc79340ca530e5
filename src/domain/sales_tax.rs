use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;

/// A sales tax rate and the liability account that collects it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalesTax {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    /// Percentage, e.g. `13.0` for 13%.
    pub rate: f64,
    pub account_id: Uuid,
    #[serde(default)]
    pub archived: bool,
}

impl SalesTax {
    pub fn new(name: impl Into<String>, rate: f64, account_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            rate,
            account_id,
            archived: false,
        }
    }

    pub fn tax_on(&self, net: f64) -> f64 {
        round_money(net * self.rate / 100.0)
    }
}

impl Identifiable for SalesTax {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for SalesTax {
    fn display_label(&self) -> String {
        format!("{} ({}%)", self.name, self.rate)
    }
}
