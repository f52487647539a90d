use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use itemize_core::ChargeTarget;

/// Which storefront a payee string belongs to. Callers pre-filter the
/// charge list to one family before handing it to the engine, so Amazon
/// orders are never searched for an Apple charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayeeFamily {
    Amazon,
    Apple,
}

impl fmt::Display for PayeeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayeeFamily::Amazon => write!(f, "amazon"),
            PayeeFamily::Apple => write!(f, "apple"),
        }
    }
}

/// Precompiled payee patterns. Bank descriptors are noisy
/// ("AMZN Mktp US*RT4Y12", "APPLE.COM/BILL 866-712-7753"), so matching is
/// case-insensitive on stable tokens rather than whole strings.
pub struct PayeeClassifier {
    amazon: Regex,
    apple: Regex,
}

impl PayeeClassifier {
    pub fn try_new() -> Result<Self, regex::Error> {
        Ok(PayeeClassifier {
            amazon: Regex::new(r"(?i)\b(amzn|amazon|prime video)\b")?,
            apple: Regex::new(r"(?i)(apple\.com/bill|itunes\.com|\bapple\b)")?,
        })
    }

    pub fn family(&self, payee: &str) -> Option<PayeeFamily> {
        if self.amazon.is_match(payee) {
            return Some(PayeeFamily::Amazon);
        }
        if self.apple.is_match(payee) {
            return Some(PayeeFamily::Apple);
        }
        None
    }

    pub fn filter_charges<'a>(
        &self,
        charges: &'a [ChargeTarget],
        family: PayeeFamily,
    ) -> Vec<&'a ChargeTarget> {
        charges
            .iter()
            .filter(|c| self.family(&c.payee) == Some(family))
            .collect()
    }
}
