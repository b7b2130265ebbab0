//! Affiliate commission values reported by the catalog.

use offer_item_core::error::DomainError;
use serde::{Deserialize, Serialize};

/// How a catalog item pays its commission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionType {
    #[default]
    Unknown,
    FixedRate,
    FixedAmount,
    MultiFixedAmounts,
}

impl CommissionType {
    /// Stable storage code.
    #[must_use]
    pub fn code(self) -> i16 {
        match self {
            CommissionType::Unknown => 0,
            CommissionType::FixedRate => 1,
            CommissionType::FixedAmount => 2,
            CommissionType::MultiFixedAmounts => 3,
        }
    }

    /// Decodes a storage code.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an unknown code.
    pub fn from_code(code: i16) -> Result<Self, DomainError> {
        match code {
            0 => Ok(CommissionType::Unknown),
            1 => Ok(CommissionType::FixedRate),
            2 => Ok(CommissionType::FixedAmount),
            3 => Ok(CommissionType::MultiFixedAmounts),
            _ => Err(DomainError::validation(format!(
                "commission type {code} is unknown"
            ))),
        }
    }
}

/// A commission kind together with its calculated rate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Commission {
    pub commission_type: CommissionType,
    pub calculated_rate: f32,
}

impl Commission {
    /// Builds a commission, rejecting inconsistent type/rate pairs.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless the rate is positive for a
    /// known type, or zero for an unknown one.
    pub fn new(commission_type: CommissionType, calculated_rate: f32) -> Result<Self, DomainError> {
        let commission = Self {
            commission_type,
            calculated_rate,
        };
        if commission.is_valid() {
            Ok(commission)
        } else {
            Err(DomainError::validation(format!(
                "commission {commission_type:?} with rate {calculated_rate} is invalid"
            )))
        }
    }

    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_valid(&self) -> bool {
        match self.commission_type {
            CommissionType::Unknown => self.calculated_rate == 0.0,
            _ => self.calculated_rate > 0.0,
        }
    }
}
