use dual_invest_core::{FailureReason, FundingSource, MIN_REDEMPTION_THRESHOLD};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// Total available across all sources is below the platform minimum.
    #[error("insufficient funds: {available} available, at least {required} required")]
    InsufficientFunds { available: Decimal, required: Decimal },

    /// The requested target itself can never be redeemed.
    #[error("target amount {target} is below the minimum redemption of {minimum}")]
    TargetBelowMinimum { target: Decimal, minimum: u64 },
}

impl From<AllocationError> for FailureReason {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::InsufficientFunds {
                available,
                required,
            } => Self::InsufficientFunds {
                available,
                required,
            },
            AllocationError::TargetBelowMinimum { target, minimum } => {
                Self::TargetBelowMinimum { target, minimum }
            }
        }
    }
}

/// Which sources to redeem and how much the purchase stage gets to invest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// Whole-unit amount carried into the purchase stage.
    pub adjusted_target: u64,
    /// Sources to redeem, largest first.
    pub sources: Vec<FundingSource>,
}

impl Allocation {
    /// Sum of the selected sources, which may overshoot `adjusted_target`.
    #[must_use]
    pub fn planned_total(&self) -> Decimal {
        self.sources.iter().map(|s| s.amount).sum()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RedemptionAllocator {
    minimum: u64,
}

impl Default for RedemptionAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl RedemptionAllocator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            minimum: MIN_REDEMPTION_THRESHOLD,
        }
    }

    /// Picks the sources to redeem for `target`.
    ///
    /// When the sources hold less than `target` but at least the minimum, the
    /// target shrinks to what is available. Sources are taken largest first
    /// until the running sum reaches the adjusted target; the last one taken
    /// may push the sum past it.
    ///
    /// # Errors
    /// Returns [`AllocationError`] when the target or the available total is
    /// below the minimum.
    pub fn allocate(
        &self,
        sources: &[FundingSource],
        target: Decimal,
    ) -> Result<Allocation, AllocationError> {
        let minimum = Decimal::from(self.minimum);
        if target < minimum {
            return Err(AllocationError::TargetBelowMinimum {
                target,
                minimum: self.minimum,
            });
        }

        let total: Decimal = sources.iter().map(|s| s.amount).sum();
        if total < minimum {
            warn!(%total, %minimum, "Not enough funds to redeem");
            return Err(AllocationError::InsufficientFunds {
                available: total,
                required: minimum,
            });
        }

        let capped = if total >= target {
            target
        } else {
            info!(%total, %target, "Available funds below target, redeeming what exists");
            total
        };
        // Both operands are >= minimum here, so the floor is a positive whole number.
        let adjusted_target = capped.floor().to_u64().unwrap_or(self.minimum);

        let mut ordered = sources.to_vec();
        ordered.sort_by(|a, b| b.amount.cmp(&a.amount));

        let goal = Decimal::from(adjusted_target);
        let mut cumulative = Decimal::ZERO;
        let mut selected = Vec::new();
        for source in ordered {
            if cumulative >= goal {
                break;
            }
            cumulative += source.amount;
            debug!(index = source.index, amount = %source.amount, %cumulative, "Source allocated");
            selected.push(source);
        }

        Ok(Allocation {
            adjusted_target,
            sources: selected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sources(amounts: &[Decimal]) -> Vec<FundingSource> {
        amounts
            .iter()
            .enumerate()
            .map(|(index, amount)| FundingSource {
                amount: *amount,
                index,
            })
            .collect()
    }

    #[test]
    fn test_two_sources_cover_target() {
        let allocation = RedemptionAllocator::new()
            .allocate(&sources(&[dec!(12), dec!(9)]), dec!(20))
            .unwrap();

        assert_eq!(allocation.adjusted_target, 20);
        assert_eq!(allocation.sources.len(), 2);
        assert_eq!(allocation.sources[0].amount, dec!(12));
        assert_eq!(allocation.sources[1].amount, dec!(9));
        assert_eq!(allocation.planned_total(), dec!(21));
    }

    #[test]
    fn test_below_minimum_fails() {
        let result = RedemptionAllocator::new().allocate(&sources(&[dec!(15), dec!(3)]), dec!(20));

        assert_eq!(
            result,
            Err(AllocationError::InsufficientFunds {
                available: dec!(18),
                required: dec!(20),
            })
        );
    }

    #[test]
    fn test_single_large_source() {
        let allocation = RedemptionAllocator::new()
            .allocate(&sources(&[dec!(25)]), dec!(20))
            .unwrap();

        assert_eq!(allocation.adjusted_target, 20);
        assert_eq!(allocation.sources.len(), 1);
        assert_eq!(allocation.planned_total(), dec!(25));
    }

    #[test]
    fn test_target_shrinks_to_available() {
        let allocation = RedemptionAllocator::new()
            .allocate(&sources(&[dec!(20.7), dec!(4.9)]), dec!(50))
            .unwrap();

        assert_eq!(allocation.adjusted_target, 25);
        assert_eq!(allocation.sources.len(), 2);
    }

    #[test]
    fn test_largest_sources_first() {
        let allocation = RedemptionAllocator::new()
            .allocate(&sources(&[dec!(5), dec!(30), dec!(18)]), dec!(40))
            .unwrap();

        let picked: Vec<usize> = allocation.sources.iter().map(|s| s.index).collect();
        assert_eq!(picked, vec![1, 2]);
        assert_eq!(allocation.adjusted_target, 40);
    }

    #[test]
    fn test_fractional_target_is_floored() {
        let allocation = RedemptionAllocator::new()
            .allocate(&sources(&[dec!(100)]), dec!(37.9))
            .unwrap();

        assert_eq!(allocation.adjusted_target, 37);
    }

    #[test]
    fn test_target_below_minimum_rejected() {
        let result = RedemptionAllocator::new().allocate(&sources(&[dec!(100)]), dec!(10));

        assert!(matches!(
            result,
            Err(AllocationError::TargetBelowMinimum { minimum: 20, .. })
        ));
    }

    #[test]
    fn test_error_maps_to_failure_reason() {
        let reason: FailureReason = AllocationError::InsufficientFunds {
            available: dec!(18),
            required: dec!(20),
        }
        .into();

        assert_eq!(
            reason,
            FailureReason::InsufficientFunds {
                available: dec!(18),
                required: dec!(20),
            }
        );
    }
}
