use model::ContractDirection;
use std::fmt;

/// Trading intent for one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Expect the price to rise.
    Buy,
    /// Expect the price to fall.
    Sell,
    /// Do nothing this cycle.
    None,
}

impl Signal {
    /// Contract to purchase for this signal. `Buy` rides a rise (`CALL`),
    /// `Sell` a fall (`PUT`).
    pub fn direction(&self) -> Option<ContractDirection> {
        match self {
            Self::Buy => Some(ContractDirection::Call),
            Self::Sell => Some(ContractDirection::Put),
            Self::None => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
            Self::None => write!(f, "none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_direction() {
        assert_eq!(Signal::Buy.direction(), Some(ContractDirection::Call));
        assert_eq!(Signal::Sell.direction(), Some(ContractDirection::Put));
        assert_eq!(Signal::None.direction(), None);
    }
}
