use std::fmt;
use validator::ValidationErrors;

#[derive(Debug, Clone, PartialEq)]
pub enum WheelError {
    /// No eligible slice is left for the requested outcome.
    ExhaustedPool,
    /// A prize was drawn but nobody is left to receive it.
    ExhaustedGuests,
    /// A spin is already in flight.
    Busy,
    /// The spin was decided in a session that has since ended.
    StaleSpin { spin_epoch: u64, current_epoch: u64 },
    SessionExpired,
    RunComplete,
    InvalidConfig(ValidationErrors),
}

impl WheelError {
    /// Errors the operator never needs to see.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Busy | Self::StaleSpin { .. })
    }

    /// Errors shown as a notice that blocks further spinning.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::ExhaustedPool | Self::ExhaustedGuests)
    }
}

impl fmt::Display for WheelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExhaustedPool => write!(f, "No prizes left on the wheel"),
            Self::ExhaustedGuests => write!(f, "No eligible guests left to receive a prize"),
            Self::Busy => write!(f, "A spin is already in progress"),
            Self::StaleSpin { spin_epoch, current_epoch } => write!(
                f,
                "Spin from session epoch {} discarded in epoch {}",
                spin_epoch, current_epoch
            ),
            Self::SessionExpired => write!(f, "Session time is up"),
            Self::RunComplete => write!(f, "All sessions have been played"),
            Self::InvalidConfig(e) => write!(f, "Invalid wheel configuration: {}", e),
        }
    }
}

impl std::error::Error for WheelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidConfig(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for WheelError {
    fn from(err: ValidationErrors) -> Self {
        Self::InvalidConfig(err)
    }
}
