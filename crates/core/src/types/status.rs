//! Status enums for payments and bookings.

use serde::{Deserialize, Serialize};

/// Ledger entry classification.
///
/// Matches the `paymentType` column of the transaction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    /// A guest paying for a booking (the checkout path).
    #[default]
    Booking,
    /// A refund issued on cancellation.
    Cancellation,
    /// A payout to the host.
    Host,
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Booking => write!(f, "booking"),
            Self::Cancellation => write!(f, "cancellation"),
            Self::Host => write!(f, "host"),
        }
    }
}

impl std::str::FromStr for PaymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booking" => Ok(Self::Booking),
            "cancellation" => Ok(Self::Cancellation),
            "host" => Ok(Self::Host),
            _ => Err(format!("invalid payment type: {s}")),
        }
    }
}

/// How a booking was placed.
///
/// `request` bookings need host approval after payment; anything else is
/// treated as an instant booking and approved directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookingType {
    Request,
    #[default]
    #[serde(other)]
    Instant,
}

impl BookingType {
    /// Whether this booking needs host approval after payment.
    #[must_use]
    pub const fn needs_approval(self) -> bool {
        matches!(self, Self::Request)
    }
}

impl std::fmt::Display for BookingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request => write!(f, "request"),
            Self::Instant => write!(f, "instant"),
        }
    }
}

/// Lifecycle state of a booking, as reported by the booking gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingState {
    /// Paid, waiting for the host to accept the request.
    Pending,
    /// Confirmed.
    Approved,
    /// Cancelled by either party.
    Cancelled,
    /// Stay finished.
    Completed,
}

impl std::fmt::Display for BookingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Completed => write!(f, "completed"),
        }
    }
}
