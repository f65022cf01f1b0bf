use std::{fmt, str::FromStr};

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Order lifecycle. Stored as its numeric code.
///
/// The main path is Pending -> PendingPayment -> PaymentSuccess, plus
/// Pending -> Expired. Two more moves are accepted on purpose: Pending ->
/// PaymentSuccess, because the gateway may settle without ever reporting a
/// pending callback, and PendingPayment -> Expired, because a payment can lapse
/// after the customer opened it. PaymentSuccess and Expired are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    #[sea_orm(num_value = 100)]
    Pending,
    #[sea_orm(num_value = 200)]
    PendingPayment,
    #[sea_orm(num_value = 300)]
    PaymentSuccess,
    #[sea_orm(num_value = 400)]
    Expired,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PendingPayment => "pending-payment",
            OrderStatus::PaymentSuccess => "payment-success",
            OrderStatus::Expired => "expired",
        }
    }

    /// Statuses an order may be in for a move to `self` to be accepted.
    pub fn predecessors(self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[],
            OrderStatus::PendingPayment => &[OrderStatus::Pending],
            OrderStatus::PaymentSuccess | OrderStatus::Expired => {
                &[OrderStatus::Pending, OrderStatus::PendingPayment]
            }
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        next.predecessors().contains(&self)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment lifecycle as recorded by the payment service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[sea_orm(num_value = 0)]
    Initial,
    #[sea_orm(num_value = 100)]
    Pending,
    #[sea_orm(num_value = 200)]
    Settlement,
    #[sea_orm(num_value = 300)]
    Expire,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Initial => "initial",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Settlement => "settlement",
            PaymentStatus::Expire => "expire",
        }
    }

    pub fn predecessors(self) -> &'static [PaymentStatus] {
        match self {
            PaymentStatus::Initial => &[],
            PaymentStatus::Pending => &[PaymentStatus::Initial],
            PaymentStatus::Settlement | PaymentStatus::Expire => {
                &[PaymentStatus::Initial, PaymentStatus::Pending]
            }
        }
    }

    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        next.predecessors().contains(&self)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction status reported by the payment gateway, in webhooks and in
/// settlement events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Settlement,
    Expire,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Settlement => "settlement",
            TransactionStatus::Expire => "expire",
        }
    }

    pub fn payment_status(self) -> PaymentStatus {
        match self {
            TransactionStatus::Pending => PaymentStatus::Pending,
            TransactionStatus::Settlement => PaymentStatus::Settlement,
            TransactionStatus::Expire => PaymentStatus::Expire,
        }
    }

    pub fn order_status(self) -> OrderStatus {
        match self {
            TransactionStatus::Pending => OrderStatus::PendingPayment,
            TransactionStatus::Settlement => OrderStatus::PaymentSuccess,
            TransactionStatus::Expire => OrderStatus::Expired,
        }
    }

    /// Name carried in the settlement event envelope.
    pub fn event_name(self) -> String {
        self.as_str().to_uppercase()
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown transaction status: {0}")]
pub struct UnknownTransactionStatus(pub String);

impl FromStr for TransactionStatus {
    type Err = UnknownTransactionStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "settlement" => Ok(TransactionStatus::Settlement),
            "expire" => Ok(TransactionStatus::Expire),
            other => Err(UnknownTransactionStatus(other.to_string())),
        }
    }
}

/// Availability of a field schedule slot, owned by the field service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    Available,
    Booked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_only_moves_forward() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(PendingPayment));
        assert!(Pending.can_transition_to(PaymentSuccess));
        assert!(Pending.can_transition_to(Expired));
        assert!(PendingPayment.can_transition_to(PaymentSuccess));
        assert!(PendingPayment.can_transition_to(Expired));

        for status in [Pending, PendingPayment, PaymentSuccess, Expired] {
            assert!(!status.can_transition_to(Pending), "{status} -> pending");
            assert!(!status.can_transition_to(status), "{status} -> itself");
            assert!(!PaymentSuccess.can_transition_to(status));
            assert!(!Expired.can_transition_to(status));
        }
    }

    #[test]
    fn payment_status_only_moves_forward() {
        use PaymentStatus::*;
        assert!(Initial.can_transition_to(Pending));
        assert!(Initial.can_transition_to(Settlement));
        assert!(Pending.can_transition_to(Expire));
        assert!(!Settlement.can_transition_to(Pending));
        assert!(!Settlement.can_transition_to(Expire));
        assert!(!Expire.can_transition_to(Settlement));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn transaction_status_maps_to_both_state_machines() {
        let status: TransactionStatus = "settlement".parse().unwrap();
        assert_eq!(status.payment_status(), PaymentStatus::Settlement);
        assert_eq!(status.order_status(), OrderStatus::PaymentSuccess);
        assert_eq!(status.event_name(), "SETTLEMENT");
        assert_eq!(
            "expire".parse::<TransactionStatus>().unwrap().order_status(),
            OrderStatus::Expired
        );
        assert_eq!(
            "pending".parse::<TransactionStatus>().unwrap().order_status(),
            OrderStatus::PendingPayment
        );
        assert!("capture".parse::<TransactionStatus>().is_err());
    }
}
