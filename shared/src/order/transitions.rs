//! Order state machine
//!
//! Every status change goes through [`next_status`]. The table is the only
//! place that knows which action is legal in which status:
//!
//! | from               | actions                       |
//! |--------------------|-------------------------------|
//! | `placed`           | approve, reject, cancel       |
//! | `approved`         | pack, cancel                  |
//! | `packed`           | assign_delivery               |
//! | `out_for_delivery` | confirm_delivery              |
//! | `delivered`        | return                        |
//! | `rejected`, `cancelled`, `returned` | (terminal)   |

use super::OrderStatus;
use crate::models::Role;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// An action a participant performs on an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    Approve,
    Reject,
    Pack,
    AssignDelivery,
    ConfirmDelivery,
    Cancel,
    Return,
}

impl OrderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Pack => "pack",
            Self::AssignDelivery => "assign_delivery",
            Self::ConfirmDelivery => "confirm_delivery",
            Self::Cancel => "cancel",
            Self::Return => "return",
        }
    }

    /// Status the order ends up in after this action
    pub fn target(&self) -> OrderStatus {
        match self {
            Self::Approve => OrderStatus::Approved,
            Self::Reject => OrderStatus::Rejected,
            Self::Pack => OrderStatus::Packed,
            Self::AssignDelivery => OrderStatus::OutForDelivery,
            Self::ConfirmDelivery => OrderStatus::Delivered,
            Self::Cancel => OrderStatus::Cancelled,
            Self::Return => OrderStatus::Returned,
        }
    }

    /// Roles allowed to attempt the action. Participant checks
    /// (the order's own pharmacist, courier or customer) come on top.
    pub fn permitted_roles(&self) -> &'static [Role] {
        match self {
            Self::Approve | Self::Reject | Self::Pack | Self::AssignDelivery => {
                &[Role::Pharmacist]
            }
            Self::ConfirmDelivery => &[Role::Delivery],
            Self::Cancel => &[Role::Customer, Role::Admin],
            Self::Return => &[Role::Customer],
        }
    }
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions legal from `status`
pub fn allowed_actions(status: OrderStatus) -> &'static [OrderAction] {
    use OrderAction::*;
    match status {
        OrderStatus::Placed => &[Approve, Reject, Cancel],
        OrderStatus::Approved => &[Pack, Cancel],
        OrderStatus::Packed => &[AssignDelivery],
        OrderStatus::OutForDelivery => &[ConfirmDelivery],
        OrderStatus::Delivered => &[Return],
        OrderStatus::Rejected | OrderStatus::Cancelled | OrderStatus::Returned => &[],
    }
}

/// Illegal action for the current status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {action} an order that is {status}")]
pub struct TransitionError {
    pub status: OrderStatus,
    pub action: OrderAction,
}

/// Resolve the status reached by applying `action` to an order in `status`.
pub fn next_status(status: OrderStatus, action: OrderAction) -> Result<OrderStatus, TransitionError> {
    if allowed_actions(status).contains(&action) {
        Ok(action.target())
    } else {
        Err(TransitionError { status, action })
    }
}
