//! External collaborator seams
//!
//! The engine consumes account/KYC status, payout dispatch, and
//! notification delivery from the surrounding platform through these
//! traits. All calls are fire-and-forget or synchronous reads; nothing
//! here may block a cycle run. Payout confirmations arrive later through
//! the engine's `confirm_*` operations, driven by the gateway's
//! asynchronous callbacks.
//!
//! The no-op defaults keep tests and the CLI self-contained.

use crate::models::event::{ProfitShareEvent, ReferralCommissionEvent, WithdrawalRequest};

/// Account/KYC status read from the platform.
pub trait KycProvider: Send + Sync {
    /// May this account open investments?
    fn can_invest(&self, account_id: &str) -> bool;

    /// May this account withdraw funds?
    fn can_withdraw(&self, account_id: &str) -> bool;
}

/// External payout sink. Dispatch is fire-and-forget; the gateway
/// confirms (or fails) asynchronously.
pub trait PayoutGateway: Send + Sync {
    fn dispatch_profit_share(&self, event: &ProfitShareEvent);
    fn dispatch_commission(&self, event: &ReferralCommissionEvent);
    fn dispatch_withdrawal(&self, request: &WithdrawalRequest);
}

/// Fire-and-forget notification delivery.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, account_id: &str, message: &str);
}

/// KYC provider that accepts every account.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproveAllKyc;

impl KycProvider for ApproveAllKyc {
    fn can_invest(&self, _account_id: &str) -> bool {
        true
    }

    fn can_withdraw(&self, _account_id: &str) -> bool {
        true
    }
}

/// Payout gateway that drops every dispatch.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullGateway;

impl PayoutGateway for NullGateway {
    fn dispatch_profit_share(&self, _event: &ProfitShareEvent) {}
    fn dispatch_commission(&self, _event: &ReferralCommissionEvent) {}
    fn dispatch_withdrawal(&self, _request: &WithdrawalRequest) {}
}

/// Notification sink that drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl NotificationSink for NullNotifier {
    fn notify(&self, _account_id: &str, _message: &str) {}
}
