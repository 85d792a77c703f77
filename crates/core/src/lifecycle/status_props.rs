//! Property-based tests for the document state machine.
//!
//! - Property 1: Only the three legal transitions succeed
//! - Property 2: Confirm and unconfirm are exact inverses
//! - Property 3: Cancelled is terminal

use proptest::prelude::*;
use uuid::Uuid;

use super::status::{DocumentAction, DocumentKind, DocumentStatus};

fn status() -> impl Strategy<Value = DocumentStatus> {
    prop_oneof![
        Just(DocumentStatus::Draft),
        Just(DocumentStatus::Confirmed),
        Just(DocumentStatus::Cancelled),
    ]
}

fn action() -> impl Strategy<Value = DocumentAction> {
    prop_oneof![
        Just(DocumentAction::Confirm),
        Just(DocumentAction::Unconfirm),
        Just(DocumentAction::Cancel),
    ]
}

fn kind() -> impl Strategy<Value = DocumentKind> {
    prop_oneof![
        Just(DocumentKind::Sale),
        Just(DocumentKind::Purchase),
        Just(DocumentKind::SaleReturn),
        Just(DocumentKind::PurchaseReturn),
        Just(DocumentKind::CashIn),
        Just(DocumentKind::CashOut),
        Just(DocumentKind::Transfer),
        Just(DocumentKind::StockAdjustment),
        Just(DocumentKind::Payment),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property 1: a transition succeeds exactly for the legal pairs, and a
    /// failure reports the status it started from.
    #[test]
    fn prop_only_legal_transitions(from in status(), action in action(), kind in kind()) {
        let legal = matches!(
            (from, action),
            (DocumentStatus::Draft, DocumentAction::Confirm | DocumentAction::Cancel)
                | (DocumentStatus::Confirmed, DocumentAction::Unconfirm)
        );
        let result = from.transition(kind, Uuid::nil(), action);
        prop_assert_eq!(result.is_ok(), legal);
        if let Err(err) = result {
            prop_assert_eq!(err.error_code(), "INVALID_TRANSITION");
        }
    }

    /// Property 2: any sequence of confirm/unconfirm pairs returns to draft.
    #[test]
    fn prop_confirm_unconfirm_roundtrip(rounds in 1usize..10) {
        let mut status = DocumentStatus::Draft;
        for _ in 0..rounds {
            status = status.transition(DocumentKind::Sale, Uuid::nil(), DocumentAction::Confirm).unwrap();
            prop_assert!(status.is_confirmed());
            status = status.transition(DocumentKind::Sale, Uuid::nil(), DocumentAction::Unconfirm).unwrap();
        }
        prop_assert_eq!(status, DocumentStatus::Draft);
    }

    /// Property 3: nothing leaves cancelled.
    #[test]
    fn prop_cancelled_is_terminal(action in action()) {
        prop_assert!(DocumentStatus::Cancelled.after(action).is_none());
    }
}
