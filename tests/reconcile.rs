//! Payment reconciliation through the signed webhook and the manual check.

mod common;

use channel_market::error::{AppError, UpstreamError};
use channel_market::lifecycle::{Caller, ReconcileOutcome, ReconcileSource};
use channel_market::payment::sign;
use channel_market::store::{ListingStore, OrderStore, SettingStore};
use channel_market::types::listing::ListingStatus;
use channel_market::types::order::{Order, OrderStatus};
use channel_market::types::user::Role;
use common::{Harness, guest_order, harness, insert, owned_order, reload, seed_listing};
use uuid::Uuid;

fn webhook_body(order: &Order, payment_status: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "order_id": order.gateway_order_id.as_deref().unwrap(),
        "payment_status": payment_status,
        "status": "completed",
    }))
    .unwrap()
}

async fn send_webhook(
    h: &Harness,
    order: &Order,
    payment_status: &str,
) -> Result<ReconcileOutcome, AppError> {
    let body = webhook_body(order, payment_status);
    let signature = sign(&h.config.webhook_secret, &body).unwrap();
    h.service.handle_webhook(&body, Some(&signature)).await
}

#[tokio::test]
async fn signed_paid_webhook_pays_order_sells_listing_and_notifies() {
    let h = harness();
    let listing = seed_listing(&h.store).await;
    let order = guest_order(listing.id, "buyer@example.com");
    insert(&h.store, &order).await;

    let outcome = send_webhook(&h, &order, "paid").await.unwrap();

    assert_eq!(outcome.transitioned_to, Some(OrderStatus::Paid));
    let stored = reload(&h.store, order.id).await;
    assert_eq!(stored.status, OrderStatus::Paid);
    assert_eq!(stored.payment_status.as_deref(), Some("paid"));
    assert!(stored.paid_at.is_some());
    assert!(stored.delivery.is_none());

    let listing = h.store.get_listing(listing.id).await.unwrap().unwrap();
    assert_eq!(listing.status, ListingStatus::Sold);

    assert_eq!(h.mailer.sent_to("buyer@example.com").len(), 2);
    let admin = h.mailer.sent_to("admin@localhost");
    assert_eq!(admin.len(), 1);
    assert!(admin[0].html_body.contains("https://wa.me/"));
}

#[tokio::test]
async fn repeated_paid_webhook_is_a_no_op() {
    let h = harness();
    let listing = seed_listing(&h.store).await;
    let order = guest_order(listing.id, "buyer@example.com");
    insert(&h.store, &order).await;

    send_webhook(&h, &order, "paid").await.unwrap();
    let first = reload(&h.store, order.id).await;
    let mails = h.mailer.count();
    // A second transition would flip this back to sold.
    h.store
        .set_listing_status(listing.id, ListingStatus::Hidden)
        .await
        .unwrap();

    let outcome = send_webhook(&h, &order, "paid").await.unwrap();

    assert_eq!(outcome.transitioned_to, None);
    assert_eq!(reload(&h.store, order.id).await, first);
    assert_eq!(h.mailer.count(), mails);
    let listing = h.store.get_listing(listing.id).await.unwrap().unwrap();
    assert_eq!(listing.status, ListingStatus::Hidden);
}

#[tokio::test]
async fn bad_signature_rejects_without_touching_state() {
    let h = harness();
    let listing = seed_listing(&h.store).await;
    let order = guest_order(listing.id, "buyer@example.com");
    insert(&h.store, &order).await;

    let body = webhook_body(&order, "paid");
    let forged = sign(b"some-other-secret", &body).unwrap();

    for signature in [Some(forged.as_str()), Some("zz-not-hex"), None] {
        let err = h.service.handle_webhook(&body, signature).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Upstream(UpstreamError::InvalidSignature)
        ));
    }

    assert_eq!(reload(&h.store, order.id).await, order);
    let listing = h.store.get_listing(listing.id).await.unwrap().unwrap();
    assert_eq!(listing.status, ListingStatus::Available);
    assert_eq!(h.mailer.count(), 0);
}

#[tokio::test]
async fn webhook_for_unknown_gateway_order_is_not_found() {
    let h = harness();
    let body = br#"{"order_id":"gw-missing","payment_status":"paid"}"#;
    let signature = sign(&h.config.webhook_secret, body).unwrap();

    let err = h
        .service
        .handle_webhook(body, Some(&signature))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn webhook_without_status_is_a_validation_error() {
    let h = harness();
    let body = br#"{"order_id":"gw-1"}"#;
    let signature = sign(&h.config.webhook_secret, body).unwrap();

    let err = h
        .service
        .handle_webhook(body, Some(&signature))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn expired_and_cancelled_reports_move_pending_orders() {
    let h = harness();
    let listing = seed_listing(&h.store).await;

    for (reported, expected) in [
        ("expired", OrderStatus::Expired),
        ("cancelled", OrderStatus::Cancelled),
        ("CANCELED", OrderStatus::Cancelled),
    ] {
        let order = guest_order(listing.id, "buyer@example.com");
        insert(&h.store, &order).await;
        let outcome = send_webhook(&h, &order, reported).await.unwrap();
        assert_eq!(outcome.transitioned_to, Some(expected));
        let stored = reload(&h.store, order.id).await;
        assert_eq!(stored.status, expected);
        assert!(stored.paid_at.is_none());
    }
    // No payment, no sale.
    let listing = h.store.get_listing(listing.id).await.unwrap().unwrap();
    assert_eq!(listing.status, ListingStatus::Available);
}

#[tokio::test]
async fn unmapped_report_is_recorded_but_order_stays_pending() {
    let h = harness();
    let listing = seed_listing(&h.store).await;
    let order = guest_order(listing.id, "buyer@example.com");
    insert(&h.store, &order).await;

    let outcome = send_webhook(&h, &order, "waiting").await.unwrap();

    assert_eq!(outcome.transitioned_to, None);
    let stored = reload(&h.store, order.id).await;
    assert_eq!(stored.status, OrderStatus::Pending);
    assert_eq!(stored.payment_status.as_deref(), Some("waiting"));
}

#[tokio::test]
async fn settled_orders_ignore_later_reports() {
    let h = harness();
    let listing = seed_listing(&h.store).await;
    let order = guest_order(listing.id, "buyer@example.com");
    insert(&h.store, &order).await;

    send_webhook(&h, &order, "expired").await.unwrap();
    let expired = reload(&h.store, order.id).await;

    let outcome = send_webhook(&h, &order, "paid").await.unwrap();

    assert_eq!(outcome.transitioned_to, None);
    assert_eq!(reload(&h.store, order.id).await, expired);
}

#[tokio::test]
async fn late_unmapped_report_on_stale_copy_leaves_paid_order_alone() {
    let h = harness();
    let listing = seed_listing(&h.store).await;
    let order = guest_order(listing.id, "buyer@example.com");
    insert(&h.store, &order).await;

    // A poll read `order` while pending; the webhook pays it before the gateway answers.
    send_webhook(&h, &order, "paid").await.unwrap();
    let paid = reload(&h.store, order.id).await;

    let outcome = h
        .service
        .reconcile(order.clone(), "failed", ReconcileSource::Poll)
        .await
        .unwrap();

    assert_eq!(outcome.transitioned_to, None);
    assert_eq!(outcome.order, paid);
    let stored = reload(&h.store, order.id).await;
    assert_eq!(stored.status, OrderStatus::Paid);
    assert_eq!(stored.payment_status.as_deref(), Some("paid"));
}

#[tokio::test]
async fn payment_status_write_only_lands_on_pending_orders() {
    let h = harness();
    let listing = seed_listing(&h.store).await;
    let order = guest_order(listing.id, "buyer@example.com");
    insert(&h.store, &order).await;

    assert!(h.store.record_payment_status(order.id, "waiting").await.unwrap());
    send_webhook(&h, &order, "paid").await.unwrap();
    assert!(!h.store.record_payment_status(order.id, "failed").await.unwrap());
    assert!(!h.store.record_payment_status(Uuid::new_v4(), "failed").await.unwrap());

    let stored = reload(&h.store, order.id).await;
    assert_eq!(stored.payment_status.as_deref(), Some("paid"));
}

#[tokio::test]
async fn concurrent_reconciles_transition_exactly_once() {
    let h = harness();
    let listing = seed_listing(&h.store).await;
    let order = guest_order(listing.id, "buyer@example.com");
    insert(&h.store, &order).await;

    let (a, b) = tokio::join!(
        h.service
            .reconcile(order.clone(), "paid", ReconcileSource::Webhook),
        h.service.reconcile(order.clone(), "paid", ReconcileSource::Poll),
    );
    let transitions = [a.unwrap(), b.unwrap()]
        .iter()
        .filter(|o| o.transitioned_to.is_some())
        .count();

    assert_eq!(transitions, 1);
    assert_eq!(reload(&h.store, order.id).await.status, OrderStatus::Paid);
    // Two customer mails plus one admin mail, once.
    assert_eq!(h.mailer.count(), 3);
}

#[tokio::test]
async fn mail_failure_does_not_fail_reconciliation() {
    let h = harness();
    h.mailer.fail_all();
    let listing = seed_listing(&h.store).await;
    let order = guest_order(listing.id, "buyer@example.com");
    insert(&h.store, &order).await;

    let outcome = send_webhook(&h, &order, "paid").await.unwrap();

    assert_eq!(outcome.transitioned_to, Some(OrderStatus::Paid));
    assert_eq!(reload(&h.store, order.id).await.status, OrderStatus::Paid);
}

#[tokio::test]
async fn admin_whatsapp_setting_feeds_the_admin_alert() {
    let h = harness();
    h.store
        .put_setting("admin_whatsapp", "+62 811-000-111")
        .await
        .unwrap();
    let listing = seed_listing(&h.store).await;
    let order = guest_order(listing.id, "buyer@example.com");
    insert(&h.store, &order).await;

    send_webhook(&h, &order, "paid").await.unwrap();

    let admin = h.mailer.sent_to("admin@localhost");
    assert!(admin[0].html_body.contains("https://wa.me/62811000111"));
}

#[tokio::test]
async fn check_payment_reconciles_final_status_without_selling_listing() {
    let h = harness();
    let listing = seed_listing(&h.store).await;
    let owner = Uuid::new_v4();
    let order = owned_order(listing.id, owner);
    insert(&h.store, &order).await;
    h.gateway.set_status(true, "paid");

    let caller = Caller::resolve(Some((owner, Role::Customer)), None);
    let outcome = h.service.check_payment(order.id, &caller).await.unwrap();

    assert_eq!(outcome.transitioned_to, Some(OrderStatus::Paid));
    assert!(outcome.order.paid_at.is_some());
    let listing = h.store.get_listing(listing.id).await.unwrap().unwrap();
    assert_eq!(listing.status, ListingStatus::Available);
}

#[tokio::test]
async fn check_payment_leaves_order_alone_when_not_final() {
    let h = harness();
    let listing = seed_listing(&h.store).await;
    let order = guest_order(listing.id, "buyer@example.com");
    insert(&h.store, &order).await;
    h.gateway.set_status(false, "paid");

    let caller = Caller::resolve(None, Some("buyer@example.com"));
    let err = h.service.check_payment(order.id, &caller).await.unwrap_err();

    assert!(matches!(err, AppError::Upstream(UpstreamError::NotFinal(_))));
    assert_eq!(reload(&h.store, order.id).await, order);
}

#[tokio::test]
async fn check_payment_surfaces_gateway_failure_as_retryable() {
    let h = harness();
    let listing = seed_listing(&h.store).await;
    let order = guest_order(listing.id, "buyer@example.com");
    insert(&h.store, &order).await;
    h.gateway.fail_status_queries();

    let caller = Caller::resolve(None, Some("buyer@example.com"));
    let err = h.service.check_payment(order.id, &caller).await.unwrap_err();

    match err {
        AppError::Upstream(e) => assert!(e.is_retryable()),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(reload(&h.store, order.id).await, order);
}

#[tokio::test]
async fn check_payment_requires_access_before_calling_gateway() {
    let h = harness();
    let listing = seed_listing(&h.store).await;
    let order = guest_order(listing.id, "buyer@example.com");
    insert(&h.store, &order).await;
    h.gateway.set_status(true, "paid");

    let err = h
        .service
        .check_payment(order.id, &Caller::Anonymous)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Unauthorized(_)));
    assert_eq!(h.gateway.status_queries(), 0);
    assert_eq!(reload(&h.store, order.id).await.status, OrderStatus::Pending);
}

#[tokio::test]
async fn check_payment_needs_a_gateway_reference() {
    let h = harness();
    let listing = seed_listing(&h.store).await;
    let mut order = guest_order(listing.id, "buyer@example.com");
    order.gateway_order_id = None;
    insert(&h.store, &order).await;

    let admin = Caller::Admin {
        user_id: Uuid::new_v4(),
    };
    let err = h.service.check_payment(order.id, &admin).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}
