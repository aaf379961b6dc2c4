use super::*;
use crate::notify::notice::AMENDMENT_RESPONSE_ROLES;
use shared::message::Severity;
use shared::order::{AmendmentDelta, AmendmentResponseRequest};

fn add(id: &str, name: &str, price: f64, qty: i32) -> AmendmentDelta {
    AmendmentDelta::Add {
        item: LineItem::new(id, name, price, qty),
    }
}

fn respond(approve: bool) -> AmendmentResponseRequest {
    AmendmentResponseRequest {
        approve,
        updated_items_json: None,
        updated_total: None,
    }
}

fn seed_served(service: &OrderService, order_id: &str) -> Order {
    seed(
        service,
        with_status(device_order(order_id, r#"{"A":1}"#), OrderStatus::Served),
    )
}

#[test]
fn test_approved_amendment_on_served_order() {
    let service = create_test_service();
    seed_served(&service, "o-1");

    service
        .propose_amendment(TENANT, "o-1", vec![add("y", "Tiramisu", 6.0, 1)])
        .unwrap();
    let order = service
        .respond_amendment(TENANT, "o-1", respond(true), "chef-1")
        .unwrap();

    assert!(order.items.iter().any(|i| i.id == "y"));
    assert!(!order.has_pending_amendment());
    assert_eq!(order.total_amount, 25.0);
    assert_eq!(order.total_amount, order.items_total());

    let rows = notifications_titled(&service, "Amendment Approved");
    assert_eq!(roles_of(&rows), AMENDMENT_RESPONSE_ROLES.to_vec());
    assert!(rows.iter().all(|n| n.severity == Severity::Success));
}

#[test]
fn test_approved_total_matches_line_items() {
    let service = create_test_service();
    seed(&service, device_order("o-1", r#"{"A":1}"#));

    service
        .propose_amendment(
            TENANT,
            "o-1",
            vec![
                add("p1", "Pizza", 9.5, 1),
                add("p2", "Water", 1.1, 3),
                AmendmentDelta::Delete {
                    item_id: "p9".into(),
                },
            ],
        )
        .unwrap();
    let order = service
        .respond_amendment(TENANT, "o-1", respond(true), "chef-1")
        .unwrap();

    assert_eq!(order.items.len(), 2);
    assert_eq!(order.items[0].quantity, 3);
    assert_eq!(order.total_amount, 31.8);
    assert_eq!(order.total_amount, order.items_total());
}

#[test]
fn test_new_proposal_replaces_pending_batch() {
    let service = create_test_service();
    seed(&service, device_order("o-1", r#"{"A":1}"#));

    service
        .propose_amendment(TENANT, "o-1", vec![add("a", "A", 1.0, 1)])
        .unwrap();
    let order = service
        .propose_amendment(TENANT, "o-1", vec![add("b", "B", 2.0, 1)])
        .unwrap();
    assert_eq!(order.pending_amendment, vec![add("b", "B", 2.0, 1)]);

    let rows = notifications_titled(&service, "Amendment Requested");
    assert_eq!(rows.len(), 2 * 6);
}

#[test]
fn test_declined_amendment_keeps_items() {
    let service = create_test_service();
    let seeded = seed(&service, device_order("o-1", r#"{"A":1}"#));

    service
        .propose_amendment(TENANT, "o-1", vec![add("y", "Tiramisu", 6.0, 1)])
        .unwrap();
    let order = service
        .respond_amendment(TENANT, "o-1", respond(false), "chef-1")
        .unwrap();

    assert_eq!(order.items, seeded.items);
    assert!(!order.has_pending_amendment());
    assert_eq!(order.total_amount, 19.0);

    let rows = notifications_titled(&service, "Amendment Declined");
    assert_eq!(rows.len(), AMENDMENT_RESPONSE_ROLES.len());
    assert!(rows.iter().all(|n| n.severity == Severity::Warning));
}

#[test]
fn test_respond_without_pending_batch() {
    let service = create_test_service();
    seed(&service, device_order("o-1", r#"{"A":1}"#));

    let err = service
        .respond_amendment(TENANT, "o-1", respond(true), "chef-1")
        .unwrap_err();
    assert!(matches!(err, OrderError::NoPendingAmendment(_)));
}

#[test]
fn test_legacy_items_used_only_without_pending_batch() {
    let service = create_test_service();
    seed(&service, device_order("o-1", r#"{"A":1}"#));

    let order = service
        .respond_amendment(
            TENANT,
            "o-1",
            AmendmentResponseRequest {
                approve: true,
                updated_items_json: Some(r#"[{"id":"p7","name":"Salad","price":7.25,"qty":2}]"#.into()),
                updated_total: Some(999.0),
            },
            "chef-1",
        )
        .unwrap();
    assert_eq!(order.items, vec![LineItem::new("p7", "Salad", 7.25, 2)]);
    // the reported total is never trusted
    assert_eq!(order.total_amount, 14.5);

    service
        .propose_amendment(TENANT, "o-1", vec![add("y", "Tiramisu", 6.0, 1)])
        .unwrap();
    let order = service
        .respond_amendment(
            TENANT,
            "o-1",
            AmendmentResponseRequest {
                approve: true,
                updated_items_json: Some("[]".into()),
                updated_total: None,
            },
            "chef-1",
        )
        .unwrap();
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.total_amount, 20.5);
}

#[test]
fn test_malformed_legacy_items() {
    let service = create_test_service();
    seed(&service, device_order("o-1", r#"{"A":1}"#));

    let err = service
        .respond_amendment(
            TENANT,
            "o-1",
            AmendmentResponseRequest {
                approve: true,
                updated_items_json: Some("{oops".into()),
                updated_total: None,
            },
            "chef-1",
        )
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidPayload(_)));
}

#[test]
fn test_ready_and_paid_orders_are_not_amendable() {
    let service = create_test_service();
    seed(
        &service,
        with_status(device_order("ready", r#"{"A":1}"#), OrderStatus::Ready),
    );
    seed(
        &service,
        with_status(device_order("paid", r#"{"A":1}"#), OrderStatus::Paid),
    );

    for order_id in ["ready", "paid"] {
        let err = service
            .propose_amendment(TENANT, order_id, vec![add("y", "Tiramisu", 6.0, 1)])
            .unwrap_err();
        assert!(matches!(err, OrderError::NotAmendable { .. }), "{}", order_id);
    }
}

#[test]
fn test_empty_proposal_is_rejected() {
    let service = create_test_service();
    seed(&service, device_order("o-1", r#"{"A":1}"#));
    assert!(matches!(
        service.propose_amendment(TENANT, "o-1", Vec::new()),
        Err(OrderError::InvalidPayload(_))
    ));
}

#[test]
fn test_out_of_range_items_are_rejected() {
    let service = create_test_service();
    seed(&service, device_order("o-1", r#"{"A":1}"#));

    for item in [
        add("y", "Caviar", 1e20, 1),
        add("y", "Bread", 2.0, 1_000_000_000),
        add("y", "Bread", -2.0, 1),
        add("y", "Bread", f64::NAN, 1),
    ] {
        let err = service
            .propose_amendment(TENANT, "o-1", vec![item])
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidPayload(_)));
    }
    let order = service.get_order(TENANT, "o-1").unwrap();
    assert!(!order.has_pending_amendment());

    let err = service
        .respond_amendment(
            TENANT,
            "o-1",
            AmendmentResponseRequest {
                approve: true,
                updated_items_json: Some(
                    r#"[{"id":"p1","name":"Pizza","price":1e20,"qty":1000000000}]"#.into(),
                ),
                updated_total: None,
            },
            "chef-1",
        )
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidPayload(_)));
    assert_eq!(service.get_order(TENANT, "o-1").unwrap().total_amount, 19.0);
}
