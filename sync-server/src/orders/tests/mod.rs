use super::*;
use crate::notify::NotificationHub;
use crate::notify::NotificationFanout;
use crate::store::OrderStore;
use shared::message::{Notification, Role};
use shared::order::{LineItem, Order, OrderSnapshotDto, OrderStatus, SyncStatus, parse_table_ids};

const TENANT: &str = "tenant-1";

fn create_test_service() -> OrderService {
    let store = OrderStore::open_in_memory().unwrap();
    let fanout = NotificationFanout::new(store.clone(), NotificationHub::new(64));
    OrderService::new(store, fanout, "server")
}

/// A device-side order at tables 3 and 4 with two pizzas (19.00)
fn device_order(order_id: &str, clock: &str) -> OrderSnapshotDto {
    let mut order = Order::new(order_id, TENANT);
    order.table_ids = parse_table_ids("3,4");
    order.customer_name = "Ada".to_string();
    order.staff_id = Some("waiter-1".to_string());
    order.items = vec![LineItem::new("p1", "Pizza", 9.5, 2)];
    order.recompute_totals();

    let mut dto = order.to_snapshot();
    dto.vector_clock = clock.to_string();
    dto
}

fn with_status(mut dto: OrderSnapshotDto, status: OrderStatus) -> OrderSnapshotDto {
    dto.status = status.to_string();
    dto.workflow_status = Some(status.to_string());
    dto
}

/// Insert through the sync path and return the stored order
fn seed(service: &OrderService, dto: OrderSnapshotDto) -> Order {
    let order_id = dto.order_id.clone();
    let results = service.reconcile(TENANT, vec![dto]).unwrap();
    assert_eq!(results[0].status, SyncStatus::Inserted);
    service.store().get_order(&order_id).unwrap().unwrap()
}

fn notifications(service: &OrderService) -> Vec<Notification> {
    service.store().notifications_for(TENANT, None).unwrap()
}

fn notifications_titled(service: &OrderService, title: &str) -> Vec<Notification> {
    notifications(service)
        .into_iter()
        .filter(|n| n.title == title)
        .collect()
}

fn roles_of(rows: &[Notification]) -> Vec<Role> {
    rows.iter().map(|n| n.target_role).collect()
}

mod test_amendment;
