use std::sync::{Arc, atomic::Ordering};

use field_booking::{
    dto::{orders::CreateOrderRequest, payments::WebhookRequest},
    events::{BusMessage, ChannelBus, ChannelReceiver, Delivery, EventPublisher, SettlementConsumer},
    models::{FieldStatus, OrderStatus},
    repositories::orders,
    server::settlement_consumer,
    services::{
        order_service,
        payment_service::{self, InProcessPayments},
    },
    state::OrderState,
};
use uuid::Uuid;

mod common;

use common::{FakeFields, PaymentHarness, schedule};

struct Booking {
    payment: PaymentHarness,
    fields: Arc<FakeFields>,
    state: OrderState,
    order_id: Uuid,
    slots: Vec<Uuid>,
}

async fn booked_order() -> Booking {
    let a = schedule("Lapangan A", 100.0, FieldStatus::Available);
    let b = schedule("Lapangan B", 150.0, FieldStatus::Available);
    let fields = FakeFields::with(vec![a.clone(), b.clone()]);
    let payment = common::payment_harness().await;
    let state = common::order_state(
        fields.clone(),
        Arc::new(InProcessPayments::new(payment.state.clone())),
    )
    .await;
    let order = order_service::create_order(
        &state,
        &common::user(),
        CreateOrderRequest {
            field_schedule_ids: vec![a.uuid, b.uuid],
        },
    )
    .await
    .expect("order created")
    .data
    .expect("order");
    Booking {
        payment,
        fields,
        state,
        order_id: order.uuid,
        slots: vec![a.uuid, b.uuid],
    }
}

async fn gateway_callback(booking: &mut Booking, status: &str) -> BusMessage {
    payment_service::handle_webhook(
        &booking.payment.state,
        WebhookRequest {
            order_id: booking.order_id,
            transaction_id: "trx-1".into(),
            transaction_status: status.into(),
            payment_type: "bank_transfer".into(),
            va_numbers: vec![],
            acquirer: Some("gopay".into()),
        },
    )
    .await
    .expect("webhook applied");
    booking.payment.events.try_recv().expect("settlement event")
}

fn order_consumer(state: &OrderState, max_retry: usize) -> (SettlementConsumer, ChannelReceiver) {
    let (parking, parked) = ChannelBus::new(16);
    let parking: Arc<dyn EventPublisher> = Arc::new(parking);
    (
        settlement_consumer(state.clone(), parking, &common::broker_config(max_retry)),
        parked,
    )
}

#[tokio::test]
async fn settlement_marks_order_paid_and_books_slots_once() -> anyhow::Result<()> {
    let mut booking = booked_order().await;
    let message = gateway_callback(&mut booking, "settlement").await;
    let (consumer, mut parked) = order_consumer(&booking.state, 3);

    assert_eq!(consumer.process(&message.key, &message.payload).await?, Delivery::Handled);

    let order = orders::find_by_uuid(&booking.state.orm, booking.order_id)
        .await?
        .expect("order");
    assert_eq!(order.status, OrderStatus::PaymentSuccess);
    assert!(order.is_paid);
    assert!(order.paid_at.is_some());
    assert_eq!(
        orders::history(&booking.state.orm, order.id).await?,
        vec!["pending", "payment-success"]
    );
    assert_eq!(booking.fields.booked_calls(), vec![booking.slots.clone()]);

    // Redelivery changes nothing.
    assert_eq!(consumer.process(&message.key, &message.payload).await?, Delivery::Handled);
    let again = orders::find_by_uuid(&booking.state.orm, booking.order_id)
        .await?
        .expect("order");
    assert_eq!(again, order);
    assert_eq!(
        orders::history(&booking.state.orm, order.id).await?,
        vec!["pending", "payment-success"]
    );
    assert_eq!(booking.fields.booked_calls().len(), 1);
    assert!(parked.try_recv().is_none());
    Ok(())
}

#[tokio::test]
async fn pending_then_settlement_walks_every_status() -> anyhow::Result<()> {
    let mut booking = booked_order().await;
    let pending = gateway_callback(&mut booking, "pending").await;
    let settled = gateway_callback(&mut booking, "settlement").await;
    let (consumer, _parked) = order_consumer(&booking.state, 3);

    consumer.process(&pending.key, &pending.payload).await?;
    let order = orders::find_by_uuid(&booking.state.orm, booking.order_id)
        .await?
        .expect("order");
    assert_eq!(order.status, OrderStatus::PendingPayment);
    assert!(!order.is_paid);
    assert!(booking.fields.booked_calls().is_empty());

    consumer.process(&settled.key, &settled.payload).await?;
    // A late pending event must not move the order back.
    consumer.process(&pending.key, &pending.payload).await?;

    let order = orders::find_by_uuid(&booking.state.orm, booking.order_id)
        .await?
        .expect("order");
    assert_eq!(order.status, OrderStatus::PaymentSuccess);
    assert_eq!(
        orders::history(&booking.state.orm, order.id).await?,
        vec!["pending", "pending-payment", "payment-success"]
    );
    assert_eq!(booking.fields.booked_calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn expired_payment_never_books_slots() -> anyhow::Result<()> {
    let mut booking = booked_order().await;
    let expired = gateway_callback(&mut booking, "expire").await;
    let (consumer, _parked) = order_consumer(&booking.state, 3);

    assert_eq!(consumer.process(&expired.key, &expired.payload).await?, Delivery::Handled);

    let order = orders::find_by_uuid(&booking.state.orm, booking.order_id)
        .await?
        .expect("order");
    assert_eq!(order.status, OrderStatus::Expired);
    assert!(!order.is_paid);
    assert_eq!(order.paid_at, None);
    assert!(booking.fields.booked_calls().is_empty());
    assert_eq!(
        orders::history(&booking.state.orm, order.id).await?,
        vec!["pending", "expired"]
    );
    Ok(())
}

#[tokio::test]
async fn failed_booking_rolls_back_and_parks_the_event() -> anyhow::Result<()> {
    let mut booking = booked_order().await;
    let message = gateway_callback(&mut booking, "settlement").await;
    let (consumer, mut parked) = order_consumer(&booking.state, 2);
    booking.fields.fail_booking.store(true, Ordering::SeqCst);

    assert_eq!(consumer.process(&message.key, &message.payload).await?, Delivery::Parked);

    let order = orders::find_by_uuid(&booking.state.orm, booking.order_id)
        .await?
        .expect("order");
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(!order.is_paid);
    assert_eq!(orders::history(&booking.state.orm, order.id).await?, vec!["pending"]);

    let parked_message = parked.try_recv().expect("parked");
    assert_eq!(parked_message.topic, format!("{}.parked", common::TOPIC));
    assert_eq!(parked_message.payload, message.payload);

    // Replaying the parked event once the field service is back settles it.
    booking.fields.fail_booking.store(false, Ordering::SeqCst);
    assert_eq!(
        consumer.process(&parked_message.key, &parked_message.payload).await?,
        Delivery::Handled
    );
    let order = orders::find_by_uuid(&booking.state.orm, booking.order_id)
        .await?
        .expect("order");
    assert_eq!(order.status, OrderStatus::PaymentSuccess);
    assert_eq!(booking.fields.booked_calls(), vec![booking.slots.clone()]);
    Ok(())
}

#[tokio::test]
async fn malformed_and_unknown_events_do_not_block_the_stream() -> anyhow::Result<()> {
    let mut booking = booked_order().await;
    let message = gateway_callback(&mut booking, "settlement").await;
    let (consumer, mut parked) = order_consumer(&booking.state, 3);

    assert_eq!(consumer.process("k", b"{\"event\":").await?, Delivery::Dropped);
    assert!(parked.try_recv().is_none());

    // Same event for an order this service never created.
    let foreign = String::from_utf8(message.payload.clone())?
        .replace(&booking.order_id.to_string(), &Uuid::new_v4().to_string());
    assert_eq!(consumer.process("k", foreign.as_bytes()).await?, Delivery::Parked);
    assert!(parked.try_recv().is_some());

    assert_eq!(consumer.process(&message.key, &message.payload).await?, Delivery::Handled);
    Ok(())
}

#[tokio::test]
async fn channel_bus_delivers_published_events_to_the_consumer() -> anyhow::Result<()> {
    let mut booking = booked_order().await;
    let message = gateway_callback(&mut booking, "settlement").await;
    let (consumer, _parked) = order_consumer(&booking.state, 3);

    let (bus, receiver) = ChannelBus::new(8);
    bus.publish("unrelated-topic", "k", b"ignored").await?;
    bus.publish(&message.topic, &message.key, &message.payload).await?;
    drop(bus);
    receiver.run(common::TOPIC, consumer).await;

    let order = orders::find_by_uuid(&booking.state.orm, booking.order_id)
        .await?
        .expect("order");
    assert_eq!(order.status, OrderStatus::PaymentSuccess);
    assert_eq!(booking.fields.booked_calls().len(), 1);
    Ok(())
}
