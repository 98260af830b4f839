use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    OrderPaidEvent,
    OrderStatusChangedEvent,
    OverdueDeliveryEvent,
    RefundProcessedEvent,
    VendorCreditedEvent,
};

pub type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
    pub status_changed_producer: Vec<EventProducer<OrderStatusChangedEvent>>,
    pub vendor_credited_producer: Vec<EventProducer<VendorCreditedEvent>>,
    pub refund_processed_producer: Vec<EventProducer<RefundProcessedEvent>>,
    pub overdue_delivery_producer: Vec<EventProducer<OverdueDeliveryEvent>>,
}

impl EventProducers {
    pub async fn publish_order_paid(&self, event: OrderPaidEvent) {
        for producer in &self.order_paid_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_status_changed(&self, event: OrderStatusChangedEvent) {
        for producer in &self.status_changed_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_vendor_credited(&self, event: VendorCreditedEvent) {
        for producer in &self.vendor_credited_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_refund_processed(&self, event: RefundProcessedEvent) {
        for producer in &self.refund_processed_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_overdue_delivery(&self, event: OverdueDeliveryEvent) {
        for producer in &self.overdue_delivery_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_status_changed: Option<EventHandler<OrderStatusChangedEvent>>,
    pub on_vendor_credited: Option<EventHandler<VendorCreditedEvent>>,
    pub on_refund_processed: Option<EventHandler<RefundProcessedEvent>>,
    pub on_overdue_delivery: Option<EventHandler<OverdueDeliveryEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        Self {
            on_order_paid: hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f)),
            on_status_changed: hooks.on_status_changed.map(|f| EventHandler::new(buffer_size, f)),
            on_vendor_credited: hooks.on_vendor_credited.map(|f| EventHandler::new(buffer_size, f)),
            on_refund_processed: hooks.on_refund_processed.map(|f| EventHandler::new(buffer_size, f)),
            on_overdue_delivery: hooks.on_overdue_delivery.map(|f| EventHandler::new(buffer_size, f)),
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_status_changed {
            result.status_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_vendor_credited {
            result.vendor_credited_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_refund_processed {
            result.refund_processed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_overdue_delivery {
            result.overdue_delivery_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_paid {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_status_changed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_vendor_credited {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_refund_processed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_overdue_delivery {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_status_changed: Option<Handler<OrderStatusChangedEvent>>,
    pub on_vendor_credited: Option<Handler<VendorCreditedEvent>>,
    pub on_refund_processed: Option<Handler<RefundProcessedEvent>>,
    pub on_overdue_delivery: Option<Handler<OverdueDeliveryEvent>>,
}

impl EventHooks {
    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderStatusChangedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_status_changed = Some(Arc::new(f));
        self
    }

    pub fn on_vendor_credited<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(VendorCreditedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_vendor_credited = Some(Arc::new(f));
        self
    }

    pub fn on_refund_processed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(RefundProcessedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_refund_processed = Some(Arc::new(f));
        self
    }

    pub fn on_overdue_delivery<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OverdueDeliveryEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_overdue_delivery = Some(Arc::new(f));
        self
    }
}
