use chrono::Duration;
use log::*;
use market_engine::{events::EventProducers, traits::OverdueDelivery, OrderFlowApi, SettlementConfig, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the overdue delivery worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval`, shipped orders that have been on the road for longer than `max_age` are flagged, and the admins
/// are told about them.
pub fn start_overdue_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    settlement: SettlementConfig,
    max_age: Duration,
    interval: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = OrderFlowApi::new(db, producers, settlement);
        info!("🕰️ Overdue delivery worker started. Checking every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            info!("🕰️ Running overdue delivery job");
            match api.flag_overdue_deliveries(max_age).await {
                Ok(overdue) if overdue.is_empty() => info!("🕰️ No overdue deliveries"),
                Ok(overdue) => {
                    warn!("🕰️ {} deliveries are overdue", overdue.len());
                    debug!("🕰️ Overdue deliveries: {}", overdue_list(&overdue));
                },
                Err(e) => {
                    error!("🕰️ Error running overdue delivery job: {e}");
                },
            }
        }
    })
}

fn overdue_list(overdue: &[OverdueDelivery]) -> String {
    overdue
        .iter()
        .map(|o| {
            let agent = o.order.delivery_agent_id.map(|id| format!("#{id}")).unwrap_or_else(|| "none".into());
            format!("[{}] {} days overdue, agent: {agent}", o.order.order_id, o.days_overdue)
        })
        .collect::<Vec<String>>()
        .join(", ")
}
