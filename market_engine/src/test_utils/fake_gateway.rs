//! A deterministic, in-process payment gateway.
//!
//! By default every initialized transaction verifies as a successful charge for exactly the amount and currency it
//! was initialized with. Tests can script failures and tampered verifications per reference.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
};

use crate::{
    db_types::Money,
    traits::{
        GatewayAuthorization,
        GatewayError,
        GatewayInitRequest,
        GatewayPaymentStatus,
        GatewayVerification,
        PaymentGateway,
    },
};

#[derive(Debug, Default)]
struct GatewayState {
    initialized: HashMap<String, GatewayInitRequest>,
    verifications: HashMap<String, GatewayVerification>,
    init_failure: Option<GatewayError>,
    verify_failure: Option<GatewayError>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<GatewayState>>,
    verify_calls: Arc<AtomicUsize>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent `initialize` call fails with `error`.
    pub fn fail_initialization(&self, error: GatewayError) {
        self.state.lock().expect("poisoned").init_failure = Some(error);
    }

    /// Every subsequent `verify` call fails with `error`.
    pub fn fail_verification(&self, error: GatewayError) {
        self.state.lock().expect("poisoned").verify_failure = Some(error);
    }

    pub fn heal(&self) {
        let mut state = self.state.lock().expect("poisoned");
        state.init_failure = None;
        state.verify_failure = None;
    }

    /// The gateway will report `amount` for `reference`, regardless of what was initialized.
    pub fn report_amount(&self, reference: &str, amount: Money) {
        self.script(reference, |v| v.amount = amount);
    }

    pub fn report_currency(&self, reference: &str, currency: &str) {
        self.script(reference, |v| v.currency = currency.to_string());
    }

    pub fn report_status(&self, reference: &str, status: GatewayPaymentStatus) {
        self.script(reference, |v| v.status = status);
    }

    pub fn initialized(&self, reference: &str) -> Option<GatewayInitRequest> {
        self.state.lock().expect("poisoned").initialized.get(reference).cloned()
    }

    pub fn initialized_count(&self) -> usize {
        self.state.lock().expect("poisoned").initialized.len()
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    fn script<F: FnOnce(&mut GatewayVerification)>(&self, reference: &str, f: F) {
        let mut state = self.state.lock().expect("poisoned");
        let mut verification = state
            .verifications
            .get(reference)
            .cloned()
            .or_else(|| state.initialized.get(reference).map(success_for))
            .unwrap_or_else(|| GatewayVerification {
                reference: reference.to_string(),
                status: GatewayPaymentStatus::Success,
                amount: Money::default(),
                currency: "NGN".to_string(),
                gateway_response: None,
            });
        f(&mut verification);
        state.verifications.insert(reference.to_string(), verification);
    }
}

fn success_for(request: &GatewayInitRequest) -> GatewayVerification {
    GatewayVerification {
        reference: request.reference.clone(),
        status: GatewayPaymentStatus::Success,
        amount: request.amount,
        currency: request.currency.clone(),
        gateway_response: Some("Approved".to_string()),
    }
}

impl PaymentGateway for FakeGateway {
    async fn initialize(&self, request: GatewayInitRequest) -> Result<GatewayAuthorization, GatewayError> {
        let mut state = self.state.lock().expect("poisoned");
        if let Some(e) = state.init_failure.clone() {
            return Err(e);
        }
        let reference = request.reference.clone();
        state.initialized.insert(reference.clone(), request);
        Ok(GatewayAuthorization {
            authorization_url: format!("https://checkout.test/{reference}"),
            access_code: Some(format!("access-{reference}")),
            reference,
        })
    }

    async fn verify(&self, reference: &str) -> Result<GatewayVerification, GatewayError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().expect("poisoned");
        if let Some(e) = state.verify_failure.clone() {
            return Err(e);
        }
        if let Some(v) = state.verifications.get(reference) {
            return Ok(v.clone());
        }
        state
            .initialized
            .get(reference)
            .map(success_for)
            .ok_or_else(|| GatewayError::Rejected(format!("Transaction reference not found: {reference}")))
    }
}
