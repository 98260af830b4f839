use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::PaystackConfig,
    data_objects::PaystackResponse,
    signature,
    InitializeTransactionRequest,
    InitializedTransaction,
    PaystackApiError,
    TransactionDetails,
};

#[derive(Clone)]
pub struct PaystackApi {
    config: PaystackConfig,
    client: Arc<Client>,
}

impl PaystackApi {
    pub fn new(config: PaystackConfig) -> Result<Self, PaystackApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let mut val = HeaderValue::from_str(&bearer).map_err(|e| PaystackApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaystackApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &PaystackConfig {
        &self.config
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, PaystackApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            let envelope = response.json::<PaystackResponse<T>>().await?;
            if !envelope.status {
                return Err(PaystackApiError::Unsuccessful(envelope.message));
            }
            envelope.data.ok_or_else(|| PaystackApiError::JsonError("Response contained no data".to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await?;
            Err(PaystackApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Creates a transaction on Paystack and returns the URL the customer must be redirected to.
    pub async fn initialize_transaction(
        &self,
        mut request: InitializeTransactionRequest,
    ) -> Result<InitializedTransaction, PaystackApiError> {
        if request.callback_url.is_none() {
            request.callback_url.clone_from(&self.config.callback_url);
        }
        debug!("Initializing transaction {} for {}", request.reference, request.amount);
        let result = self
            .rest_query::<InitializedTransaction, _>(Method::POST, "/transaction/initialize", Some(request))
            .await?;
        info!("Initialized transaction {}", result.reference);
        Ok(result)
    }

    pub async fn verify_transaction(&self, reference: &str) -> Result<TransactionDetails, PaystackApiError> {
        let path = format!("/transaction/verify/{reference}");
        debug!("Verifying transaction {reference}");
        let result = self.rest_query::<TransactionDetails, ()>(Method::GET, &path, None).await?;
        info!("Transaction {reference} has status '{}' on Paystack", result.status);
        Ok(result)
    }

    pub fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> bool {
        signature::verify_signature(self.config.secret_key.reveal(), body, signature)
    }
}
