//! Scriptable data source shared by the client tests.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use shared::{
    domain::{MenuEntry, OrderId},
    protocol::{OrderRequest, OrderResult},
};

use crate::{
    error::{ClientError, Result},
    source::{mock_catalog, order_confirmation, MenuDataSource},
};

pub struct FakeMenuSource {
    pub list_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub submitted: Mutex<Vec<OrderRequest>>,
    list_failure: Mutex<Option<String>>,
    submit_failure: Mutex<Option<String>>,
    latency: Duration,
}

impl FakeMenuSource {
    pub fn new() -> Arc<Self> {
        Self::with_latency(Duration::from_millis(100))
    }

    pub fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            list_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
            list_failure: Mutex::new(None),
            submit_failure: Mutex::new(None),
            latency,
        })
    }

    pub fn fail_listing(&self, message: Option<&str>) {
        *self.list_failure.lock().expect("lock") = message.map(str::to_string);
    }

    pub fn fail_submission(&self, message: Option<&str>) {
        *self.submit_failure.lock().expect("lock") = message.map(str::to_string);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MenuDataSource for FakeMenuSource {
    async fn list_menus(&self) -> Result<Vec<MenuEntry>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        let failure = self.list_failure.lock().expect("lock").clone();
        match failure {
            Some(message) => Err(ClientError::Fetch(message)),
            None => Ok(mock_catalog()),
        }
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderResult> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.submitted.lock().expect("lock").push(request.clone());
        tokio::time::sleep(self.latency).await;
        let failure = self.submit_failure.lock().expect("lock").clone();
        match failure {
            Some(message) => Err(ClientError::Submit(message)),
            None => Ok(OrderResult {
                success: true,
                order_id: OrderId::new(format!("ORD-{n}")),
                message: order_confirmation(&request.items),
            }),
        }
    }
}
