use crate::db::models::{Device, DeviceStatus, NewDevice};
use crate::enrichment::{enrich, Description, DescriptionEnricher, DEFAULT_ENRICHMENT_TIMEOUT};
use crate::error::{RegistryError, Result};
use crate::notifications::{DeviceEvent, EventSink};
use crate::store::DeviceStore;
use crate::validation::CreateDevice;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Orchestrates device operations: uniqueness check, enrichment,
/// persistence and broadcast.
///
/// Inputs arrive already validated (see [`crate::validation`]). Persistence
/// always completes before the matching event is published.
pub struct DeviceService {
    store: Arc<dyn DeviceStore>,
    enricher: Arc<dyn DescriptionEnricher>,
    sink: Arc<dyn EventSink>,
    enrichment_timeout: Duration,
}

impl DeviceService {
    pub fn new(
        store: Arc<dyn DeviceStore>,
        enricher: Arc<dyn DescriptionEnricher>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            enricher,
            sink,
            enrichment_timeout: DEFAULT_ENRICHMENT_TIMEOUT,
        }
    }

    pub fn with_enrichment_timeout(mut self, timeout: Duration) -> Self {
        self.enrichment_timeout = timeout;
        self
    }

    /// Register a new device.
    ///
    /// Fails with [`RegistryError::DuplicateMac`] when the MAC is taken,
    /// either by the lookup here or by the store's unique constraint.
    pub async fn create(&self, input: CreateDevice) -> Result<Device> {
        let CreateDevice { name, mac } = input;

        if self.store.find_by_mac(mac.as_str()).await?.is_some() {
            return Err(RegistryError::DuplicateMac(mac.into_inner()));
        }

        let description = enrich(
            self.enricher.as_ref(),
            &name,
            mac.as_str(),
            self.enrichment_timeout,
        )
        .await;

        if let Description::Fallback { reason, .. } = &description {
            tracing::warn!(
                mac = %mac,
                reason = %reason,
                "Failed to generate device description, using fallback"
            );
        }

        let device = self
            .store
            .insert(NewDevice {
                name,
                mac: mac.into_inner(),
                status: DeviceStatus::Active,
                created_at: Utc::now(),
                description: Some(description.into_text()),
            })
            .await?;

        self.sink.publish(&DeviceEvent::Created(device.clone())).await;

        Ok(device)
    }

    pub async fn list(&self) -> Result<Vec<Device>> {
        self.store.list().await
    }

    /// Flip a device between ACTIVE and INACTIVE.
    pub async fn toggle_status(&self, id: i64) -> Result<Device> {
        let device = self.store.toggle_status(id).await?;

        tracing::debug!(
            device_id = id,
            from = %device.status.toggled(),
            to = %device.status,
            "Device status flipped"
        );

        self.sink
            .publish(&DeviceEvent::StatusChanged(device.clone()))
            .await;

        Ok(device)
    }
}
