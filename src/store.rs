use crate::db::models::{Device, NewDevice};
use crate::error::{RegistryError, Result};
use crate::sql_constants::{
    INSERT_DEVICE, SELECT_ALL_DEVICES, SELECT_DEVICE_BY_ID, SELECT_DEVICE_BY_MAC,
    TOGGLE_DEVICE_STATUS,
};
use async_trait::async_trait;
use sqlx::SqlitePool;

/// Persistent device table.
///
/// Implementations must enforce MAC uniqueness themselves and report a
/// violation as [`RegistryError::DuplicateMac`]; the service-level lookup
/// before insert is only there to produce an early, friendly error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn find_by_mac(&self, mac: &str) -> Result<Option<Device>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Device>>;

    async fn insert(&self, device: NewDevice) -> Result<Device>;

    /// All devices in store-native (ascending id) order.
    async fn list(&self) -> Result<Vec<Device>>;

    /// Flip the status atomically and return the updated record.
    ///
    /// Concurrent toggles of the same device must each take effect.
    async fn toggle_status(&self, id: i64) -> Result<Device>;
}

/// SQLite-backed [`DeviceStore`].
#[derive(Clone)]
pub struct SqliteDeviceStore {
    pool: SqlitePool,
}

impl SqliteDeviceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl DeviceStore for SqliteDeviceStore {
    async fn find_by_mac(&self, mac: &str) -> Result<Option<Device>> {
        let device = sqlx::query_as::<_, Device>(SELECT_DEVICE_BY_MAC)
            .bind(mac)
            .fetch_optional(&self.pool)
            .await?;
        Ok(device)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Device>> {
        let device = sqlx::query_as::<_, Device>(SELECT_DEVICE_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(device)
    }

    async fn insert(&self, device: NewDevice) -> Result<Device> {
        let result = sqlx::query(INSERT_DEVICE)
            .bind(&device.name)
            .bind(&device.mac)
            .bind(device.status)
            .bind(device.created_at)
            .bind(&device.description)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    RegistryError::DuplicateMac(device.mac.clone())
                },
                other => RegistryError::DatabaseError(other),
            })?;

        Ok(Device {
            id: result.last_insert_rowid(),
            name: device.name,
            mac: device.mac,
            status: device.status,
            created_at: device.created_at,
            description: device.description,
        })
    }

    async fn list(&self) -> Result<Vec<Device>> {
        let devices = sqlx::query_as::<_, Device>(SELECT_ALL_DEVICES)
            .fetch_all(&self.pool)
            .await?;
        Ok(devices)
    }

    async fn toggle_status(&self, id: i64) -> Result<Device> {
        sqlx::query_as::<_, Device>(TOGGLE_DEVICE_STATUS)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RegistryError::DeviceNotFound(id))
    }
}
