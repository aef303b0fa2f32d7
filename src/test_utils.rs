#[cfg(test)]
pub mod test_helpers {
    use crate::db::{create_pool, init_schema};
    use crate::enrichment::{DescriptionEnricher, EnrichmentFailure};
    use crate::notifications::{DeviceEvent, EventSink};
    use async_trait::async_trait;
    use sqlx::SqlitePool;
    use std::sync::Mutex;
    use tempfile::TempDir;

    pub struct TestContext {
        pub pool: SqlitePool,
        pub _temp_dir: TempDir,
    }

    impl TestContext {
        pub async fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let db_path = temp_dir.path().join("devices.db");

            let pool = create_pool(&db_path).await.unwrap();
            init_schema(&pool).await.unwrap();

            Self {
                pool,
                _temp_dir: temp_dir,
            }
        }

        pub fn pool(&self) -> &SqlitePool {
            &self.pool
        }
    }

    /// Sink that remembers everything published to it.
    #[derive(Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<DeviceEvent>>,
    }

    impl RecordingSink {
        pub fn events(&self) -> Vec<DeviceEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn publish(&self, event: &DeviceEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    /// Enricher with a fixed answer.
    pub struct StaticEnricher(pub std::result::Result<String, EnrichmentFailure>);

    #[async_trait]
    impl DescriptionEnricher for StaticEnricher {
        async fn describe(
            &self,
            _name: &str,
            _mac: &str,
        ) -> std::result::Result<String, EnrichmentFailure> {
            self.0.clone()
        }
    }
}
