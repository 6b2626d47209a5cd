//! BLE client for the environmental sensor peripheral.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use btleplug::api::{
    Central, CharPropFlags, Characteristic, Manager as _, Peripheral as _, ScanFilter,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::time::timeout;
use uuid::Uuid;

use crate::protocol::{Reading, READING_UUID, SERVICE_UUID};

/// What the device advertised when it was found.
#[derive(Debug, Clone)]
pub struct Advertisement {
    pub local_name: Option<String>,
    pub services: Vec<Uuid>,
}

/// BLE client connected to the sensor.
pub struct SensorClient {
    peripheral: Peripheral,
    reading_char: Characteristic,
    advertisement: Advertisement,
    /// Readings received via notification, oldest first
    notifications: Arc<Mutex<Vec<Reading>>>,
}

impl SensorClient {
    /// Scan for a device by name and connect.
    pub async fn connect_by_name(name: &str, scan_timeout: Duration) -> Result<Self> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No Bluetooth adapters found"))?;

        // Start scanning
        adapter.start_scan(ScanFilter::default()).await?;

        // Wait for the device to appear
        let (peripheral, advertisement) =
            Self::find_device_by_name(&adapter, name, scan_timeout).await?;

        adapter.stop_scan().await?;

        // Connect to the device
        peripheral.connect().await?;

        // Discover services
        peripheral.discover_services().await?;

        let reading_char = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == READING_UUID && c.service_uuid == SERVICE_UUID)
            .ok_or_else(|| anyhow!("Sensor reading characteristic not found"))?;

        Ok(Self {
            peripheral,
            reading_char,
            advertisement,
            notifications: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Find a device by name within the scan timeout.
    async fn find_device_by_name(
        adapter: &Adapter,
        name: &str,
        scan_timeout: Duration,
    ) -> Result<(Peripheral, Advertisement)> {
        let start = std::time::Instant::now();

        while start.elapsed() < scan_timeout {
            let peripherals = adapter.peripherals().await?;

            for peripheral in peripherals {
                if let Some(props) = peripheral.properties().await? {
                    if props.local_name.as_deref() == Some(name) {
                        let advertisement = Advertisement {
                            local_name: props.local_name,
                            services: props.services,
                        };
                        return Ok((peripheral, advertisement));
                    }
                }
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Err(anyhow!("Device '{}' not found within timeout", name))
    }

    /// Advertisement data seen during the scan.
    pub fn advertisement(&self) -> &Advertisement {
        &self.advertisement
    }

    /// Properties declared by the reading characteristic.
    pub fn reading_properties(&self) -> CharPropFlags {
        self.reading_char.properties
    }

    /// Read the characteristic value directly.
    pub async fn read_reading(&self) -> Result<Reading> {
        let data = self.peripheral.read(&self.reading_char).await?;
        Reading::decode(&data)
    }

    /// Subscribe to notifications and collect them in the background.
    pub async fn subscribe(&self) -> Result<()> {
        self.peripheral.subscribe(&self.reading_char).await?;

        let buffer = self.notifications.clone();
        let mut stream = self.peripheral.notifications().await?;
        tokio::spawn(async move {
            while let Some(data) = stream.next().await {
                if data.uuid != READING_UUID {
                    continue;
                }
                if let Ok(reading) = Reading::decode(&data.value) {
                    buffer.lock().await.push(reading);
                }
            }
        });

        Ok(())
    }

    /// Number of notifications received so far.
    pub async fn notification_count(&self) -> usize {
        self.notifications.lock().await.len()
    }

    /// Wait until `count` further notifications have arrived, returning them.
    pub async fn wait_for_notifications(
        &self,
        count: usize,
        wait: Duration,
    ) -> Result<Vec<Reading>> {
        let already = self.notification_count().await;

        let result = timeout(wait, async {
            loop {
                {
                    let buf = self.notifications.lock().await;
                    if buf.len() >= already + count {
                        return buf[already..already + count].to_vec();
                    }
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;

        match result {
            Ok(readings) => Ok(readings),
            Err(_) => Err(anyhow!(
                "Timeout waiting for {} notifications (got {})",
                count,
                self.notification_count().await - already
            )),
        }
    }

    /// Disconnect from the device.
    pub async fn disconnect(&self) -> Result<()> {
        let _ = self.peripheral.unsubscribe(&self.reading_char).await;
        self.peripheral.disconnect().await?;
        Ok(())
    }
}
