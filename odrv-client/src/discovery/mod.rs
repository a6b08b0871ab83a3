//! Finding devices on the local machine.
//!
//! Discovery only enumerates ports and hands out names; it never opens a
//! port or talks to the firmware.

pub mod path_spec;
pub mod ports;
pub mod registry;

use std::sync::Arc;

use anyhow::{Context, Result};
use odrv_shared::device::DeviceInfo;
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use path_spec::PathSpec;
use ports::PortSource;
use registry::{DeviceEvent, DeviceRegistry};

pub struct Discovery {
    source: Arc<dyn PortSource>,
    specs: Vec<PathSpec>,
    serial_number: Option<String>,
}

impl Discovery {
    pub fn new(
        source: Arc<dyn PortSource>,
        specs: Vec<PathSpec>,
        serial_number: Option<String>,
    ) -> Self {
        Self {
            source,
            specs,
            serial_number,
        }
    }

    fn accepts(&self, info: &DeviceInfo) -> bool {
        let serial_ok = match &self.serial_number {
            Some(wanted) => info
                .serial_number
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(wanted)),
            None => true,
        };
        serial_ok && self.specs.iter().any(|spec| spec.matches(info))
    }

    /// One blocking scan, filtered by path and serial number.
    pub fn scan(&self) -> Result<Vec<DeviceInfo>> {
        let ports = self.source.scan()?;
        Ok(ports.into_iter().filter(|p| self.accepts(p)).collect())
    }

    async fn scan_async(&self) -> Result<Vec<DeviceInfo>> {
        let source = self.source.clone();
        let ports = tokio::task::spawn_blocking(move || source.scan())
            .await
            .context("Port scan task failed")??;
        Ok(ports.into_iter().filter(|p| self.accepts(p)).collect())
    }

    /// Poll for devices until `token` is cancelled, feeding `registry` and
    /// forwarding every change on `events`.
    pub async fn watch(
        self,
        registry: Arc<DeviceRegistry>,
        interval: Duration,
        events: mpsc::UnboundedSender<DeviceEvent>,
        token: CancellationToken,
    ) {
        let paths: Vec<String> = self.specs.iter().map(ToString::to_string).collect();
        debug!("Watching for devices on {}", paths.join(", "));

        loop {
            match self.scan_async().await {
                Ok(found) => {
                    for event in registry.update(found) {
                        let handle = event.handle();
                        match &event {
                            DeviceEvent::Lost(_) => warn!(device = %handle.name, "device lost"),
                            _ => info!(device = %handle.name, port = %handle.info.port, "device found"),
                        }
                        if events.send(event).is_err() {
                            debug!("event receiver dropped");
                        }
                    }
                }
                Err(e) => warn!("Device scan failed: {e:#}"),
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = sleep(interval) => {}
            }
        }

        debug!("Device discovery stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ports::StaticPorts;

    fn port(serial: &str, vid: u16, pid: u16, name: &str) -> DeviceInfo {
        DeviceInfo {
            port: name.to_string(),
            serial_number: Some(serial.to_string()),
            vendor_id: Some(vid),
            product_id: Some(pid),
            ..Default::default()
        }
    }

    fn usb() -> Vec<PathSpec> {
        path_spec::parse_path("usb").unwrap()
    }

    #[test]
    fn test_scan_filters_by_path() {
        let source = Arc::new(StaticPorts::new(vec![
            port("A", 0x1209, 0x0d32, "/dev/ttyACM0"),
            port("F", 0x0403, 0x6001, "/dev/ttyUSB0"),
        ]));
        let discovery = Discovery::new(source, usb(), None);
        let found = discovery.scan().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].port, "/dev/ttyACM0");
    }

    #[test]
    fn test_scan_filters_by_serial_number() {
        let source = Arc::new(StaticPorts::new(vec![
            port("206a", 0x1209, 0x0d32, "/dev/ttyACM0"),
            port("3057", 0x1209, 0x0d32, "/dev/ttyACM1"),
        ]));
        let discovery = Discovery::new(source, usb(), Some("206A".to_string()));
        let found = discovery.scan().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].port, "/dev/ttyACM0");
    }

    #[tokio::test]
    async fn test_watch_reports_and_stops_on_cancel() {
        let source = Arc::new(StaticPorts::new(vec![port(
            "A",
            0x1209,
            0x0d32,
            "/dev/ttyACM0",
        )]));
        let registry = Arc::new(DeviceRegistry::new("odrv"));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();

        let discovery = Discovery::new(source.clone(), usb(), None);
        let task = tokio::spawn(discovery.watch(
            registry.clone(),
            Duration::from_millis(10),
            tx,
            token.clone(),
        ));

        let first = rx.recv().await.unwrap();
        assert!(matches!(&first, DeviceEvent::Connected(h) if h.name == "odrv0"));

        source.set(Vec::new());
        let second = rx.recv().await.unwrap();
        assert!(matches!(&second, DeviceEvent::Lost(h) if h.name == "odrv0"));

        token.cancel();
        task.await.unwrap();
        assert!(!registry.has_devices());
    }
}
