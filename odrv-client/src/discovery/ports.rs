use anyhow::{Context, Result};
use odrv_shared::device::DeviceInfo;
use tokio_serial::{SerialPortInfo, SerialPortType};

/// Something that can list the ports currently present on the machine.
pub trait PortSource: Send + Sync {
    fn scan(&self) -> Result<Vec<DeviceInfo>>;
}

/// Ports as reported by the operating system.
pub struct SystemPorts;

impl PortSource for SystemPorts {
    fn scan(&self) -> Result<Vec<DeviceInfo>> {
        let ports = tokio_serial::available_ports().context("Failed to enumerate serial ports")?;
        Ok(ports.into_iter().map(port_to_info).collect())
    }
}

fn port_to_info(port: SerialPortInfo) -> DeviceInfo {
    match port.port_type {
        SerialPortType::UsbPort(usb) => DeviceInfo {
            port: port.port_name,
            serial_number: usb.serial_number,
            vendor_id: Some(usb.vid),
            product_id: Some(usb.pid),
            manufacturer: usb.manufacturer,
            product: usb.product,
        },
        _ => DeviceInfo {
            port: port.port_name,
            ..Default::default()
        },
    }
}

/// Fixed, mutable port list for tests.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct StaticPorts(pub std::sync::Mutex<Vec<DeviceInfo>>);

#[cfg(test)]
impl StaticPorts {
    pub(crate) fn new(ports: Vec<DeviceInfo>) -> Self {
        Self(std::sync::Mutex::new(ports))
    }

    pub(crate) fn set(&self, ports: Vec<DeviceInfo>) {
        *self.0.lock().unwrap() = ports;
    }
}

#[cfg(test)]
impl PortSource for StaticPorts {
    fn scan(&self) -> Result<Vec<DeviceInfo>> {
        Ok(self.0.lock().unwrap().clone())
    }
}
