use serde::{Deserialize, Serialize};

/// USB vendor id shared by all ODrive boards (pid.codes).
pub const ODRIVE_USB_VENDOR_ID: u16 = 0x1209;

/// Product ids used by ODrive firmware over the years.
pub const ODRIVE_USB_PRODUCT_IDS: &[u16] = &[0x0D31, 0x0D32, 0x0D33];

pub fn is_odrive_usb_id(vendor_id: u16, product_id: u16) -> bool {
    vendor_id == ODRIVE_USB_VENDOR_ID && ODRIVE_USB_PRODUCT_IDS.contains(&product_id)
}

/// Identity of a device found during discovery.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct DeviceInfo {
    /// OS path of the port, e.g. `/dev/ttyACM0` or `COM3`.
    pub port: String,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub vendor_id: Option<u16>,
    #[serde(default)]
    pub product_id: Option<u16>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
}

impl DeviceInfo {
    /// Attribute names readable from the shell, in display order.
    pub const ATTRIBUTES: &'static [&'static str] = &[
        "serial_number",
        "port",
        "vendor_id",
        "product_id",
        "manufacturer",
        "product",
    ];

    pub fn is_odrive(&self) -> bool {
        match (self.vendor_id, self.product_id) {
            (Some(vid), Some(pid)) => is_odrive_usb_id(vid, pid),
            _ => false,
        }
    }

    /// Serial number if the port reported one, otherwise the port path.
    /// Used to recognise a device when it comes back after a disconnect.
    pub fn identity(&self) -> &str {
        self.serial_number.as_deref().unwrap_or(&self.port)
    }

    /// Human readable label used in connect/disconnect messages.
    pub fn label(&self) -> String {
        match &self.serial_number {
            Some(serial) => serial.clone(),
            None => self.port.clone(),
        }
    }
}
