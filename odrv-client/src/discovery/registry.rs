use std::fmt;
use std::sync::{Mutex, PoisonError};

use odrv_shared::device::DeviceInfo;

use crate::shell::value::Value;
use crate::util::format::Tone;

/// A discovered device as seen from the shell, e.g. `odrv0`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceHandle {
    pub name: String,
    pub info: DeviceInfo,
}

impl DeviceHandle {
    /// Read one of [`DeviceInfo::ATTRIBUTES`].
    pub fn attribute(&self, attribute: &str) -> Option<Value> {
        let text = |v: &Option<String>| v.clone().map(Value::Str).unwrap_or(Value::None);
        let id = |v: Option<u16>| v.map(|n| Value::Int(n.into())).unwrap_or(Value::None);
        match attribute {
            "serial_number" => Some(text(&self.info.serial_number)),
            "port" => Some(Value::Str(self.info.port.clone())),
            "vendor_id" => Some(id(self.info.vendor_id)),
            "product_id" => Some(id(self.info.product_id)),
            "manufacturer" => Some(text(&self.info.manufacturer)),
            "product" => Some(text(&self.info.product)),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<device {} on {}", self.name, self.info.port)?;
        if let Some(serial) = &self.info.serial_number {
            write!(f, ", serial {serial}")?;
        }
        write!(f, ">")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Connected(DeviceHandle),
    Reconnected(DeviceHandle),
    Lost(DeviceHandle),
}

impl DeviceEvent {
    pub fn handle(&self) -> &DeviceHandle {
        match self {
            DeviceEvent::Connected(h) | DeviceEvent::Reconnected(h) | DeviceEvent::Lost(h) => h,
        }
    }

    pub fn message(&self, branding_long: &str) -> String {
        let h = self.handle();
        match self {
            DeviceEvent::Connected(_) => {
                format!("Connected to {branding_long} {} as {}", h.info.label(), h.name)
            }
            DeviceEvent::Reconnected(_) => {
                format!("Reconnected to {branding_long} {} as {}", h.info.label(), h.name)
            }
            DeviceEvent::Lost(_) => format!("Oh no {} disappeared", h.name),
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            DeviceEvent::Connected(_) | DeviceEvent::Reconnected(_) => Tone::Good,
            DeviceEvent::Lost(_) => Tone::Bad,
        }
    }
}

struct Slot {
    handle: DeviceHandle,
    connected: bool,
}

/// Names handed out to discovered devices.
///
/// Names are sequential (`odrv0`, `odrv1`, ...) and never reused: a device
/// that comes back gets the name it had before.
pub struct DeviceRegistry {
    branding_short: String,
    slots: Mutex<Vec<Slot>>,
}

impl DeviceRegistry {
    pub fn new(branding_short: &str) -> Self {
        Self {
            branding_short: branding_short.to_string(),
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Reconcile with the devices present right now and report what changed.
    pub fn update(&self, present: Vec<DeviceInfo>) -> Vec<DeviceEvent> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let mut events = Vec::new();
        let mut seen: Vec<String> = Vec::new();

        for info in present {
            let identity = info.identity().to_string();
            if seen.contains(&identity) {
                continue;
            }
            seen.push(identity.clone());

            match slots.iter_mut().find(|s| s.handle.info.identity() == identity) {
                Some(slot) => {
                    slot.handle.info = info;
                    if !slot.connected {
                        slot.connected = true;
                        events.push(DeviceEvent::Reconnected(slot.handle.clone()));
                    }
                }
                None => {
                    let handle = DeviceHandle {
                        name: format!("{}{}", self.branding_short, slots.len()),
                        info,
                    };
                    events.push(DeviceEvent::Connected(handle.clone()));
                    slots.push(Slot {
                        handle,
                        connected: true,
                    });
                }
            }
        }

        for slot in slots.iter_mut().filter(|s| s.connected) {
            if !seen.iter().any(|id| id == slot.handle.info.identity()) {
                slot.connected = false;
                events.push(DeviceEvent::Lost(slot.handle.clone()));
            }
        }

        events
    }

    pub fn connected(&self) -> Vec<DeviceHandle> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .iter()
            .filter(|s| s.connected)
            .map(|s| s.handle.clone())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<DeviceHandle> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .iter()
            .find(|s| s.connected && s.handle.name == name)
            .map(|s| s.handle.clone())
    }

    /// True if `name` was ever handed out, connected or not.
    pub fn is_device_name(&self, name: &str) -> bool {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.iter().any(|s| s.handle.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.connected().into_iter().map(|h| h.name).collect()
    }

    pub fn has_devices(&self) -> bool {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.iter().any(|s| s.connected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(serial: &str, port: &str) -> DeviceInfo {
        DeviceInfo {
            port: port.to_string(),
            serial_number: Some(serial.to_string()),
            vendor_id: Some(0x1209),
            product_id: Some(0x0d32),
            ..Default::default()
        }
    }

    #[test]
    fn test_sequential_names() {
        let registry = DeviceRegistry::new("odrv");
        let events = registry.update(vec![info("A", "/dev/ttyACM0"), info("B", "/dev/ttyACM1")]);

        let names: Vec<&str> = events.iter().map(|e| e.handle().name.as_str()).collect();
        assert_eq!(names, vec!["odrv0", "odrv1"]);
        assert!(matches!(events[0], DeviceEvent::Connected(_)));
        assert!(registry.has_devices());
        assert_eq!(registry.names(), vec!["odrv0", "odrv1"]);
    }

    #[test]
    fn test_steady_state_reports_nothing() {
        let registry = DeviceRegistry::new("odrv");
        registry.update(vec![info("A", "/dev/ttyACM0")]);
        assert!(registry.update(vec![info("A", "/dev/ttyACM0")]).is_empty());
    }

    #[test]
    fn test_duplicate_ports_of_one_device_count_once() {
        let registry = DeviceRegistry::new("odrv");
        let events = registry.update(vec![info("A", "/dev/ttyACM0"), info("A", "/dev/ttyACM1")]);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_lost_and_reconnected_keeps_name() {
        let registry = DeviceRegistry::new("odrv");
        registry.update(vec![info("A", "/dev/ttyACM0"), info("B", "/dev/ttyACM1")]);

        let events = registry.update(vec![info("B", "/dev/ttyACM1")]);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], DeviceEvent::Lost(h) if h.name == "odrv0"));
        assert!(registry.get("odrv0").is_none());
        assert!(registry.is_device_name("odrv0"));

        // comes back on a different port
        let events = registry.update(vec![info("B", "/dev/ttyACM1"), info("A", "/dev/ttyACM2")]);
        assert_eq!(events.len(), 1);
        match &events[0] {
            DeviceEvent::Reconnected(h) => {
                assert_eq!(h.name, "odrv0");
                assert_eq!(h.info.port, "/dev/ttyACM2");
            }
            other => panic!("unexpected event {other:?}"),
        }

        // a new device continues the sequence
        let events = registry.update(vec![
            info("A", "/dev/ttyACM2"),
            info("B", "/dev/ttyACM1"),
            info("C", "/dev/ttyACM3"),
        ]);
        assert_eq!(events[0].handle().name, "odrv2");
    }

    #[test]
    fn test_messages() {
        let handle = DeviceHandle {
            name: "odrv0".to_string(),
            info: info("2061377C3548", "/dev/ttyACM0"),
        };
        assert_eq!(
            DeviceEvent::Connected(handle.clone()).message("ODrive"),
            "Connected to ODrive 2061377C3548 as odrv0"
        );
        assert_eq!(DeviceEvent::Lost(handle.clone()).tone(), Tone::Bad);
        assert_eq!(
            handle.attribute("vendor_id"),
            Some(Value::Int(0x1209))
        );
        assert_eq!(handle.attribute("manufacturer"), Some(Value::None));
        assert_eq!(handle.attribute("axis0"), None);
    }
}
