//! Parsing of `--path` device filters.
//!
//! Grammar: comma separated entries, each `usb`, `usb:<filter>`, `serial`
//! or `serial:<port>`. USB filters are `idVendor=<n>` / `idProduct=<n>`;
//! further filters of the same USB entry may follow as their own comma
//! separated items, e.g. `usb:idVendor=0x1209,idProduct=0x0d32`.

use std::fmt;

use odrv_shared::device::{DeviceInfo, ODRIVE_USB_VENDOR_ID};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSpec {
    Usb {
        vendor_id: Option<u16>,
        product_id: Option<u16>,
    },
    Serial {
        port: Option<String>,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathSpecError {
    #[error("empty device path")]
    Empty,
    #[error("unknown path kind '{0}', expected 'usb' or 'serial'")]
    UnknownKind(String),
    #[error("unknown usb filter '{0}', expected idVendor or idProduct")]
    UnknownUsbFilter(String),
    #[error("invalid number '{0}'")]
    BadNumber(String),
}

impl PathSpec {
    pub fn matches(&self, info: &DeviceInfo) -> bool {
        match self {
            PathSpec::Usb {
                vendor_id: None,
                product_id: None,
            } => info.is_odrive(),
            PathSpec::Usb {
                vendor_id,
                product_id,
            } => {
                let vid = vendor_id.unwrap_or(ODRIVE_USB_VENDOR_ID);
                info.vendor_id == Some(vid)
                    && product_id.is_none_or(|pid| info.product_id == Some(pid))
            }
            PathSpec::Serial { port: Some(port) } => &info.port == port,
            // USB-UART adapters wired to the device's UART pins
            PathSpec::Serial { port: None } => info.vendor_id.is_some() && !info.is_odrive(),
        }
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSpec::Usb {
                vendor_id,
                product_id,
            } => {
                write!(f, "usb")?;
                let mut sep = ':';
                if let Some(vid) = vendor_id {
                    write!(f, "{sep}idVendor={vid:#06x}")?;
                    sep = ',';
                }
                if let Some(pid) = product_id {
                    write!(f, "{sep}idProduct={pid:#06x}")?;
                }
                Ok(())
            }
            PathSpec::Serial { port: None } => write!(f, "serial"),
            PathSpec::Serial { port: Some(port) } => write!(f, "serial:{port}"),
        }
    }
}

pub fn parse_path(path: &str) -> Result<Vec<PathSpec>, PathSpecError> {
    let mut specs: Vec<PathSpec> = Vec::new();

    for item in path.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (kind, rest) = match item.split_once(':') {
            Some((kind, rest)) => (kind, Some(rest)),
            None => (item, None),
        };

        match kind {
            "usb" => {
                let mut spec = PathSpec::Usb {
                    vendor_id: None,
                    product_id: None,
                };
                if let Some(filter) = rest.filter(|r| !r.is_empty()) {
                    apply_usb_filter(&mut spec, filter)?;
                }
                specs.push(spec);
            }
            "serial" => specs.push(PathSpec::Serial {
                port: rest.filter(|r| !r.is_empty()).map(str::to_string),
            }),
            _ if item.contains('=') => match specs.last_mut() {
                Some(spec @ PathSpec::Usb { .. }) => apply_usb_filter(spec, item)?,
                _ => return Err(PathSpecError::UnknownKind(item.to_string())),
            },
            other => return Err(PathSpecError::UnknownKind(other.to_string())),
        }
    }

    if specs.is_empty() {
        return Err(PathSpecError::Empty);
    }
    Ok(specs)
}

fn apply_usb_filter(spec: &mut PathSpec, filter: &str) -> Result<(), PathSpecError> {
    let PathSpec::Usb {
        vendor_id,
        product_id,
    } = spec
    else {
        return Err(PathSpecError::UnknownUsbFilter(filter.to_string()));
    };

    let (key, value) = filter
        .split_once('=')
        .ok_or_else(|| PathSpecError::UnknownUsbFilter(filter.to_string()))?;
    let number = parse_u16(value.trim())?;
    match key.trim() {
        "idVendor" => *vendor_id = Some(number),
        "idProduct" => *product_id = Some(number),
        other => return Err(PathSpecError::UnknownUsbFilter(other.to_string())),
    }
    Ok(())
}

fn parse_u16(text: &str) -> Result<u16, PathSpecError> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => text.parse::<u16>(),
    };
    parsed.map_err(|_| PathSpecError::BadNumber(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usb_info(vid: u16, pid: u16, port: &str) -> DeviceInfo {
        DeviceInfo {
            port: port.to_string(),
            vendor_id: Some(vid),
            product_id: Some(pid),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_plain_kinds() {
        assert_eq!(
            parse_path("usb").unwrap(),
            vec![PathSpec::Usb {
                vendor_id: None,
                product_id: None
            }]
        );
        assert_eq!(
            parse_path("serial:/dev/ttyUSB0").unwrap(),
            vec![PathSpec::Serial {
                port: Some("/dev/ttyUSB0".to_string())
            }]
        );
    }

    #[test]
    fn test_parse_usb_filters_across_commas() {
        let specs = parse_path("usb:idVendor=0x1209,idProduct=0x0d32, serial").unwrap();
        assert_eq!(
            specs,
            vec![
                PathSpec::Usb {
                    vendor_id: Some(0x1209),
                    product_id: Some(0x0d32)
                },
                PathSpec::Serial { port: None },
            ]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_path("  ,"), Err(PathSpecError::Empty));
        assert_eq!(
            parse_path("bluetooth"),
            Err(PathSpecError::UnknownKind("bluetooth".to_string()))
        );
        assert_eq!(
            parse_path("usb:bus=1"),
            Err(PathSpecError::UnknownUsbFilter("bus".to_string()))
        );
        assert_eq!(
            parse_path("usb:idVendor=0xzz"),
            Err(PathSpecError::BadNumber("0xzz".to_string()))
        );
        assert_eq!(
            parse_path("serial,idProduct=1"),
            Err(PathSpecError::UnknownKind("idProduct=1".to_string()))
        );
    }

    #[test]
    fn test_usb_matches_known_ids_by_default() {
        let spec = PathSpec::Usb {
            vendor_id: None,
            product_id: None,
        };
        assert!(spec.matches(&usb_info(0x1209, 0x0d32, "/dev/ttyACM0")));
        assert!(!spec.matches(&usb_info(0x0403, 0x6001, "/dev/ttyUSB0")));
    }

    #[test]
    fn test_usb_product_filter() {
        let spec = parse_path("usb:idProduct=0x0d33").unwrap().remove(0);
        assert!(spec.matches(&usb_info(0x1209, 0x0d33, "a")));
        assert!(!spec.matches(&usb_info(0x1209, 0x0d32, "a")));
    }

    #[test]
    fn test_serial_matches() {
        let any = PathSpec::Serial { port: None };
        assert!(any.matches(&usb_info(0x0403, 0x6001, "/dev/ttyUSB0")));
        assert!(!any.matches(&usb_info(0x1209, 0x0d32, "/dev/ttyACM0")));

        let exact = PathSpec::Serial {
            port: Some("/dev/ttyS1".to_string()),
        };
        let builtin = DeviceInfo {
            port: "/dev/ttyS1".to_string(),
            ..Default::default()
        };
        assert!(exact.matches(&builtin));
        assert!(!any.matches(&builtin));
    }

    #[test]
    fn test_display_round_trips_through_parser() {
        for path in ["usb", "usb:idVendor=0x1209,idProduct=0x0d32", "serial:COM3"] {
            let spec = parse_path(path).unwrap().remove(0);
            assert_eq!(parse_path(&spec.to_string()).unwrap(), vec![spec]);
        }
    }
}
