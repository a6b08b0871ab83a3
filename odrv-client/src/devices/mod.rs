use std::sync::Arc;

use anyhow::{Context, Result};
use odrv_shared::device::DeviceInfo;

use crate::discovery::Discovery;
use crate::discovery::path_spec::parse_path;
use crate::discovery::ports::PortSource;
use crate::discovery::registry::DeviceRegistry;
use crate::shell::{BRANDING_SHORT, ShellArgs};
use crate::util::format::{bold, cyan, dim, green, pad_cell};

/// One scan for devices matching `args`, without starting a shell.
pub async fn list_devices(source: Arc<dyn PortSource>, args: &ShellArgs) -> Result<Vec<DeviceInfo>> {
    let specs =
        parse_path(&args.path).with_context(|| format!("Invalid device path '{}'", args.path))?;
    let discovery = Discovery::new(source, specs, args.serial_number.clone());
    tokio::task::spawn_blocking(move || discovery.scan())
        .await
        .context("Port scan task failed")?
}

fn usb_id(info: &DeviceInfo) -> String {
    match (info.vendor_id, info.product_id) {
        (Some(vid), Some(pid)) => format!("{vid:04x}:{pid:04x}"),
        _ => "-".to_string(),
    }
}

/// Table rows, named the way the shell would name them.
///
/// Ports reporting the same serial number are one device and share a row.
pub fn format_devices_table(devices: &[DeviceInfo]) -> Vec<String> {
    let registry = DeviceRegistry::new(BRANDING_SHORT);
    registry.update(devices.to_vec());
    let handles = registry.connected();
    if handles.is_empty() {
        return vec![dim("No devices found")];
    }

    const WIDTH_NAME: usize = 8;
    const WIDTH_SERIAL: usize = 16;
    const WIDTH_PORT: usize = 16;
    const WIDTH_USB: usize = 11;

    let row = |name: &str, serial: &str, port: &str, usb: &str, product: &str| {
        format!(
            "  {} {} {} {} {}",
            pad_cell(name, WIDTH_NAME),
            pad_cell(serial, WIDTH_SERIAL),
            pad_cell(port, WIDTH_PORT),
            pad_cell(usb, WIDTH_USB),
            product
        )
    };

    let mut lines = vec![bold("Devices")];
    lines.push(row(
        &dim("NAME"),
        &dim("SERIAL"),
        &dim("PORT"),
        &dim("USB ID"),
        &dim("PRODUCT"),
    ));

    for handle in &handles {
        let dev = &handle.info;
        let usb = usb_id(dev);
        let usb = if dev.is_odrive() { green(&usb) } else { usb };
        lines.push(row(
            &cyan(&handle.name),
            dev.serial_number.as_deref().unwrap_or("-"),
            &dev.port,
            &usb,
            dev.product.as_deref().unwrap_or("-"),
        ));
    }
    lines
}

pub fn print_devices_table(devices: &[DeviceInfo]) {
    for line in format_devices_table(devices) {
        println!("{line}");
    }
}
