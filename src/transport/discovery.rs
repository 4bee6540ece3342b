//! Serial port discovery for locating the modem

use std::path::Path;
use tokio_serial::SerialPortType;
use tracing::debug;

/// Raspberry Pi on-board UARTs, checked by path
const GPIO_PORTS: [(&str, &str); 3] = [
    ("/dev/serial0", "Primary GPIO serial (pins 14/15)"),
    ("/dev/ttyAMA0", "PL011 UART"),
    ("/dev/ttyS0", "Mini UART"),
];

/// Kind of serial device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    Usb,
    Gpio,
    Other,
}

impl std::fmt::Display for PortKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortKind::Usb => write!(f, "USB"),
            PortKind::Gpio => write!(f, "GPIO"),
            PortKind::Other => write!(f, "Other"),
        }
    }
}

/// A serial port the modem may be attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub path: String,
    pub kind: PortKind,
    pub description: String,
}

/// Enumerate candidate serial ports: OS-reported devices first, then GPIO UARTs
pub fn find_serial_ports() -> Vec<PortInfo> {
    let mut ports = match tokio_serial::available_ports() {
        Ok(found) => found
            .into_iter()
            .map(|info| {
                let name = Path::new(&info.port_name)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| info.port_name.clone());
                let (kind, description) = match info.port_type {
                    SerialPortType::UsbPort(usb) => (
                        PortKind::Usb,
                        match usb.product {
                            Some(product) => format!("USB Serial ({}, {})", name, product),
                            None => format!("USB Serial ({})", name),
                        },
                    ),
                    _ => (PortKind::Other, format!("Serial ({})", name)),
                };
                PortInfo {
                    path: info.port_name,
                    kind,
                    description,
                }
            })
            .collect::<Vec<_>>(),
        Err(e) => {
            debug!("[SERIAL] Port enumeration failed: {}", e);
            Vec::new()
        }
    };

    merge_gpio_ports(&mut ports, |path| Path::new(path).exists());
    ports
}

/// Add present GPIO UARTs, replacing generic entries for the same path
fn merge_gpio_ports(ports: &mut Vec<PortInfo>, exists: impl Fn(&str) -> bool) {
    for (path, description) in GPIO_PORTS {
        if !exists(path) {
            continue;
        }
        ports.retain(|p| p.path != path);
        ports.push(PortInfo {
            path: path.to_string(),
            kind: PortKind::Gpio,
            description: description.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpio_ports_merged() {
        let mut ports = vec![
            PortInfo {
                path: "/dev/ttyUSB0".into(),
                kind: PortKind::Usb,
                description: "USB Serial (ttyUSB0)".into(),
            },
            PortInfo {
                path: "/dev/ttyS0".into(),
                kind: PortKind::Other,
                description: "Serial (ttyS0)".into(),
            },
        ];

        merge_gpio_ports(&mut ports, |path| path != "/dev/ttyAMA0");

        let paths: Vec<_> = ports.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, ["/dev/ttyUSB0", "/dev/serial0", "/dev/ttyS0"]);
        assert_eq!(ports[2].kind, PortKind::Gpio);
        assert_eq!(ports[2].description, "Mini UART");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(PortKind::Usb.to_string(), "USB");
        assert_eq!(PortKind::Gpio.to_string(), "GPIO");
    }
}
