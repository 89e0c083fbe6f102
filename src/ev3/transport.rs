// Physical channels to a brick
//
// Three link kinds carry the same framing: the USB gadget serial node,
// a Bluetooth RFCOMM serial node, and a TCP stream negotiated through
// the brick's UDP beacon. Framing code only sees send/receive.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, UdpSocket};
use std::time::{Duration, Instant};

use serialport::SerialPort;
use tracing::{debug, info};

use super::{Ev3Error, Result};

/// Baudrate for the serial channel kinds (RFCOMM nodes ignore it, but the
/// port still has to be configured with one).
pub const SERIAL_BAUDRATE: u32 = 115_200;

/// UDP port the brick announces itself on.
pub const BEACON_PORT: u16 = 3015;

/// Granularity at which blocking reads wake up to check the deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One physical link to a brick.
pub enum Channel {
    Usb(Box<dyn SerialPort>),
    Bluetooth(Box<dyn SerialPort>),
    Wifi(TcpStream),
}

impl Channel {
    /// Open the brick's USB serial node (e.g. `/dev/ttyACM0`).
    pub fn open_usb(path: &str) -> Result<Self> {
        info!("opening usb link on {}", path);
        Ok(Channel::Usb(open_serial(path)?))
    }

    /// Open a bound RFCOMM node (e.g. `/dev/rfcomm0`).
    pub fn open_bluetooth(path: &str) -> Result<Self> {
        info!("opening bluetooth link on {}", path);
        Ok(Channel::Bluetooth(open_serial(path)?))
    }

    /// Wait for a brick beacon, answer it and establish the TCP link.
    ///
    /// When `serial` is given, a beacon from any other brick is an error;
    /// otherwise the first announcing brick wins.
    pub fn connect_wifi(serial: Option<&str>) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", BEACON_PORT))?;
        let mut buf = [0u8; 128];
        let (n, addr) = socket.recv_from(&mut buf)?;
        let beacon = String::from_utf8_lossy(&buf[..n]).into_owned();
        debug!("beacon from {}: {:?}", addr, beacon);

        let number = beacon_field(&beacon, "Serial-Number")?;
        let port: u16 = beacon_field(&beacon, "Port")?
            .parse()
            .map_err(|_| Ev3Error::Protocol("beacon carries a malformed port".into()))?;
        let name = beacon_field(&beacon, "Name")?;
        let protocol = beacon_field(&beacon, "Protocol")?;

        if let Some(want) = serial {
            let want = want.replace(':', "").to_uppercase();
            if number.to_uppercase() != want {
                return Err(Ev3Error::Protocol(format!(
                    "found brick {number} but not {want}"
                )));
            }
        }

        // Answering the beacon makes the brick accept a TCP connection.
        socket.send_to(b" ", (addr.ip(), port))?;
        let mut stream = TcpStream::connect((addr.ip(), port))?;

        let unlock = format!("GET /target?sn={number}VMTP1.0\nProtocol: {protocol}");
        stream.write_all(unlock.as_bytes())?;
        let mut reply = [0u8; 16];
        let n = stream.read(&mut reply)?;
        if !reply[..n].starts_with(b"Accept:EV340") {
            return Err(Ev3Error::Protocol(format!(
                "brick {name} rejected the wifi unlock"
            )));
        }
        stream.set_read_timeout(Some(POLL_INTERVAL))?;

        info!("wifi link to {} accepted", name);
        Ok(Channel::Wifi(stream))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Channel::Usb(_) => "usb",
            Channel::Bluetooth(_) => "bluetooth",
            Channel::Wifi(_) => "wifi",
        }
    }

    /// Write one complete frame.
    pub fn send(&mut self, frame: &[u8]) -> Result<()> {
        match self {
            Channel::Usb(port) | Channel::Bluetooth(port) => {
                port.write_all(frame)?;
                port.flush()?;
            }
            Channel::Wifi(stream) => {
                stream.write_all(frame)?;
                stream.flush()?;
            }
        }
        Ok(())
    }

    /// Fill `buf` completely, blocking until the bytes arrive or the
    /// deadline passes.
    pub fn receive_exact(&mut self, buf: &mut [u8], deadline: Option<Instant>) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read_some(&mut buf[filled..]) {
                Ok(0) => return Err(Ev3Error::Protocol("channel closed".into())),
                Ok(n) => filled += n,
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) =>
                {
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        return Err(Ev3Error::Timeout);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn read_some(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Channel::Usb(port) | Channel::Bluetooth(port) => port.read(buf),
            Channel::Wifi(stream) => stream.read(buf),
        }
    }
}

fn open_serial(path: &str) -> Result<Box<dyn SerialPort>> {
    Ok(serialport::new(path, SERIAL_BAUDRATE)
        .timeout(POLL_INTERVAL)
        .open()?)
}

fn beacon_field(beacon: &str, key: &str) -> Result<String> {
    beacon
        .lines()
        .find_map(|line| line.strip_prefix(key)?.strip_prefix(": "))
        .map(|value| value.trim().to_string())
        .ok_or_else(|| Ev3Error::Protocol(format!("beacon is missing the {key} field")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BEACON: &str =
        "Serial-Number: 0016533f0c1e \nPort: 5555 \nName: EV3 \nProtocol: EV3 \n";

    #[test]
    fn beacon_fields_are_extracted() {
        assert_eq!(beacon_field(BEACON, "Serial-Number").unwrap(), "0016533f0c1e");
        assert_eq!(beacon_field(BEACON, "Port").unwrap(), "5555");
        assert_eq!(beacon_field(BEACON, "Name").unwrap(), "EV3");
        assert_eq!(beacon_field(BEACON, "Protocol").unwrap(), "EV3");
    }

    #[test]
    fn missing_beacon_field_is_a_protocol_error() {
        assert!(matches!(
            beacon_field("Port: 5555 \n", "Serial-Number"),
            Err(Ev3Error::Protocol(_))
        ));
    }
}
