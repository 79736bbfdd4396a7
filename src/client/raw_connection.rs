//! Raw blocking connection over TCP or a Unix domain socket
//!
//! Reader and writer halves are split over a cloned socket so replies can be
//! decoded straight out of a `BufReader`.

use std::io::{self, BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
#[cfg(unix)]
use std::path::Path;
use std::time::Duration;

use super::control_plane::ControlPlane;
use crate::utils::{ConnectionError, RespDecoder, RespEncoder, RespValue};

const BUFFER_CAPACITY: usize = 16 * 1024;

pub enum RawConnection {
    Tcp {
        writer: BufWriter<TcpStream>,
        reader: BufReader<TcpStream>,
    },
    #[cfg(unix)]
    Unix {
        writer: BufWriter<UnixStream>,
        reader: BufReader<UnixStream>,
    },
}

impl RawConnection {
    /// Open a TCP connection, trying every resolved address in turn
    pub fn connect_tcp(
        host: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        let endpoint = format!("{}:{}", host, port);
        let failed = |source: io::Error| ConnectionError::ConnectFailed {
            endpoint: endpoint.clone(),
            source,
        };

        let addrs: Vec<_> = (host, port).to_socket_addrs().map_err(failed)?.collect();
        let mut last_err =
            io::Error::new(io::ErrorKind::NotFound, "No addresses found".to_string());

        for addr in addrs {
            match TcpStream::connect_timeout(&addr, connect_timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true).ok();
                    let writer = BufWriter::with_capacity(
                        BUFFER_CAPACITY,
                        stream.try_clone().map_err(failed)?,
                    );
                    let reader = BufReader::with_capacity(BUFFER_CAPACITY, stream);
                    return Ok(RawConnection::Tcp { writer, reader });
                }
                Err(e) => last_err = e,
            }
        }

        Err(failed(last_err))
    }

    /// Open a Unix domain socket connection
    #[cfg(unix)]
    pub fn connect_unix(path: &Path) -> Result<Self, ConnectionError> {
        let failed = |source: io::Error| ConnectionError::ConnectFailed {
            endpoint: path.display().to_string(),
            source,
        };

        let stream = UnixStream::connect(path).map_err(failed)?;
        let writer = BufWriter::with_capacity(BUFFER_CAPACITY, stream.try_clone().map_err(failed)?);
        let reader = BufReader::with_capacity(BUFFER_CAPACITY, stream);

        Ok(RawConnection::Unix { writer, reader })
    }

    /// Apply the same timeout to reads and writes; `None` blocks forever
    pub fn set_timeouts(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            RawConnection::Tcp { reader, .. } => {
                reader.get_ref().set_read_timeout(timeout)?;
                reader.get_ref().set_write_timeout(timeout)
            }
            #[cfg(unix)]
            RawConnection::Unix { reader, .. } => {
                reader.get_ref().set_read_timeout(timeout)?;
                reader.get_ref().set_write_timeout(timeout)
            }
        }
    }

    /// Send a pre-encoded command and read exactly one reply
    pub fn round_trip(&mut self, encoder: &RespEncoder) -> io::Result<RespValue> {
        match self {
            RawConnection::Tcp { writer, reader } => {
                writer.write_all(encoder.as_bytes())?;
                writer.flush()?;
                RespDecoder::new(reader).decode()
            }
            #[cfg(unix)]
            RawConnection::Unix { writer, reader } => {
                writer.write_all(encoder.as_bytes())?;
                writer.flush()?;
                RespDecoder::new(reader).decode()
            }
        }
    }
}

impl ControlPlane for RawConnection {
    fn execute(&mut self, args: &[&str]) -> io::Result<RespValue> {
        let mut encoder = RespEncoder::with_capacity(64);
        encoder.encode_command(args);
        self.round_trip(&encoder)
    }

    fn execute_binary(&mut self, args: &[&[u8]]) -> io::Result<RespValue> {
        let capacity = args.iter().map(|a| a.len() + 16).sum::<usize>() + 16;
        let mut encoder = RespEncoder::with_capacity(capacity);
        encoder.encode_command(args);
        self.round_trip(&encoder)
    }
}
