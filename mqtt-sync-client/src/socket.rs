//! The minimal byte-oriented capability the client needs from a transport.
//!
//! Production code talks to a [`TcpStream`]; tests substitute an in-memory
//! fake that never touches the network.

use std::io;
use std::net::TcpStream;
use std::time::Duration;

/// A send/receive/close/timeout capability. The client frames and parses
/// MQTT packets itself; a `Socket` only ever moves bytes.
pub trait Socket {
    /// Writes as much of `buf` as the transport accepts right now. A
    /// `WouldBlock`/`Interrupted` error is transient and should be retried
    /// by the caller; any other error is fatal to the connection.
    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Reads into `buf`, returning the number of bytes read. `Ok(0)` means
    /// the remote end closed the connection.
    fn recv_into(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Closes the transport. Called at most once per socket.
    fn close(&mut self) -> io::Result<()>;

    /// Sets the read/write deadline used by `send`/`recv_into`.
    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;
}

pub struct TcpSocket(TcpStream);

impl TcpSocket {
    pub fn connect(host: &str, port: u16) -> io::Result<Self> {
        let stream = TcpStream::connect((host, port))?;
        Ok(TcpSocket(stream))
    }
}

impl Socket for TcpSocket {
    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        use std::io::Write;
        self.0.write(buf)
    }

    fn recv_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        use std::io::Read;
        self.0.read(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        self.0.shutdown(std::net::Shutdown::Both)
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.0.set_read_timeout(timeout)?;
        self.0.set_write_timeout(timeout)
    }
}

/// Writes the entirety of `buf`, retrying on transient errors.
pub(crate) fn write_all(socket: &mut dyn Socket, buf: &[u8]) -> io::Result<()> {
    let mut offset = 0;
    while offset < buf.len() {
        match socket.send(&buf[offset..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "socket closed while writing",
                ))
            }
            Ok(n) => offset += n,
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Reads exactly `buf.len()` bytes, retrying on transient errors until
/// `deadline` passes.
pub(crate) fn read_exact_until(
    socket: &mut dyn Socket,
    buf: &mut [u8],
    deadline: std::time::Instant,
) -> io::Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        if std::time::Instant::now() >= deadline {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "recv_timeout elapsed"));
        }
        match socket.recv_into(&mut buf[filled..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "socket closed while reading",
                ))
            }
            Ok(n) => filled += n,
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::Interrupted
                    || e.kind() == io::ErrorKind::TimedOut =>
            {
                continue
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
