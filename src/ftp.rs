//! FTP module.

use std::borrow::Cow;
use std::io::{self, copy, BufRead, BufReader, BufWriter, Read, Write};
use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs};
use std::str::FromStr;
use std::time::Duration;

use log::{debug, trace};
#[cfg(feature = "secure")]
use native_tls::TlsConnector;
use regex::Regex;
use serde::Deserialize;

use super::data_stream::DataStream;
use super::listing::{self, ListingMode, RemoteEntry};
use super::status;
use super::types::{ErrorKind, FtpError, Line, Result};

lazy_static! {
    // This regex extracts IP and Port details from PASV command response.
    // The regex looks for the pattern (h1,h2,h3,h4,p1,p2).
    static ref PORT_RE: Regex = Regex::new(r"\((\d+),(\d+),(\d+),(\d+),(\d+),(\d+)\)").unwrap();

    // This regex extracts the port from EPSV command response: (|||port|).
    static ref EPSV_PORT_RE: Regex = Regex::new(r"\(\|\|\|(\d+)\|\)").unwrap();
}

/// How data connections are negotiated. Both are passive: the client connects out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    /// `PASV`, connecting to the address the server reports.
    #[default]
    Pasv,
    /// `EPSV`, connecting to the control connection's peer address.
    Epsv,
}

/// Stream to interface with the FTP server. This interface is only for the command stream.
#[derive(Debug)]
pub struct FtpStream {
    reader: BufReader<DataStream>,
    mode: DataMode,
    listing: ListingMode,
    timeout: Option<Duration>,
    #[cfg(feature = "secure")]
    tls: Option<(TlsConnector, String)>,
}

impl FtpStream {
    /// Creates an FTP Stream.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<FtpStream> {
        TcpStream::connect(addr)
            .map_err(FtpError::ConnectionError)
            .and_then(|stream| FtpStream::handshake(stream, None))
    }

    /// Creates an FTP Stream, giving up on each resolved address after `timeout`.
    /// The same timeout applies to every data connection opened later.
    pub fn connect_timeout<A: ToSocketAddrs>(addr: A, timeout: Duration) -> Result<FtpStream> {
        let mut last_err = None;
        for addr in addr.to_socket_addrs().map_err(FtpError::ConnectionError)? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return FtpStream::handshake(stream, Some(timeout)),
                Err(err) => {
                    debug!("could not connect to {}: {}", addr, err);
                    last_err = Some(err);
                }
            }
        }
        Err(FtpError::ConnectionError(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing")
        })))
    }

    fn handshake(stream: TcpStream, timeout: Option<Duration>) -> Result<FtpStream> {
        let mut ftp_stream = FtpStream {
            reader: BufReader::new(DataStream::Tcp(stream)),
            mode: DataMode::default(),
            listing: ListingMode::default(),
            timeout,
            #[cfg(feature = "secure")]
            tls: None,
        };
        ftp_stream.read_response(status::READY).map(|_| ftp_stream)
    }

    /// Switch to explicit FTPS (`AUTH TLS`). `domain` is checked against the
    /// server certificate. Data connections are protected as well (`PROT P`).
    /// This method does nothing if the connection is already secured.
    #[cfg(feature = "secure")]
    pub fn into_secure(mut self, connector: TlsConnector, domain: &str) -> Result<FtpStream> {
        if self.reader.get_ref().is_ssl() {
            return Ok(self);
        }
        // Ask the server to start securing data.
        self.write_str("AUTH TLS\r\n")?;
        self.read_response(status::AUTH_OK)?;
        let tcp = self.reader.into_inner().into_tcp_stream().map_err(FtpError::ConnectionError)?;
        let stream = connector
            .connect(domain, tcp)
            .map_err(|e| FtpError::SecureError(e.to_string()))?;

        let mut secured = FtpStream {
            reader: BufReader::new(DataStream::Ssl(stream)),
            mode: self.mode,
            listing: self.listing,
            timeout: self.timeout,
            tls: Some((connector, domain.to_owned())),
        };
        // Set protection buffer size
        secured.write_str("PBSZ 0\r\n")?;
        secured.read_response(status::COMMAND_OK)?;
        // Change the level of data protection to Private
        secured.write_str("PROT P\r\n")?;
        secured.read_response(status::COMMAND_OK)?;
        Ok(secured)
    }

    /// Selects how data connections are opened. Takes effect on the next transfer.
    pub fn set_mode(&mut self, mode: DataMode) {
        self.mode = mode;
    }

    /// Selects the command `list_entries` uses.
    pub fn set_listing_mode(&mut self, listing: ListingMode) {
        self.listing = listing;
    }

    fn open_data_connection(&self, addr: SocketAddr) -> Result<TcpStream> {
        match self.timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        }
        .map_err(FtpError::ConnectionError)
    }

    /// Execute command which send data back in a separate stream
    fn data_command(&mut self, cmd: &str) -> Result<DataStream> {
        let addr = match self.mode {
            DataMode::Pasv => self.pasv()?,
            DataMode::Epsv => self.epsv()?,
        };
        self.write_str(cmd)?;
        let stream = self.open_data_connection(addr)?;
        self.secure_data(stream)
    }

    #[cfg(not(feature = "secure"))]
    fn secure_data(&self, stream: TcpStream) -> Result<DataStream> {
        Ok(DataStream::Tcp(stream))
    }

    #[cfg(feature = "secure")]
    fn secure_data(&self, stream: TcpStream) -> Result<DataStream> {
        match self.tls {
            Some((ref connector, ref domain)) => connector
                .connect(domain, stream)
                .map(DataStream::Ssl)
                .map_err(|e| FtpError::SecureError(e.to_string())),
            None => Ok(DataStream::Tcp(stream)),
        }
    }

    /// Returns a reference to the underlying TcpStream.
    pub fn get_ref(&self) -> &TcpStream {
        self.reader.get_ref().get_ref()
    }

    /// Log in to the FTP server.
    pub fn login(&mut self, user: &str, password: &str) -> Result<()> {
        self.write_str(format!("USER {}\r\n", user))?;
        self.read_response_in(&[status::LOGGED_IN, status::NEED_PASSWORD])
            .and_then(|Line(code, _)| {
                if code == status::NEED_PASSWORD {
                    self.write_str(format!("PASS {}\r\n", password))?;
                    self.read_response(status::LOGGED_IN)?;
                }
                Ok(())
            })
    }

    /// Change the current directory to the path specified.
    pub fn cwd(&mut self, path: &str) -> Result<()> {
        self.write_str(format!("CWD {}\r\n", path))?;
        self.read_response(status::REQUESTED_FILE_ACTION_OK).map(|_| ())
    }

    /// Move the current directory to the parent directory.
    pub fn cdup(&mut self) -> Result<()> {
        self.write_str("CDUP\r\n")?;
        self.read_response_in(&[status::COMMAND_OK, status::REQUESTED_FILE_ACTION_OK]).map(|_| ())
    }

    /// This creates a new directory on the server.
    pub fn mkdir(&mut self, pathname: &str) -> Result<()> {
        self.write_str(format!("MKD {}\r\n", pathname))?;
        self.read_response(status::PATH_CREATED).map(|_| ())
    }

    /// Runs the PASV command.
    fn pasv(&mut self) -> Result<SocketAddr> {
        self.write_str("PASV\r\n")?;
        // PASV response format : 227 Entering Passive Mode (h1,h2,h3,h4,p1,p2).
        let Line(_, line) = self.read_response(status::PASSIVE_MODE)?;
        let caps = PORT_RE.captures(&line)
            .ok_or_else(|| FtpError::InvalidResponse(format!("Invalid PASV response: {}", line)))?;

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            *octet = caps[i + 1].parse::<u8>()
                .map_err(|_| FtpError::InvalidResponse(format!("Invalid PASV response: {}", line)))?;
        }
        let port = (u16::from(octets[4]) << 8) + u16::from(octets[5]);
        let addr = format!("{}.{}.{}.{}:{}", octets[0], octets[1], octets[2], octets[3], port);
        SocketAddr::from_str(&addr).map_err(FtpError::InvalidAddress)
    }

    /// Runs the EPSV command. The data connection goes to the control peer.
    fn epsv(&mut self) -> Result<SocketAddr> {
        self.write_str("EPSV\r\n")?;
        // EPSV response format : 229 Entering Extended Passive Mode (|||port|).
        let Line(_, line) = self.read_response(status::EXTENDED_PASSIVE_MODE)?;
        let port = EPSV_PORT_RE.captures(&line)
            .and_then(|caps| caps[1].parse::<u16>().ok())
            .ok_or_else(|| FtpError::InvalidResponse(format!("Invalid EPSV response: {}", line)))?;
        let ip: IpAddr = self.get_ref().peer_addr().map_err(FtpError::ConnectionError)?.ip();
        Ok(SocketAddr::new(ip, port))
    }

    /// Switches the session to image (binary) transfers with `TYPE I`.
    pub fn binary(&mut self) -> Result<()> {
        self.write_str("TYPE I\r\n")?;
        self.read_response(status::COMMAND_OK).map(|_| ())
    }

    /// Quits the current FTP session.
    pub fn quit(&mut self) -> Result<()> {
        self.write_str("QUIT\r\n")?;
        self.read_response(status::CLOSING).map(|_| ())
    }

    /// Removes the remote pathname from the server.
    pub fn rmdir(&mut self, pathname: &str) -> Result<()> {
        self.write_str(format!("RMD {}\r\n", pathname))?;
        self.read_response(status::REQUESTED_FILE_ACTION_OK).map(|_| ())
    }

    /// Remove the remote file from the server.
    pub fn rm(&mut self, filename: &str) -> Result<()> {
        self.write_str(format!("DELE {}\r\n", filename))?;
        self.read_response(status::REQUESTED_FILE_ACTION_OK).map(|_| ())
    }

    fn put_file<R: Read + ?Sized>(&mut self, filename: &str, r: &mut R) -> Result<u64> {
        let stor_command = format!("STOR {}\r\n", filename);
        let mut data_stream = BufWriter::new(self.data_command(&stor_command)?);
        self.read_response_in(&[status::ALREADY_OPEN, status::ABOUT_TO_SEND])?;
        let written = copy(r, &mut data_stream).map_err(FtpError::ConnectionError)?;
        // The data connection closes when `data_stream` drops, which ends the transfer.
        data_stream.flush().map_err(FtpError::ConnectionError)?;
        Ok(written)
    }

    /// ### put
    ///
    /// This stores a file on the server, relative to the current directory,
    /// and returns the number of bytes sent.
    /// r argument must be any struct which implemenents the Read trait
    pub fn put<R: Read + ?Sized>(&mut self, filename: &str, r: &mut R) -> Result<u64> {
        let written = self.put_file(filename, r)?;
        self.read_response_in(&[status::CLOSING_DATA_CONNECTION, status::REQUESTED_FILE_ACTION_OK])
            .map(|_| written)
    }

    /// Execute a command which returns list of strings in a separate stream
    fn list_command(&mut self, cmd: Cow<'static, str>) -> Result<Vec<String>> {
        let mut raw = Vec::new();
        {
            let mut data_stream = BufReader::new(self.data_command(&cmd)?);
            self.read_response_in(&[status::ABOUT_TO_SEND, status::ALREADY_OPEN])?;
            data_stream.read_to_end(&mut raw).map_err(FtpError::ConnectionError)?;
        }

        let lines = String::from_utf8_lossy(&raw)
            .lines()
            .map(|s| s.trim_end_matches('\r'))
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        self.read_response_in(&[status::CLOSING_DATA_CONNECTION, status::REQUESTED_FILE_ACTION_OK])
            .map(|_| lines)
    }

    /// Execute `LIST` command which returns the detailed file listing in human readable format.
    /// If `pathname` is omited then the list of files in the current directory will be
    /// returned otherwise it will the list of files on `pathname`.
    pub fn list(&mut self, pathname: Option<&str>) -> Result<Vec<String>> {
        let command = pathname.map_or("LIST\r\n".into(), |path| format!("LIST {}\r\n", path).into());
        self.list_command(command)
    }

    /// Execute `MLSD` command which returns one machine-readable line per entry.
    pub fn mlsd(&mut self, pathname: Option<&str>) -> Result<Vec<String>> {
        let command = pathname.map_or("MLSD\r\n".into(), |path| format!("MLSD {}\r\n", path).into());
        self.list_command(command)
    }

    /// Lists the current directory as parsed entries, using the listing mode
    /// of the session. In `Auto` mode a server that rejects `MLSD` as
    /// unsupported is switched to `LIST` for the rest of the session.
    pub fn list_entries(&mut self) -> Result<Vec<RemoteEntry>> {
        if self.listing != ListingMode::List {
            match self.mlsd(None) {
                Ok(lines) => return Ok(lines.iter().filter_map(|l| listing::parse_mlsd_line(l)).collect()),
                Err(ref err)
                    if self.listing == ListingMode::Auto && err.kind() == ErrorKind::NotImplemented =>
                {
                    debug!("server does not support MLSD, falling back to LIST");
                    self.listing = ListingMode::List;
                }
                Err(err) => return Err(err),
            }
        }
        self.list(None)
            .map(|lines| lines.iter().filter_map(|l| listing::parse_list_line(l)).collect())
    }

    fn write_str<S: AsRef<str>>(&mut self, command: S) -> Result<()> {
        let command = command.as_ref();
        if command.starts_with("PASS ") {
            trace!("CMD PASS ****");
        } else {
            trace!("CMD {}", command.trim_end());
        }

        let stream = self.reader.get_mut();
        stream.write_all(command.as_bytes())
            .map_err(FtpError::ConnectionError)
    }

    pub fn read_response(&mut self, expected_code: u32) -> Result<Line> {
        self.read_response_in(&[expected_code])
    }

    /// Retrieve single line response
    pub fn read_response_in(&mut self, expected_code: &[u32]) -> Result<Line> {
        let mut line = String::new();
        self.reader.read_line(&mut line).map_err(FtpError::ConnectionError)?;
        trace!("FTP {}", line.trim_end());

        if line.len() < 5 {
            return Err(FtpError::InvalidResponse("error: could not read reply code".to_owned()));
        }

        // The reply code is three ASCII digits; compare bytes so that a
        // multi-byte character in the text cannot split a slice.
        let head = line.as_bytes();
        if !head[..3].iter().all(u8::is_ascii_digit) {
            return Err(FtpError::InvalidResponse(format!(
                "error: could not parse reply code: {}",
                line.trim_end()
            )));
        }
        let code = head[..3].iter().fold(0u32, |code, digit| code * 10 + u32::from(digit - b'0'));

        // multiple line reply
        // loop while the line does not begin with the code and a space
        let expected = [head[0], head[1], head[2], b' '];
        while line.len() < 5 || line.as_bytes()[..4] != expected {
            line.clear();
            let read = self.reader.read_line(&mut line).map_err(FtpError::ConnectionError)?;
            if read == 0 {
                return Err(FtpError::ConnectionError(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed inside a multi-line reply",
                )));
            }
            trace!("FTP {}", line.trim_end());
        }

        if expected_code.iter().any(|ec| code == *ec) {
            Ok(Line(code, line))
        } else {
            Err(FtpError::UnexpectedResponse(Line(code, line)))
        }
    }
}
