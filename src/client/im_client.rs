use std::collections::VecDeque;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::client::ClientError;
use crate::protocol::{ActionCode, MAX_PAYLOAD_LEN, Msg, ResponseCode, UserName, read_msg, write_msg};

/// How long the request helpers wait for their reply.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocking QuickIM client over one TCP connection.
///
/// Frames that arrive while a helper waits for a specific reply are kept
/// and handed out by later `recv` calls, in arrival order.
pub struct ImClient {
    stream: TcpStream,
    pending: VecDeque<Msg>,
    username: Option<UserName>,
}

impl ImClient {
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            pending: VecDeque::new(),
            username: None,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ClientError> {
        Ok(self.stream.local_addr()?)
    }

    /// Name this connection logged in as, if any.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn send(&mut self, msg: &Msg) -> Result<(), ClientError> {
        write_msg(&mut self.stream, msg)?;
        Ok(())
    }

    /// Next frame, waiting as long as it takes.
    pub fn recv(&mut self) -> Result<Msg, ClientError> {
        if let Some(msg) = self.pending.pop_front() {
            return Ok(msg);
        }
        self.stream.set_read_timeout(None)?;
        Ok(read_msg(&mut self.stream, MAX_PAYLOAD_LEN)?)
    }

    /// Next frame, or `ClientError::Timeout`.
    ///
    /// A timeout that fires mid-frame leaves the stream unusable; timeouts
    /// are meant for "nothing arrived" checks.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Msg, ClientError> {
        if let Some(msg) = self.pending.pop_front() {
            return Ok(msg);
        }
        self.read_within(timeout)
    }

    /// Wait for the first frame matching `want`. Other frames are queued for
    /// later `recv` calls.
    pub fn wait_for<F>(&mut self, timeout: Duration, mut want: F) -> Result<Msg, ClientError>
    where
        F: FnMut(&Msg) -> bool,
    {
        self.wait_pick(timeout, |m| if want(&m) { Ok(m) } else { Err(m) })
    }

    /// Like `wait_for`, but `pick` takes the frame by value and either
    /// extracts what it needs or hands the frame back.
    fn wait_pick<T, F>(&mut self, timeout: Duration, mut pick: F) -> Result<T, ClientError>
    where
        F: FnMut(Msg) -> Result<T, Msg>,
    {
        let mut found = None;
        let mut rest = VecDeque::with_capacity(self.pending.len());
        for msg in self.pending.drain(..) {
            if found.is_some() {
                rest.push_back(msg);
                continue;
            }
            match pick(msg) {
                Ok(v) => found = Some(v),
                Err(msg) => rest.push_back(msg),
            }
        }
        self.pending = rest;
        if let Some(v) = found {
            return Ok(v);
        }

        let deadline = Instant::now() + timeout;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Err(ClientError::Timeout);
            }
            match pick(self.read_within(left)?) {
                Ok(v) => return Ok(v),
                Err(msg) => self.pending.push_back(msg),
            }
        }
    }

    /// Send `msg` and wait for the `Response` answering `action`.
    pub fn request(&mut self, msg: &Msg, action: ActionCode) -> Result<String, ClientError> {
        self.send(msg)?;
        let (code, text) = self.wait_pick(REPLY_TIMEOUT, |m| match m {
            Msg::Response {
                action: a,
                code,
                text,
            } if a == action => Ok((code, text)),
            other => Err(other),
        })?;
        match code {
            ResponseCode::Success => Ok(text),
            ResponseCode::Fail => Err(ClientError::Rejected {
                action,
                reason: text,
            }),
        }
    }

    pub fn register(&mut self, username: &str, password: &str) -> Result<String, ClientError> {
        let msg = Msg::Register {
            username: username.to_owned(),
            password: password.to_owned(),
        };
        self.request(&msg, ActionCode::Register)
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<String, ClientError> {
        let msg = Msg::Login {
            username: username.to_owned(),
            password: password.to_owned(),
        };
        let text = self.request(&msg, ActionCode::Login)?;
        self.username = Some(username.trim().to_owned());
        Ok(text)
    }

    /// Send a direct message under a fresh id; returns the id so the caller
    /// can match the ack.
    pub fn send_text(&mut self, to: &str, content: &str) -> Result<String, ClientError> {
        let msg_id = Uuid::new_v4().to_string();
        self.send(&Msg::SendMessage {
            to: to.to_owned(),
            content: content.to_owned(),
            msg_id: msg_id.clone(),
        })?;
        Ok(msg_id)
    }

    /// Log out if logged in, then shut the socket.
    pub fn disconnect(mut self) -> Result<(), ClientError> {
        if self.username.take().is_some() {
            self.send(&Msg::Logout)?;
        }
        match self.stream.shutdown(Shutdown::Both) {
            // the server may already have hung up after the logout
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn read_within(&mut self, timeout: Duration) -> Result<Msg, ClientError> {
        self.stream.set_read_timeout(Some(timeout))?;
        Ok(read_msg(&mut self.stream, MAX_PAYLOAD_LEN)?)
    }
}
