use crate::error::ThresherError;
use std::io::{self, Read, Write};
use std::marker::PhantomData;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

const LEN_BYTES: usize = 4;
const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;
const READ_CHUNK: usize = 8 * 1024;
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Wire envelope. `Close` is the explicit end-of-stream sentinel: one per
/// peer from the sender, counted by the bound receiver, so phases terminate
/// deterministically instead of by external process kill.
#[derive(Debug, Clone, PartialEq, bincode::Encode, bincode::Decode)]
pub enum Frame<T> {
    Item(T),
    Close,
}

fn encode_frame<T: bincode::Encode>(frame: &Frame<T>) -> Result<Vec<u8>, ThresherError> {
    let body = bincode::encode_to_vec(frame, bincode::config::standard())?;
    if body.len() > MAX_FRAME_BYTES {
        return Err(ThresherError::Transport(format!(
            "frame of {} bytes exceeds the {} byte limit",
            body.len(),
            MAX_FRAME_BYTES
        )));
    }
    let mut buf = Vec::with_capacity(LEN_BYTES + body.len());
    buf.extend_from_slice(&(body.len() as u32).to_be_bytes());
    buf.extend_from_slice(&body);
    Ok(buf)
}

/// Bound, not-yet-accepting half of a push endpoint. Split from `PushSocket`
/// so callers can learn the local address (port 0 binds) before the blocking
/// accept of the expected peer set.
pub struct PushListener {
    listener: TcpListener,
}

impl PushListener {
    pub fn bind(addr: SocketAddr) -> Result<Self, ThresherError> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| ThresherError::Transport(format!("bind {}: {}", addr, e)))?;
        Ok(PushListener { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ThresherError> {
        self.listener
            .local_addr()
            .map_err(|e| ThresherError::Transport(format!("local_addr: {}", e)))
    }

    /// Accept exactly `expected_peers` connections, then start distributing.
    pub fn accept<T>(self, expected_peers: usize) -> Result<PushSocket<T>, ThresherError> {
        let mut peers = Vec::with_capacity(expected_peers);
        for _ in 0..expected_peers {
            let (stream, _) = self
                .listener
                .accept()
                .map_err(|e| ThresherError::Transport(format!("accept: {}", e)))?;
            stream.set_nodelay(true).ok();
            peers.push(stream);
        }
        Ok(PushSocket {
            peers,
            next: 0,
            bound: true,
            _marker: PhantomData,
        })
    }
}

/// Fair-queued one-directional sender. Bound mode (ventilator) round-robins
/// frames across the accepted peers; connected mode (worker) has a single
/// upstream peer. Sends block; backpressure comes from the transport buffers.
pub struct PushSocket<T> {
    peers: Vec<TcpStream>,
    next: usize,
    bound: bool,
    _marker: PhantomData<T>,
}

impl<T: bincode::Encode> PushSocket<T> {
    pub fn connect(addr: SocketAddr) -> Result<Self, ThresherError> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| ThresherError::Transport(format!("connect {}: {}", addr, e)))?;
        stream.set_nodelay(true).ok();
        Ok(PushSocket {
            peers: vec![stream],
            next: 0,
            bound: false,
            _marker: PhantomData,
        })
    }

    /// Send one frame to whichever peer is next in the rotation. Failures are
    /// not retried (fire-and-forget contract).
    pub fn send(&mut self, frame: &Frame<T>) -> Result<(), ThresherError> {
        if self.peers.is_empty() {
            return Err(ThresherError::Transport("no connected peers".to_string()));
        }
        let buf = encode_frame(frame)?;
        let idx = self.next % self.peers.len();
        self.next = self.next.wrapping_add(1);
        self.peers[idx]
            .write_all(&buf)
            .map_err(|e| ThresherError::Transport(format!("send: {}", e)))?;
        Ok(())
    }

    /// Deliver one `Close` to every peer, then tear the connections down.
    ///
    /// In bound mode this side must not close first: the listening port would
    /// sit in TIME_WAIT and the next phase could not rebind it. So after the
    /// sentinels go out we wait (bounded) for each peer to hang up.
    pub fn close(mut self) -> Result<(), ThresherError> {
        let buf = encode_frame::<T>(&Frame::Close)?;
        for peer in &mut self.peers {
            if let Err(err) = peer.write_all(&buf) {
                tracing::debug!(error = %err, "close sentinel not delivered");
            }
        }
        if self.bound {
            let mut scratch = [0u8; 256];
            for peer in &mut self.peers {
                peer.set_read_timeout(Some(DRAIN_TIMEOUT)).ok();
                loop {
                    match peer.read(&mut scratch) {
                        Ok(0) => break,
                        Ok(_) => continue,
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(_) => break,
                    }
                }
            }
        } else {
            for peer in &mut self.peers {
                peer.shutdown(Shutdown::Write).ok();
            }
        }
        Ok(())
    }
}

struct Conn {
    stream: TcpStream,
    buf: Vec<u8>,
    eof: bool,
}

impl Conn {
    fn new(stream: TcpStream) -> Result<Self, ThresherError> {
        stream
            .set_nonblocking(true)
            .map_err(|e| ThresherError::Transport(format!("set_nonblocking: {}", e)))?;
        stream.set_nodelay(true).ok();
        Ok(Conn {
            stream,
            buf: Vec::new(),
            eof: false,
        })
    }

    /// Pull whatever bytes are ready without blocking.
    fn fill(&mut self) -> Result<(), ThresherError> {
        if self.eof {
            return Ok(());
        }
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(());
                }
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ThresherError::Transport(format!("recv: {}", e))),
            }
        }
    }

    fn take_frame<T: bincode::Decode<()>>(&mut self) -> Result<Option<Frame<T>>, ThresherError> {
        if self.buf.len() < LEN_BYTES {
            return Ok(None);
        }
        let mut len_bytes = [0u8; LEN_BYTES];
        len_bytes.copy_from_slice(&self.buf[..LEN_BYTES]);
        let len = u32::from_be_bytes(len_bytes) as usize;
        if len > MAX_FRAME_BYTES {
            return Err(ThresherError::Transport(format!(
                "oversized frame header: {} bytes",
                len
            )));
        }
        if self.buf.len() < LEN_BYTES + len {
            return Ok(None);
        }
        let rest = self.buf.split_off(LEN_BYTES + len);
        let body = std::mem::replace(&mut self.buf, rest);
        let (frame, _) = bincode::decode_from_slice(&body[LEN_BYTES..], bincode::config::standard())?;
        Ok(Some(frame))
    }
}

/// Fair-queued one-directional receiver. Bound mode (aggregator) accepts
/// producer connections as they arrive and polls them round-robin; connected
/// mode (worker) has a single upstream connection. `try_recv` never blocks:
/// it returns `NotReady` when no complete frame is buffered, which the retry
/// combinator turns into a bounded blocking receive.
pub struct PullSocket<T> {
    listener: Option<TcpListener>,
    conns: Vec<Conn>,
    next: usize,
    _marker: PhantomData<T>,
}

impl<T: bincode::Decode<()>> PullSocket<T> {
    /// Binding an address twice while a prior instance is alive fails here.
    pub fn bind(addr: SocketAddr) -> Result<Self, ThresherError> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| ThresherError::Transport(format!("bind {}: {}", addr, e)))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| ThresherError::Transport(format!("set_nonblocking: {}", e)))?;
        Ok(PullSocket {
            listener: Some(listener),
            conns: Vec::new(),
            next: 0,
            _marker: PhantomData,
        })
    }

    pub fn connect(addr: SocketAddr) -> Result<Self, ThresherError> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| ThresherError::Transport(format!("connect {}: {}", addr, e)))?;
        Ok(PullSocket {
            listener: None,
            conns: vec![Conn::new(stream)?],
            next: 0,
            _marker: PhantomData,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ThresherError> {
        match &self.listener {
            Some(listener) => listener
                .local_addr()
                .map_err(|e| ThresherError::Transport(format!("local_addr: {}", e))),
            None => Err(ThresherError::Transport(
                "connected pull socket has no bound address".to_string(),
            )),
        }
    }

    fn accept_pending(&mut self) -> Result<(), ThresherError> {
        let Some(listener) = &self.listener else {
            return Ok(());
        };
        loop {
            match listener.accept() {
                Ok((stream, _)) => self.conns.push(Conn::new(stream)?),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ThresherError::Transport(format!("accept: {}", e))),
            }
        }
    }

    pub fn try_recv(&mut self) -> Result<Frame<T>, ThresherError> {
        self.accept_pending()?;
        let n = self.conns.len();
        let mut received = None;
        for step in 0..n {
            let idx = (self.next + step) % n;
            let conn = &mut self.conns[idx];
            conn.fill()?;
            if let Some(frame) = conn.take_frame()? {
                self.next = idx + 1;
                received = Some(frame);
                break;
            }
            if conn.eof && !conn.buf.is_empty() {
                return Err(ThresherError::Transport(
                    "peer disconnected mid-frame".to_string(),
                ));
            }
        }
        self.conns.retain(|c| !(c.eof && c.buf.is_empty()));
        if self.conns.is_empty() {
            self.next = 0;
        } else {
            self.next %= self.conns.len();
        }
        received.ok_or(ThresherError::NotReady)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::retry;
    use std::net::{IpAddr, Ipv4Addr};
    use std::thread;

    fn loopback() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[test]
    fn test_bound_push_to_connected_pull() {
        let listener = PushListener::bind(loopback()).unwrap();
        let addr = listener.local_addr().unwrap();

        let consumer = thread::spawn(move || {
            let mut pull: PullSocket<String> = PullSocket::connect(addr).unwrap();
            let mut items = Vec::new();
            loop {
                match retry(200, "test recv", || pull.try_recv()).unwrap() {
                    Frame::Item(s) => items.push(s),
                    Frame::Close => break,
                }
            }
            items
        });

        let mut push: PushSocket<String> = listener.accept(1).unwrap();
        for word in ["alpha", "beta", "gamma"] {
            push.send(&Frame::Item(word.to_string())).unwrap();
        }
        push.close().unwrap();

        let items = consumer.join().unwrap();
        assert_eq!(items, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_bound_push_fair_queues_across_peers() {
        let listener = PushListener::bind(loopback()).unwrap();
        let addr = listener.local_addr().unwrap();

        let mut consumers = Vec::new();
        for _ in 0..3 {
            consumers.push(thread::spawn(move || {
                let mut pull: PullSocket<u64> = PullSocket::connect(addr).unwrap();
                let mut items = Vec::new();
                loop {
                    match retry(200, "test recv", || pull.try_recv()).unwrap() {
                        Frame::Item(v) => items.push(v),
                        Frame::Close => break,
                    }
                }
                items
            }));
        }

        let mut push: PushSocket<u64> = listener.accept(3).unwrap();
        for v in 0..9u64 {
            push.send(&Frame::Item(v)).unwrap();
        }
        push.close().unwrap();

        let mut all = Vec::new();
        for consumer in consumers {
            let items = consumer.join().unwrap();
            // round-robin: each peer gets exactly a third
            assert_eq!(items.len(), 3);
            all.extend(items);
        }
        all.sort_unstable();
        assert_eq!(all, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn test_bound_pull_fans_in_from_many_producers() {
        let mut pull: PullSocket<Vec<String>> = PullSocket::bind(loopback()).unwrap();
        let addr = pull.local_addr().unwrap();

        let mut producers = Vec::new();
        for i in 0..3 {
            producers.push(thread::spawn(move || {
                let mut push: PushSocket<Vec<String>> = PushSocket::connect(addr).unwrap();
                push.send(&Frame::Item(vec![format!("msg-{}", i)])).unwrap();
                push.close().unwrap();
            }));
        }

        let mut items = Vec::new();
        let mut closes = 0;
        while closes < 3 {
            match retry(200, "test recv", || pull.try_recv()).unwrap() {
                Frame::Item(tokens) => items.extend(tokens),
                Frame::Close => closes += 1,
            }
        }
        for producer in producers {
            producer.join().unwrap();
        }

        items.sort();
        assert_eq!(items, vec!["msg-0", "msg-1", "msg-2"]);
    }

    #[test]
    fn test_try_recv_with_nothing_ready_is_transient() {
        let mut pull: PullSocket<String> = PullSocket::bind(loopback()).unwrap();
        let err = pull.try_recv().unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_binding_same_address_twice_fails() {
        let first: PullSocket<String> = PullSocket::bind(loopback()).unwrap();
        let addr = first.local_addr().unwrap();
        let second = PullSocket::<String>::bind(addr);
        assert!(matches!(second, Err(ThresherError::Transport(_))));
    }

    #[test]
    fn test_large_frame_round_trips_in_pieces() {
        let listener = PushListener::bind(loopback()).unwrap();
        let addr = listener.local_addr().unwrap();
        let payload: Vec<String> = (0..5000).map(|i| format!("token-{}", i)).collect();
        let expected = payload.clone();

        let consumer = thread::spawn(move || {
            let mut pull: PullSocket<Vec<String>> = PullSocket::connect(addr).unwrap();
            loop {
                match retry(500, "test recv", || pull.try_recv()).unwrap() {
                    Frame::Item(tokens) => return tokens,
                    Frame::Close => panic!("close before payload"),
                }
            }
        });

        let mut push: PushSocket<Vec<String>> = listener.accept(1).unwrap();
        push.send(&Frame::Item(payload)).unwrap();
        push.close().unwrap();

        assert_eq!(consumer.join().unwrap(), expected);
    }
}
