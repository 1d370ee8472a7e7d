//! Readiness multiplexer.
//!
//! A thin owner of one `mio::Poll` instance that tracks which raw
//! descriptors are registered. Registrations are edge-triggered, so a
//! consumer must drain a ready descriptor until it would block.

use crate::error::TransportError;
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token, Waker};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::time::Duration;

/// Token reserved for the poller's waker. Never a valid descriptor.
const WAKE_TOKEN: Token = Token(usize::MAX);

/// Default number of readiness events collected per wait.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// One ready descriptor reported by [`Poller::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    /// Ready descriptor.
    pub fd: RawFd,
    /// Data (or a pending connection) can be read.
    pub readable: bool,
    /// Send capacity is available.
    pub writable: bool,
    /// The peer hung up or shut down its write half.
    pub hangup: bool,
    /// The descriptor reported an error condition.
    pub error: bool,
}

impl Readiness {
    fn from_event(event: &mio::event::Event) -> Self {
        Self {
            fd: event.token().0 as RawFd,
            readable: event.is_readable(),
            writable: event.is_writable(),
            hangup: event.is_read_closed(),
            error: event.is_error(),
        }
    }
}

/// Readiness multiplexer over raw descriptors.
pub struct Poller {
    poll: Poll,
    events: Events,
    registered: HashSet<RawFd>,
    waker: Arc<Waker>,
}

impl Poller {
    /// Creates a poller collecting at most `capacity` events per wait.
    ///
    /// # Errors
    /// Returns [`TransportError::PollCreate`] if the OS instance cannot be
    /// created.
    pub fn new(capacity: usize) -> Result<Self, TransportError> {
        let poll = Poll::new().map_err(TransportError::PollCreate)?;
        let waker = Waker::new(poll.registry(), WAKE_TOKEN).map_err(TransportError::PollCreate)?;
        Ok(Self {
            poll,
            events: Events::with_capacity(capacity.max(1)),
            registered: HashSet::new(),
            waker: Arc::new(waker),
        })
    }

    /// Registers `fd` with the given interest.
    ///
    /// Readable interest also reports peer hang-up.
    ///
    /// # Errors
    /// Returns [`TransportError::AlreadyRegistered`] if `fd` is already
    /// registered, or the OS error if registration fails.
    pub fn register(&mut self, fd: RawFd, interest: Interest) -> Result<(), TransportError> {
        if !self.registered.insert(fd) {
            return Err(TransportError::AlreadyRegistered { fd });
        }
        if let Err(e) = self
            .poll
            .registry()
            .register(&mut SourceFd(&fd), token_for(fd), interest)
        {
            self.registered.remove(&fd);
            return Err(e.into());
        }
        Ok(())
    }

    /// Replaces the interest of a registered descriptor.
    ///
    /// # Errors
    /// Returns [`TransportError::NotRegistered`] for an unknown descriptor.
    pub fn modify(&mut self, fd: RawFd, interest: Interest) -> Result<(), TransportError> {
        if !self.registered.contains(&fd) {
            return Err(TransportError::NotRegistered { fd });
        }
        self.poll
            .registry()
            .reregister(&mut SourceFd(&fd), token_for(fd), interest)?;
        Ok(())
    }

    /// Removes a descriptor from the poller.
    ///
    /// # Errors
    /// Returns [`TransportError::NotRegistered`] for an unknown descriptor.
    pub fn deregister(&mut self, fd: RawFd) -> Result<(), TransportError> {
        if !self.registered.remove(&fd) {
            return Err(TransportError::NotRegistered { fd });
        }
        self.poll.registry().deregister(&mut SourceFd(&fd))?;
        tracing::trace!(fd, "descriptor deregistered");
        Ok(())
    }

    /// Returns true if `fd` is currently registered.
    #[must_use]
    pub fn is_registered(&self, fd: RawFd) -> bool {
        self.registered.contains(&fd)
    }

    /// Returns the number of registered descriptors.
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.registered.len()
    }

    /// Waits for readiness and replaces the contents of `ready`.
    ///
    /// `None` blocks until an event or a wake-up arrives; `Some(ZERO)`
    /// returns immediately. A wait interrupted by a signal reports no
    /// events. Wake-ups are not reported.
    ///
    /// # Returns
    /// Number of ready descriptors written to `ready`.
    ///
    /// # Errors
    /// Returns the OS error for any failure other than interruption.
    pub fn wait(
        &mut self,
        ready: &mut Vec<Readiness>,
        timeout: Option<Duration>,
    ) -> Result<usize, TransportError> {
        ready.clear();
        if let Err(e) = self.poll.poll(&mut self.events, timeout) {
            if e.kind() == ErrorKind::Interrupted {
                tracing::trace!("poll interrupted by signal");
                return Ok(0);
            }
            return Err(e.into());
        }

        ready.extend(
            self.events
                .iter()
                .filter(|event| event.token() != WAKE_TOKEN)
                .map(Readiness::from_event),
        );
        Ok(ready.len())
    }

    /// Returns a waker that interrupts a blocking [`Poller::wait`] from any
    /// thread.
    #[must_use]
    pub fn waker(&self) -> Arc<Waker> {
        Arc::clone(&self.waker)
    }
}

fn token_for(fd: RawFd) -> Token {
    Token(fd as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::{TcpListener, TcpStream};
    use std::os::fd::AsRawFd;
    use std::time::Instant;

    fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn test_register_twice_fails() {
        let mut poller = Poller::new(8).unwrap();
        let (_client, server) = connected_pair();
        let fd = server.as_raw_fd();

        poller.register(fd, Interest::READABLE).unwrap();
        let err = poller.register(fd, Interest::READABLE).unwrap_err();
        assert!(matches!(err, TransportError::AlreadyRegistered { fd: f } if f == fd));
        assert_eq!(poller.registered_count(), 1);
    }

    #[test]
    fn test_deregister_and_modify_unknown() {
        let mut poller = Poller::new(8).unwrap();
        assert!(matches!(
            poller.deregister(42),
            Err(TransportError::NotRegistered { fd: 42 })
        ));
        assert!(matches!(
            poller.modify(42, Interest::READABLE),
            Err(TransportError::NotRegistered { fd: 42 })
        ));
    }

    #[test]
    fn test_register_after_deregister() {
        let mut poller = Poller::new(8).unwrap();
        let (_client, server) = connected_pair();
        let fd = server.as_raw_fd();

        poller.register(fd, Interest::READABLE).unwrap();
        poller.deregister(fd).unwrap();
        assert!(!poller.is_registered(fd));
        poller.register(fd, Interest::READABLE).unwrap();
        assert!(poller.is_registered(fd));
    }

    #[test]
    fn test_wait_zero_timeout_returns_immediately() {
        let mut poller = Poller::new(8).unwrap();
        let mut ready = Vec::new();

        let started = Instant::now();
        let count = poller.wait(&mut ready, Some(Duration::ZERO)).unwrap();
        assert_eq!(count, 0);
        assert!(ready.is_empty());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_reports_readable() {
        let mut poller = Poller::new(8).unwrap();
        let (mut client, server) = connected_pair();
        server.set_nonblocking(true).unwrap();
        let fd = server.as_raw_fd();
        poller.register(fd, Interest::READABLE).unwrap();

        client.write_all(&[0xC1, 0x04, 0xF4, 0x06]).unwrap();

        let mut ready = Vec::new();
        let count = poller
            .wait(&mut ready, Some(Duration::from_secs(5)))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(ready[0].fd, fd);
        assert!(ready[0].readable);
    }

    #[test]
    fn test_wait_reports_hangup() {
        let mut poller = Poller::new(8).unwrap();
        let (client, server) = connected_pair();
        server.set_nonblocking(true).unwrap();
        poller
            .register(server.as_raw_fd(), Interest::READABLE)
            .unwrap();

        drop(client);

        let mut ready = Vec::new();
        poller
            .wait(&mut ready, Some(Duration::from_secs(5)))
            .unwrap();
        assert_eq!(ready.len(), 1);
        assert!(ready[0].hangup);
    }

    #[test]
    fn test_waker_interrupts_blocking_wait() {
        let mut poller = Poller::new(8).unwrap();
        let waker = poller.waker();

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            waker.wake().unwrap();
        });

        let mut ready = Vec::new();
        let count = poller.wait(&mut ready, None).unwrap();
        assert_eq!(count, 0);
        handle.join().unwrap();
    }

    extern "C" fn ignore_signal(_: libc::c_int) {}

    #[test]
    fn test_wait_interrupted_by_signal_reports_nothing() {
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = ignore_signal as extern "C" fn(libc::c_int) as usize;
            libc::sigemptyset(&mut action.sa_mask);
            assert_eq!(
                libc::sigaction(libc::SIGUSR1, &action, std::ptr::null_mut()),
                0
            );
        }

        let (tid_tx, tid_rx) = std::sync::mpsc::channel();
        let waiter = std::thread::spawn(move || {
            let mut poller = Poller::new(8).unwrap();
            let mut ready = vec![Readiness {
                fd: 0,
                readable: true,
                writable: false,
                hangup: false,
                error: false,
            }];
            tid_tx.send(unsafe { libc::pthread_self() }).unwrap();
            let result = poller.wait(&mut ready, None);
            (result, ready)
        });

        let tid = tid_rx.recv().unwrap();
        // A signal landing before the thread blocks is lost, so keep sending.
        while !waiter.is_finished() {
            unsafe {
                libc::pthread_kill(tid, libc::SIGUSR1);
            }
            std::thread::sleep(Duration::from_millis(20));
        }

        let (result, ready) = waiter.join().unwrap();
        assert_eq!(result.unwrap(), 0);
        assert!(ready.is_empty());
    }
}
