//! Link-layer transport: a raw AF_PACKET socket bound to one interface.
//!
//! The kernel filter on the DFS ethertype keeps unrelated traffic away; the
//! interface additionally runs promiscuous so frames addressed to emulated
//! stations still arrive. [`FrameIo`] is the seam the serve loop works
//! against, so tests can drive it with scripted frames.

use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use async_trait::async_trait;
use tokio::io::unix::AsyncFd;

use crate::frame::{MacAddr, ETHERTYPE};

/// Frame-level transport used by the serve loop.
#[async_trait]
pub trait FrameIo {
    /// Our own hardware address, used for reply headers and destination
    /// filtering.
    fn mac(&self) -> MacAddr;

    /// Receives one frame into `buf` and returns its length.
    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Transmits one frame verbatim.
    async fn send(&mut self, frame: &[u8]) -> io::Result<()>;
}

/// A non-blocking packet socket registered with the tokio reactor.
pub struct RawSock {
    fd: AsyncFd<OwnedFd>,
    mac: MacAddr,
}

impl RawSock {
    /// Opens a raw socket for the DFS ethertype on `interface`, switches
    /// the interface to promiscuous mode and binds to it. Needs root (or
    /// CAP_NET_RAW).
    pub fn open(interface: &str) -> io::Result<Self> {
        let protocol = libc::c_int::from(ETHERTYPE.to_be());
        let raw = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW | libc::SOCK_NONBLOCK,
                protocol,
            )
        };
        if raw < 0 {
            return Err(io::Error::last_os_error());
        }
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let index = {
            let mut req = ifreq(interface)?;
            ioctl(&fd, libc::SIOCGIFINDEX, &mut req)?;
            unsafe { req.ifr_ifru.ifru_ifindex }
        };
        {
            let mut req = ifreq(interface)?;
            ioctl(&fd, libc::SIOCGIFFLAGS, &mut req)?;
            unsafe { req.ifr_ifru.ifru_flags |= libc::IFF_PROMISC as libc::c_short };
            ioctl(&fd, libc::SIOCSIFFLAGS, &mut req)?;
        }
        let mac = {
            let mut req = ifreq(interface)?;
            ioctl(&fd, libc::SIOCGIFHWADDR, &mut req)?;
            let hw = unsafe { req.ifr_ifru.ifru_hwaddr.sa_data };
            MacAddr([
                hw[0] as u8,
                hw[1] as u8,
                hw[2] as u8,
                hw[3] as u8,
                hw[4] as u8,
                hw[5] as u8,
            ])
        };

        let mut addr: libc::sockaddr_ll = unsafe { mem::zeroed() };
        addr.sll_family = libc::AF_PACKET as libc::sa_family_t;
        addr.sll_protocol = ETHERTYPE.to_be();
        addr.sll_ifindex = index;
        addr.sll_halen = 6;
        addr.sll_addr[..6].copy_from_slice(mac.as_bytes());
        let rc = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                &addr as *const libc::sockaddr_ll as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            fd: AsyncFd::new(fd)?,
            mac,
        })
    }
}

#[async_trait]
impl FrameIo for RawSock {
    fn mac(&self) -> MacAddr {
        self.mac
    }

    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.fd.readable().await?;
            let result = guard.try_io(|inner| {
                let n = unsafe {
                    libc::recv(inner.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len(), 0)
                };
                if n < 0 {
                    Err(io::Error::last_os_error())
                } else {
                    Ok(n as usize)
                }
            });
            match result {
                Ok(Err(err)) if err.kind() == io::ErrorKind::Interrupted => continue,
                Ok(done) => return done,
                Err(_would_block) => continue,
            }
        }
    }

    async fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        loop {
            let mut guard = self.fd.writable().await?;
            let result = guard.try_io(|inner| {
                let n = unsafe {
                    libc::send(inner.as_raw_fd(), frame.as_ptr().cast(), frame.len(), 0)
                };
                if n < 0 {
                    Err(io::Error::last_os_error())
                } else {
                    Ok(n as usize)
                }
            });
            match result {
                Ok(Err(err)) if err.kind() == io::ErrorKind::Interrupted => continue,
                Ok(Ok(sent)) if sent != frame.len() => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("sent {sent} of {} bytes", frame.len()),
                    ));
                }
                Ok(done) => return done.map(|_| ()),
                Err(_would_block) => continue,
            }
        }
    }
}

fn ifreq(interface: &str) -> io::Result<libc::ifreq> {
    let mut req: libc::ifreq = unsafe { mem::zeroed() };
    let name = interface.as_bytes();
    if name.is_empty() || name.len() >= req.ifr_name.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid interface name",
        ));
    }
    for (slot, &b) in req.ifr_name.iter_mut().zip(name) {
        *slot = b as libc::c_char;
    }
    Ok(req)
}

fn ioctl(fd: &OwnedFd, request: libc::c_ulong, req: &mut libc::ifreq) -> io::Result<()> {
    let rc = unsafe { libc::ioctl(fd.as_raw_fd(), request as _, req) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
