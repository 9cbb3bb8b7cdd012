//! AF_PACKET raw socket bound to a single interface

use super::Capture;
use crate::{Error, Result};
use std::ffi::CString;
use std::os::unix::io::{AsRawFd, RawFd};
use tokio::io::unix::AsyncFd;

/// Non-blocking AF_PACKET socket in promiscuous mode
pub struct PacketSocket {
    async_fd: AsyncFd<RawFd>,
    ifindex: i32,
}

impl PacketSocket {
    /// Open a raw socket bound to `ifname`. Requires CAP_NET_RAW.
    pub fn bind(ifname: &str) -> Result<Self> {
        let fd = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW,
                (libc::ETH_P_ALL as u16).to_be() as i32,
            )
        };
        if fd < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }

        let ifindex = match Self::ifindex_of(fd, ifname) {
            Ok(idx) => idx,
            Err(e) => {
                unsafe { libc::close(fd) };
                return Err(e);
            }
        };

        let sockaddr = libc::sockaddr_ll {
            sll_family: libc::AF_PACKET as u16,
            sll_protocol: (libc::ETH_P_ALL as u16).to_be(),
            sll_ifindex: ifindex,
            sll_hatype: 0,
            sll_pkttype: 0,
            sll_halen: 0,
            sll_addr: [0; 8],
        };
        let ret = unsafe {
            libc::bind(
                fd,
                &sockaddr as *const _ as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_ll>() as u32,
            )
        };
        if ret < 0 {
            unsafe { libc::close(fd) };
            return Err(Error::Io(std::io::Error::last_os_error()));
        }

        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };

        // The switch must see frames addressed to other hosts
        Self::set_promisc(fd, ifindex, true)?;

        // ETH_P_ALL sockets are also handed copies of locally transmitted
        // frames (PACKET_OUTGOING); those must never count as ingress or a
        // flood loops back into its own sender. Old kernels lack the
        // option, so recv filters by pkttype as well.
        let _ = Self::set_ignore_outgoing(fd);

        Ok(Self {
            async_fd: AsyncFd::new(fd).map_err(Error::Io)?,
            ifindex,
        })
    }

    fn ifindex_of(fd: RawFd, ifname: &str) -> Result<i32> {
        let ifname_c = CString::new(ifname).map_err(|_| Error::InterfaceNotFound {
            name: ifname.to_string(),
        })?;

        let mut ifr: libc::ifreq = unsafe { std::mem::zeroed() };
        let name_bytes = ifname_c.as_bytes_with_nul();
        if name_bytes.len() > ifr.ifr_name.len() {
            return Err(Error::InterfaceNotFound {
                name: ifname.to_string(),
            });
        }
        for (dst, &src) in ifr.ifr_name.iter_mut().zip(name_bytes) {
            *dst = src as libc::c_char;
        }

        let ret = unsafe { libc::ioctl(fd, libc::SIOCGIFINDEX, &mut ifr) };
        if ret < 0 {
            return Err(Error::InterfaceNotFound {
                name: ifname.to_string(),
            });
        }

        Ok(unsafe { ifr.ifr_ifru.ifru_ifindex })
    }

    fn set_promisc(fd: RawFd, ifindex: i32, enable: bool) -> Result<()> {
        let mreq = libc::packet_mreq {
            mr_ifindex: ifindex,
            mr_type: libc::PACKET_MR_PROMISC as u16,
            mr_alen: 0,
            mr_address: [0; 8],
        };
        let optname = if enable {
            libc::PACKET_ADD_MEMBERSHIP
        } else {
            libc::PACKET_DROP_MEMBERSHIP
        };

        let ret = unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_PACKET,
                optname,
                &mreq as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::packet_mreq>() as u32,
            )
        };
        if ret < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }
        Ok(())
    }

    fn set_ignore_outgoing(fd: RawFd) -> Result<()> {
        let val: libc::c_int = 1;
        let ret = unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_PACKET,
                libc::PACKET_IGNORE_OUTGOING,
                &val as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as u32,
            )
        };
        if ret < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }
        Ok(())
    }

    async fn recv_impl(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            let mut guard = self.async_fd.readable_mut().await.map_err(Error::Io)?;

            match guard.try_io(|inner| {
                let fd = *inner.get_ref();
                let mut addr: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
                let mut addr_len =
                    std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t;
                let n = unsafe {
                    libc::recvfrom(
                        fd,
                        buf.as_mut_ptr() as *mut _,
                        buf.len(),
                        0,
                        &mut addr as *mut _ as *mut libc::sockaddr,
                        &mut addr_len,
                    )
                };
                if n < 0 {
                    Err(std::io::Error::last_os_error())
                } else {
                    Ok((n as usize, addr.sll_pkttype))
                }
            }) {
                Ok(Ok((len, pkttype))) => {
                    if !is_ingress(pkttype) {
                        // Looped-back copy of our own transmission
                        continue;
                    }
                    return Ok(len);
                }
                Ok(Err(e)) => return Err(Error::Io(e)),
                Err(_would_block) => continue,
            }
        }
    }

    async fn send_impl(&mut self, buf: &[u8]) -> Result<usize> {
        loop {
            let mut guard = self.async_fd.writable_mut().await.map_err(Error::Io)?;

            match guard.try_io(|inner| {
                let fd = *inner.get_ref();
                let n = unsafe { libc::send(fd, buf.as_ptr() as *const _, buf.len(), 0) };
                if n < 0 {
                    Err(std::io::Error::last_os_error())
                } else {
                    Ok(n as usize)
                }
            }) {
                Ok(Ok(len)) => return Ok(len),
                Ok(Err(e)) => return Err(Error::Io(e)),
                Err(_would_block) => continue,
            }
        }
    }
}

/// Everything the kernel classifies except PACKET_OUTGOING is traffic the
/// pipelines must see; an outgoing copy re-entering `handle_frame` would be
/// relearned and reflooded as if a host had sent it.
fn is_ingress(pkttype: u8) -> bool {
    pkttype != libc::PACKET_OUTGOING
}

impl AsRawFd for PacketSocket {
    fn as_raw_fd(&self) -> RawFd {
        *self.async_fd.get_ref()
    }
}

impl Drop for PacketSocket {
    fn drop(&mut self) {
        let fd = *self.async_fd.get_ref();
        let _ = Self::set_promisc(fd, self.ifindex, false);
        unsafe { libc::close(fd) };
    }
}

impl Capture for PacketSocket {
    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.recv_impl(buf).await
    }

    async fn send(&mut self, buf: &[u8]) -> Result<usize> {
        self.send_impl(buf).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_transmissions_are_not_ingress() {
        assert!(!is_ingress(libc::PACKET_OUTGOING));
    }

    #[test]
    fn received_classes_are_ingress() {
        assert!(is_ingress(libc::PACKET_HOST));
        assert!(is_ingress(libc::PACKET_BROADCAST));
        assert!(is_ingress(libc::PACKET_MULTICAST));
        assert!(is_ingress(libc::PACKET_OTHERHOST));
    }
}
