/// IPv4 address pool.
///
/// An `AddressPool` hands out host addresses from a `base/mask` subnet
/// in strictly increasing order, starting at the first usable host.
/// The assigned addresses are a pure function of call order, so a
/// topology built the same way twice gets identical addressing.

use std::net::Ipv4Addr;

use crate::error::{SimError, SimResult};

/// A contiguous IPv4 subnet allocator.
#[derive(Debug, Clone)]
pub struct AddressPool {
    base: Ipv4Addr,
    mask: Ipv4Addr,
    network: u32,
    /// Host part of the broadcast address; the last usable host is one
    /// below this.
    host_limit: u32,
    next_host: u32,
}

impl AddressPool {
    /// Create a pool over `base/mask`.
    ///
    /// The mask must be contiguous and leave at least two host bits
    /// (room for one usable host beside network and broadcast).
    pub fn new(base: Ipv4Addr, mask: Ipv4Addr) -> SimResult<Self> {
        let mask_bits = u32::from(mask);
        let host_bits = !mask_bits;
        // A contiguous mask inverts to 2^k - 1.
        if host_bits & host_bits.wrapping_add(1) != 0 {
            return Err(SimError::InvalidTopology(format!(
                "mask {} is not contiguous",
                mask
            )));
        }
        if host_bits < 3 {
            return Err(SimError::InvalidTopology(format!(
                "mask {} leaves no usable host addresses",
                mask
            )));
        }
        Ok(AddressPool {
            base,
            mask,
            network: u32::from(base) & mask_bits,
            host_limit: host_bits,
            next_host: 1,
        })
    }

    /// Allocate the next unused host address.
    ///
    /// Returns `.1`, `.2`, ... in order; fails with `PoolExhausted`
    /// once every usable host id has been handed out.
    pub fn allocate(&mut self) -> SimResult<Ipv4Addr> {
        if self.next_host >= self.host_limit {
            return Err(SimError::PoolExhausted {
                base: self.base,
                mask: self.mask,
            });
        }
        let addr = Ipv4Addr::from(self.network | self.next_host);
        self.next_host += 1;
        Ok(addr)
    }

    /// Usable host addresses in the subnet.
    pub fn capacity(&self) -> u32 {
        self.host_limit - 1
    }

    /// Addresses handed out so far.
    pub fn allocated(&self) -> u32 {
        self.next_host - 1
    }

    /// The subnet base address.
    pub fn base(&self) -> Ipv4Addr {
        self.base
    }

    /// The subnet mask.
    pub fn mask(&self) -> Ipv4Addr {
        self.mask
    }
}

impl std::fmt::Display for AddressPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.mask)
    }
}
