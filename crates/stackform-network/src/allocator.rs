//! Subnet address allocation.
//!
//! Carves fixed-size blocks out of the VPC range. Index `n` always maps
//! to the `n`-th block, so separate allocation passes over the same
//! zone list can never hand out the same range twice.

use std::net::Ipv4Addr;

use stackform_core::{Cidr, SynthError, SynthResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrAllocator {
    base: Cidr,
    subnet_prefix: u8,
}

impl CidrAllocator {
    pub fn new(base: Cidr, subnet_prefix: u8) -> SynthResult<Self> {
        if subnet_prefix < base.prefix() || subnet_prefix > 32 {
            return Err(SynthError::config(
                "network.subnet_prefix",
                format!("/{subnet_prefix} does not fit inside {base}"),
            ));
        }
        Ok(Self { base, subnet_prefix })
    }

    pub fn base(&self) -> Cidr {
        self.base
    }

    /// Highest valid index. Index 0 is the block at the base address and
    /// is never handed out.
    pub fn capacity(&self) -> u64 {
        let bits = u32::from(self.subnet_prefix - self.base.prefix());
        (1u64 << bits) - 1
    }

    /// The block for `index`. Fails for `index <= 0` and for indices past
    /// the end of the base range; never wraps.
    pub fn allocate(&self, index: i64) -> SynthResult<Cidr> {
        if index <= 0 {
            return Err(SynthError::InvalidAllocation {
                index,
                reason: "subnet indices start at 1".to_string(),
            });
        }
        let capacity = self.capacity();
        if index as u64 > capacity {
            return Err(SynthError::InvalidAllocation {
                index,
                reason: format!("{} holds only {capacity} /{} blocks", self.base, self.subnet_prefix),
            });
        }

        let block_size = 1u64 << (32 - u32::from(self.subnet_prefix));
        let offset = index as u64 * block_size;
        let network = u64::from(u32::from(self.base.network())) + offset;
        let network = u32::try_from(network).map_err(|_| SynthError::InvalidAllocation {
            index,
            reason: "block lies past the end of the address space".to_string(),
        })?;
        Cidr::new(Ipv4Addr::from(network), self.subnet_prefix)
    }
}
