//! The memory side of the simulator: a byte-addressable little-endian RAM
//! image plus the [`IoDevice`] seam external tools (debugger, loader) use.

pub mod ram;

/// Byte-granular access to an addressable device.
pub trait IoDevice {
    type Address;
    type Value;

    fn read_at(&self, address: Self::Address) -> Self::Value;
    fn write_at(&mut self, address: Self::Address, value: Self::Value);
}
