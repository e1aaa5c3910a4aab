//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers prevent common bugs like passing an object address
//! where a managed thread id is expected, and make function signatures more
//! expressive.

use serde::Serialize;
use std::fmt;

/// Managed thread id
///
/// The id assigned by the managed runtime, as reported in the dump. This is
/// NOT the OS thread id; a managed thread keeps its id even when the runtime
/// migrates it across OS threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ThreadId(pub u32);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thread {}", self.0)
    }
}

impl From<u32> for ThreadId {
    fn from(id: u32) -> Self {
        ThreadId(id)
    }
}

/// Address of an object on the GC heap
///
/// Addresses come straight out of the dump and are only meaningful within it.
/// Displayed in hex because that is how every debugger renders them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectAddress(pub u64);

impl fmt::Display for ObjectAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl From<u64> for ObjectAddress {
    fn from(addr: u64) -> Self {
        ObjectAddress(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_id_display() {
        assert_eq!(ThreadId(7).to_string(), "Thread 7");
    }

    #[test]
    fn test_object_address_display() {
        assert_eq!(ObjectAddress(0xdead_beef).to_string(), "0xdeadbeef");
        assert_eq!(ObjectAddress(0).to_string(), "0x0");
    }

    #[test]
    fn test_thread_id_ordering() {
        // Sets of owners must serialize in a stable order
        let mut ids = vec![ThreadId(9), ThreadId(1), ThreadId(4)];
        ids.sort();
        assert_eq!(ids, vec![ThreadId(1), ThreadId(4), ThreadId(9)]);
    }
}
