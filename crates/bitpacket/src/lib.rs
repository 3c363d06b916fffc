//! # bitpacket
//!
//! A library for describing binary packets as ordered sequences of named
//! bit fields and reading/writing arithmetic values at arbitrary bit
//! offsets.
//!
//! Fields are packed back to back with no padding: each field starts at the
//! bit where the previous one ends, and may be 1 bit or 130 bits wide.
//! Multi-byte values honor a configurable protocol endianness independent of
//! the host, signed values keep two's-complement semantics at widths that
//! match no native integer type, and the backing buffer is either owned by
//! the packet or shared with the caller.
//!
//! ## Example
//!
//! ```
//! use bitpacket::field::FieldInit;
//! use bitpacket::protocol::Protocol;
//!
//! let mut packet = Protocol::default();
//! packet.append_field(FieldInit::new("version", 3), true).unwrap();
//! packet.append_field(FieldInit::new("payload", 13), true).unwrap();
//!
//! packet.write("version", 5u8).unwrap();
//! packet.write("payload", -42i16).unwrap();
//! assert_eq!(packet.read::<u8>("version").unwrap(), 5);
//! assert_eq!(packet.read::<i16>("payload").unwrap(), -42);
//! ```

pub mod bits;
pub mod buffer;
pub mod codec;
pub mod errors;
pub mod field;
pub mod protocol;
#[cfg(feature = "serde")]
pub mod serde;
