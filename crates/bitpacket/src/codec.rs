//! Scalar read/write engine: arithmetic values to and from field bit ranges.
//!
//! Values travel through a canonical 64-bit wire pattern: integers are
//! widened preserving sign, floats contribute their IEEE-754 bits at the
//! field's width. The pattern's low `bytes_count` bytes are laid out in
//! protocol byte order, shifted into place and merged into the working
//! buffer under the field's masks; reading runs the same steps in reverse
//! and finishes with sign extension or float decoding.

use crate::{
    bits::{self, sign_extend},
    errors::Error,
    field::{FieldMetadata, VisType},
    protocol::Protocol,
};

mod sealed {
    pub trait Sealed {}
}

/// Broad classification of a scalar type, used by the codec preconditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Unsigned,
    Signed,
    Float,
}

/// Arithmetic types a field can be read or written as.
///
/// Implemented for the fixed-width integers up to 64 bits and for
/// `f32`/`f64`. The choice is independent of the field's
/// [VisType](crate::field::VisType): any field may be read as any scalar,
/// with truncation and sign extension following the field's bit count.
pub trait Scalar: Copy + sealed::Sealed {
    const KIND: ScalarKind;

    /// Widens to the 64-bit wire pattern for a field of `bit_count` bits.
    fn to_wire(self, bit_count: usize) -> u64;

    /// Narrows an LSB-aligned wire pattern read from a field of `bit_count`
    /// bits.
    fn from_wire(wire: u64, bit_count: usize) -> Self;
}

macro_rules! unsigned_scalar {
    ($($int:ty),*) => {$(
        impl sealed::Sealed for $int {}

        impl Scalar for $int {
            const KIND: ScalarKind = ScalarKind::Unsigned;

            fn to_wire(self, _bit_count: usize) -> u64 {
                self as u64
            }

            fn from_wire(wire: u64, _bit_count: usize) -> Self {
                wire as $int
            }
        }
    )*};
}

macro_rules! signed_scalar {
    ($($int:ty),*) => {$(
        impl sealed::Sealed for $int {}

        impl Scalar for $int {
            const KIND: ScalarKind = ScalarKind::Signed;

            fn to_wire(self, _bit_count: usize) -> u64 {
                self as i64 as u64
            }

            fn from_wire(wire: u64, bit_count: usize) -> Self {
                sign_extend(wire, bit_count.min(64)) as $int
            }
        }
    )*};
}

unsigned_scalar!(u8, u16, u32, u64);
signed_scalar!(i8, i16, i32, i64);

impl sealed::Sealed for f32 {}

impl Scalar for f32 {
    const KIND: ScalarKind = ScalarKind::Float;

    fn to_wire(self, bit_count: usize) -> u64 {
        if bit_count == 32 {
            self.to_bits() as u64
        } else {
            (self as f64).to_bits()
        }
    }

    fn from_wire(wire: u64, bit_count: usize) -> Self {
        if bit_count == 32 {
            f32::from_bits(wire as u32)
        } else {
            f64::from_bits(wire) as f32
        }
    }
}

impl sealed::Sealed for f64 {}

impl Scalar for f64 {
    const KIND: ScalarKind = ScalarKind::Float;

    fn to_wire(self, bit_count: usize) -> u64 {
        if bit_count == 32 {
            (self as f32).to_bits() as u64
        } else {
            self.to_bits()
        }
    }

    fn from_wire(wire: u64, bit_count: usize) -> Self {
        if bit_count == 32 {
            f32::from_bits(wire as u32) as f64
        } else {
            f64::from_bits(wire)
        }
    }
}

fn check_preconditions<T: Scalar>(
    little_endian: bool,
    metadata: &FieldMetadata,
) -> Result<(), Error> {
    if metadata.bit_count == 0 {
        return Err(Error::BadInput);
    }
    if little_endian && metadata.bit_count > 8 && metadata.bit_count % 8 != 0 {
        return Err(Error::NotApplicable);
    }
    if T::KIND == ScalarKind::Float && metadata.bit_count != 32 && metadata.bit_count != 64 {
        return Err(Error::NotApplicable);
    }
    if metadata.bit_count > 64 {
        return Err(Error::NotApplicable);
    }
    Ok(())
}

impl Protocol {
    /// Writes `value` into the named field.
    pub fn write<T: Scalar>(&mut self, name: &str, value: T) -> Result<(), Error> {
        let metadata = match self.field_metadata(name) {
            Some(metadata) => *metadata,
            None => return Err(Error::FieldNotFound),
        };
        self.write_meta(&metadata, value)
    }

    /// Writes `value` into an ad-hoc bit range without a named field.
    pub fn write_ghost<T: Scalar>(
        &mut self,
        first_bit: usize,
        bit_count: usize,
        value: T,
    ) -> Result<(), Error> {
        self.write_meta(
            &FieldMetadata::new(first_bit, bit_count, VisType::default()),
            value,
        )
    }

    /// Reads the named field as `T`.
    pub fn read<T: Scalar>(&self, name: &str) -> Result<T, Error> {
        let metadata = match self.field_metadata(name) {
            Some(metadata) => metadata,
            None => return Err(Error::FieldNotFound),
        };
        self.read_meta(metadata)
    }

    /// Reads an ad-hoc bit range as `T`.
    pub fn read_ghost<T: Scalar>(&self, first_bit: usize, bit_count: usize) -> Result<T, Error> {
        self.read_meta(&FieldMetadata::new(first_bit, bit_count, VisType::default()))
    }

    /// Writes `values` as equal-width elements splitting the named field.
    ///
    /// On an element error the operation stops at the first failing index;
    /// earlier elements remain written.
    pub fn write_array<T: Scalar>(&mut self, name: &str, values: &[T]) -> Result<(), Error> {
        if values.is_empty() {
            return Err(Error::BadInput);
        }
        let metadata = match self.field_metadata(name) {
            Some(metadata) => *metadata,
            None => return Err(Error::FieldNotFound),
        };
        if metadata.bit_count % values.len() != 0 {
            return Err(Error::NotApplicable);
        }

        let width = metadata.bit_count / values.len();
        for (i, value) in values.iter().enumerate() {
            self.write_ghost(metadata.first_bit_ind + i * width, width, *value)?;
        }
        Ok(())
    }

    /// Writes `values` as equal-width elements splitting a caller-supplied
    /// bit range.
    pub fn write_ghost_array<T: Scalar>(
        &mut self,
        first_bit: usize,
        bit_count: usize,
        values: &[T],
    ) -> Result<(), Error> {
        if values.is_empty() {
            return Err(Error::BadInput);
        }
        if bit_count % values.len() != 0 {
            return Err(Error::NotApplicable);
        }

        let width = bit_count / values.len();
        for (i, value) in values.iter().enumerate() {
            self.write_ghost(first_bit + i * width, width, *value)?;
        }
        Ok(())
    }

    /// Fills `out` with equal-width elements splitting the named field.
    ///
    /// On an element error the operation stops at the first failing index;
    /// earlier elements remain filled.
    pub fn read_array<T: Scalar>(&self, name: &str, out: &mut [T]) -> Result<(), Error> {
        if out.is_empty() {
            return Err(Error::BadInput);
        }
        let metadata = match self.field_metadata(name) {
            Some(metadata) => *metadata,
            None => return Err(Error::FieldNotFound),
        };
        if metadata.bit_count % out.len() != 0 {
            return Err(Error::NotApplicable);
        }

        let width = metadata.bit_count / out.len();
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.read_ghost(metadata.first_bit_ind + i * width, width)?;
        }
        Ok(())
    }

    /// Fills `out` with equal-width elements splitting a caller-supplied bit
    /// range.
    pub fn read_ghost_array<T: Scalar>(
        &self,
        first_bit: usize,
        bit_count: usize,
        out: &mut [T],
    ) -> Result<(), Error> {
        if out.is_empty() {
            return Err(Error::BadInput);
        }
        if bit_count % out.len() != 0 {
            return Err(Error::NotApplicable);
        }

        let width = bit_count / out.len();
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.read_ghost(first_bit + i * width, width)?;
        }
        Ok(())
    }

    fn write_meta<T: Scalar>(&mut self, metadata: &FieldMetadata, value: T) -> Result<(), Error> {
        check_preconditions::<T>(self.is_little_endian(), metadata)?;

        // Low `bytes_count` bytes of the wire pattern, in protocol byte
        // order, with one spill byte of headroom for the shift below.
        let bc = metadata.bytes_count;
        let wire = value.to_wire(metadata.bit_count);
        let mut raw = [0u8; 9];
        if self.is_little_endian() {
            raw[..bc].copy_from_slice(&wire.to_le_bytes()[..bc]);
        } else {
            raw[..bc].copy_from_slice(&wire.to_be_bytes()[8 - bc..]);
        }

        let first_byte = metadata.first_byte_ind;
        let touched = metadata.touched_bytes_count;
        let mut buffer = match self.working_buffer_mut() {
            Some(buffer) => buffer,
            None => return Err(Error::BadInput),
        };
        if first_byte + touched > buffer.len() {
            return Err(Error::BadInput);
        }

        if metadata.left_spacing == 0 && metadata.right_spacing == 0 {
            buffer[first_byte..first_byte + bc].copy_from_slice(&raw[..bc]);
            return Ok(());
        }

        // Align the value's last bit with the field's last bit in the
        // buffer. When the leading raw byte ends up empty after the shift,
        // the payload starts one byte in.
        let mut payload = 0;
        if metadata.right_spacing > 0 {
            bits::shift_right(&mut raw[..bc + 1], 8 - metadata.right_spacing);
            let transferable = metadata.bit_count % 8;
            if transferable != 0 && 8 - metadata.right_spacing >= transferable {
                payload = 1;
            }
        }

        for i in 0..touched {
            let mask = if i == 0 {
                metadata.first_mask
            } else if i == touched - 1 {
                metadata.last_mask
            } else {
                0xFF
            };
            let byte = &mut buffer[first_byte + i];
            *byte = (*byte & !mask) | (raw[payload + i] & mask);
        }
        Ok(())
    }

    fn read_meta<T: Scalar>(&self, metadata: &FieldMetadata) -> Result<T, Error> {
        check_preconditions::<T>(self.is_little_endian(), metadata)?;

        let buffer = match self.working_buffer() {
            Some(buffer) => buffer,
            None => return Err(Error::BadInput),
        };
        let first_byte = metadata.first_byte_ind;
        let touched = metadata.touched_bytes_count;
        if first_byte + touched > buffer.len() {
            return Err(Error::BadInput);
        }

        let mut scratch = [0u8; 9];
        scratch[..touched].copy_from_slice(&buffer[first_byte..first_byte + touched]);

        // Mask off neighboring fields, then align the value's last bit with
        // the end of the touched span.
        if metadata.left_spacing > 0 || metadata.right_spacing > 0 {
            scratch[0] &= metadata.first_mask;
            if touched > 1 {
                scratch[touched - 1] &= metadata.last_mask;
            }
            if metadata.right_spacing > 0 {
                bits::shift_right(&mut scratch[..touched], metadata.right_spacing);
            }
        }

        let bc = metadata.bytes_count;
        let aligned = &scratch[touched - bc..touched];
        let mut wide = [0u8; 8];
        let wire = if self.is_little_endian() {
            wide[..bc].copy_from_slice(aligned);
            u64::from_le_bytes(wide)
        } else {
            wide[8 - bc..].copy_from_slice(aligned);
            u64::from_be_bytes(wide)
        };
        Ok(T::from_wire(wire, metadata.bit_count))
    }
}
