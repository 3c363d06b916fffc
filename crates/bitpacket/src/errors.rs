#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A caller-violated precondition: empty or duplicate field name, zero
    /// bit count, missing or too-short working buffer, empty array.
    BadInput,
    /// The operation is well-defined but unsupported for this configuration:
    /// floating point at widths other than 32/64, fields wider than 64 bits,
    /// little-endian sub-byte fields, array length not dividing the field.
    NotApplicable,
    /// The looked-up name is not part of the layout.
    FieldNotFound,
}
