//! Protocol layout and buffer management.

use std::collections::HashMap;
use std::ops::Range;

use crate::{
    buffer::{BufferSource, SharedBuffer, WorkingBuffer, WorkingBufferMut},
    errors::Error,
    field::{FieldInit, FieldMetadata, VisType},
};

/// A bit-packed packet description together with its backing storage.
///
/// Fields are appended in order and packed back to back: each field starts
/// at the bit where the previous one ends. The internal buffer is always
/// sized to exactly `ceil(bit_len / 8)` bytes; reads and writes may instead
/// target a caller-provided external buffer selected via [BufferSource].
///
/// Cloning deep-copies the internal buffer and the field metadata, and
/// shares the external buffer handle with the original.
#[derive(Debug, Clone)]
pub struct Protocol {
    fields: Vec<String>,
    metadata: HashMap<String, FieldMetadata>,
    internal: Vec<u8>,
    external: Option<SharedBuffer>,
    source: BufferSource,
    little_endian: bool,
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::new(false, BufferSource::Internal, None)
    }
}

impl Protocol {
    pub fn new(
        little_endian: bool,
        source: BufferSource,
        external: Option<SharedBuffer>,
    ) -> Self {
        Protocol {
            fields: Vec::new(),
            metadata: HashMap::new(),
            internal: Vec::new(),
            external,
            source,
            little_endian,
        }
    }

    /// Builds a protocol from an ordered field list. If any append fails the
    /// layout is cleared and the instance is returned with an empty layout.
    pub fn with_fields(
        fields: Vec<FieldInit>,
        little_endian: bool,
        source: BufferSource,
        external: Option<SharedBuffer>,
    ) -> Self {
        let mut protocol = Protocol::new(little_endian, source, external);
        for init in fields {
            if protocol.append_field(init, true).is_err() {
                let _ = protocol.clear_protocol();
                break;
            }
        }
        protocol
    }

    /// Appends a field starting at the current end of the layout.
    ///
    /// With `preserve` the internal buffer's old contents are carried over,
    /// clipped to the shorter of the two lengths; otherwise the buffer is
    /// zero-filled.
    pub fn append_field(&mut self, init: FieldInit, preserve: bool) -> Result<(), Error> {
        if init.name.is_empty() || init.bit_count == 0 || self.metadata.contains_key(&init.name) {
            return Err(Error::BadInput);
        }
        if init.vis_type == VisType::FloatingPoint && init.bit_count != 32 && init.bit_count != 64 {
            return Err(Error::NotApplicable);
        }

        let metadata = FieldMetadata::new(self.bit_len(), init.bit_count, init.vis_type);
        self.metadata.insert(init.name.clone(), metadata);
        self.fields.push(init.name);

        if preserve {
            self.update_internal_buffer();
        } else {
            self.reallocate_internal_buffer();
        }
        Ok(())
    }

    /// Appends every field of `other`, in `other`'s order.
    ///
    /// Atomic: if any of `other`'s names already exists locally, nothing is
    /// appended.
    pub fn append_protocol(&mut self, other: &Protocol, preserve: bool) -> Result<(), Error> {
        for name in &other.fields {
            if self.metadata.contains_key(name) {
                return Err(Error::BadInput);
            }
        }

        for name in &other.fields {
            let metadata = other.metadata[name];
            self.append_field(
                FieldInit {
                    name: name.clone(),
                    bit_count: metadata.bit_count,
                    vis_type: metadata.vis_type,
                },
                preserve,
            )?;
        }
        Ok(())
    }

    /// Removes a field anywhere in the layout; every subsequent field is
    /// renumbered down by the removed width.
    pub fn remove_field(&mut self, name: &str, preserve: bool) -> Result<(), Error> {
        let pos = match self.fields.iter().position(|field| field == name) {
            Some(pos) => pos,
            None => return Err(Error::FieldNotFound),
        };
        let removed = match self.metadata.remove(name) {
            Some(metadata) => metadata,
            None => return Err(Error::FieldNotFound),
        };
        self.fields.remove(pos);

        for follower in &self.fields[pos..] {
            if let Some(metadata) = self.metadata.get_mut(follower) {
                *metadata = FieldMetadata::new(
                    metadata.first_bit_ind - removed.bit_count,
                    metadata.bit_count,
                    metadata.vis_type,
                );
            }
        }

        if preserve {
            self.update_internal_buffer();
        } else {
            self.reallocate_internal_buffer();
        }
        Ok(())
    }

    /// Removes the last field of the layout.
    pub fn remove_last_field(&mut self, preserve: bool) -> Result<(), Error> {
        let name = match self.fields.pop() {
            Some(name) => name,
            None => return Err(Error::NotApplicable),
        };
        self.metadata.remove(&name);

        if preserve {
            self.update_internal_buffer();
        } else {
            self.reallocate_internal_buffer();
        }
        Ok(())
    }

    /// Drops every field; the internal buffer shrinks to zero length.
    pub fn clear_protocol(&mut self) -> Result<(), Error> {
        if self.fields.is_empty() {
            return Err(Error::NotApplicable);
        }
        self.fields.clear();
        self.metadata.clear();
        self.reallocate_internal_buffer();
        Ok(())
    }

    /// Field names in layout order.
    pub fn field_names(&self) -> &[String] {
        &self.fields
    }

    pub fn field_metadata(&self, name: &str) -> Option<&FieldMetadata> {
        self.metadata.get(name)
    }

    /// Total packed length of the layout in bits.
    pub fn bit_len(&self) -> usize {
        match self.fields.last().and_then(|name| self.metadata.get(name)) {
            Some(last) => last.first_bit_ind + last.bit_count,
            None => 0,
        }
    }

    pub fn is_little_endian(&self) -> bool {
        self.little_endian
    }

    pub fn set_is_little_endian(&mut self, little_endian: bool) {
        self.little_endian = little_endian;
    }

    pub fn buffer_source(&self) -> BufferSource {
        self.source
    }

    /// Switches which buffer reads and writes target. The internal buffer
    /// persists across switches.
    pub fn set_buffer_source(&mut self, source: BufferSource) {
        self.source = source;
    }

    pub fn internal_buffer(&self) -> &[u8] {
        &self.internal
    }

    pub fn internal_buffer_len(&self) -> usize {
        self.internal.len()
    }

    pub fn external_buffer(&self) -> Option<&SharedBuffer> {
        self.external.as_ref()
    }

    /// Replaces the external buffer handle. Takes effect immediately when
    /// the external source is selected.
    pub fn set_external_buffer(&mut self, external: SharedBuffer) {
        self.external = Some(external);
    }

    /// View of the buffer reads currently target, or `None` when the
    /// external source is selected but no external buffer is set.
    pub fn working_buffer(&self) -> Option<WorkingBuffer<'_>> {
        match self.source {
            BufferSource::Internal => Some(WorkingBuffer::Internal(&self.internal)),
            BufferSource::External => self
                .external
                .as_ref()
                .map(|buffer| WorkingBuffer::External(buffer.borrow())),
        }
    }

    /// Mutable counterpart of [Protocol::working_buffer].
    pub fn working_buffer_mut(&mut self) -> Option<WorkingBufferMut<'_>> {
        match self.source {
            BufferSource::Internal => Some(WorkingBufferMut::Internal(&mut self.internal)),
            BufferSource::External => self
                .external
                .as_ref()
                .map(|buffer| WorkingBufferMut::External(buffer.borrow_mut())),
        }
    }

    /// Zeroes the working buffer over the layout's byte span, clipped to the
    /// buffer's actual length. No-op when the layout is empty.
    pub fn clear_working_buffer(&mut self) {
        if self.fields.is_empty() {
            return;
        }
        let span = self.internal.len();
        if let Some(mut buffer) = self.working_buffer_mut() {
            let len = span.min(buffer.len());
            buffer[..len].fill(0);
        }
    }

    /// Byte range of the working buffer touched by the named field, to be
    /// used as an index into [Protocol::working_buffer].
    pub fn field_range(&self, name: &str) -> Result<Range<usize>, Error> {
        match self.metadata.get(name) {
            Some(m) => Ok(m.first_byte_ind..m.first_byte_ind + m.touched_bytes_count),
            None => Err(Error::FieldNotFound),
        }
    }

    fn reallocate_internal_buffer(&mut self) {
        let bits = self.bit_len();
        self.internal = vec![0; (bits + 7) / 8];
    }

    fn update_internal_buffer(&mut self) {
        let old = std::mem::take(&mut self.internal);
        self.reallocate_internal_buffer();
        let len = old.len().min(self.internal.len());
        self.internal[..len].copy_from_slice(&old[..len]);
    }
}
