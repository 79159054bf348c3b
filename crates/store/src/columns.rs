//! Columnar storage - one growable typed buffer per schema field
//!
//! Buffers are addressed by slot and grown with type defaults before any
//! write, so no access ever indexes out of bounds. Freed slots are reset to
//! defaults; reads past the highest written slot return the type default.
//!
//! Buffers are exclusively owned by their collection; nothing else retains
//! references across `clear_slot`/`reset`.

use folio_core::{ColumnType, Error, FieldValue, Fields, Result, Schema};
use std::sync::Arc;

/// One typed buffer
#[derive(Debug)]
enum ColumnBuffer {
    Str(Vec<String>),
    Num(Vec<f64>),
    Bool(Vec<bool>),
    StrArray(Vec<Vec<String>>),
    NumArray(Vec<Vec<f64>>),
    /// `None` cells are absent embeddings (the vector default)
    Vector(Vec<Option<Vec<f32>>>),
}

impl ColumnBuffer {
    fn for_type(ty: ColumnType) -> Self {
        match ty {
            ColumnType::String => ColumnBuffer::Str(Vec::new()),
            ColumnType::Number | ColumnType::Timestamp => ColumnBuffer::Num(Vec::new()),
            ColumnType::Boolean => ColumnBuffer::Bool(Vec::new()),
            ColumnType::StringArray => ColumnBuffer::StrArray(Vec::new()),
            ColumnType::NumberArray => ColumnBuffer::NumArray(Vec::new()),
            ColumnType::Vector { .. } => ColumnBuffer::Vector(Vec::new()),
        }
    }

    /// Grow with defaults so `slot` is addressable
    fn grow_to(&mut self, slot: u32) {
        let len = slot as usize + 1;
        match self {
            ColumnBuffer::Str(buf) => buf.resize(len.max(buf.len()), String::new()),
            ColumnBuffer::Num(buf) => buf.resize(len.max(buf.len()), 0.0),
            ColumnBuffer::Bool(buf) => buf.resize(len.max(buf.len()), false),
            ColumnBuffer::StrArray(buf) => buf.resize(len.max(buf.len()), Vec::new()),
            ColumnBuffer::NumArray(buf) => buf.resize(len.max(buf.len()), Vec::new()),
            ColumnBuffer::Vector(buf) => buf.resize(len.max(buf.len()), None),
        }
    }

    /// Write an already-conformed value at `slot`
    fn write(&mut self, slot: u32, value: FieldValue) {
        self.grow_to(slot);
        let at = slot as usize;
        match (self, value) {
            (ColumnBuffer::Str(buf), FieldValue::String(s)) => buf[at] = s,
            (ColumnBuffer::Num(buf), FieldValue::Number(n)) => buf[at] = n,
            (ColumnBuffer::Bool(buf), FieldValue::Bool(b)) => buf[at] = b,
            (ColumnBuffer::StrArray(buf), FieldValue::StringArray(a)) => buf[at] = a,
            (ColumnBuffer::NumArray(buf), FieldValue::NumberArray(a)) => buf[at] = a,
            (ColumnBuffer::Vector(buf), FieldValue::Vector(v)) => buf[at] = Some(v),
            (ColumnBuffer::Vector(buf), FieldValue::Null) => buf[at] = None,
            // Schema::conform ran before us; anything else is unreachable
            _ => debug_assert!(false, "unconformed value reached column buffer"),
        }
    }

    /// Read the value at `slot`; defaults beyond the written range
    fn read(&self, slot: u32) -> FieldValue {
        let at = slot as usize;
        match self {
            ColumnBuffer::Str(buf) => {
                FieldValue::String(buf.get(at).cloned().unwrap_or_default())
            }
            ColumnBuffer::Num(buf) => FieldValue::Number(buf.get(at).copied().unwrap_or(0.0)),
            ColumnBuffer::Bool(buf) => FieldValue::Bool(buf.get(at).copied().unwrap_or(false)),
            ColumnBuffer::StrArray(buf) => {
                FieldValue::StringArray(buf.get(at).cloned().unwrap_or_default())
            }
            ColumnBuffer::NumArray(buf) => {
                FieldValue::NumberArray(buf.get(at).cloned().unwrap_or_default())
            }
            ColumnBuffer::Vector(buf) => match buf.get(at).and_then(|cell| cell.clone()) {
                Some(v) => FieldValue::Vector(v),
                None => FieldValue::Null,
            },
        }
    }

    fn clear_slot(&mut self, slot: u32) {
        let at = slot as usize;
        match self {
            ColumnBuffer::Str(buf) => {
                if let Some(cell) = buf.get_mut(at) {
                    cell.clear();
                }
            }
            ColumnBuffer::Num(buf) => {
                if let Some(cell) = buf.get_mut(at) {
                    *cell = 0.0;
                }
            }
            ColumnBuffer::Bool(buf) => {
                if let Some(cell) = buf.get_mut(at) {
                    *cell = false;
                }
            }
            ColumnBuffer::StrArray(buf) => {
                if let Some(cell) = buf.get_mut(at) {
                    cell.clear();
                }
            }
            ColumnBuffer::NumArray(buf) => {
                if let Some(cell) = buf.get_mut(at) {
                    cell.clear();
                }
            }
            ColumnBuffer::Vector(buf) => {
                if let Some(cell) = buf.get_mut(at) {
                    *cell = None;
                }
            }
        }
    }
}

/// Per-field columnar storage addressed by slot
#[derive(Debug)]
pub struct ColumnStore {
    schema: Arc<Schema>,
    /// One buffer per schema field, in declaration order
    buffers: Vec<ColumnBuffer>,
}

impl ColumnStore {
    /// Create empty buffers for every schema field
    pub fn new(schema: Arc<Schema>) -> Self {
        let buffers = schema.fields().map(|(_, ty)| ColumnBuffer::for_type(ty)).collect();
        ColumnStore { schema, buffers }
    }

    /// The schema this store was built for
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Write one field at `slot`, conforming the value first.
    ///
    /// # Errors
    ///
    /// `UnknownColumn`, `TypeMismatch` or `DimensionMismatch` per
    /// [`Schema::conform`]; the buffer is untouched on error.
    pub fn set(&mut self, field: &str, slot: u32, value: FieldValue) -> Result<()> {
        let value = self.schema.conform(field, value)?;
        let pos = self
            .schema
            .position(field)
            .ok_or_else(|| Error::UnknownColumn(field.to_string()))?;
        self.buffers[pos].write(slot, value);
        Ok(())
    }

    /// Read one field at `slot`
    ///
    /// # Errors
    ///
    /// `UnknownColumn` if the field is not in the schema.
    pub fn get(&self, field: &str, slot: u32) -> Result<FieldValue> {
        let pos = self
            .schema
            .position(field)
            .ok_or_else(|| Error::UnknownColumn(field.to_string()))?;
        Ok(self.buffers[pos].read(slot))
    }

    /// Replace the whole row: provided fields are written, omitted schema
    /// fields are explicitly reset to their type default.
    ///
    /// All values are conformed before any buffer is touched, so a failing
    /// field leaves the row unchanged.
    pub fn set_row(&mut self, slot: u32, fields: &Fields) -> Result<()> {
        let mut conformed: Vec<(usize, FieldValue)> = Vec::with_capacity(self.schema.len());
        for (pos, (name, ty)) in self.schema.fields().enumerate() {
            let value = match fields.get(name) {
                Some(value) => self.schema.conform(name, value.clone())?,
                None => ty.default_value(),
            };
            conformed.push((pos, value));
        }
        // Reject extraneous fields instead of silently dropping them
        for name in fields.keys() {
            if !self.schema.contains(name) {
                return Err(Error::UnknownColumn(name.clone()));
            }
        }
        for (pos, value) in conformed {
            self.buffers[pos].write(slot, value);
        }
        Ok(())
    }

    /// Merge into the row: only the provided fields are rewritten.
    pub fn merge_row(&mut self, slot: u32, fields: &Fields) -> Result<()> {
        let mut conformed: Vec<(usize, FieldValue)> = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            let value = self.schema.conform(name, value.clone())?;
            let pos = self
                .schema
                .position(name)
                .ok_or_else(|| Error::UnknownColumn(name.clone()))?;
            conformed.push((pos, value));
        }
        for (pos, value) in conformed {
            self.buffers[pos].write(slot, value);
        }
        Ok(())
    }

    /// Materialize every field at `slot`
    pub fn row(&self, slot: u32) -> Fields {
        let mut fields = Fields::new();
        for (pos, (name, _)) in self.schema.fields().enumerate() {
            fields.insert(name.to_string(), self.buffers[pos].read(slot));
        }
        fields
    }

    /// Borrow the raw embedding at `slot` without materializing anything.
    ///
    /// Returns `None` for absent embeddings.
    ///
    /// # Errors
    ///
    /// `UnknownColumn` if the field is not in the schema.
    pub fn vector(&self, field: &str, slot: u32) -> Result<Option<&[f32]>> {
        let pos = self
            .schema
            .position(field)
            .ok_or_else(|| Error::UnknownColumn(field.to_string()))?;
        match &self.buffers[pos] {
            ColumnBuffer::Vector(buf) => Ok(buf
                .get(slot as usize)
                .and_then(|cell| cell.as_deref())),
            _ => Ok(None),
        }
    }

    /// Reset every field at `slot` to its type default
    pub fn clear_slot(&mut self, slot: u32) {
        for buffer in &mut self.buffers {
            buffer.clear_slot(slot);
        }
    }

    /// Drop all buffers back to empty
    pub fn reset(&mut self) {
        for (buffer, (_, ty)) in self.buffers.iter_mut().zip(self.schema.fields()) {
            *buffer = ColumnBuffer::for_type(ty);
        }
    }
}
