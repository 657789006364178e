use byteorder::{ByteOrder, LittleEndian};
use webnn_structures::{ObjectHandle, WebnnDataError};

/// Bytes taken by the `u32` length in front of a string.
pub const STRING_LENGTH_BYTE_COUNT: usize = 4;
/// Bytes taken by the `u64` length in front of a raw byte region.
pub const BYTES_LENGTH_BYTE_COUNT: usize = 8;
/// Bytes taken by the `u32` element count in front of an integer array.
pub const ARRAY_COUNT_BYTE_COUNT: usize = 4;

pub fn sized_string_byte_count(value: &str) -> usize {
    STRING_LENGTH_BYTE_COUNT + value.len()
}

pub fn sized_bytes_byte_count(value: &[u8]) -> usize {
    BYTES_LENGTH_BYTE_COUNT + value.len()
}

/// Byte count of a counted array of 4 byte elements (`i32`, `u32`, `f32`).
pub fn sized_array_byte_count(element_count: usize) -> usize {
    ARRAY_COUNT_BYTE_COUNT + element_count * 4
}

//region Writer

/// Bounds-checked little endian writer over a fixed slice handed out by a transport.
#[derive(Debug)]
pub struct WireByteWriter<'a> {
    bytes: &'a mut [u8],
    position: usize,
}

impl<'a> WireByteWriter<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    fn try_claim(&mut self, count: usize) -> Result<&mut [u8], WebnnDataError> {
        let start = self.position;
        let end = start
            .checked_add(count)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                WebnnDataError::SerializationError(format!(
                    "Cannot write {} bytes at offset {} into a {} byte region",
                    count,
                    start,
                    self.bytes.len()
                ))
            })?;
        self.position = end;
        Ok(&mut self.bytes[start..end])
    }

    pub fn try_write_u8(&mut self, value: u8) -> Result<(), WebnnDataError> {
        self.try_claim(1)?[0] = value;
        Ok(())
    }

    pub fn try_write_bool(&mut self, value: bool) -> Result<(), WebnnDataError> {
        self.try_write_u8(value as u8)
    }

    pub fn try_write_u32(&mut self, value: u32) -> Result<(), WebnnDataError> {
        LittleEndian::write_u32(self.try_claim(4)?, value);
        Ok(())
    }

    pub fn try_write_i32(&mut self, value: i32) -> Result<(), WebnnDataError> {
        LittleEndian::write_i32(self.try_claim(4)?, value);
        Ok(())
    }

    pub fn try_write_u64(&mut self, value: u64) -> Result<(), WebnnDataError> {
        LittleEndian::write_u64(self.try_claim(8)?, value);
        Ok(())
    }

    pub fn try_write_f32(&mut self, value: f32) -> Result<(), WebnnDataError> {
        LittleEndian::write_f32(self.try_claim(4)?, value);
        Ok(())
    }

    pub fn try_write_usize(&mut self, value: usize) -> Result<(), WebnnDataError> {
        self.try_write_u64(value as u64)
    }

    pub fn try_write_handle(&mut self, handle: ObjectHandle) -> Result<(), WebnnDataError> {
        self.try_write_u32(handle.id)?;
        self.try_write_u32(handle.generation)
    }

    /// Absent handles are written as the null handle.
    pub fn try_write_optional_handle(
        &mut self,
        handle: Option<ObjectHandle>,
    ) -> Result<(), WebnnDataError> {
        self.try_write_handle(handle.unwrap_or(ObjectHandle::NULL))
    }

    pub fn try_write_string(&mut self, value: &str) -> Result<(), WebnnDataError> {
        let length = u32::try_from(value.len()).map_err(|_| {
            WebnnDataError::SerializationError(format!(
                "String of {} bytes does not fit a u32 length",
                value.len()
            ))
        })?;
        self.try_write_u32(length)?;
        self.try_write_raw(value.as_bytes())
    }

    pub fn try_write_bytes(&mut self, value: &[u8]) -> Result<(), WebnnDataError> {
        self.try_write_usize(value.len())?;
        self.try_write_raw(value)
    }

    pub fn try_write_raw(&mut self, value: &[u8]) -> Result<(), WebnnDataError> {
        self.try_claim(value.len())?.copy_from_slice(value);
        Ok(())
    }

    fn try_write_count(&mut self, count: usize) -> Result<(), WebnnDataError> {
        let count = u32::try_from(count).map_err(|_| {
            WebnnDataError::SerializationError(format!("Array of {} elements is too long", count))
        })?;
        self.try_write_u32(count)
    }

    pub fn try_write_i32_array(&mut self, values: &[i32]) -> Result<(), WebnnDataError> {
        self.try_write_count(values.len())?;
        for value in values {
            self.try_write_i32(*value)?;
        }
        Ok(())
    }

    pub fn try_write_u32_array(&mut self, values: &[u32]) -> Result<(), WebnnDataError> {
        self.try_write_count(values.len())?;
        for value in values {
            self.try_write_u32(*value)?;
        }
        Ok(())
    }

    pub fn try_write_handle_array(&mut self, values: &[ObjectHandle]) -> Result<(), WebnnDataError> {
        self.try_write_count(values.len())?;
        for value in values {
            self.try_write_handle(*value)?;
        }
        Ok(())
    }
}

//endregion

//region Reader

/// Bounds-checked little endian reader. Every read fails cleanly on a short buffer.
#[derive(Debug, Clone)]
pub struct WireByteReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> WireByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    fn try_take(&mut self, count: usize) -> Result<&'a [u8], WebnnDataError> {
        let start = self.position;
        let end = start
            .checked_add(count)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                WebnnDataError::DeserializationError(format!(
                    "Buffer underrun reading {} bytes at offset {} of {}",
                    count,
                    start,
                    self.bytes.len()
                ))
            })?;
        self.position = end;
        Ok(&self.bytes[start..end])
    }

    pub fn try_read_u8(&mut self) -> Result<u8, WebnnDataError> {
        Ok(self.try_take(1)?[0])
    }

    pub fn try_read_bool(&mut self) -> Result<bool, WebnnDataError> {
        match self.try_read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WebnnDataError::DeserializationError(format!(
                "Invalid boolean byte {}",
                other
            ))),
        }
    }

    pub fn try_read_u32(&mut self) -> Result<u32, WebnnDataError> {
        Ok(LittleEndian::read_u32(self.try_take(4)?))
    }

    pub fn try_read_i32(&mut self) -> Result<i32, WebnnDataError> {
        Ok(LittleEndian::read_i32(self.try_take(4)?))
    }

    pub fn try_read_u64(&mut self) -> Result<u64, WebnnDataError> {
        Ok(LittleEndian::read_u64(self.try_take(8)?))
    }

    pub fn try_read_f32(&mut self) -> Result<f32, WebnnDataError> {
        Ok(LittleEndian::read_f32(self.try_take(4)?))
    }

    pub fn try_read_usize(&mut self) -> Result<usize, WebnnDataError> {
        let value = self.try_read_u64()?;
        usize::try_from(value).map_err(|_| {
            WebnnDataError::DeserializationError(format!(
                "Length {} does not fit this platform",
                value
            ))
        })
    }

    pub fn try_read_handle(&mut self) -> Result<ObjectHandle, WebnnDataError> {
        let id = self.try_read_u32()?;
        let generation = self.try_read_u32()?;
        Ok(ObjectHandle::new(id, generation))
    }

    /// The null handle reads back as `None`.
    pub fn try_read_optional_handle(&mut self) -> Result<Option<ObjectHandle>, WebnnDataError> {
        let handle = self.try_read_handle()?;
        Ok((!handle.is_null()).then_some(handle))
    }

    pub fn try_read_string(&mut self) -> Result<String, WebnnDataError> {
        let length = self.try_read_u32()? as usize;
        let raw = self.try_take(length)?;
        String::from_utf8(raw.to_vec()).map_err(|error| {
            WebnnDataError::DeserializationError(format!("String is not valid UTF-8: {}", error))
        })
    }

    pub fn try_read_bytes(&mut self) -> Result<Vec<u8>, WebnnDataError> {
        let length = self.try_read_usize()?;
        Ok(self.try_take(length)?.to_vec())
    }

    /// Reads a count and checks the whole array is present before allocating for it.
    fn try_take_array(&mut self, element_byte_count: usize) -> Result<&'a [u8], WebnnDataError> {
        let count = self.try_read_u32()? as usize;
        let byte_count = count.checked_mul(element_byte_count).ok_or_else(|| {
            WebnnDataError::DeserializationError(format!("Array count {} overflows", count))
        })?;
        self.try_take(byte_count)
    }

    pub fn try_read_i32_array(&mut self) -> Result<Vec<i32>, WebnnDataError> {
        let raw = self.try_take_array(4)?;
        Ok(raw.chunks_exact(4).map(LittleEndian::read_i32).collect())
    }

    pub fn try_read_u32_array(&mut self) -> Result<Vec<u32>, WebnnDataError> {
        let raw = self.try_take_array(4)?;
        Ok(raw.chunks_exact(4).map(LittleEndian::read_u32).collect())
    }

    pub fn try_read_handle_array(&mut self) -> Result<Vec<ObjectHandle>, WebnnDataError> {
        let raw = self.try_take_array(ObjectHandle::NUMBER_BYTES)?;
        Ok(raw
            .chunks_exact(ObjectHandle::NUMBER_BYTES)
            .map(|chunk| {
                ObjectHandle::new(
                    LittleEndian::read_u32(&chunk[0..4]),
                    LittleEndian::read_u32(&chunk[4..8]),
                )
            })
            .collect())
    }
}

//endregion
