//! Conversion between DICOM file bytes and in-memory records.

use dicom_object::file::ReadPreamble;
use dicom_object::{DefaultDicomObject, OpenFileOptions};
use thiserror::Error;

pub const PREAMBLE_LENGTH: usize = 128;
const MAGIC_CODE: &[u8; 4] = b"DICM";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Read error: {}", .0.to_lowercase())]
    ReadError(String),

    #[error("Write error: {}", .0.to_lowercase())]
    WriteError(String),

    #[error("not a DICOM file: magic code 'DICM' not found")]
    MissingMagicCode,
}

/// One decoded DICOM file: the 128-byte preamble, if the file had one, and the file object
/// holding the file meta group and the data set, including the pixel data.
#[derive(Debug, Clone)]
pub struct Record {
    preamble: Option<[u8; PREAMBLE_LENGTH]>,
    object: DefaultDicomObject,
}

impl Record {
    pub fn new(object: DefaultDicomObject) -> Self {
        Self {
            preamble: None,
            object,
        }
    }

    pub fn with_preamble(mut self, preamble: [u8; PREAMBLE_LENGTH]) -> Self {
        self.preamble = Some(preamble);
        self
    }

    pub fn preamble(&self) -> Option<&[u8; PREAMBLE_LENGTH]> {
        self.preamble.as_ref()
    }

    pub fn object(&self) -> &DefaultDicomObject {
        &self.object
    }

    pub fn into_object(self) -> DefaultDicomObject {
        self.object
    }

    /// Creates a record for `object` that carries over this record's preamble.
    pub fn derive(&self, object: DefaultDicomObject) -> Self {
        Self {
            preamble: self.preamble,
            object,
        }
    }
}

pub trait Codec {
    fn parse(&self, bytes: &[u8]) -> Result<Record, CodecError>;

    fn encode(&self, record: &Record) -> Result<Vec<u8>, CodecError>;
}

/// [`Codec`] for DICOM Part 10 files, backed by `dicom-object`.
///
/// Files are accepted with or without the 128-byte preamble. Encoding writes the record's
/// preamble back, or an all-zero one if it has none.
#[derive(Debug, Clone, Copy, Default)]
pub struct DicomCodec;

fn split_preamble(bytes: &[u8]) -> Result<(Option<[u8; PREAMBLE_LENGTH]>, &[u8]), CodecError> {
    if bytes.starts_with(MAGIC_CODE) {
        return Ok((None, bytes));
    }

    match bytes.get(PREAMBLE_LENGTH..PREAMBLE_LENGTH + MAGIC_CODE.len()) {
        Some(magic) if magic == MAGIC_CODE => {
            let mut preamble = [0_u8; PREAMBLE_LENGTH];
            preamble.copy_from_slice(&bytes[..PREAMBLE_LENGTH]);
            Ok((Some(preamble), &bytes[PREAMBLE_LENGTH..]))
        }
        _ => Err(CodecError::MissingMagicCode),
    }
}

impl Codec for DicomCodec {
    fn parse(&self, bytes: &[u8]) -> Result<Record, CodecError> {
        let (preamble, body) = split_preamble(bytes)?;

        let object = OpenFileOptions::new()
            .read_preamble(ReadPreamble::Never)
            .from_reader(body)
            .map_err(|err| CodecError::ReadError(format!("{err}")))?;

        Ok(Record { preamble, object })
    }

    fn encode(&self, record: &Record) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();
        record
            .object
            .write_all(&mut bytes)
            .map_err(|err| CodecError::WriteError(format!("{err}")))?;

        let preamble = record.preamble.unwrap_or([0_u8; PREAMBLE_LENGTH]);
        if bytes.starts_with(MAGIC_CODE) {
            let mut with_preamble = preamble.to_vec();
            with_preamble.extend_from_slice(&bytes);
            return Ok(with_preamble);
        }
        match bytes.get_mut(..PREAMBLE_LENGTH) {
            Some(head) => head.copy_from_slice(&preamble),
            None => return Err(CodecError::WriteError("output has no preamble".into())),
        }
        Ok(bytes)
    }
}
