use bincode::{config::standard, decode_from_slice, encode_to_vec};

/// Types a stored record can be decoded into.
///
/// Implemented for every `bincode::Decode` type with the standard config, so
/// a record type only needs `#[derive(bincode::Decode)]`.
pub trait RecordDecode: Sized {
    fn decode_record(bytes: &[u8]) -> Result<Self, bincode::error::DecodeError>;
}

/// Types a record can be encoded from before it is written.
pub trait RecordEncode {
    fn encode_record(&self) -> Result<Vec<u8>, bincode::error::EncodeError>;
}

impl<T: bincode::Decode<()>> RecordDecode for T {
    fn decode_record(bytes: &[u8]) -> Result<Self, bincode::error::DecodeError> {
        let (decoded, _) = decode_from_slice(bytes, standard())?;
        Ok(decoded)
    }
}

impl<T: bincode::Encode> RecordEncode for T {
    fn encode_record(&self) -> Result<Vec<u8>, bincode::error::EncodeError> {
        encode_to_vec(self, standard())
    }
}
