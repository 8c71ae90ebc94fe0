//! Module codecs for the Sonic Arranger player.
//!
//! Two encodings exist: the chunked "SOAR" file saved by the editor and the
//! offset-table layout embedded in replay binaries. Both decode into
//! [`sa_ir::Module`]; only the chunked form can be written back.

mod error;
mod legacy;
mod records;
mod table;
mod tagged;

use sa_ir::{Module, SourceFormat};
use std::io::Write;

pub use error::{FormatError, Result};

/// Magic at the start of the chunked encoding.
pub const TAGGED_MAGIC: [u8; 4] = *b"SOAR";

/// Pick the encoding of `data` from its first four bytes.
pub fn detect(data: &[u8]) -> Result<SourceFormat> {
    match data.get(..4) {
        None => Err(FormatError::TooShort { len: data.len() }),
        Some(magic) if magic == TAGGED_MAGIC => Ok(SourceFormat::Tagged),
        Some(_) => Ok(SourceFormat::Legacy),
    }
}

/// Decode a module from either encoding.
pub fn load_module(data: &[u8]) -> Result<Module> {
    match detect(data)? {
        SourceFormat::Tagged => tagged::decode(data),
        SourceFormat::Legacy => legacy::decode(data),
    }
}

/// Encode a module in the given form.
pub fn encode_module(module: &Module, format: SourceFormat) -> Result<Vec<u8>> {
    match format {
        SourceFormat::Tagged => tagged::encode(module),
        SourceFormat::Legacy => Err(FormatError::UnsupportedEncoding),
    }
}

/// Encode a module in the chunked form.
pub fn save_module(module: &Module) -> Result<Vec<u8>> {
    encode_module(module, SourceFormat::Tagged)
}

/// Encode a module in the chunked form into `w`.
pub fn write_module(w: &mut impl Write, module: &Module) -> Result<()> {
    let bytes = save_module(module)?;
    w.write_all(&bytes)?;
    Ok(())
}
