use thiserror::Error;

#[derive(Error, Debug)]
pub enum TypesError {
    #[error("RLP decode error: {0}")]
    RlpDecode(#[from] rlp::DecoderError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),
}
