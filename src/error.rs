/// Errors used throughout this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The OID value is not recognized.
    #[error("Invalid OID: 0x{0:08x}")]
    InvalidOid(u32),
    /// The parameter set name is not recognized.
    #[error("Invalid parameter set: {0}")]
    InvalidParameterSet(String),
    /// The Winternitz parameter value is not supported.
    #[error("Invalid parameters: unsupported Winternitz parameter w={0}")]
    InvalidParams(u32),
    /// All one-time signatures have been used.
    #[error("Key exhausted: all one-time signatures have been used")]
    KeyExhausted,
    /// The provided seed has an incorrect length.
    #[error("Invalid seed length: expected {expected}, got {got}")]
    InvalidSeedLength {
        /// Expected seed length in bytes.
        expected: usize,
        /// Actual seed length in bytes.
        got: usize,
    },
    /// Signature verification failed.
    #[error("Signature verification failed")]
    VerificationFailed,
    /// The hash function configuration is not supported.
    #[error("Hash function error: unsupported n={n} with func={func}")]
    Hash {
        /// The hash output length parameter.
        n: u32,
        /// The hash function identifier.
        func: u32,
    },
    /// The provided key has an incorrect length.
    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength {
        /// Expected key length in bytes.
        expected: usize,
        /// Actual key length in bytes.
        got: usize,
    },
    /// The provided signature has an incorrect length.
    #[error("Invalid signature length: expected {expected}, got {got}")]
    InvalidSignatureLength {
        /// Expected signature length in bytes.
        expected: usize,
        /// Actual signature length in bytes.
        got: usize,
    },
    /// `bds_k` must be even and no greater than the single-tree height.
    #[error("Invalid bds_k: {bds_k} (tree_height={tree_height})")]
    InvalidBdsK {
        /// The rejected `bds_k` value.
        bds_k: u32,
        /// The single-tree height it was checked against.
        tree_height: u32,
    },
    /// The XMSS-MT layer count `d` is outside the supported range.
    #[error("Invalid layer count: {0}")]
    InvalidLayerCount(u32),
    /// A deserialized BDS state does not match the size implied by its
    /// parameter set.
    #[error("BDS state mismatch: expected {expected} bytes, got {got}")]
    BdsStateMismatch {
        /// Expected serialized size in bytes.
        expected: usize,
        /// Actual buffer size in bytes.
        got: usize,
    },
}

/// Result type used by this crate.
pub type XmssResult<T> = Result<T, Error>;
