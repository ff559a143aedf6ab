pub mod cipher;
pub mod codec;
pub mod error;
pub mod integrity;
pub mod issuer;
pub mod matching;
pub mod payload;
pub mod types;

pub use cipher::{ChaChaCipher, SymmetricCipher};
pub use error::{ErrorKind, ValidationError};
pub use issuer::{TokenClaims, TokenIssuer};
pub use payload::{DecryptedSecret, PayloadDecryptor};
pub use types::{AllowedTokenTypes, Assertions, Payload, TokenType};
