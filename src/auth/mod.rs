mod errors;
mod store;

pub use errors::CredentialError;
pub use store::{CREDENTIAL_KEY, CredentialStore, FileCredentialStore, MemoryCredentialStore};
