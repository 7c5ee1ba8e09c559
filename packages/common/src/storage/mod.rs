pub mod error;
pub mod filesystem;
pub mod traits;

pub use error::StorageError;
pub use filesystem::FilesystemObjectStore;
pub use traits::ObjectStore;
