//! Process-wide client session state: credential, device identity, visit date.
//!
//! All three live in the same durable store under fixed keys (see
//! [`crate::storage::keys`]). Writers replace whole values; last write wins.

pub mod credentials;
pub mod device;
pub mod visit;

pub use credentials::CredentialStore;
pub use device::{DeviceId, DeviceIdentity};
pub use visit::VisitTracker;
