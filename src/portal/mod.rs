//! Client stack for the student registration portal.
//!
//! The portal has no public API; everything here impersonates the browser
//! session its own frontend would hold. `session` owns credential lifecycle,
//! `search` and `details` drive the two JSON endpoints, `wire` isolates the
//! portal's field names, and `transport` is the seam tests script against.

pub mod details;
pub mod errors;
pub mod json;
pub mod search;
pub mod session;
pub mod token;
pub mod transport;
pub mod wire;

pub use details::{DetailClient, DetailOutcome};
pub use errors::PortalError;
pub use search::{SearchClient, SubjectSearch};
pub use session::{Session, SessionManager};
pub use transport::{HttpTransport, PortalResponse, Transport};
