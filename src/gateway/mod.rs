//! Gateway server implementation

pub mod endpoint;
pub mod envelope;
mod router;
mod server;
pub mod validation;

pub use endpoint::{ENDPOINTS, Endpoint, Operation};
pub use envelope::Envelope;
pub use router::{AppState, create_router};
pub use server::Gateway;
pub use validation::{Params, ValidationError};
