pub mod api_client;
pub mod autofill;
pub mod generation_flow;
pub mod identity_client;
pub mod session_cache;
pub mod streak;

pub use api_client::{ApiClient, ApiError};
pub use generation_flow::{FlowError, FlowState, GenerationFlow};
pub use identity_client::{AuthFailure, IdentityClient};
pub use session_cache::SessionCache;
