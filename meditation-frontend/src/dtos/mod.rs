pub mod auth;
pub mod generation;

pub use auth::{LoginForm, SignupForm};
pub use generation::{
    field_messages, FlowVariant, GenerationForm, GenerationFormInput, GenerationRequest,
    GenerationRequestBuilder,
};
