pub mod generation;

pub use generation::{
    GenerateRequest, GenerateResponse, HealthResponse, ProviderInfo, ProvidersResponse,
    StatusResponse,
};
