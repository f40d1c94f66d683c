pub mod accumulator;
pub mod cleanup;
pub mod credentials;
pub mod dispatcher;
pub mod metrics;
pub mod prompt;
pub mod providers;
pub mod session_store;

pub use accumulator::{StreamAccumulator, StreamOutcome};
pub use cleanup::clean_content;
pub use credentials::{CredentialSource, EnvCredentials, StaticCredentials};
pub use dispatcher::{GenerateCommand, GenerateError, GenerationDispatcher};
pub use self::metrics::{get_metrics, init_metrics};
pub use session_store::{Clock, ManualClock, SessionSnapshot, SessionStore, SystemClock};
