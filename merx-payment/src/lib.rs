pub mod fingerprint;
pub mod hosted;
pub mod mock;
pub mod provider;
pub mod registry;
pub mod status;

pub use hosted::HostedGateway;
pub use mock::MockGateway;
pub use provider::{InitPaymentResponse, PaymentProvider, PaymentRequest};
pub use registry::ProviderRegistry;
pub use status::{PaymentState, PaymentStatus};
