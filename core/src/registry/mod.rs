pub mod error;
pub mod persistence;
pub mod seed;
pub mod store;
pub mod types;
pub mod verification;

pub use error::{RegistryError, RegistryErrorKind};
pub use persistence::RegistryPersistence;
pub use seed::{GLOBAL_EMERGENCY_GUIDANCE, emergency_number, seed_state};
pub use store::{RegistrySnapshot, RegistryState, ResourceRegistry};
pub use types::{
    ContactChannel, FabricationCheck, KnownFabrication, Resource, ResourceStatus, ServiceTier,
    VERIFICATION_WINDOW_DAYS, VerificationEvent, VerificationOutcome, normalize_contact_value,
};
pub use verification::{VerificationScheduler, VerifierPort};
