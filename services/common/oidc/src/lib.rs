pub mod claims;
pub mod clock;
pub mod config;
pub mod discovery;
pub mod error;
pub mod jwks;
pub mod keys;
pub mod metrics;
pub mod token;
pub mod verifier;

pub use claims::{Audience, ClaimSet};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ProviderConfig;
pub use discovery::{fetch_discovery, DiscoveryDocument};
pub use error::{OidcError, OidcResult, RejectionKind};
pub use jwks::{JwksFetcher, JwksKeySource};
pub use keys::{InMemoryKeyStore, SigningKeyResolver};
pub use metrics::VerifierMetrics;
pub use token::{DecodedToken, TokenHeader};
pub use verifier::IdTokenVerifier;
