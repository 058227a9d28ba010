pub mod collect;
pub mod filter;
pub mod orchestrator;

pub use crate::domain::model::{Credential, FilterCriteria, Position, Profile, SheetRow};
pub use crate::domain::ports::{AuthPrompt, CredentialProvider, ProfileSearch, SheetDestination, SheetSink};
pub use crate::utils::error::Result;
