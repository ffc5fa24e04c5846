pub mod access;
pub mod broker;
pub mod credentials;
pub mod identity;
pub mod ledger;
pub mod normalize;
pub mod resolver;

pub use crate::domain::model::{BindOutcome, BindRequest, BindResponse, BindStatus};
pub use crate::domain::ports::{AccessReviewer, IdentityResolver, ResourceStore};
pub use crate::utils::error::Result;
