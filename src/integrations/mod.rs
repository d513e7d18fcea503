//! Remote registry integration.

pub mod registry_client {
    pub use crate::registry_client::*;
}

pub mod sync {
    pub use crate::sync::*;
}
