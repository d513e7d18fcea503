// Domain-layer modules and shared errors/models
pub mod coordinator {
    pub use crate::coordinator::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod payment_status {
    pub use crate::payment_status::*;
}

pub mod visualization {
    pub use crate::visualization::*;
}

pub mod errors {
    pub use crate::errors::*;
}
