// Thin namespace wrapper for API-layer components
pub mod handlers {
    pub use crate::handlers::*;
}

pub mod prediction {
    pub use crate::prediction::*;
}
