// Domain-layer modules and shared errors/models
pub mod features {
    pub use crate::features::*;
}

pub mod scoring {
    pub use crate::scoring::*;
}

pub mod classifier {
    pub use crate::classifier::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
