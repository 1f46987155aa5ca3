//! Data access layer.

pub mod db {
    pub use crate::db::*;
}

pub mod db_storage {
    pub use crate::db_storage::*;
}

pub mod csv_import {
    pub use crate::csv_import::*;
}
