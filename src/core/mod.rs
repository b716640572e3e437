// Core modules implementing table storage, records, and error modeling.
pub mod error;
pub mod paths;
pub mod record;
pub mod store;
