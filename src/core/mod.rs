// Core data model, storage, routing, and query modules shared by the API and ABI layers.
pub mod component;
pub mod debug;
pub mod error;
pub mod flags;
pub mod handle;
pub mod mesh;
pub mod query;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod validate;
