pub mod decode;
pub mod diff;
pub mod extract;
pub mod loader;
pub mod model;
pub mod node;
pub mod pipeline;
pub mod serialize;
pub mod stats;
pub mod store;
pub mod verdict;
