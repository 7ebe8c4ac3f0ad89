pub mod analyzer;
pub mod clock;
pub mod hit_test;
pub mod session;
pub mod store;
pub mod viewport;
