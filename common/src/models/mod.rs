pub mod session;
pub mod verification;
