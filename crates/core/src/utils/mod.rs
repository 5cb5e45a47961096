pub mod pass_guard;
pub mod time_utils;

pub use pass_guard::PassGuard;
