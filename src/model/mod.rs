pub mod algorithm;
pub mod history;
pub mod lockout;
pub mod log;
pub mod policy;
pub mod user;
