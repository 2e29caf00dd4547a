//! Player directory and admission guard

pub mod directory;
pub mod guard;

pub use directory::PlayerDirectory;
pub use guard::{AdmissionGuard, GuardContext, PolicyAdmissionGuard, Verdict};
