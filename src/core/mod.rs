// Core modules: errors, time windows, service launch and supervision.
pub mod error;
pub mod launch;
pub mod supervisor;
pub mod window;
