pub mod analyze;
mod feedback;
mod health;

pub use analyze::handle_analyze;
pub use feedback::handle_feedback;
pub use health::health_check;
