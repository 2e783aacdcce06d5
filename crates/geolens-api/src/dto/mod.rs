mod request;
mod response;

pub use request::FeedbackRequest;
pub use response::{AnalyzeResponse, FeedbackResponse, HealthResponse};
