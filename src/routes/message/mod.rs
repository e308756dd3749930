mod handler;
mod model;

pub use handler::submit_message;
pub use model::{SubmitMessageRequest, SubmitMessageResponse};
