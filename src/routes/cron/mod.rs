mod handler;
mod model;

pub use handler::sweep_queue;
pub use model::SweepResponse;
