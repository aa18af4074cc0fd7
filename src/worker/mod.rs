pub mod pipeline;
pub mod worker;
