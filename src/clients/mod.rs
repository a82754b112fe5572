pub mod rubric_client;

pub use rubric_client::RubricClient;
