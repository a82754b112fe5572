pub mod json_loader;

pub use json_loader::{load_all_datasets, load_dataset, DatasetContent, NamedDataset};
