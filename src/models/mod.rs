pub mod file_record;
pub mod filter;
pub mod folder_node;
pub mod plan;
pub mod settings;
