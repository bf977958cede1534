pub mod execution_service;
pub mod file_service;
pub mod folder_tree_service;
pub mod ledger_service;
pub mod scan_service;
pub mod session_service;
pub mod settings_service;
pub mod trash_service;
