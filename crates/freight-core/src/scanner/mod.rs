pub mod walk;

pub use walk::{ensure_root, list_candidate_dirs, list_child_dir_names};
