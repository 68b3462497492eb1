pub mod args;
mod r#impl;
mod structs;

pub use r#impl::{
    DEFAULT_CONFIG_PATH, get_config, init_config, init_config_from_path, init_config_with,
};
pub use structs::*;
