//! Administrative commands.
//!
//! Each command is a single line sent over its own short-lived session.
//! The builders here only format command lines; [`run_command`] executes
//! them and turns a non-zero exit status into [`AdminError::CommandFailed`].

mod commands;
mod error;
mod runner;
mod version;

pub use commands::{
    create_group_command, list_groups_command, list_projects_command, quote, replicate_command,
    update_project_command, CreateProjectCommand, QueryCommand, ReviewCommand, PLUGIN_LIST_COMMAND,
    UPDATE_ALLOWED_KEYS, VERSION_COMMAND,
};
pub use error::AdminError;
pub use runner::{run_command, CommandOutput};
pub use version::{parse_version, version_from_output, GerritVersion};
