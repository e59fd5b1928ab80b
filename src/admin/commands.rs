//! Command line builders for the Gerrit SSH administrative commands.

use super::{AdminError, GerritVersion};

/// Keys accepted by [`update_project_command`].
pub const UPDATE_ALLOWED_KEYS: [&str; 8] = [
    "description",
    "submit-type",
    "contributor-agreements",
    "signed-off-by",
    "content-merge",
    "change-id",
    "project-state",
    "max-object-size-limit",
];

/// Lists installed plugins as a JSON object keyed by plugin name.
pub const PLUGIN_LIST_COMMAND: &str = "gerrit plugin ls --format json";

/// Prints `gerrit version <version>`.
pub const VERSION_COMMAND: &str = "gerrit version";

/// Wrap a value in double quotes, escaping embedded quotes.
#[must_use]
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

/// `gerrit create-group`.
#[must_use]
pub fn create_group_command(group: &str, visible_to_all: bool, owner: Option<&str>) -> String {
    let mut cmd = "gerrit create-group".to_string();
    if visible_to_all {
        cmd.push_str(" --visible-to-all");
    }
    if let Some(owner) = owner {
        cmd.push_str(" --owner ");
        cmd.push_str(owner);
    }
    cmd.push(' ');
    cmd.push_str(&quote(group));
    cmd
}

/// `gerrit set-project <project> --<key> <value>`.
///
/// # Errors
///
/// Returns `AdminError::InvalidUpdateKey` if `key` is not in
/// [`UPDATE_ALLOWED_KEYS`].
pub fn update_project_command(project: &str, key: &str, value: &str) -> Result<String, AdminError> {
    if !UPDATE_ALLOWED_KEYS.contains(&key) {
        return Err(AdminError::InvalidUpdateKey(key.to_string()));
    }
    let value = if key == "description" {
        quote(value)
    } else {
        value.to_string()
    };
    Ok(format!("gerrit set-project {project} --{key} {value}"))
}

/// `gerrit ls-projects`.
#[must_use]
pub fn list_projects_command(show_description: bool) -> String {
    if show_description {
        "gerrit ls-projects --description".to_string()
    } else {
        "gerrit ls-projects".to_string()
    }
}

/// `gerrit ls-groups`.
#[must_use]
pub fn list_groups_command(verbose: bool) -> String {
    if verbose {
        "gerrit ls-groups -v".to_string()
    } else {
        "gerrit ls-groups".to_string()
    }
}

/// Start replication of `project`, or of all projects when `None`.
///
/// `legacy` selects the pre-plugin `gerrit replicate` command.
#[must_use]
pub fn replicate_command(project: Option<&str>, legacy: bool) -> String {
    let project = project.unwrap_or("--all");
    if legacy {
        format!("gerrit replicate {project}")
    } else {
        format!("replication start {project}")
    }
}

/// Builder for `gerrit create-project`.
#[derive(Debug, Clone)]
pub struct CreateProjectCommand {
    project: String,
    require_change_id: bool,
    empty_repo: bool,
    description: Option<String>,
}

impl CreateProjectCommand {
    /// Create a new builder. Change-Id is required by default.
    #[must_use]
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            require_change_id: true,
            empty_repo: false,
            description: None,
        }
    }

    /// Require a Change-Id footer.
    #[must_use]
    pub fn require_change_id(mut self, require: bool) -> Self {
        self.require_change_id = require;
        self
    }

    /// Create an initial empty commit.
    #[must_use]
    pub fn empty_repo(mut self, empty: bool) -> Self {
        self.empty_repo = empty;
        self
    }

    /// Set the project description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Get the project name.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Build the command line for a server of the given version.
    ///
    /// An unknown version is treated as older than 2.12.
    #[must_use]
    pub fn build(&self, version: Option<GerritVersion>) -> String {
        let mut cmd = "gerrit create-project".to_string();
        if self.require_change_id {
            cmd.push_str(" --require-change-id");
        }
        if self.empty_repo {
            cmd.push_str(" --empty-commit");
        }
        if let Some(description) = &self.description {
            cmd.push_str(" --description ");
            cmd.push_str(&quote(description));
        }
        if version.is_some_and(|v| v.supports_positional_project_name()) {
            cmd.push(' ');
        } else {
            cmd.push_str(" --name ");
        }
        cmd.push_str(&quote(&self.project));
        cmd
    }
}

/// A `--<label>` option of `gerrit review`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReviewAction {
    Flag(String),
    Value(String, String),
}

/// Builder for `gerrit review`.
#[derive(Debug, Clone)]
pub struct ReviewCommand {
    change: String,
    project: String,
    message: Option<String>,
    actions: Vec<ReviewAction>,
}

impl ReviewCommand {
    /// Review `change` (a change number with patch set, or a commit) of `project`.
    #[must_use]
    pub fn new(change: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            change: change.into(),
            project: project.into(),
            message: None,
            actions: Vec::new(),
        }
    }

    /// Attach a review message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Add a bare flag such as `--submit` or `--abandon`.
    #[must_use]
    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.actions.push(ReviewAction::Flag(name.into()));
        self
    }

    /// Add an option with a value such as `--code-review +2`.
    #[must_use]
    pub fn label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.actions.push(ReviewAction::Value(name.into(), value.into()));
        self
    }

    /// Build the command line.
    #[must_use]
    pub fn build(&self) -> String {
        let mut cmd = format!("gerrit review {} --project {}", self.change, self.project);
        if let Some(message) = &self.message {
            cmd.push_str(" --message ");
            cmd.push_str(&quote(message));
        }
        for action in &self.actions {
            match action {
                ReviewAction::Flag(name) => {
                    cmd.push_str(" --");
                    cmd.push_str(name);
                }
                ReviewAction::Value(name, value) => {
                    cmd.push_str(&format!(" --{name} {value}"));
                }
            }
        }
        cmd
    }
}

/// Builder for `gerrit query --format json`.
#[derive(Debug, Clone)]
pub struct QueryCommand {
    query: String,
    commit_message: bool,
    comments: bool,
}

impl QueryCommand {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            commit_message: false,
            comments: false,
        }
    }

    /// Include the full commit message.
    #[must_use]
    pub fn commit_message(mut self, include: bool) -> Self {
        self.commit_message = include;
        self
    }

    /// Include review comments.
    #[must_use]
    pub fn comments(mut self, include: bool) -> Self {
        self.comments = include;
        self
    }

    /// Build the command line.
    #[must_use]
    pub fn build(&self) -> String {
        let mut cmd = "gerrit query --format json".to_string();
        if self.commit_message {
            cmd.push_str(" --commit-message");
        }
        if self.comments {
            cmd.push_str(" --comments");
        }
        cmd.push(' ');
        cmd.push_str(&self.query);
        cmd
    }
}
