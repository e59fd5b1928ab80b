//! Administrative operations of [`GerritClient`].

use serde_json::{Map, Value};

use super::GerritClient;
use crate::admin::{
    create_group_command, list_groups_command, list_projects_command, parse_version,
    replicate_command, run_command, update_project_command, version_from_output, AdminError,
    CommandOutput, CreateProjectCommand, QueryCommand, ReviewCommand, PLUGIN_LIST_COMMAND,
    VERSION_COMMAND,
};
use crate::stream::EventRecord;

impl GerritClient {
    async fn ssh(&self, command: &str) -> Result<CommandOutput, AdminError> {
        run_command(self.provider.as_ref(), &self.target, command).await
    }

    /// Create a group. Returns the command's stderr.
    ///
    /// # Errors
    ///
    /// Returns `AdminError` if the command fails.
    pub async fn create_group(
        &self,
        group: &str,
        visible_to_all: bool,
        owner: Option<&str>,
    ) -> Result<String, AdminError> {
        let output = self
            .ssh(&create_group_command(group, visible_to_all, owner))
            .await?;
        Ok(output.stderr)
    }

    /// Create a project, picking the name syntax the server understands.
    /// Returns the command's stderr.
    ///
    /// # Errors
    ///
    /// Returns `AdminError` if the command fails. A failed version probe is
    /// not an error; the server is then treated as older than 2.12.
    pub async fn create_project(&self, command: &CreateProjectCommand) -> Result<String, AdminError> {
        let version = match self.get_version().await {
            Ok(raw) => parse_version(&raw).ok(),
            Err(e) => {
                tracing::debug!(error = %e, "Gerrit version unknown");
                None
            }
        };
        let output = self.ssh(&command.build(version)).await?;
        Ok(output.stderr)
    }

    /// Change one setting of a project. Returns the command's stderr.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::InvalidUpdateKey` for unsupported keys, or
    /// `AdminError` if the command fails.
    pub async fn update_project(
        &self,
        project: &str,
        key: &str,
        value: &str,
    ) -> Result<String, AdminError> {
        let command = update_project_command(project, key, value)?;
        let output = self.ssh(&command).await?;
        Ok(output.stderr)
    }

    /// List project names, optionally as `name - description`.
    ///
    /// # Errors
    ///
    /// Returns `AdminError` if the command fails.
    pub async fn list_projects(&self, show_description: bool) -> Result<Vec<String>, AdminError> {
        Ok(self.ssh(&list_projects_command(show_description)).await?.lines())
    }

    /// List group names.
    ///
    /// # Errors
    ///
    /// Returns `AdminError` if the command fails.
    pub async fn list_groups(&self, verbose: bool) -> Result<Vec<String>, AdminError> {
        Ok(self.ssh(&list_groups_command(verbose)).await?.lines())
    }

    /// Installed plugins keyed by name (needs Gerrit 2.5 or later).
    ///
    /// # Errors
    ///
    /// Returns `AdminError` if the command fails or its output is not a JSON object.
    pub async fn get_plugins(&self) -> Result<Map<String, Value>, AdminError> {
        let output = self.ssh(PLUGIN_LIST_COMMAND).await?;
        Ok(serde_json::from_str(&output.stdout)?)
    }

    /// Names of the installed plugins.
    ///
    /// # Errors
    ///
    /// Same as [`get_plugins`](Self::get_plugins).
    pub async fn list_plugins(&self) -> Result<Vec<String>, AdminError> {
        Ok(self.get_plugins().await?.into_iter().map(|(name, _)| name).collect())
    }

    /// The server version string (needs Gerrit 2.6 or later).
    ///
    /// # Errors
    ///
    /// Returns `AdminError` if the command fails or prints something unexpected.
    pub async fn get_version(&self) -> Result<String, AdminError> {
        let output = self.ssh(VERSION_COMMAND).await?;
        version_from_output(&output.stdout)
            .map(String::from)
            .ok_or_else(|| AdminError::UnexpectedOutput {
                command: VERSION_COMMAND.to_string(),
                output: output.stdout.clone(),
            })
    }

    /// Trigger replication of one project, or all when `None`.
    ///
    /// Uses the replication plugin when plugins can be listed, otherwise the
    /// legacy `gerrit replicate`. A successful plugin listing is remembered.
    ///
    /// # Errors
    ///
    /// Returns `AdminError` if the replication command fails.
    pub async fn replicate(&self, project: Option<&str>) -> Result<Vec<String>, AdminError> {
        let legacy = match self
            .installed_plugins
            .get_or_try_init(|| self.list_plugins())
            .await
        {
            Ok(_) => false,
            Err(e) => {
                tracing::debug!(error = %e, "Plugin listing unavailable, using gerrit replicate");
                true
            }
        };
        let output = self.ssh(&replicate_command(project, legacy)).await?;
        Ok(output.stdout.split('\n').map(String::from).collect())
    }

    /// Post a review. Returns the command's stderr.
    ///
    /// # Errors
    ///
    /// Returns `AdminError` if the command fails.
    pub async fn review(&self, command: &ReviewCommand) -> Result<String, AdminError> {
        let output = self.ssh(&command.build()).await?;
        Ok(output.stderr)
    }

    /// First result of a query, or `None` if nothing matched.
    ///
    /// # Errors
    ///
    /// Returns `AdminError` if the command fails or the first line is not JSON.
    pub async fn query(&self, command: &QueryCommand) -> Result<Option<EventRecord>, AdminError> {
        let output = self.ssh(&command.build()).await?;
        let Some(first) = output.stdout.split('\n').next().filter(|l| !l.is_empty()) else {
            return Ok(None);
        };
        let data: Option<EventRecord> = serde_json::from_str(first)?;
        let data = data.filter(|d| !d.is_empty());
        if let Some(record) = &data {
            tracing::debug!(data = ?record, "Received data from Gerrit query");
        }
        Ok(data)
    }

    /// Every line of a query's JSON output, including the trailing stats row.
    ///
    /// # Errors
    ///
    /// Returns `AdminError` if the command fails or a line is not JSON.
    pub async fn bulk_query(&self, query: &str) -> Result<Vec<EventRecord>, AdminError> {
        let output = self.ssh(&QueryCommand::new(query).build()).await?;
        let data = output
            .lines()
            .iter()
            .map(|line| serde_json::from_str(line))
            .collect::<Result<Vec<EventRecord>, _>>()?;
        tracing::debug!(count = data.len(), "Received data from Gerrit query");
        Ok(data)
    }
}
