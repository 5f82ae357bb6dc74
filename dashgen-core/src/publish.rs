//! Publishing regenerated outputs to version control using git2

use git2::{Cred, IndexAddOption, PushOptions, RemoteCallbacks, Repository, Signature};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::PublishSettings;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Remote '{0}' not found")]
    RemoteNotFound(String),
}

pub type Result<T> = std::result::Result<T, PublishError>;

/// What a publish run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Publishing was disabled or no repository was found
    Skipped(String),
    /// The working tree matched HEAD
    NothingToCommit,
    Committed { commit: String, pushed: bool },
}

/// Commits (and optionally pushes) the working tree
pub struct GitPublisher {
    repo: Repository,
    settings: PublishSettings,
}

impl GitPublisher {
    /// Open the repository containing `path`
    pub fn open(path: impl AsRef<Path>, settings: PublishSettings) -> Result<Self> {
        let repo = Repository::discover(path.as_ref())?;
        Ok(Self { repo, settings })
    }

    /// Stage everything, commit when something changed, push when a token is
    /// given
    pub fn publish(&self, message: &str, token: Option<&str>) -> Result<PublishOutcome> {
        self.stage_all()?;

        if !self.has_staged_changes()? {
            info!("Nothing to publish");
            return Ok(PublishOutcome::NothingToCommit);
        }

        let commit = self.commit(message)?;

        let pushed = match token {
            Some(token) => {
                self.push(token)?;
                true
            }
            None => {
                info!("No push token set, skipping push");
                false
            }
        };

        Ok(PublishOutcome::Committed { commit, pushed })
    }

    fn stage_all(&self) -> Result<()> {
        let mut index = self.repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        debug!("Staged all changes");
        Ok(())
    }

    fn has_staged_changes(&self) -> Result<bool> {
        let tree_id = self.repo.index()?.write_tree()?;
        match self.repo.head() {
            Ok(head) => Ok(head.peel_to_tree()?.id() != tree_id),
            Err(_) => Ok(!self.repo.find_tree(tree_id)?.is_empty()),
        }
    }

    fn signature(&self) -> Result<Signature<'static>> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig.to_owned()),
            Err(_) => Ok(Signature::now("dashgen", "dashgen@localhost")?),
        }
    }

    fn commit(&self, message: &str) -> Result<String> {
        let sig = self.signature()?;
        let tree_id = self.repo.index()?.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => None,
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let commit_id = self.repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        info!("Created commit: {}", commit_id);
        Ok(commit_id.to_string())
    }

    fn push(&self, token: &str) -> Result<()> {
        let mut remote = self
            .repo
            .find_remote(&self.settings.remote)
            .map_err(|_| PublishError::RemoteNotFound(self.settings.remote.clone()))?;

        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(|_url, _username, _allowed| {
            Cred::userpass_plaintext("x-access-token", token)
        });

        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);

        let refspec = format!("refs/heads/{0}:refs/heads/{0}", self.settings.branch);
        remote.push(&[refspec.as_str()], Some(&mut options))?;

        info!("Pushed to {}/{}", self.settings.remote, self.settings.branch);
        Ok(())
    }
}

/// Publish from `repo_dir` when enabled. Never fails: problems are logged and
/// reported as [`PublishOutcome::Skipped`].
pub fn publish_if_enabled(repo_dir: &Path, settings: &PublishSettings) -> PublishOutcome {
    if !settings.enabled {
        return PublishOutcome::Skipped("publishing disabled".to_string());
    }

    let publisher = match GitPublisher::open(repo_dir, settings.clone()) {
        Ok(publisher) => publisher,
        Err(e) => {
            warn!("Not publishing, no repository at {:?}: {}", repo_dir, e);
            return PublishOutcome::Skipped(e.to_string());
        }
    };

    let token = std::env::var(&settings.token_env).ok().filter(|t| !t.is_empty());
    match publisher.publish(&settings.message, token.as_deref()) {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Publish failed: {}", e);
            PublishOutcome::Skipped(e.to_string())
        }
    }
}
