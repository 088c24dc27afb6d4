//! CI trigger handling.
//!
//! The event that started a run only decides what context gets logged; every
//! event walks and documents the whole repository.

use crate::error::{Error, Result};
use crate::source::SourceHost;
use std::fmt;
use std::str::FromStr;

/// Kind of event that triggered a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A pull request was opened or updated
    PullRequest,
    /// Commits were pushed to a branch
    Push,
}

impl EventKind {
    /// Returns the identifier used by CI environments.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::PullRequest => "pull_request",
            Self::Push => "push",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pull_request" => Ok(Self::PullRequest),
            "push" => Ok(Self::Push),
            other => Err(Error::config(format!(
                "Unsupported event type '{other}': expected 'pull_request' or 'push'"
            ))),
        }
    }
}

/// A fully resolved trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Pull request number and its source branch
    PullRequest {
        /// Pull request number
        number: u64,
        /// Head branch of the pull request
        branch: String,
    },
    /// Pushed branch
    Push {
        /// Branch name without the `refs/heads/` prefix
        branch: String,
    },
}

impl Trigger {
    /// Resolves the trigger, looking the pull request up on the source host if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the pull request number is missing or the lookup fails.
    pub fn resolve(
        kind: EventKind,
        pull_request: Option<u64>,
        git_ref: Option<&str>,
        source: &dyn SourceHost,
    ) -> Result<Self> {
        match kind {
            EventKind::PullRequest => {
                let number = pull_request.ok_or(Error::missing("pull_request_number"))?;
                let branch = source.pull_request_head(number)?;
                Ok(Self::PullRequest { number, branch })
            }
            EventKind::Push => Ok(Self::Push {
                branch: branch_name(git_ref.unwrap_or_default()).to_string(),
            }),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PullRequest { number, branch } => {
                write!(f, "pull request #{number} on branch {branch}")
            }
            Self::Push { branch } => write!(f, "push event on branch {branch}"),
        }
    }
}

fn branch_name(git_ref: &str) -> &str {
    git_ref.strip_prefix("refs/heads/").unwrap_or(git_ref)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ContentEntry, RepositoryInfo};

    struct PullRequestHost;

    impl SourceHost for PullRequestHost {
        fn repository(&self) -> Result<RepositoryInfo> {
            unimplemented!()
        }

        fn list_directory(&self, _path: &str) -> Result<Vec<ContentEntry>> {
            unimplemented!()
        }

        fn fetch_blob(&self, _path: &str) -> Result<Vec<u8>> {
            unimplemented!()
        }

        fn pull_request_head(&self, number: u64) -> Result<String> {
            Ok(format!("feature/{number}"))
        }
    }

    #[test]
    fn test_event_kind_parsing() {
        assert_eq!("push".parse::<EventKind>().unwrap(), EventKind::Push);
        assert_eq!(
            "pull_request".parse::<EventKind>().unwrap(),
            EventKind::PullRequest
        );
        assert!("workflow_dispatch".parse::<EventKind>().unwrap_err().is_config());
    }

    #[test]
    fn test_push_strips_heads_prefix() {
        let trigger =
            Trigger::resolve(EventKind::Push, None, Some("refs/heads/main"), &PullRequestHost)
                .unwrap();
        assert_eq!(
            trigger,
            Trigger::Push {
                branch: "main".to_string()
            }
        );
        assert_eq!(trigger.to_string(), "push event on branch main");
    }

    #[test]
    fn test_pull_request_looks_up_head_branch() {
        let trigger =
            Trigger::resolve(EventKind::PullRequest, Some(7), None, &PullRequestHost).unwrap();
        assert_eq!(trigger.to_string(), "pull request #7 on branch feature/7");
    }

    #[test]
    fn test_pull_request_requires_number() {
        let err = Trigger::resolve(EventKind::PullRequest, None, None, &PullRequestHost)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingField {
                field: "pull_request_number"
            }
        ));
    }
}
