//! Session flag synthesis per target strategy

use super::error::InvocationError;
use relay_foundation::SessionStrategy;
use tracing::{debug, warn};

/// Extra launch arguments that start or resume an external session
pub fn session_args(
    target: &str,
    strategy: &SessionStrategy,
    cli_session_id: &str,
    resume: bool,
    is_first_request: bool,
) -> Result<Vec<String>, InvocationError> {
    let resuming = resume && !is_first_request;

    match strategy {
        SessionStrategy::None => {
            debug!("{}: no session strategy, no session flags", target);
            Ok(Vec::new())
        }
        SessionStrategy::ExplicitId {
            new_flag,
            resume_flag,
        } => {
            if resuming {
                debug!("{} session resume: {}", target, cli_session_id);
                Ok(vec![resume_flag.clone(), cli_session_id.to_string()])
            } else {
                debug!("{} new session: {}", target, cli_session_id);
                Ok(vec![new_flag.clone(), cli_session_id.to_string()])
            }
        }
        SessionStrategy::ImplicitLatest {
            resume_flag,
            latest_value,
        } => {
            if resuming {
                debug!("{} session resume: {}", target, latest_value);
                Ok(vec![resume_flag.clone(), latest_value.clone()])
            } else {
                debug!("{} new session (no flag)", target);
                Ok(Vec::new())
            }
        }
        SessionStrategy::SubcommandRewrite => {
            if resuming {
                warn!(
                    "{} needs its launch subcommand rewritten to resume, which is unsupported",
                    target
                );
                Err(InvocationError::UnsupportedSession {
                    target: target.to_string(),
                    strategy: strategy.name().to_string(),
                })
            } else {
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::ErrorKind;

    const ID: &str = "2f0c7a8e-0000-4000-8000-000000000001";

    #[test]
    fn test_explicit_id_first_and_resume() {
        let strategy = SessionStrategy::explicit_id();

        let first = session_args("claude", &strategy, ID, false, true).unwrap();
        assert_eq!(first, vec!["--session-id".to_string(), ID.to_string()]);

        let resumed = session_args("claude", &strategy, ID, true, false).unwrap();
        assert_eq!(resumed, vec!["--resume".to_string(), ID.to_string()]);
    }

    #[test]
    fn test_explicit_id_resume_on_first_request_starts_new() {
        let strategy = SessionStrategy::explicit_id();
        let args = session_args("claude", &strategy, ID, true, true).unwrap();
        assert_eq!(args[0], "--session-id");
    }

    #[test]
    fn test_explicit_id_not_resumed_second_request() {
        let strategy = SessionStrategy::explicit_id();
        let args = session_args("claude", &strategy, ID, false, false).unwrap();
        assert_eq!(args, vec!["--session-id".to_string(), ID.to_string()]);
    }

    #[test]
    fn test_implicit_latest() {
        let strategy = SessionStrategy::implicit_latest();

        assert!(session_args("gemini", &strategy, ID, false, true)
            .unwrap()
            .is_empty());
        assert!(session_args("gemini", &strategy, ID, true, true)
            .unwrap()
            .is_empty());
        assert_eq!(
            session_args("gemini", &strategy, ID, true, false).unwrap(),
            vec!["--resume".to_string(), "latest".to_string()]
        );
    }

    #[test]
    fn test_subcommand_rewrite_is_unsupported_on_resume() {
        let strategy = SessionStrategy::SubcommandRewrite;

        assert!(session_args("codex", &strategy, ID, false, true)
            .unwrap()
            .is_empty());

        let err = session_args("codex", &strategy, ID, true, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedSession);
        assert!(err.to_string().contains("subcommand_rewrite"));
    }

    #[test]
    fn test_no_strategy() {
        assert!(session_args("cat", &SessionStrategy::None, ID, true, false)
            .unwrap()
            .is_empty());
    }
}
