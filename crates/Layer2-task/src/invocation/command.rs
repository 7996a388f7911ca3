//! Launch argument assembly and input rendering

use relay_foundation::{SkipFlagPosition, SystemPromptMode, TargetConfig};
use serde::Serialize;
use tracing::warn;

/// Flag that lets a target run outside a git repository
pub const SKIP_GIT_REPO_CHECK_FLAG: &str = "--skip-git-repo-check";

/// Structured input document for targets without a native system-prompt flag
#[derive(Debug, Serialize)]
struct StructuredInput<'a> {
    system_prompt: &'a str,
    prompt: &'a str,
}

/// Full launch vector: `[command] + native prompt flags + base args block + validated args`
pub fn build_launch_args(
    config: &TargetConfig,
    system_prompt: Option<&str>,
    skip_git_repo_check: bool,
    validated_args: &[String],
) -> Vec<String> {
    let mut args = vec![config.command.clone()];

    if let (SystemPromptMode::NativeFlag { flags }, Some(system_prompt)) =
        (&config.system_prompt_mode, system_prompt)
    {
        args.extend(flags.iter().cloned());
        args.push(system_prompt.to_string());
    }

    if skip_git_repo_check && config.supports_skip_git_check {
        match config.skip_git_check_position {
            SkipFlagPosition::BeforeExtraArgs => {
                args.push(SKIP_GIT_REPO_CHECK_FLAG.to_string());
                args.extend(config.extra_args.iter().cloned());
            }
            SkipFlagPosition::AfterExtraArgs => match config.extra_args.split_first() {
                Some((first, rest)) => {
                    args.push(first.clone());
                    args.push(SKIP_GIT_REPO_CHECK_FLAG.to_string());
                    args.extend(rest.iter().cloned());
                }
                None => args.push(SKIP_GIT_REPO_CHECK_FLAG.to_string()),
            },
        }
    } else {
        args.extend(config.extra_args.iter().cloned());
    }

    args.extend(validated_args.iter().cloned());
    args
}

/// Content written to the input file
pub fn render_input(config: &TargetConfig, prompt: &str, system_prompt: Option<&str>) -> String {
    match (&config.system_prompt_mode, system_prompt) {
        (SystemPromptMode::Structured, Some(system_prompt)) => {
            let doc = StructuredInput {
                system_prompt,
                prompt,
            };
            match serde_yaml::to_string(&doc) {
                Ok(yaml) => yaml,
                Err(e) => {
                    // plain string fields; only reachable on a serializer bug
                    warn!("Failed to render structured input, sending raw prompt: {}", e);
                    prompt.to_string()
                }
            }
        }
        _ => prompt.to_string(),
    }
}
