//! Argument validation against a per-target allow-list
//!
//! 플래그(`-`로 시작)는 허용 목록에 정확히 있을 때만 유지하고, `=`가 없으며 다음
//! 토큰이 플래그가 아니면 다음 토큰을 값으로 함께 유지합니다. 플래그가 아닌 토큰은
//! 그대로 유지되므로, 제거된 플래그 뒤의 값도 독립 인자로 남습니다.

use tracing::{debug, warn};

/// Prefix marking a candidate flag
const FLAG_PREFIX: char = '-';

fn is_flag(arg: &str) -> bool {
    arg.starts_with(FLAG_PREFIX)
}

/// Filter `args` against `allow_list`, never failing
pub fn validate_args(target: &str, args: &[String], allow_list: &[String]) -> Vec<String> {
    if args.is_empty() {
        return Vec::new();
    }

    if allow_list.is_empty() {
        warn!(
            "Target '{}' declares no supported args, ignoring {:?}",
            target, args
        );
        return Vec::new();
    }

    let mut validated = Vec::with_capacity(args.len());
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];

        if is_flag(arg) {
            if allow_list.iter().any(|allowed| allowed == arg) {
                debug!("Target '{}': flag '{}' allowed", target, arg);
                validated.push(arg.clone());

                if !arg.contains('=') && i + 1 < args.len() && !is_flag(&args[i + 1]) {
                    i += 1;
                    debug!("Target '{}': value '{}' kept", target, args[i]);
                    validated.push(args[i].clone());
                }
            } else {
                warn!(
                    "Target '{}': unsupported flag '{}' dropped (supported: {:?})",
                    target, arg, allow_list
                );
            }
        } else {
            // standalone value, or a second positional after a kept value
            validated.push(arg.clone());
        }

        i += 1;
    }

    validated
}
