use std::sync::LazyLock;

use regex::Regex;

use crate::command::Command;
use crate::env::{EnvLookup, ProcessEnv};

/// CLI whose invocations are forced non-interactive.
pub const DEPLOY_CLI: &str = "gcloud";

/// Flag inserted right after [`DEPLOY_CLI`].
pub const QUIET_FLAG: &str = "--quiet";

/// Registry reference, whole token or the value after a chain of `key=`
/// prefixes (`--tag=`, `--substitutions=_IMAGE=`).
static REGISTRY_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<flag>(?:-{0,2}[A-Za-z0-9_][A-Za-z0-9_.-]*=)+)?gcr\.io/\S*$")
        .expect("registry reference pattern is valid")
});

static PROCESS_ENV: ProcessEnv = ProcessEnv;

/// Values substituted into recognized command shapes during one compile pass.
///
/// An empty service name or image reference leaves the corresponding
/// tokens as the README wrote them.
#[derive(Clone, Copy)]
pub struct SubstitutionContext<'a> {
    service: &'a str,
    image: &'a str,
    env: &'a dyn EnvLookup,
}

impl<'a> SubstitutionContext<'a> {
    /// Context reading `${NAME}` values from the process environment.
    pub fn new(service: &'a str, image: &'a str) -> Self {
        SubstitutionContext {
            service,
            image,
            env: &PROCESS_ENV,
        }
    }

    pub fn with_env(mut self, env: &'a dyn EnvLookup) -> Self {
        self.env = env;
        self
    }

    pub fn service(&self) -> &str {
        self.service
    }

    pub fn image(&self) -> &str {
        self.image
    }

    pub fn env(&self) -> &dyn EnvLookup {
        self.env
    }
}

impl std::fmt::Debug for SubstitutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubstitutionContext")
            .field("service", &self.service)
            .field("image", &self.image)
            .finish_non_exhaustive()
    }
}

/// Apply the deploy-target, registry and quiet rules to one command.
/// Applying it to its own output changes nothing.
pub(crate) fn apply(command: Command, ctx: &SubstitutionContext<'_>) -> Command {
    let (name, mut args) = command.into_parts();

    replace_deploy_target(&mut args, ctx.service);
    replace_registry_refs(&mut args, ctx.image);

    if name == DEPLOY_CLI && args.first().map(String::as_str) != Some(QUIET_FLAG) {
        args.insert(0, QUIET_FLAG.to_string());
    }

    Command::new(name, args)
}

/// `run services (deploy|update) <X> ...`: replace `<X>`.
fn replace_deploy_target(args: &mut [String], service: &str) {
    if service.is_empty() {
        return;
    }

    let start = usize::from(args.first().map(String::as_str) == Some(QUIET_FLAG));
    if let [run, services, verb, target, ..] = &mut args[start..] {
        let verb = verb.as_str();
        if run.as_str() == "run" && services.as_str() == "services" && (verb == "deploy" || verb == "update") {
            *target = service.to_string();
        }
    }
}

fn replace_registry_refs(args: &mut [String], image: &str) {
    if image.is_empty() {
        return;
    }

    for i in 0..args.len() {
        // `--image gcr.io/...`: the value of a detached flag is left alone.
        if i > 0 && is_detached_flag(&args[i - 1]) {
            continue;
        }
        let replaced = REGISTRY_REF.captures(&args[i]).map(|caps| {
            let flag = caps.name("flag").map_or("", |m| m.as_str());
            format!("{}{}", flag, image)
        });
        if let Some(replaced) = replaced {
            args[i] = replaced;
        }
    }
}

fn is_detached_flag(token: &str) -> bool {
    token.starts_with('-') && !token.contains('=')
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICE: &str = "unique_service_name";
    const IMAGE: &str = "gcr.io/unique/tag";

    fn subst(name: &str, args: &[&str]) -> Command {
        apply(Command::new(name, args.iter().copied()), &SubstitutionContext::new(SERVICE, IMAGE))
    }

    #[test]
    fn quiet_flag_only_for_deploy_cli() {
        assert_eq!(subst("gcloud", &["builds", "list"]).args(), ["--quiet", "builds", "list"]);
        assert_eq!(subst("echo", &["gcloud"]).args(), ["gcloud"]);
        assert_eq!(subst("gcloud", &[]).args(), ["--quiet"]);
    }

    #[test]
    fn deploy_and_update_targets() {
        assert_eq!(
            subst("gcloud", &["run", "services", "update", "hello", "other"]).args(),
            ["--quiet", "run", "services", "update", SERVICE, "other"]
        );
        // Shape mismatch: nothing to replace.
        assert_eq!(
            subst("gcloud", &["run", "services", "describe", "hello"]).args(),
            ["--quiet", "run", "services", "describe", "hello"]
        );
        assert_eq!(
            subst("gcloud", &["run", "services", "deploy"]).args(),
            ["--quiet", "run", "services", "deploy"]
        );
    }

    #[test]
    fn registry_refs_keep_flag_prefix() {
        assert_eq!(
            subst("docker", &["push", "gcr.io/hello/world"]).args(),
            ["push", IMAGE]
        );
        assert_eq!(
            subst("docker", &["build", "--tag=gcr.io/a/b", "."]).args(),
            ["build", "--tag=gcr.io/unique/tag", "."]
        );
        assert_eq!(
            subst("gcloud", &["builds", "submit", "--substitutions=_IMAGE=gcr.io/hello/world"]).args(),
            ["--quiet", "builds", "submit", "--substitutions=_IMAGE=gcr.io/unique/tag"]
        );
        assert_eq!(
            subst("docker", &["pull", "docker.io/gcr.io/x"]).args(),
            ["pull", "docker.io/gcr.io/x"]
        );
    }

    #[test]
    fn detached_flag_value_is_not_substituted() {
        assert_eq!(
            subst("gcloud", &["run", "services", "deploy", "hello", "--image", "gcr.io/hello/world"]).args(),
            ["--quiet", "run", "services", "deploy", SERVICE, "--image", "gcr.io/hello/world"]
        );
    }

    #[test]
    fn empty_context_leaves_tokens() {
        let ctx = SubstitutionContext::new("", "");
        let cmd = apply(
            Command::new("gcloud", ["run", "services", "deploy", "hello", "--image=gcr.io/a/b"]),
            &ctx,
        );
        assert_eq!(cmd.args(), ["--quiet", "run", "services", "deploy", "hello", "--image=gcr.io/a/b"]);
    }

    #[test]
    fn idempotent() {
        let ctx = SubstitutionContext::new(SERVICE, IMAGE);
        let inputs = [
            Command::new("gcloud", ["run", "services", "deploy", "hello", "--image=gcr.io/hello/world"]),
            Command::new("gcloud", ["builds", "submit", "--tag=gcr.io/hello/world"]),
            Command::new("docker", ["push", "gcr.io/hello/world"]),
            Command::new("gcloud", ["builds", "submit", "--substitutions=_IMAGE=gcr.io/a/b"]),
            Command::new("echo", ["hello"]),
        ];
        for input in inputs {
            let once = apply(input, &ctx);
            let twice = apply(once.clone(), &ctx);
            assert_eq!(once, twice);
        }
    }
}
