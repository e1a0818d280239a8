//! Orchestrator tests with a scripted command runner
//!
//! These tests verify:
//! - A failed install does not stop the packages after it
//! - Present packages never reach their install handler
//! - Missing tools fail a package without running anything
//! - Environment changes made by one install reach later ones

use std::collections::HashMap;

use devsetup::{
    Catalog, CommandOutput, CommandRunner, Environment, InstallMethod, Orchestrator,
    PackageDescriptor, Result,
};

/// Answers every command from a script; unknown commands succeed for `run`
/// and fail for `query`.
#[derive(Default)]
struct ScriptedRunner {
    run_exit: HashMap<String, i32>,
    present: Vec<String>,
    listings: HashMap<String, String>,
    /// (command, PATH at the time)
    runs: Vec<(String, String)>,
    queries: Vec<String>,
}

impl ScriptedRunner {
    fn ran(&self) -> Vec<&str> {
        self.runs.iter().map(|(c, _)| c.as_str()).collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&mut self, command: &str, _privileged: bool, env: &Environment) -> Result<CommandOutput> {
        self.runs
            .push((command.to_string(), env.get("PATH").unwrap_or_default().to_string()));
        Ok(match self.run_exit.get(command) {
            Some(&code) if code != 0 => CommandOutput::failed(code),
            _ => CommandOutput::succeeded(),
        })
    }

    fn query(&mut self, command: &str, _env: &Environment) -> Result<CommandOutput> {
        self.queries.push(command.to_string());
        if let Some(stdout) = self.listings.get(command) {
            return Ok(CommandOutput {
                stdout: stdout.clone(),
                ..CommandOutput::succeeded()
            });
        }
        if self.present.iter().any(|c| c == command) {
            Ok(CommandOutput::succeeded())
        } else {
            Ok(CommandOutput::failed(1))
        }
    }
}

fn direct(id: &str, deps: &[&str]) -> PackageDescriptor {
    PackageDescriptor::new(id, id, InstallMethod::Direct, &format!("check {}", id))
        .install(&format!("install {}", id))
        .depends_on(deps)
}

#[test]
fn test_second_of_three_fails_third_still_attempted() {
    let catalog = Catalog::new(vec![direct("a", &[]), direct("b", &["a"]), direct("c", &[])]);
    let runner = ScriptedRunner {
        run_exit: HashMap::from([("install b".to_string(), 1)]),
        ..ScriptedRunner::default()
    };
    let mut orchestrator = Orchestrator::new(&catalog, runner, Environment::default());

    let outcome = orchestrator.install(&["b", "c"]);

    assert_eq!(orchestrator.runner().ran(), vec!["install a", "install b", "install c"]);
    assert_eq!(outcome.installed, vec!["a", "c"]);
    assert_eq!(outcome.failed_ids(), vec!["b"]);
    assert!(outcome.failed[0].reason.contains("install b"));
}

#[test]
fn test_dependent_of_failed_package_is_still_attempted() {
    let catalog = Catalog::new(vec![direct("base", &[]), direct("top", &["base"])]);
    let runner = ScriptedRunner {
        run_exit: HashMap::from([("install base".to_string(), 2)]),
        ..ScriptedRunner::default()
    };
    let mut orchestrator = Orchestrator::new(&catalog, runner, Environment::default());

    let outcome = orchestrator.install(&["top"]);
    assert_eq!(outcome.failed_ids(), vec!["base"]);
    assert_eq!(outcome.installed, vec!["top"]);
}

#[test]
fn test_present_package_never_installed() {
    let catalog = Catalog::new(vec![direct("a", &[]), direct("b", &["a"])]);
    let runner = ScriptedRunner {
        present: vec!["check a".to_string()],
        ..ScriptedRunner::default()
    };
    let mut orchestrator = Orchestrator::new(&catalog, runner, Environment::default());

    let outcome = orchestrator.install(&["b"]);

    assert_eq!(orchestrator.runner().ran(), vec!["install b"]);
    assert_eq!(outcome.installed, vec!["a", "b"]);
    assert_eq!(outcome.already_present, vec!["a"]);
    assert!(outcome.is_success());
}

#[test]
fn test_missing_tool_fails_without_running() {
    let catalog = Catalog::builtin();
    let runner = ScriptedRunner::default();
    let env = Environment::from_pairs([("PATH", "/nonexistent/devsetup-test")]);
    let mut orchestrator = Orchestrator::new(&catalog, runner, env);

    let outcome = orchestrator.install(&["git"]);

    assert!(orchestrator.runner().runs.is_empty());
    assert_eq!(outcome.failed_ids(), vec!["git"]);
    assert!(outcome.failed[0].reason.contains("brew"));
    assert_eq!(outcome.exit_code(), 0);
}

#[test]
fn test_rbenv_shims_reach_later_gem_installs() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    for tool in ["rbenv", "gem"] {
        let path = dir.path().join(tool);
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    let tools = dir.path().to_str().unwrap().to_string();

    let catalog = Catalog::builtin();
    let runner = ScriptedRunner {
        present: vec![
            "command -v rbenv".to_string(),
            "brew list --versions ruby-build".to_string(),
        ],
        listings: HashMap::from([(
            "rbenv install --list-all".to_string(),
            "3.2.6\n3.3.10\n3.3.9\n3.4.0-preview2\n".to_string(),
        )]),
        ..ScriptedRunner::default()
    };
    let env = Environment::from_pairs([("PATH", tools.as_str()), ("HOME", "/Users/dev")]);
    let mut orchestrator = Orchestrator::new(&catalog, runner, env).with_ruby_fallback("3.3.6");

    let outcome = orchestrator.install(&["bundler"]);
    assert!(outcome.failed.is_empty(), "{:?}", outcome.failed);
    assert_eq!(outcome.installed, vec!["rbenv", "ruby-build", "ruby", "bundler"]);

    let runner = orchestrator.runner();
    assert_eq!(
        runner.ran(),
        vec![
            "rbenv install -s 3.3.9",
            "rbenv global 3.3.9",
            "rbenv rehash",
            "gem install bundler",
            "rbenv rehash",
        ]
    );
    let (_, gem_path) = &runner.runs[3];
    assert!(gem_path.starts_with("/Users/dev/.rbenv/shims"));
    assert!(
        orchestrator
            .environment()
            .get("PATH")
            .unwrap()
            .starts_with("/Users/dev/.rbenv/shims")
    );
}

#[test]
fn test_dry_run_flag_is_reported() {
    struct DryRunner;

    impl CommandRunner for DryRunner {
        fn run(&mut self, _: &str, _: bool, _: &Environment) -> Result<CommandOutput> {
            Ok(CommandOutput::succeeded())
        }

        fn query(&mut self, _: &str, _: &Environment) -> Result<CommandOutput> {
            Ok(CommandOutput::failed(1))
        }

        fn is_dry_run(&self) -> bool {
            true
        }
    }

    let catalog = Catalog::new(vec![direct("a", &[])]);
    let mut orchestrator = Orchestrator::new(&catalog, DryRunner, Environment::default());
    let outcome = orchestrator.install(&["a"]);
    assert!(outcome.dry_run);
    assert_eq!(outcome.installed, vec!["a"]);
}
