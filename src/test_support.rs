//! Test fixtures — executable shell scripts that stand in for the rosa CLI.
//!
//! Each script logs every invocation to `calls.log` next to itself and
//! answers `--help` with captured-style rosa output, so discovery, synthesis,
//! execution, and session tests run against a real subprocess boundary.

use std::os::unix::fs::PermissionsExt;

use tempfile::TempDir;

/// Write `body` as an executable `/bin/sh` script named `rosa` inside a
/// fresh temp dir. Returns the dir (keep it alive) and the script path.
pub(crate) fn fake_cli(body: &str) -> (TempDir, String) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("rosa");
    let script = format!("#!/bin/sh\n{}\n", body);
    std::fs::write(&path, script).expect("write fixture script");

    let mut perms = std::fs::metadata(&path).expect("stat fixture").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod fixture");

    (dir, path.to_string_lossy().into_owned())
}

const ROOT_HELP: &str = r#"Command line tool for Red Hat OpenShift Service on AWS.

Usage:
  rosa [command]

Available Commands:
  create      Create a resource from stdin
  login       Log in to your Red Hat account
  logout      Log out
{EXTRA_COMMANDS}
Flags:
  -h, --help   help for rosa

Global Flags:
      --color string   Surround certain characters with escape sequences
"#;

const CREATE_HELP: &str = r#"Create a resource from stdin.

Usage:
  rosa create [flags]

Available Commands:
  cluster     Create cluster

Flags:
  -h, --help   help for create

Global Flags:
      --color string   Surround certain characters with escape sequences
"#;

const CLUSTER_HELP: &str = r#"Create cluster.

Usage:
  rosa create cluster [flags]

Flags:
  -o, --output string   Output format. Allowed formats are [json yaml]
      --region string   Use a specific AWS region

Global Flags:
      --color string   Surround certain characters with escape sequences
"#;

const PLAIN_LEAF_HELP: &str = r#"Usage:
  rosa {NAME} [flags]

Flags:
  -h, --help   help for {NAME}

Global Flags:
      --color string   Surround certain characters with escape sequences
"#;

fn heredoc(text: &str) -> String {
    format!("cat <<'ROSA_EOF'\n{}\nROSA_EOF", text.trim_end())
}

/// Scenario A fixture: root advertises `create`, `login`, `logout`;
/// `create cluster` is a leaf with `-o, --output` and `--region`.
pub(crate) fn scenario_a_cli() -> (TempDir, String) {
    let body = format!(
        r#"log="$(dirname "$0")/calls.log"
printf '%s\n' "$*" >> "$log"
case "$*" in
  "--help")
    {root}
    ;;
  "create --help")
    {create}
    ;;
  "create cluster --help")
    {cluster}
    ;;
  "login --help")
    {login}
    ;;
  "logout --help")
    {logout}
    ;;
  "create cluster"*)
    printf '{{"kind":"Cluster","name":"foo"}}\n'
    ;;
  *)
    :
    ;;
esac"#,
        root = heredoc(&ROOT_HELP.replace("{EXTRA_COMMANDS}", "")),
        create = heredoc(CREATE_HELP),
        cluster = heredoc(CLUSTER_HELP),
        login = heredoc(&PLAIN_LEAF_HELP.replace("{NAME}", "login")),
        logout = heredoc(&PLAIN_LEAF_HELP.replace("{NAME}", "logout")),
    );
    fake_cli(&body)
}

/// Behavior of the fixture's `whoami` command.
pub(crate) enum WhoamiMode {
    /// Logged in: stdout is `{"OCM API": "<env>"}`.
    Env(&'static str),
    /// Logged out: stderr carries the not-logged-in marker, exit 0.
    NotLoggedIn,
    /// Status response is not a mapping.
    Malformed,
    /// The status command itself exits non-zero.
    ExecFail,
}

/// Session fixture: Scenario A commands plus `whoami`, with configurable
/// status behavior. `login`/`logout` invocations succeed.
pub(crate) fn session_cli(mode: WhoamiMode) -> (TempDir, String) {
    let whoami_arm = match mode {
        WhoamiMode::Env(env) => format!(r#"printf '{{"OCM API": "{}"}}\n'"#, env),
        WhoamiMode::NotLoggedIn => {
            "printf '{}\\n'\nprintf 'User is not logged in to OCM\\n' >&2".to_string()
        }
        WhoamiMode::Malformed => "printf 'not a mapping\\n'".to_string(),
        WhoamiMode::ExecFail => "printf 'whoami exploded\\n' >&2\nexit 1".to_string(),
    };

    let body = format!(
        r#"log="$(dirname "$0")/calls.log"
printf '%s\n' "$*" >> "$log"
case "$*" in
  "--help")
    {root}
    ;;
  "create --help")
    {create}
    ;;
  "create cluster --help")
    {cluster}
    ;;
  "login --help")
    {login}
    ;;
  "logout --help")
    {logout}
    ;;
  "whoami --help")
    {whoami_help}
    ;;
  "login --env="*)
    :
    ;;
  "logout")
    :
    ;;
  "whoami")
    {whoami_arm}
    ;;
  "create cluster"*)
    printf '{{"kind":"Cluster","name":"foo"}}\n'
    ;;
  *)
    :
    ;;
esac"#,
        root = heredoc(&ROOT_HELP.replace(
            "{EXTRA_COMMANDS}",
            "  whoami      Displays user account information\n"
        )),
        create = heredoc(CREATE_HELP),
        cluster = heredoc(CLUSTER_HELP),
        login = heredoc(&PLAIN_LEAF_HELP.replace("{NAME}", "login")),
        logout = heredoc(&PLAIN_LEAF_HELP.replace("{NAME}", "logout")),
        whoami_help = heredoc(&PLAIN_LEAF_HELP.replace("{NAME}", "whoami")),
        whoami_arm = whoami_arm,
    );
    fake_cli(&body)
}
