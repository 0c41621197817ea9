use std::process::Stdio;

use tokio::process::Command;

/// Command for `program` with stdout/stderr piped and stdin closed.
///
/// The child is killed if its handle is dropped, so a torn-down pool never leaves processes behind.
pub fn cmd_program(program: &str, args: &[String]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args.iter().map(|s| s.as_str()))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}
