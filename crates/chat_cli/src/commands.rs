/// What the loop should do with one line read from the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Exit,
    Skip,
    Send(String),
}

pub fn parse_repl_line(input: &str) -> ReplCommand {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return ReplCommand::Skip;
    }

    if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
        return ReplCommand::Exit;
    }

    ReplCommand::Send(input.trim_end_matches(['\r', '\n']).to_string())
}
