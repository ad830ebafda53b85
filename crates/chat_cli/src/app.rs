use std::io::{self, BufRead, Write};

use multimodal_chat::classify::COMMAND_USAGE;
use multimodal_chat::{ChatSession, SessionEvent};
use tracing::debug;

use crate::commands::{parse_repl_line, ReplCommand};

pub const BANNER: &str = "CLI Chat Agent (type 'quit' to exit)";
pub const PROMPT: &str = "User: ";

/// Runs the read-eval-print loop until `quit`/`exit` or end of input.
///
/// Each line is fully answered before the next one is read. Remote and local
/// failures are printed inline and never end the loop; only I/O errors on
/// `input`/`output` do.
pub fn run_repl<R, W>(session: &mut ChatSession, mut input: R, output: &mut W) -> io::Result<()>
where
    R: BufRead,
    W: Write,
{
    writeln!(output, "{BANNER}")?;
    writeln!(output, "{COMMAND_USAGE}")?;

    let mut line = String::new();
    loop {
        write!(output, "\n{PROMPT}")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            debug!("stdin closed, ending session");
            writeln!(output)?;
            break;
        }

        let text = match parse_repl_line(&line) {
            ReplCommand::Exit => break,
            ReplCommand::Skip => continue,
            ReplCommand::Send(text) => text,
        };

        let mut write_result = Ok(());
        // Remote failures were already rendered from the event stream.
        let _ = session.send_command_line(&text, &mut |event| {
            if write_result.is_ok() {
                write_result = render_event(output, &event);
            }
        });
        write_result?;
    }

    Ok(())
}

pub fn render_event<W: Write>(output: &mut W, event: &SessionEvent) -> io::Result<()> {
    match event {
        SessionEvent::Notice(notice) => writeln!(output, "Error: {notice}"),
        SessionEvent::Transcribing { .. } => writeln!(output, "(transcribing audio...)"),
        SessionEvent::Thinking => {
            writeln!(output, "(thinking...)")?;
            output.flush()
        }
        SessionEvent::Replied(reply) => writeln!(output, "Assistant: {reply}"),
        SessionEvent::Failed(error) => writeln!(output, "Error: {error}"),
    }
}
